//! Forced-value propagation (percolation) of spaces and networks.
//!
//! Percolation is resolved through BDDs, which is necessary to recognize
//! non-syntactic tautologies (e.g. an update function that simplifies to a
//! constant only after some inputs are fixed).

use crate::spaces::BooleanSpace;
use crate::symbolic::{SymbolicFunctions, optimized_recursive_dnf};

use biodivine_lib_bdd::{Bdd, BddVariableSet};
use biodivine_lib_param_bn::{BooleanNetwork, FnUpdate, RegulatoryGraph};

use std::collections::BTreeSet;

/// Percolate a space through the network.
///
/// The result contains the original fixings of `space`, every variable that
/// becomes constant once `space` is imposed, and every variable that is
/// constant in the network itself.
///
/// If the argument is a trap space, the result is a trap subspace of it. For a
/// general space the propagation can conflict with the original fixing of some
/// variable; in that case the original value is kept and the conflict remains
/// in the result.
pub fn percolate_space(functions: &SymbolicFunctions, space: &BooleanSpace) -> BooleanSpace {
    let mut restriction = space.clone();
    let mut candidates: BTreeSet<usize> = (0..functions.num_vars()).collect();

    let mut done = false;
    while !done {
        done = true;
        for index in candidates.clone() {
            let update = functions.update(index);
            if let Some(value) = functions.function_eval(update, &restriction) {
                let name = functions.name(index);
                match restriction.get(name) {
                    Some(existing) if *existing != value => {
                        // A conflict. Keep the original value and stop
                        // propagating through this variable.
                        candidates.remove(&index);
                    }
                    _ => {
                        done = false;
                        restriction.insert(name.to_string(), value);
                        candidates.remove(&index);
                    }
                }
            }
        }
    }

    restriction
}

/// Percolate a space through the network, disregarding constants.
///
/// Unlike [percolate_space], constants that are already fixed within the
/// network are not propagated, and the result contains only the *new*
/// constants, not the fixings of `space` itself.
pub fn percolate_space_strict(
    functions: &SymbolicFunctions,
    space: &BooleanSpace,
) -> BooleanSpace {
    let mut result = BooleanSpace::new();
    let mut restriction = space.clone();
    let mut candidates: BTreeSet<usize> = (0..functions.num_vars()).collect();

    // Ignore variables that are constant in the network itself.
    for index in 0..functions.num_vars() {
        let update = functions.update(index);
        if update.is_true() || update.is_false() {
            candidates.remove(&index);
        }
    }

    let mut done = false;
    while !done {
        done = true;
        for index in candidates.clone() {
            let update = functions.update(index);
            if let Some(value) = functions.function_eval(update, &restriction) {
                let name = functions.name(index);
                match restriction.get(name) {
                    Some(existing) if *existing != value => {
                        // A conflict. We don't want to output this, but we
                        // also don't want to change the value.
                        candidates.remove(&index);
                    }
                    _ => {
                        done = false;
                        restriction.insert(name.to_string(), value);
                        result.insert(name.to_string(), value);
                        candidates.remove(&index);
                    }
                }
            }
        }
    }

    result
}

/// Find the variables of `space` whose fixed value conflicts with the
/// percolation of `space`.
pub fn percolation_conflicts(
    functions: &SymbolicFunctions,
    space: &BooleanSpace,
    strict_percolation: bool,
) -> BTreeSet<String> {
    let percolated = if strict_percolation {
        percolate_space_strict(functions, space)
    } else {
        percolate_space(functions, space)
    };

    let mut conflicts: BTreeSet<String> = BTreeSet::new();
    for (name, value) in &percolated {
        let Some(index) = functions.index_of(name) else {
            continue;
        };
        let update = functions.update(index);
        if let Some(fn_value) = functions.function_eval(update, &percolated) {
            if fn_value != *value {
                conflicts.insert(name.clone());
            }
        }
    }
    conflicts
}

/// Produce a copy of the network with update functions percolated to the given
/// space. With `remove_constants`, the percolated variables are eliminated
/// completely and the regulatory graph is re-inferred for the remaining ones.
pub fn percolate_network(
    network: &BooleanNetwork,
    functions: &SymbolicFunctions,
    space: &BooleanSpace,
    remove_constants: bool,
) -> Result<BooleanNetwork, String> {
    // Percolate the space first to ensure everything that can be fixed is fixed.
    let percolated = percolate_space(functions, space);
    let valuation = functions.space_to_valuation(&percolated)?;
    let restriction = valuation.to_values();

    let mut lines: Vec<(String, String)> = Vec::new();
    for index in 0..functions.num_vars() {
        let name = functions.name(index);
        if remove_constants && percolated.contains_key(name) {
            continue;
        }
        let update = functions.update(index).restrict(&restriction);
        lines.push((
            name.to_string(),
            bdd_to_bnet_expression(functions.bdd_variable_set(), &update),
        ));
    }

    if lines.is_empty() {
        // Everything is fixed; the percolated network is empty.
        return Ok(BooleanNetwork::new(RegulatoryGraph::new(Vec::new())));
    }

    BooleanNetwork::try_from_bnet(render_bnet(&lines).as_str())
}

/// Convert an update function term to a (not necessarily disjoint, not
/// necessarily minimal) list of subspaces whose union is exactly the set of
/// states satisfying the term.
pub fn expression_to_space_list(
    functions: &SymbolicFunctions,
    expression: &FnUpdate,
) -> Result<Vec<BooleanSpace>, String> {
    let bdd = functions.mk_function_bdd(expression)?;
    let vars = functions.bdd_variable_set();

    let mut spaces: Vec<BooleanSpace> = Vec::new();
    for clause in optimized_recursive_dnf(&bdd) {
        let mut space = BooleanSpace::new();
        for (var, value) in clause.to_values() {
            space.insert(vars.name_of(var), value);
        }
        spaces.push(space);
    }
    Ok(spaces)
}

/// Render the whole network in the `.bnet` format (used for snapshots and for
/// building sub-networks with a compatible update function semantics).
pub fn network_to_bnet(network: &BooleanNetwork) -> Result<String, String> {
    let functions = SymbolicFunctions::new(network)?;
    let mut lines: Vec<(String, String)> = Vec::new();
    for index in 0..functions.num_vars() {
        lines.push((
            functions.name(index).to_string(),
            bdd_to_bnet_expression(functions.bdd_variable_set(), functions.update(index)),
        ));
    }
    Ok(render_bnet(&lines))
}

/// Render `target, factors` lines into a `.bnet` model string, sorted by the
/// target name so that the output is deterministic.
pub(crate) fn render_bnet(lines: &[(String, String)]) -> String {
    let mut sorted = lines.to_vec();
    sorted.sort();
    let mut result = String::from("targets,factors\n");
    for (target, factors) in sorted {
        result.push_str(&format!("{target}, {factors}\n"));
    }
    result
}

/// Render a function BDD as a `.bnet` compatible Boolean expression.
pub(crate) fn bdd_to_bnet_expression(vars: &BddVariableSet, bdd: &Bdd) -> String {
    if bdd.is_true() {
        return "true".to_string();
    }
    if bdd.is_false() {
        return "false".to_string();
    }
    let mut clauses: Vec<String> = Vec::new();
    for clause in optimized_recursive_dnf(bdd) {
        let mut literals: Vec<String> = Vec::new();
        for (var, value) in clause.to_values() {
            let name = vars.name_of(var);
            literals.push(if value { name } else { format!("!{name}") });
        }
        clauses.push(format!("({})", literals.join(" & ")));
    }
    clauses.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;

    #[test]
    fn test_percolation_cycle() {
        // Fixing `a` propagates through the whole positive cycle.
        let bn = BooleanNetwork::try_from_bnet("targets,factors\na, b\nb, c\nc, a\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        let space = space_from_values(&[("a", false)]);
        let expected = space_from_values(&[("a", false), ("b", false), ("c", false)]);
        assert_eq!(percolate_space(&functions, &space), expected);

        // The strict variant also reports `a`, since the cycle confirms it.
        let strict = percolate_space_strict(&functions, &space);
        assert_eq!(strict, expected);
    }

    #[test]
    fn test_percolation_conflict() {
        // Here, `{a=0, b=0, c=0}` is not a trap space: percolation forces
        // `b=1`. The conflicting variable keeps its original value.
        let bn = BooleanNetwork::try_from_bnet("targets,factors\na, b\nb, !c\nc, a\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        let space = space_from_values(&[("a", false), ("b", false), ("c", false)]);
        assert_eq!(percolate_space(&functions, &space), space);

        // Strict percolation confirms `a` and `c`, but drops the conflict on `b`.
        let strict = percolate_space_strict(&functions, &space);
        assert_eq!(strict, space_from_values(&[("a", false), ("c", false)]));

        let conflicts = percolation_conflicts(&functions, &space, false);
        assert_eq!(conflicts, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn test_percolation_idempotence() {
        let bn = BooleanNetwork::try_from_bnet(
            "targets,factors\nS, S\nA, S | B\nB, A\nC, A | D\nD, C\nE, false\n",
        )
        .unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        for space in [
            BooleanSpace::new(),
            space_from_values(&[("S", false)]),
            space_from_values(&[("A", true), ("B", true)]),
        ] {
            let once = percolate_space(&functions, &space);
            let twice = percolate_space(&functions, &once);
            assert_eq!(once, twice);
        }

        // Network constants are always propagated by the non-strict variant.
        let root = percolate_space(&functions, &BooleanSpace::new());
        assert_eq!(root, space_from_values(&[("E", false)]));
    }

    #[test]
    fn test_percolate_network() {
        let bn = BooleanNetwork::try_from_bnet(
            "targets,factors\nS, S\nA, S | B\nB, A\nC, A | D\nD, C\nE, false\n",
        )
        .unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        let space = space_from_values(&[("S", false)]);
        let reduced = percolate_network(&bn, &functions, &space, true).unwrap();

        // `S` and `E` are eliminated, the rest keeps percolated functions.
        assert_eq!(reduced.num_vars(), 4);
        let reduced_functions = SymbolicFunctions::new(&reduced).unwrap();
        let a = reduced_functions.index_of("A").unwrap();
        // `A = S | B` percolates to `A = B`.
        let b_var = reduced_functions.bdd_variable(reduced_functions.index_of("B").unwrap());
        let expected = reduced_functions.bdd_variable_set().mk_var(b_var);
        assert_eq!(reduced_functions.update(a), &expected);
    }

    #[test]
    fn test_expression_to_space_list_round_trip() {
        let bn =
            BooleanNetwork::try_from_bnet("targets,factors\na, (a & !b) | c\nb, a\nc, b\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        let a_var = bn.as_graph().find_variable("a").unwrap();
        let expression = bn.get_update_function(a_var).as_ref().unwrap();

        let spaces = expression_to_space_list(&functions, expression).unwrap();
        // The union of the clauses is semantically equivalent to the function.
        let union = functions.mk_space_list_bdd(&spaces).unwrap();
        let original = functions.mk_function_bdd(expression).unwrap();
        assert_eq!(union, original);
    }
}
