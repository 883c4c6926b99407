//! Symbolic encoding of the update functions of a Boolean network.
//!
//! The engine manipulates update functions as BDDs over a dedicated variable set
//! that contains exactly one BDD variable per network variable (in network order).
//! This is deliberately independent of the `SymbolicAsyncGraph` encoding, which
//! reserves additional variables for parameters and is only used for reachability.

use crate::spaces::BooleanSpace;

use biodivine_lib_bdd::{
    Bdd, BddPartialValuation, BddValuation, BddVariable, BddVariableSet, BddVariableSetBuilder,
};
use biodivine_lib_param_bn::{BinaryOp, BooleanNetwork, FnUpdate};

use std::collections::HashMap;

/// A table of update-function BDDs for a (parameter-free) Boolean network.
///
/// Free inputs (variables with no update function and no regulators) are treated
/// as identities, which is how most tools interpret them.
pub struct SymbolicFunctions {
    vars: BddVariableSet,
    names: Vec<String>,
    bdd_vars: Vec<BddVariable>,
    index_of: HashMap<String, usize>,
    updates: Vec<Bdd>,
}

impl SymbolicFunctions {
    /// Build the function table for the given network.
    ///
    /// Fails if the network contains explicit parameters or implicit parameters
    /// that are not free inputs.
    pub fn new(network: &BooleanNetwork) -> Result<SymbolicFunctions, String> {
        check_no_parameters(network)?;

        let mut builder = BddVariableSetBuilder::new();
        let mut names: Vec<String> = Vec::new();
        let mut bdd_vars: Vec<BddVariable> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();
        for var in network.variables() {
            let name = network.get_variable_name(var).clone();
            let bdd_var = builder.make_variable(name.as_str());
            index_of.insert(name.clone(), names.len());
            names.push(name);
            bdd_vars.push(bdd_var);
        }
        let vars = builder.build();

        let mut updates: Vec<Bdd> = Vec::new();
        for var in network.variables() {
            let update = match network.get_update_function(var) {
                Some(update) => fn_update_to_bdd(&vars, &bdd_vars, update)?,
                // A free input with an unspecified update function is an identity.
                None => vars.mk_var(bdd_vars[var.to_index()]),
            };
            updates.push(update);
        }

        Ok(SymbolicFunctions {
            vars,
            names,
            bdd_vars,
            index_of,
            updates,
        })
    }

    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    pub fn variable_names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_of.get(name).copied()
    }

    pub fn bdd_variable(&self, index: usize) -> BddVariable {
        self.bdd_vars[index]
    }

    pub fn update(&self, index: usize) -> &Bdd {
        &self.updates[index]
    }

    pub fn bdd_variable_set(&self) -> &BddVariableSet {
        &self.vars
    }

    /// Convert a space to a `BddPartialValuation` over this variable set.
    pub fn space_to_valuation(&self, space: &BooleanSpace) -> Result<BddPartialValuation, String> {
        let mut valuation = BddPartialValuation::empty();
        for (name, value) in space {
            let index = self
                .index_of(name)
                .ok_or(format!("Unknown variable `{name}`."))?;
            valuation.set_value(self.bdd_vars[index], *value);
        }
        Ok(valuation)
    }

    /// A BDD which is satisfied exactly by the states of the given space.
    pub fn mk_space_bdd(&self, space: &BooleanSpace) -> Result<Bdd, String> {
        let valuation = self.space_to_valuation(space)?;
        Ok(self.vars.mk_conjunctive_clause(&valuation))
    }

    /// A BDD which is satisfied exactly by the states of the union of the given spaces.
    pub fn mk_space_list_bdd(&self, spaces: &[BooleanSpace]) -> Result<Bdd, String> {
        let mut clauses: Vec<BddPartialValuation> = Vec::new();
        for space in spaces {
            clauses.push(self.space_to_valuation(space)?);
        }
        Ok(self.vars.mk_dnf(&clauses))
    }

    /// Evaluate a Boolean function in the given (partial) state. Returns `None`
    /// if the space does not determine the function value.
    pub fn function_eval(&self, function: &Bdd, space: &BooleanSpace) -> Option<bool> {
        if function.is_false() {
            return Some(false);
        }
        if function.is_true() {
            return Some(true);
        }
        let mut restriction: Vec<(BddVariable, bool)> = Vec::new();
        for (name, value) in space {
            if let Some(index) = self.index_of(name) {
                restriction.push((self.bdd_vars[index], *value));
            }
        }
        let restricted = function.restrict(&restriction);
        if restricted.is_true() {
            Some(true)
        } else if restricted.is_false() {
            Some(false)
        } else {
            None
        }
    }

    /// Extract a network state from a BDD valuation.
    pub fn valuation_to_space(&self, valuation: &BddValuation) -> BooleanSpace {
        let mut space = BooleanSpace::new();
        for (index, name) in self.names.iter().enumerate() {
            space.insert(name.clone(), valuation.value(self.bdd_vars[index]));
        }
        space
    }

    /// Convert a full state into a BDD valuation (missing variables default to `false`).
    pub fn space_to_full_valuation(&self, space: &BooleanSpace) -> BddValuation {
        let mut values = vec![false; self.num_vars()];
        for (index, name) in self.names.iter().enumerate() {
            if let Some(value) = space.get(name) {
                values[index] = *value;
            }
        }
        BddValuation::new(values)
    }

    /// Translate an arbitrary update function term into a BDD.
    pub fn mk_function_bdd(&self, update: &FnUpdate) -> Result<Bdd, String> {
        fn_update_to_bdd(&self.vars, &self.bdd_vars, update)
    }
}

/// Enumerate a DNF of the given BDD, splitting at each recursion step on the
/// variable whose two restrictions have the minimum summed BDD size.
///
/// This is usually much smaller than the clause sequence of the raw BDD, albeit
/// still not minimal. The naive exponential clause set is never materialized.
pub fn optimized_recursive_dnf(bdd: &Bdd) -> Vec<BddPartialValuation> {
    let mut results: Vec<BddPartialValuation> = Vec::new();
    optimized_recursive_dnf_rec(bdd, BddPartialValuation::empty(), &mut results);
    results
}

fn optimized_recursive_dnf_rec(
    bdd: &Bdd,
    prefix: BddPartialValuation,
    results: &mut Vec<BddPartialValuation>,
) {
    if bdd.is_false() {
        return;
    }
    if bdd.is_true() {
        results.push(prefix);
        return;
    }

    let mut support: Vec<BddVariable> = bdd.support_set().into_iter().collect();
    support.sort();

    let mut best_var = support[0];
    let mut best_size = 10 * bdd.size();
    for var in support {
        let t_size = bdd.var_restrict(var, true).size();
        let f_size = bdd.var_restrict(var, false).size();
        if t_size + f_size < best_size {
            best_size = t_size + f_size;
            best_var = var;
        }
    }

    let mut t_prefix = prefix.clone();
    t_prefix.set_value(best_var, true);
    optimized_recursive_dnf_rec(&bdd.var_restrict(best_var, true), t_prefix, results);
    let mut f_prefix = prefix;
    f_prefix.set_value(best_var, false);
    optimized_recursive_dnf_rec(&bdd.var_restrict(best_var, false), f_prefix, results);
}

/// Verify that the network has no explicit parameters and no implicit parameters
/// other than free inputs.
pub fn check_no_parameters(network: &BooleanNetwork) -> Result<(), String> {
    if network.num_parameters() > 0 {
        return Err(format!(
            "Parametrized networks are not supported. Found {} explicit parameters.",
            network.num_parameters()
        ));
    }
    for var in network.implicit_parameters() {
        if !network.regulators(var).is_empty() {
            return Err(format!(
                "Parametrized networks are not supported. Found implicit parameter `{}`.",
                network.get_variable_name(var)
            ));
        }
    }
    Ok(())
}

/// Translate a `FnUpdate` term into a BDD over the given variable set.
fn fn_update_to_bdd(
    vars: &BddVariableSet,
    bdd_vars: &[BddVariable],
    update: &FnUpdate,
) -> Result<Bdd, String> {
    match update {
        FnUpdate::Const(value) => Ok(if *value { vars.mk_true() } else { vars.mk_false() }),
        FnUpdate::Var(id) => Ok(vars.mk_var(bdd_vars[id.to_index()])),
        FnUpdate::Not(inner) => Ok(fn_update_to_bdd(vars, bdd_vars, inner)?.not()),
        FnUpdate::Binary(op, left, right) => {
            let left = fn_update_to_bdd(vars, bdd_vars, left)?;
            let right = fn_update_to_bdd(vars, bdd_vars, right)?;
            Ok(match op {
                BinaryOp::And => left.and(&right),
                BinaryOp::Or => left.or(&right),
                BinaryOp::Xor => left.xor(&right),
                BinaryOp::Iff => left.iff(&right),
                BinaryOp::Imp => left.imp(&right),
            })
        }
        FnUpdate::Param(..) => Err("Parametrized networks are not supported.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;

    const MODEL_TOGGLE: &str = r"
targets,factors
A, !B
B, !A
C, A & !C
";

    #[test]
    fn test_function_eval() {
        let bn = BooleanNetwork::try_from_bnet(MODEL_TOGGLE).unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        let a = functions.index_of("A").unwrap();
        let c = functions.index_of("C").unwrap();

        // f_A = !B is undetermined without B, and fixed once B is known.
        assert_eq!(
            functions.function_eval(functions.update(a), &BooleanSpace::new()),
            None
        );
        let b_one = space_from_values(&[("B", true)]);
        assert_eq!(
            functions.function_eval(functions.update(a), &b_one),
            Some(false)
        );

        // f_C = A & !C needs both A and C.
        let a_one = space_from_values(&[("A", true)]);
        assert_eq!(functions.function_eval(functions.update(c), &a_one), None);
        let a_one_c_zero = space_from_values(&[("A", true), ("C", false)]);
        assert_eq!(
            functions.function_eval(functions.update(c), &a_one_c_zero),
            Some(true)
        );
    }

    #[test]
    fn test_space_bdd_cardinality() {
        let bn = BooleanNetwork::try_from_bnet(MODEL_TOGGLE).unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        let space = space_from_values(&[("A", true)]);
        let bdd = functions.mk_space_bdd(&space).unwrap();
        // Three variables, one fixed: four states.
        assert_eq!(bdd.cardinality(), 4.0);

        let empty: Vec<BooleanSpace> = Vec::new();
        assert!(functions.mk_space_list_bdd(&empty).unwrap().is_false());
    }

    #[test]
    fn test_free_input_is_identity() {
        // `S` has no update function in aeon format unless specified.
        let bn = BooleanNetwork::try_from("S -> A\n$A: S").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        let s = functions.index_of("S").unwrap();
        let expected = functions
            .bdd_variable_set()
            .mk_var(functions.bdd_variable(s));
        assert_eq!(functions.update(s), &expected);
    }
}
