//! Trap space and fixed point enumeration through Petri net siphons.
//!
//! Conflict-free siphons of the implicant Petri net correspond to trap spaces
//! of the Boolean network, and deadlocks correspond to fixed points. This
//! module builds the siphon logic program for a (possibly restricted) Petri
//! net and enumerates its inclusion-extremal models, either with the built-in
//! ground solver or through an external `clingo` process.
//!
//! Mind the polarity convention: for trap space problems, siphon membership of
//! a place means "a token never appears there", so the `b1_v` atom fixes `v=0`
//! and vice versa. Fixed point (deadlock) models use the direct polarity.

mod clingo;
mod ground;

use crate::config::SolverBackend;
use crate::petri_net::{PetriNet, place_to_variable, variable_to_place};
use crate::spaces::BooleanSpace;

use ground::{EnumerationMode, GroundSolver, Lit};

use std::collections::HashMap;

/// The three problems solved over a Petri net encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapSpaceProblem {
    /// Minimal trap spaces (maximal conflict-free siphons).
    Min,
    /// Maximal non-trivial trap spaces (minimal non-empty siphons).
    Max,
    /// Fixed points.
    Fix,
}

/// Optional restrictions of a trap space query.
#[derive(Clone, Debug, Default)]
pub struct TrapSpaceOptions {
    /// Force these variables to their given values in every solution.
    pub ensure_subspace: BooleanSpace,
    /// Disallow solutions lying in any of these subspaces.
    pub avoid_subspaces: Vec<BooleanSpace>,
    /// Stop the enumeration after this many solutions.
    pub solution_limit: Option<usize>,
    /// Variables treated as inputs when `problem=max`: their `*` values are
    /// eliminated, reducing the solutions for `k` source nodes to `2^k`.
    /// When `None`, the source variables of the Petri net are used.
    pub optimize_source_variables: Option<Vec<String>>,
    /// Consider the time-reversed network (swaps the siphon/trap roles).
    pub reverse_time: bool,
}

/// Enumerate trap spaces or fixed points of the given Petri net, streaming
/// every solution to the callback. Return `false` from the callback to stop
/// the enumeration.
pub fn trap_spaces_streaming(
    petri_net: &PetriNet,
    problem: TrapSpaceProblem,
    options: &TrapSpaceOptions,
    backend: &SolverBackend,
    on_solution: &mut dyn FnMut(BooleanSpace) -> bool,
) -> Result<(), String> {
    let mut builder = ProgramBuilder::new();

    // Declare places and their conflicts based on network variables.
    for var in petri_net.variables() {
        let positive = builder.atom(var, true);
        let negative = builder.atom(var, false);
        builder.choice(positive);
        builder.choice(negative);
        // We can't have both places in the siphon simultaneously.
        builder.constraint(vec![positive, negative]);
        // If we are computing fixed points, at least one of them must hold.
        if problem == TrapSpaceProblem::Fix {
            builder.at_least_one(vec![positive, negative]);
        }
    }

    // Solutions must have the desired variables fixed. Note the inverted polarity.
    for (var, value) in &options.ensure_subspace {
        let in_net = petri_net.variables().contains(var);
        let fact = builder.atom(var, !*value);
        builder.fact(fact);
        if !in_net {
            // The inverse atom has no defining rule and is therefore false.
            let inverse = builder.atom(var, *value);
            builder.never(inverse);
        }
    }

    // Solutions can't have variables fixed based on any avoided subspace.
    for to_avoid in &options.avoid_subspaces {
        // A variable that exists neither in the net nor in `ensure_subspace`
        // has a permanently false atom, which makes the constraint vacuous.
        let all_known = to_avoid
            .keys()
            .all(|var| builder.is_known(var) || petri_net.variables().contains(var));
        if !all_known && !to_avoid.is_empty() {
            continue;
        }
        let atoms: Vec<usize> = to_avoid
            .iter()
            .map(|(var, value)| builder.atom(var, !*value))
            .collect();
        builder.constraint(atoms);
    }

    for transition in petri_net.transitions() {
        let (source_var, source_value) = transition.source_place();
        let (target_var, target_value) = transition.target_place();
        let source = builder.atom(&source_var, source_value);
        let target = builder.atom(&target_var, target_value);
        let conditions: Vec<usize> = transition
            .conditions
            .iter()
            .map(|(var, value)| builder.atom(var, *value))
            .collect();
        if !options.reverse_time {
            // Compute siphons: the target place (the only successor that is
            // not a predecessor) implies one of the predecessors.
            let mut head = vec![source];
            head.extend(conditions.iter().copied());
            builder.implication(head, target);
        } else {
            // Compute traps: the source place implies one of the successors.
            let mut head = vec![target];
            head.extend(conditions.iter().copied());
            builder.implication(head, source);
        }
    }

    // For maximal trap spaces, we need an extra condition.
    if problem == TrapSpaceProblem::Max {
        // Only places which are not fixed by `ensure_subspace` are considered.
        let mut free_places: Vec<usize> = Vec::new();
        for var in petri_net.variables() {
            if !options.ensure_subspace.contains_key(var) {
                free_places.push(builder.atom(var, true));
                free_places.push(builder.atom(var, false));
            }
        }
        if !free_places.is_empty() {
            // Excludes the empty "star" space.
            builder.at_least_one(free_places);

            // Additionally, source nodes must not appear as `*`, since such
            // solutions merely represent input freedom.
            let sources = match &options.optimize_source_variables {
                Some(sources) => sources.clone(),
                None => petri_net.source_variables(),
            };
            for var in sources {
                if !options.ensure_subspace.contains_key(&var)
                    && petri_net.variables().contains(&var)
                {
                    let positive = builder.atom(&var, true);
                    let negative = builder.atom(&var, false);
                    builder.at_least_one(vec![positive, negative]);
                }
            }
        }
    }

    let mode = match problem {
        TrapSpaceProblem::Min => EnumerationMode::Maximal,
        TrapSpaceProblem::Max => EnumerationMode::Minimal,
        TrapSpaceProblem::Fix => EnumerationMode::All,
    };
    let dom_mod = match problem {
        TrapSpaceProblem::Min | TrapSpaceProblem::Fix => "3,16",
        TrapSpaceProblem::Max => "5,16",
    };

    // Note that this is counterintuitive but correct: if the "positive" place
    // appears in the solution, the variable is fixed to `0`.
    builder.solve(backend, mode, dom_mod, &mut |var, positive| {
        (var.to_string(), !positive)
    }, on_solution)
}

/// Enumerate trap spaces or fixed points of the given Petri net as a list.
pub fn trap_spaces(
    petri_net: &PetriNet,
    problem: TrapSpaceProblem,
    options: &TrapSpaceOptions,
    backend: &SolverBackend,
) -> Result<Vec<BooleanSpace>, String> {
    let mut results: Vec<BooleanSpace> = Vec::new();
    let limit = options.solution_limit;
    trap_spaces_streaming(petri_net, problem, options, backend, &mut |space| {
        results.push(space);
        match limit {
            Some(limit) => results.len() < limit,
            None => true,
        }
    })?;
    Ok(results)
}

/// Enumerate the fixed points of the asynchronous state transition graph
/// reduced by a retained set, streaming every solution to the callback.
///
/// The retained set modifies the Petri net structure: every variable of the
/// set can only update towards its retained value. Deadlocks of the modified
/// net then cover the attractors of the original one.
pub fn fixed_points_reduced_stg_streaming(
    petri_net: &PetriNet,
    retained_set: &BooleanSpace,
    ensure_subspace: &BooleanSpace,
    avoid_subspaces: &[BooleanSpace],
    backend: &SolverBackend,
    on_solution: &mut dyn FnMut(BooleanSpace) -> bool,
) -> Result<(), String> {
    let reduced = reduce_petri_net(petri_net, retained_set);

    let mut builder = ProgramBuilder::new();
    for var in reduced.variables() {
        let positive = builder.atom(var, true);
        let negative = builder.atom(var, false);
        builder.choice(positive);
        builder.choice(negative);
        // Assert there is a fixed point.
        builder.constraint(vec![positive, negative]);
        builder.at_least_one(vec![positive, negative]);
    }

    // A deadlock disables every transition: some predecessor place is empty.
    for transition in reduced.transitions() {
        let (source_var, source_value) = transition.source_place();
        let mut preds = vec![builder.atom(&source_var, source_value)];
        for (var, value) in &transition.conditions {
            preds.push(builder.atom(var, *value));
        }
        builder.constraint(preds);
    }

    // Note that here the polarity is direct: `m(x) = 1 ~ place b1_x`.
    for (var, value) in ensure_subspace {
        let in_net = reduced.variables().contains(var);
        let fact = builder.atom(var, *value);
        builder.fact(fact);
        if !in_net {
            let inverse = builder.atom(var, !*value);
            builder.never(inverse);
        }
    }

    for to_avoid in avoid_subspaces {
        if to_avoid.is_empty() {
            // There is no solution and we do not need to process more.
            builder.constraint(Vec::new());
            break;
        }
        let all_known = to_avoid
            .keys()
            .all(|var| builder.is_known(var) || reduced.variables().contains(var));
        if !all_known {
            continue;
        }
        let atoms: Vec<usize> = to_avoid
            .iter()
            .map(|(var, value)| builder.atom(var, *value))
            .collect();
        builder.constraint(atoms);
    }

    builder.solve(
        backend,
        EnumerationMode::All,
        "3,16",
        &mut |var, positive| (var.to_string(), positive),
        on_solution,
    )
}

/// List variant of [fixed_points_reduced_stg_streaming].
pub fn fixed_points_reduced_stg(
    petri_net: &PetriNet,
    retained_set: &BooleanSpace,
    ensure_subspace: &BooleanSpace,
    avoid_subspaces: &[BooleanSpace],
    solution_limit: Option<usize>,
    backend: &SolverBackend,
) -> Result<Vec<BooleanSpace>, String> {
    let mut results: Vec<BooleanSpace> = Vec::new();
    fixed_points_reduced_stg_streaming(
        petri_net,
        retained_set,
        ensure_subspace,
        avoid_subspaces,
        backend,
        &mut |space| {
            results.push(space);
            match solution_limit {
                Some(limit) => results.len() < limit,
                None => true,
            }
        },
    )?;
    Ok(results)
}

/// Build a copy of the Petri net where the variables of the retained set can
/// only change their value towards the retained one.
fn reduce_petri_net(petri_net: &PetriNet, retained_set: &BooleanSpace) -> PetriNet {
    let mut reduced = petri_net.clone();
    reduced.retain_transitions(|transition| {
        match retained_set.get(&transition.change) {
            // A transition moving the variable away from the retained value.
            Some(value) => transition.goes_up == *value,
            None => true,
        }
    });
    reduced
}

/// Accumulates the logic program in two synchronized representations: ASP
/// statements for the wire back end and propositional clauses for the ground
/// solver.
struct ProgramBuilder {
    atom_names: Vec<String>,
    atom_ids: HashMap<String, usize>,
    statements: Vec<String>,
    clauses: Vec<Vec<Lit>>,
}

impl ProgramBuilder {
    fn new() -> ProgramBuilder {
        ProgramBuilder {
            atom_names: Vec::new(),
            atom_ids: HashMap::new(),
            statements: Vec::new(),
            clauses: Vec::new(),
        }
    }

    fn atom(&mut self, var: &str, positive: bool) -> usize {
        let name = variable_to_place(var, positive);
        if let Some(id) = self.atom_ids.get(&name) {
            return *id;
        }
        let id = self.atom_names.len();
        self.atom_ids.insert(name.clone(), id);
        self.atom_names.push(name);
        id
    }

    fn is_known(&self, var: &str) -> bool {
        self.atom_ids.contains_key(&variable_to_place(var, true))
            || self.atom_ids.contains_key(&variable_to_place(var, false))
    }

    fn choice(&mut self, atom: usize) {
        self.statements
            .push(format!("{{{}}}.", self.atom_names[atom]));
    }

    fn fact(&mut self, atom: usize) {
        self.statements.push(format!("{}.", self.atom_names[atom]));
        self.clauses.push(vec![(atom, true)]);
    }

    /// Pin an atom that has no defining rule to `false` (the solver-side
    /// counterpart of the closed-world default).
    fn never(&mut self, atom: usize) {
        self.clauses.push(vec![(atom, false)]);
    }

    /// `:- a1, ..., ak.`: the atoms cannot hold simultaneously.
    fn constraint(&mut self, atoms: Vec<usize>) {
        let names: Vec<&str> = atoms.iter().map(|a| self.atom_names[*a].as_str()).collect();
        self.statements.push(format!(":- {}.", names.join("; ")));
        self.clauses
            .push(atoms.into_iter().map(|a| (a, false)).collect());
    }

    /// `h1; ...; hk :- b.`: the body atom implies one of the head atoms.
    fn implication(&mut self, head: Vec<usize>, body: usize) {
        let names: Vec<&str> = head.iter().map(|a| self.atom_names[*a].as_str()).collect();
        self.statements.push(format!(
            "{} :- {}.",
            names.join("; "),
            self.atom_names[body]
        ));
        let mut clause: Vec<Lit> = vec![(body, false)];
        clause.extend(head.into_iter().map(|a| (a, true)));
        self.clauses.push(clause);
    }

    /// `a1; ...; ak.`: at least one of the atoms holds.
    fn at_least_one(&mut self, atoms: Vec<usize>) {
        let names: Vec<&str> = atoms.iter().map(|a| self.atom_names[*a].as_str()).collect();
        self.statements.push(format!("{}.", names.join("; ")));
        self.clauses
            .push(atoms.into_iter().map(|a| (a, true)).collect());
    }

    /// Run the configured back end, decode every model into a space through the
    /// `decode_place` polarity convention and feed it to the callback.
    fn solve(
        self,
        backend: &SolverBackend,
        mode: EnumerationMode,
        dom_mod: &str,
        decode_place: &mut dyn FnMut(&str, bool) -> (String, bool),
        on_solution: &mut dyn FnMut(BooleanSpace) -> bool,
    ) -> Result<(), String> {
        match backend {
            SolverBackend::Ground => {
                let mut solver = GroundSolver::new(self.atom_names.len());
                for clause in self.clauses {
                    solver.add_clause(clause);
                }
                let atom_names = self.atom_names;
                solver.enumerate(mode, &mut |model| {
                    let mut space = BooleanSpace::new();
                    for (atom, value) in model.iter().enumerate() {
                        if !*value {
                            continue;
                        }
                        let (var, positive) =
                            place_to_variable(&atom_names[atom]).expect("Internal place name.");
                        let (name, fixed) = decode_place(var, positive);
                        space.insert(name, fixed);
                    }
                    on_solution(space)
                })
            }
            SolverBackend::Clingo { binary } => {
                let program = self.statements.join("\n");
                clingo::solve_with_clingo(binary, &program, dom_mod, &mut |model_line| {
                    let mut space = BooleanSpace::new();
                    for atom in model_line.split_whitespace() {
                        if let Ok((var, positive)) = place_to_variable(atom) {
                            let (name, fixed) = decode_place(var, positive);
                            space.insert(name, fixed);
                        }
                    }
                    on_solution(space)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;
    use crate::symbolic::SymbolicFunctions;
    use biodivine_lib_param_bn::BooleanNetwork;

    fn petri_net(model: &str) -> PetriNet {
        let bn = BooleanNetwork::try_from_bnet(model).unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        crate::petri_net::network_to_petri_net(&bn, &functions).unwrap()
    }

    fn sorted(mut spaces: Vec<BooleanSpace>) -> Vec<BooleanSpace> {
        spaces.sort();
        spaces
    }

    const MODEL_FLIP_FLOP: &str = "targets,factors\nA, B\nB, A\nC, !C\n";

    #[test]
    fn test_minimal_trap_spaces() {
        let pn = petri_net(MODEL_FLIP_FLOP);
        let results = trap_spaces(
            &pn,
            TrapSpaceProblem::Min,
            &TrapSpaceOptions::default(),
            &SolverBackend::Ground,
        )
        .unwrap();
        let expected = vec![
            space_from_values(&[("A", false), ("B", false)]),
            space_from_values(&[("A", true), ("B", true)]),
        ];
        assert_eq!(sorted(results), sorted(expected));
    }

    #[test]
    fn test_maximal_trap_spaces() {
        let pn = petri_net(MODEL_FLIP_FLOP);
        let results = trap_spaces(
            &pn,
            TrapSpaceProblem::Max,
            &TrapSpaceOptions::default(),
            &SolverBackend::Ground,
        )
        .unwrap();
        let expected = vec![
            space_from_values(&[("A", false), ("B", false)]),
            space_from_values(&[("A", true), ("B", true)]),
        ];
        assert_eq!(sorted(results), sorted(expected));
    }

    #[test]
    fn test_fixed_points() {
        // The flip-flop cannot stabilize `C`, so there are no fixed points.
        let pn = petri_net(MODEL_FLIP_FLOP);
        let results = trap_spaces(
            &pn,
            TrapSpaceProblem::Fix,
            &TrapSpaceOptions::default(),
            &SolverBackend::Ground,
        )
        .unwrap();
        assert!(results.is_empty());

        // Without the negation, both constant states are fixed points.
        let pn = petri_net("targets,factors\nA, B\nB, A\nC, C\n");
        let results = trap_spaces(
            &pn,
            TrapSpaceProblem::Fix,
            &TrapSpaceOptions::default(),
            &SolverBackend::Ground,
        )
        .unwrap();
        assert_eq!(results.len(), 4);
        for result in &results {
            assert_eq!(result.len(), 3);
            assert_eq!(result.get("A"), result.get("B"));
        }
    }

    #[test]
    fn test_ensure_and_avoid() {
        let pn = petri_net(MODEL_FLIP_FLOP);
        let options = TrapSpaceOptions {
            ensure_subspace: space_from_values(&[("A", true)]),
            ..Default::default()
        };
        let results = trap_spaces(&pn, TrapSpaceProblem::Min, &options, &SolverBackend::Ground)
            .unwrap();
        assert_eq!(
            sorted(results),
            vec![space_from_values(&[("A", true), ("B", true)])]
        );

        let options = TrapSpaceOptions {
            avoid_subspaces: vec![space_from_values(&[("A", true), ("B", true)])],
            ..Default::default()
        };
        let results = trap_spaces(&pn, TrapSpaceProblem::Min, &options, &SolverBackend::Ground)
            .unwrap();
        assert_eq!(
            sorted(results),
            vec![space_from_values(&[("A", false), ("B", false)])]
        );
    }

    #[test]
    fn test_solution_limit() {
        let pn = petri_net(MODEL_FLIP_FLOP);
        let options = TrapSpaceOptions {
            solution_limit: Some(1),
            ..Default::default()
        };
        let results = trap_spaces(&pn, TrapSpaceProblem::Min, &options, &SolverBackend::Ground)
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_source_variable_optimization() {
        // Two sources: `max` yields the four source combinations, not `3^2 - 1`.
        let pn = petri_net("targets,factors\nS, S\nT, T\nA, S & T\n");
        let results = trap_spaces(
            &pn,
            TrapSpaceProblem::Max,
            &TrapSpaceOptions::default(),
            &SolverBackend::Ground,
        )
        .unwrap();
        assert_eq!(results.len(), 4);
        for result in &results {
            assert!(result.contains_key("S") && result.contains_key("T"));
        }
    }

    #[test]
    fn test_reverse_time() {
        // The two-variable toggle is symmetric under time reversal.
        let pn = petri_net("targets,factors\nA, B\nB, A\n");
        let forward = trap_spaces(
            &pn,
            TrapSpaceProblem::Min,
            &TrapSpaceOptions::default(),
            &SolverBackend::Ground,
        )
        .unwrap();
        let options = TrapSpaceOptions {
            reverse_time: true,
            ..Default::default()
        };
        let reversed =
            trap_spaces(&pn, TrapSpaceProblem::Min, &options, &SolverBackend::Ground).unwrap();
        assert_eq!(sorted(forward), sorted(reversed));
    }

    #[test]
    fn test_fixed_points_reduced_stg() {
        let pn = petri_net(MODEL_FLIP_FLOP);
        let retained = space_from_values(&[("C", false)]);
        let results = fixed_points_reduced_stg(
            &pn,
            &retained,
            &BooleanSpace::new(),
            &[],
            None,
            &SolverBackend::Ground,
        )
        .unwrap();
        let expected = vec![
            space_from_values(&[("A", false), ("B", false), ("C", false)]),
            space_from_values(&[("A", true), ("B", true), ("C", false)]),
        ];
        assert_eq!(sorted(results), sorted(expected));

        let avoid = vec![space_from_values(&[("A", false), ("B", false)])];
        let results = fixed_points_reduced_stg(
            &pn,
            &retained,
            &BooleanSpace::new(),
            &avoid,
            None,
            &SolverBackend::Ground,
        )
        .unwrap();
        assert_eq!(
            results,
            vec![space_from_values(&[("A", true), ("B", true), ("C", false)])]
        );
    }

    #[test]
    fn test_ensure_outside_restricted_net() {
        // Restricting the net removes `A` and `B`; ensuring them still works
        // and the fixings are reported in the solutions.
        let pn = petri_net(MODEL_FLIP_FLOP);
        let space = space_from_values(&[("A", true), ("B", true)]);
        let restricted = pn.restrict_to_subspace(&space);
        let options = TrapSpaceOptions {
            ensure_subspace: space.clone(),
            ..Default::default()
        };
        let results = trap_spaces(
            &restricted,
            TrapSpaceProblem::Min,
            &options,
            &SolverBackend::Ground,
        )
        .unwrap();
        assert_eq!(results, vec![space]);
    }
}
