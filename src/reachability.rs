//! Optional reachability pruning through an external oracle.
//!
//! The oracle consumes an automata-network rendering of the Petri net (one
//! line `"v" [0,1]` per variable, one rule per transition) and a goal given as
//! a disjunction of conjunctive valuations. A positive answer proves the goal
//! reachable; an inconclusive one surfaces as the `Cannot verify.` error,
//! which the caller treats as "keep the candidate".

use crate::config::SuccessionDiagramConfig;
use crate::petri_net::PetriNet;
use crate::spaces::BooleanSpace;
use crate::symbolic::optimized_recursive_dnf;

use biodivine_lib_bdd::{Bdd, BddVariableSet};

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ask the oracle whether `initial_state` can reach some state of
/// `target_states`. Fails with `Cannot verify.` when the analysis is
/// inconclusive.
pub fn oracle_reachability(
    config: &SuccessionDiagramConfig,
    petri_net: &PetriNet,
    initial_state: &BooleanSpace,
    target_states: &Bdd,
    vars: &BddVariableSet,
) -> Result<bool, String> {
    let Some(binary) = &config.oracle_binary else {
        return Err("No reachability oracle is configured.".to_string());
    };
    if target_states.is_false() {
        // Cannot reach a state in an empty set.
        return Ok(false);
    }

    let model = petri_net_as_automata_network(petri_net, initial_state);
    let goal = build_symbolic_goal(target_states, vars, config.pint_goal_size_limit);

    // The model file only lives for the duration of this call.
    let model_file = ScopedFile::create("an", &model)?;

    let output = Command::new(binary)
        .arg(model_file.path())
        .arg(goal)
        .output()
        .map_err(|e| format!("Cannot start `{binary}`: {e}"))?;

    if !output.status.success() {
        return Err("Cannot verify.".to_string());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        match line.trim() {
            "True" => return Ok(true),
            "False" => return Ok(false),
            _ => {}
        }
    }
    Err("Cannot verify.".to_string())
}

/// Convert a set of states (as a BDD) into a textual goal: a disjunction of
/// conjunctive valuations.
///
/// If the goal grows past `size_limit` literals, a partial goal is returned.
/// This is always safe: a partial goal that is reachable proves reachability,
/// and an unreachable partial goal keeps the candidate conservatively.
pub fn build_symbolic_goal(states: &Bdd, vars: &BddVariableSet, size_limit: usize) -> String {
    debug_assert!(!states.is_false());

    let mut goals: Vec<String> = Vec::new();
    let mut remaining = size_limit as i64;
    for clause in optimized_recursive_dnf(states) {
        let literals: Vec<(biodivine_lib_bdd::BddVariable, bool)> = clause.to_values();
        remaining -= literals.len() as i64;
        if remaining < 0 {
            // The goal would not fit into the command line argument limits;
            // a partial goal has to do.
            log::warn!("Oracle goal size limit exceeded. A partial goal is used.");
            break;
        }
        let atoms: Vec<String> = literals
            .iter()
            .map(|(var, value)| format!("\"{}\"={}", vars.name_of(*var), *value as u8))
            .collect();
        goals.push(atoms.join(","));
    }
    goals.join(" or ")
}

/// Render a Petri net (created by the implicant encoding) as an automata
/// network, together with the initial context of the query.
pub fn petri_net_as_automata_network(petri_net: &PetriNet, initial_state: &BooleanSpace) -> String {
    let mut result = String::new();

    // Declare all variables with 0/1 domains.
    for variable in petri_net.variables() {
        result.push_str(&format!("\"{variable}\" [0, 1]\n"));
    }

    for transition in petri_net.transitions() {
        let (var, _) = transition.source_place();
        let source_level = if transition.goes_up { 0 } else { 1 };
        let target_level = 1 - source_level;

        // The condition places are those shared between the predecessors and
        // the successors; ordered by place polarity first (all `b0_` places
        // sort before `b1_`), then by variable name.
        let mut condition_places: Vec<(String, bool)> = transition.conditions.clone();
        condition_places.sort_by_key(|(name, value)| (*value, name.clone()));
        let conditions: Vec<String> = condition_places
            .iter()
            .map(|(name, value)| format!("\"{name}\"={}", *value as u8))
            .collect();

        if conditions.is_empty() {
            result.push_str(&format!("\"{var}\" {source_level} -> {target_level}\n"));
        } else {
            result.push_str(&format!(
                "\"{var}\" {source_level} -> {target_level} when {}\n",
                conditions.join(" and ")
            ));
        }
    }

    // The initial context pins the queried state.
    let initial: Vec<String> = initial_state
        .iter()
        .filter(|(name, _)| petri_net.variables().contains(*name))
        .map(|(name, value)| format!("\"{name}\"={}", *value as u8))
        .collect();
    if !initial.is_empty() {
        result.push_str(&format!("initial_context {}\n", initial.join(", ")));
    }

    result
}

/// A temporary file removed on every exit path.
struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    fn create(extension: &str, contents: &str) -> Result<ScopedFile, String> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "succession-diagram-{}-{}.{}",
            std::process::id(),
            unique,
            extension
        ));
        let mut file = File::create(&path).map_err(|e| e.to_string())?;
        file.write_all(contents.as_bytes())
            .map_err(|e| e.to_string())?;
        Ok(ScopedFile { path })
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;
    use crate::symbolic::SymbolicFunctions;
    use biodivine_lib_param_bn::BooleanNetwork;

    #[test]
    fn test_automata_network_rendering() {
        let bn = BooleanNetwork::try_from_bnet("targets,factors\nA, B\nB, A\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        let pn = crate::petri_net::network_to_petri_net(&bn, &functions).unwrap();

        let initial = space_from_values(&[("A", false), ("B", true)]);
        let rendered = petri_net_as_automata_network(&pn, &initial);

        assert!(rendered.contains("\"A\" [0, 1]"));
        assert!(rendered.contains("\"B\" [0, 1]"));
        // `A` rises when `B` holds, and falls when it does not.
        assert!(rendered.contains("\"A\" 0 -> 1 when \"B\"=1"));
        assert!(rendered.contains("\"A\" 1 -> 0 when \"B\"=0"));
        assert!(rendered.contains("initial_context \"A\"=0, \"B\"=1"));
    }

    #[test]
    fn test_goal_clipping() {
        let bn = BooleanNetwork::try_from_bnet("targets,factors\nA, B\nB, A\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        // `A ^ B` needs two two-literal clauses.
        let a = functions.bdd_variable_set().mk_var(functions.bdd_variable(0));
        let b = functions.bdd_variable_set().mk_var(functions.bdd_variable(1));
        let xor = a.xor(&b);

        let full = build_symbolic_goal(&xor, functions.bdd_variable_set(), 8);
        assert!(full.contains(" or "));

        // With a budget of two literals, only one clause fits.
        let partial = build_symbolic_goal(&xor, functions.bdd_variable_set(), 2);
        assert!(!partial.contains(" or "));
        assert!(!partial.is_empty());
    }
}
