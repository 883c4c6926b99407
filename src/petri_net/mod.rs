//! Translation of Boolean networks into Petri nets.
//!
//! The encoding follows the siphon/trap correspondence: every network variable
//! `v` owns two places `b0_v` and `b1_v`, and every implicant of `f_v & !v`
//! (resp. `!f_v & v`) becomes a transition that moves the token from `b0_v` to
//! `b1_v` (resp. back), reading the places of the implicant. In every reachable
//! marking exactly one of `b0_v`/`b1_v` carries a token, so markings are
//! exactly Boolean states.
//!
//! Variable names have to be sanitized before the translation so that place
//! names remain valid logic-program symbols (lowercase prefix, `[A-Za-z0-9_]`
//! characters only).

use crate::spaces::BooleanSpace;
use crate::symbolic::{SymbolicFunctions, check_no_parameters, optimized_recursive_dnf};

use biodivine_lib_bdd::Bdd;
use biodivine_lib_param_bn::BooleanNetwork;
use serde::{Deserialize, Serialize};

use std::collections::{HashMap, HashSet};

/// One Petri net transition of the implicant encoding.
///
/// The transition moves the token of `change` from `b{1-target}_change` to
/// `b{target}_change`; `conditions` are the places that are both consumed and
/// produced (i.e. the implicant literals over the remaining variables).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnTransition {
    pub name: String,
    pub change: String,
    /// `true` for a `0 -> 1` flip of `change`, `false` for `1 -> 0`.
    pub goes_up: bool,
    /// Sorted `(variable, required value)` pairs, excluding `change` itself.
    pub conditions: Vec<(String, bool)>,
}

impl PnTransition {
    /// The place the transition consumes without producing it back.
    pub fn source_place(&self) -> (String, bool) {
        (self.change.clone(), !self.goes_up)
    }

    /// The place the transition produces without consuming it.
    pub fn target_place(&self) -> (String, bool) {
        (self.change.clone(), self.goes_up)
    }
}

/// A Petri net encoding of a Boolean network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PetriNet {
    /// Lexicographically sorted variable names; each owns a `b0_`/`b1_` place pair.
    variables: Vec<String>,
    transitions: Vec<PnTransition>,
}

impl PetriNet {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn transitions(&self) -> &[PnTransition] {
        &self.transitions
    }

    pub fn num_places(&self) -> usize {
        2 * self.variables.len()
    }

    /// Variables that represent source nodes of the encoded network, i.e.
    /// variables that no transition can change.
    pub fn source_variables(&self) -> Vec<String> {
        let changed: HashSet<&String> = self.transitions.iter().map(|t| &t.change).collect();
        self.variables
            .iter()
            .filter(|v| !changed.contains(v))
            .cloned()
            .collect()
    }

    /// Keep only the transitions satisfying the given predicate.
    pub fn retain_transitions(&mut self, predicate: impl Fn(&PnTransition) -> bool) {
        self.transitions.retain(|t| predicate(t));
    }

    /// Create a copy of this Petri net restricted to a sub-space.
    ///
    /// Every variable fixed by `space` has both of its places removed, together
    /// with every transition that writes to the variable or reads the removed
    /// inverse place. Conditions on the fixed place are assumed satisfied and
    /// dropped. Variables of `space` that do not appear in the net are ignored.
    pub fn restrict_to_subspace(&self, space: &BooleanSpace) -> PetriNet {
        let fixed: HashMap<&String, bool> = space
            .iter()
            .filter(|(name, _)| self.variables.contains(*name))
            .map(|(name, value)| (name, *value))
            .collect();

        let variables: Vec<String> = self
            .variables
            .iter()
            .filter(|v| !fixed.contains_key(v))
            .cloned()
            .collect();

        let mut transitions: Vec<PnTransition> = Vec::new();
        'next_transition: for transition in &self.transitions {
            if fixed.contains_key(&transition.change) {
                continue;
            }
            let mut conditions: Vec<(String, bool)> = Vec::new();
            for (variable, value) in &transition.conditions {
                match fixed.get(variable) {
                    Some(fixed_value) if fixed_value == value => {
                        // Condition is permanently satisfied.
                    }
                    Some(_) => {
                        // Condition reads the inverse of the fixed value and
                        // can never be satisfied again.
                        continue 'next_transition;
                    }
                    None => conditions.push((variable.clone(), *value)),
                }
            }
            transitions.push(PnTransition {
                name: transition.name.clone(),
                change: transition.change.clone(),
                goes_up: transition.goes_up,
                conditions,
            });
        }

        PetriNet {
            variables,
            transitions,
        }
    }
}

/// Generate a Petri net place name from a network variable name.
pub fn variable_to_place(variable: &str, positive: bool) -> String {
    if positive {
        format!("b1_{variable}")
    } else {
        format!("b0_{variable}")
    }
}

/// Extract the variable name and polarity from a Petri net place name.
pub fn place_to_variable(place: &str) -> Result<(&str, bool), String> {
    if let Some(variable) = place.strip_prefix("b1_") {
        Ok((variable, true))
    } else if let Some(variable) = place.strip_prefix("b0_") {
        Ok((variable, false))
    } else {
        Err(format!("Invalid place name: `{place}`."))
    }
}

/// Verify that every variable name consists of `[A-Za-z0-9_]` characters only.
/// With `check_only`, invalid names fail the call; otherwise the offending
/// characters are replaced by `_` and collisions are resolved by prepending
/// extra underscores, producing a renamed copy of the network.
pub fn sanitize_network_names(
    network: &BooleanNetwork,
    check_only: bool,
) -> Result<BooleanNetwork, String> {
    let is_sane = |name: &str| -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let mut needs_rename = false;
    for var in network.variables() {
        let name = network.get_variable_name(var);
        if !is_sane(name) {
            if check_only {
                return Err(format!("Found unsanitized variable: `{name}`."));
            }
            needs_rename = true;
        }
    }
    if !needs_rename {
        return Ok(network.clone());
    }

    // Reserve all valid names first so that sanitized names cannot clash with them.
    let mut taken: HashSet<String> = network
        .variables()
        .map(|v| network.get_variable_name(v).clone())
        .filter(|name| is_sane(name))
        .collect();

    let mut renaming: HashMap<String, String> = HashMap::new();
    for var in network.variables() {
        let name = network.get_variable_name(var).clone();
        if is_sane(&name) {
            renaming.insert(name.clone(), name);
            continue;
        }
        let mut candidate: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        while taken.contains(&candidate) {
            candidate.insert(0, '_');
        }
        taken.insert(candidate.clone());
        renaming.insert(name, candidate);
    }

    // Rebuild the network from its update function BDDs under the new names.
    let functions = SymbolicFunctions::new(network)?;
    let vars = functions.bdd_variable_set();
    let mut lines: Vec<(String, String)> = Vec::new();
    for index in 0..functions.num_vars() {
        let update = functions.update(index);
        let expression = if update.is_true() {
            "true".to_string()
        } else if update.is_false() {
            "false".to_string()
        } else {
            let mut clauses: Vec<String> = Vec::new();
            for clause in optimized_recursive_dnf(update) {
                let mut literals: Vec<String> = Vec::new();
                for (var, value) in clause.to_values() {
                    let renamed = renaming[&vars.name_of(var)].clone();
                    literals.push(if value { renamed } else { format!("!{renamed}") });
                }
                clauses.push(format!("({})", literals.join(" & ")));
            }
            clauses.join(" | ")
        };
        lines.push((renaming[functions.name(index)].clone(), expression));
    }
    BooleanNetwork::try_from_bnet(crate::spaces::render_bnet(&lines).as_str())
}

/// Convert a Boolean network into its Petri net encoding.
///
/// The given network must have sanitized names and no parameters (free inputs
/// are allowed and simply produce no transitions).
pub fn network_to_petri_net(
    network: &BooleanNetwork,
    functions: &SymbolicFunctions,
) -> Result<PetriNet, String> {
    sanitize_network_names(network, true)?;
    check_no_parameters(network)?;

    let mut variables: Vec<String> = network
        .variables()
        .map(|v| network.get_variable_name(v).clone())
        .collect();
    variables.sort();

    let mut transitions: Vec<PnTransition> = Vec::new();
    for var in network.variables() {
        if network.get_update_function(var).is_none() {
            // A free input; its value never changes on its own.
            continue;
        }
        let index = var.to_index();
        let var_name = network.get_variable_name(var).clone();
        let function = functions.update(index);
        let var_bdd = functions
            .bdd_variable_set()
            .mk_var(functions.bdd_variable(index));

        let up_bdd = function.and(&var_bdd.not());
        let down_bdd = function.not().and(&var_bdd);

        log::debug!(
            "Start translation for `{var_name}`: {} | {}",
            up_bdd.size(),
            down_bdd.size()
        );

        create_transitions(&mut transitions, functions, &var_name, &up_bdd, true);
        create_transitions(&mut transitions, functions, &var_name, &down_bdd, false);
    }

    Ok(PetriNet {
        variables,
        transitions,
    })
}

/// Create PN transitions from a BDD of positive/negative implicants of one variable.
fn create_transitions(
    transitions: &mut Vec<PnTransition>,
    functions: &SymbolicFunctions,
    var_name: &str,
    implicant_bdd: &Bdd,
    goes_up: bool,
) {
    let vars = functions.bdd_variable_set();
    let dir_str = if goes_up { "up" } else { "down" };
    let mut total = 0;
    for (t_id, implicant) in optimized_recursive_dnf(implicant_bdd).into_iter().enumerate() {
        total += 1;
        let mut conditions: Vec<(String, bool)> = Vec::new();
        for (var, value) in implicant.to_values() {
            let name = vars.name_of(var);
            if name == var_name {
                continue;
            }
            conditions.push((name, value));
        }
        conditions.sort();
        transitions.push(PnTransition {
            name: format!("tr_{}_{}_{}", var_name, dir_str, t_id + 1),
            change: var_name.to_string(),
            goes_up,
            conditions,
        });
    }
    log::debug!("  >> Generated {total} total PN transitions.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;

    const MODEL_FLIP_FLOP: &str = "targets,factors\nA, B\nB, A\nC, !C\n";

    fn encode(model: &str) -> (BooleanNetwork, PetriNet) {
        let bn = BooleanNetwork::try_from_bnet(model).unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        let pn = network_to_petri_net(&bn, &functions).unwrap();
        (bn, pn)
    }

    #[test]
    fn test_flip_flop_encoding() {
        let (_, pn) = encode(MODEL_FLIP_FLOP);
        assert_eq!(pn.variables(), &["A", "B", "C"]);
        // One up and one down transition per variable.
        assert_eq!(pn.transitions().len(), 6);

        let a_up = pn
            .transitions()
            .iter()
            .find(|t| t.change == "A" && t.goes_up)
            .unwrap();
        assert_eq!(a_up.conditions, vec![("B".to_string(), true)]);
        assert_eq!(a_up.source_place(), ("A".to_string(), false));
        assert_eq!(a_up.target_place(), ("A".to_string(), true));

        // `C = !C` flips unconditionally.
        let c_up = pn
            .transitions()
            .iter()
            .find(|t| t.change == "C" && t.goes_up)
            .unwrap();
        assert!(c_up.conditions.is_empty());
    }

    #[test]
    fn test_restriction() {
        let (_, pn) = encode(MODEL_FLIP_FLOP);
        let restricted = pn.restrict_to_subspace(&space_from_values(&[("A", true), ("B", true)]));
        assert_eq!(restricted.variables(), &["C"]);
        // Only the two `C` transitions survive.
        assert_eq!(restricted.transitions().len(), 2);

        // Restricting a condition to its inverse deletes the transition.
        let restricted = pn.restrict_to_subspace(&space_from_values(&[("B", false)]));
        assert!(
            !restricted
                .transitions()
                .iter()
                .any(|t| t.change == "A" && t.goes_up)
        );
        // The `A` down transition survives with no conditions left.
        let a_down = restricted
            .transitions()
            .iter()
            .find(|t| t.change == "A" && !t.goes_up)
            .unwrap();
        assert!(a_down.conditions.is_empty());
    }

    #[test]
    fn test_source_variables() {
        let (_, pn) = encode("targets,factors\nS, S\nA, S & A\n");
        assert_eq!(pn.source_variables(), vec!["S".to_string()]);
    }

    #[test]
    fn test_place_names() {
        assert_eq!(variable_to_place("x", true), "b1_x");
        assert_eq!(variable_to_place("x", false), "b0_x");
        assert_eq!(place_to_variable("b1_x").unwrap(), ("x", true));
        assert_eq!(place_to_variable("b0_long_name").unwrap(), ("long_name", false));
        assert!(place_to_variable("w_x").is_err());
    }

    #[test]
    fn test_sanitize_names() {
        let bn =
            BooleanNetwork::try_from("A_1 -> B\nA_1 -> A_1\n$B: A_1\n$A_1: A_1\n").unwrap();
        // Already sanitized names pass the check unchanged.
        assert!(sanitize_network_names(&bn, true).is_ok());
    }
}
