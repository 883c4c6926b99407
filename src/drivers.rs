//! Single-node driver analysis: logical domains of influence and one-node
//! drivers of a target subspace.

use crate::spaces::{BooleanSpace, percolate_space_strict, space_from_values};
use crate::symbolic::SymbolicFunctions;

use std::collections::BTreeMap;

/// Compute the logical domain of influence (the strictly percolated fixings)
/// of every single-node state. Constant nodes are skipped.
pub fn find_single_node_ldois(
    functions: &SymbolicFunctions,
) -> BTreeMap<(String, bool), BooleanSpace> {
    let mut ldois: BTreeMap<(String, bool), BooleanSpace> = BTreeMap::new();
    for index in 0..functions.num_vars() {
        let update = functions.update(index);
        if update.is_true() || update.is_false() {
            continue;
        }
        let name = functions.name(index).to_string();
        for value in [false, true] {
            let space = space_from_values(&[(name.as_str(), value)]);
            ldois.insert(
                (name.clone(), value),
                percolate_space_strict(functions, &space),
            );
        }
    }
    ldois
}

/// Find all one-node drivers of a target subspace: single-node states whose
/// domain of influence covers the whole target.
pub fn find_single_drivers(
    target_subspace: &BooleanSpace,
    functions: &SymbolicFunctions,
    ldois: Option<&BTreeMap<(String, bool), BooleanSpace>>,
) -> Vec<(String, bool)> {
    let computed;
    let ldois = match ldois {
        Some(ldois) => ldois,
        None => {
            computed = find_single_node_ldois(functions);
            &computed
        }
    };

    let mut drivers: Vec<(String, bool)> = Vec::new();
    for ((var, value), ldoi) in ldois {
        let covers = target_subspace.iter().all(|(k, v)| {
            ldoi.get(k) == Some(v) || (k == var && v == value)
        });
        if covers {
            drivers.push((var.clone(), *value));
        }
    }
    drivers
}

#[cfg(test)]
mod tests {
    use super::*;
    use biodivine_lib_param_bn::BooleanNetwork;

    #[test]
    fn test_single_node_ldois() {
        let bn = BooleanNetwork::try_from_bnet("targets,factors\nA, A\nB, A\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();
        let ldois = find_single_node_ldois(&functions);

        assert_eq!(
            ldois[&("A".to_string(), false)],
            space_from_values(&[("A", false), ("B", false)])
        );
        assert_eq!(
            ldois[&("A".to_string(), true)],
            space_from_values(&[("A", true), ("B", true)])
        );
        assert!(ldois[&("B".to_string(), false)].is_empty());
        assert!(ldois[&("B".to_string(), true)].is_empty());
    }

    #[test]
    fn test_single_drivers() {
        let bn = BooleanNetwork::try_from_bnet("targets,factors\nA, A\nB, A\n").unwrap();
        let functions = SymbolicFunctions::new(&bn).unwrap();

        let target = space_from_values(&[("B", false)]);
        let mut drivers = find_single_drivers(&target, &functions, None);
        drivers.sort();
        assert_eq!(
            drivers,
            vec![("A".to_string(), false), ("B".to_string(), false)]
        );
    }
}
