//! Operations on spaces (partial assignments of Boolean network variables).
//!
//! A space fixes a subset of the network variables to constant values; the
//! remaining variables are free. Spaces double as states when every variable
//! is fixed.

mod percolation;

pub use percolation::{
    expression_to_space_list, network_to_bnet, percolate_network, percolate_space,
    percolate_space_strict, percolation_conflicts,
};
pub(crate) use percolation::{bdd_to_bnet_expression, render_bnet};

use biodivine_lib_param_bn::BooleanNetwork;
use num_bigint::BigUint;

use std::collections::BTreeMap;

/// A partial assignment of network variables, keyed by variable name.
///
/// The ordered map guarantees deterministic iteration, which the engine relies
/// on whenever spaces are printed, hashed or enumerated.
pub type BooleanSpace = BTreeMap<String, bool>;

/// Build a space from a slice of `(name, value)` pairs.
pub fn space_from_values(values: &[(&str, bool)]) -> BooleanSpace {
    values
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

/// Compute the intersection of two spaces, or `None` if they disagree on a
/// commonly fixed variable.
pub fn intersect(x: &BooleanSpace, y: &BooleanSpace) -> Option<BooleanSpace> {
    let mut result = x.clone();
    for (name, value) in y {
        if let Some(existing) = result.get(name) {
            if existing != value {
                return None;
            }
        }
        result.insert(name.clone(), *value);
    }
    Some(result)
}

/// `true` if `x` is a subspace of `y`, i.e. every variable fixed by `y` is
/// fixed to the same value in `x`.
pub fn is_subspace(x: &BooleanSpace, y: &BooleanSpace) -> bool {
    y.iter().all(|(name, value)| x.get(name) == Some(value))
}

/// Evaluate a DNF function (a list of conjunctive clauses, each a space) in the
/// given state or space. An empty DNF is `false`.
pub fn dnf_function_is_true(dnf: &[BooleanSpace], state: &BooleanSpace) -> bool {
    dnf.iter().any(|clause| is_subspace(state, clause))
}

/// Remove from a DNF all clauses that are satisfied by the given state.
pub fn remove_state_from_dnf(dnf: &[BooleanSpace], state: &BooleanSpace) -> Vec<BooleanSpace> {
    dnf.iter()
        .filter(|clause| !is_subspace(state, clause))
        .cloned()
        .collect()
}

/// Extend `space` with every fixing from `extension` (values already fixed in
/// `space` win). This is the `space | extension` idiom used when lifting results
/// from a percolated network back into the parent space.
pub fn extend_space(space: &BooleanSpace, extension: &BooleanSpace) -> BooleanSpace {
    let mut result = extension.clone();
    for (name, value) in space {
        result.insert(name.clone(), *value);
    }
    result
}

/// Encode a space into a unique arbitrary-precision integer with respect to the
/// variable ordering of the given network.
///
/// Every variable occupies two bits (`00` free, `10` fixed to zero, `11` fixed
/// to one), so distinct spaces always produce distinct keys and the induced
/// ordering is a total lexicographic order on spaces.
pub fn space_unique_key(space: &BooleanSpace, network: &BooleanNetwork) -> Result<BigUint, String> {
    let mut key = BigUint::from(0u8);
    for (name, value) in space {
        let var = network
            .as_graph()
            .find_variable(name)
            .ok_or(format!("Unknown variable `{name}`."))?;
        let code = if *value { 3u8 } else { 2u8 };
        key |= BigUint::from(code) << (2 * var.to_index());
    }
    Ok(key)
}

/// Render a space as a 0/1/`*` string following the lexicographic variable order.
pub fn space_to_binary_string(space: &BooleanSpace, var_ordering: &[String]) -> String {
    let mut result = String::new();
    for name in var_ordering {
        match space.get(name) {
            Some(true) => result.push('1'),
            Some(false) => result.push('0'),
            None => result.push('*'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_and_subspace() {
        let x = space_from_values(&[("A", true), ("B", false)]);
        let y = space_from_values(&[("B", false), ("C", true)]);
        let z = space_from_values(&[("A", false)]);

        let xy = intersect(&x, &y).unwrap();
        assert_eq!(xy, space_from_values(&[("A", true), ("B", false), ("C", true)]));
        assert!(intersect(&x, &z).is_none());

        assert!(is_subspace(&xy, &x));
        assert!(is_subspace(&xy, &y));
        assert!(!is_subspace(&x, &xy));
        // Everything is a subspace of the whole space.
        assert!(is_subspace(&x, &BooleanSpace::new()));
    }

    #[test]
    fn test_dnf_helpers() {
        let clause_a = space_from_values(&[("A", true)]);
        let clause_b = space_from_values(&[("B", false), ("C", true)]);
        let dnf = vec![clause_a.clone(), clause_b.clone()];

        let state = space_from_values(&[("A", false), ("B", false), ("C", true)]);
        assert!(dnf_function_is_true(&dnf, &state));
        assert!(!dnf_function_is_true(&[], &state));

        let filtered = remove_state_from_dnf(&dnf, &state);
        assert_eq!(filtered, vec![clause_a]);
    }

    #[test]
    fn test_space_unique_key() {
        let bn = BooleanNetwork::try_from_bnet("targets,factors\nA, B\nB, A\nC, !C\n").unwrap();

        let x = space_from_values(&[("A", false), ("B", true)]);
        let y = space_from_values(&[("A", true), ("B", false)]);
        let z = space_from_values(&[("A", false), ("B", true), ("C", false)]);

        let key_x = space_unique_key(&x, &bn).unwrap();
        let key_y = space_unique_key(&y, &bn).unwrap();
        let key_z = space_unique_key(&z, &bn).unwrap();
        assert_ne!(key_x, key_y);
        assert_ne!(key_x, key_z);
        assert_ne!(key_y, key_z);

        // The same space always encodes to the same key.
        assert_eq!(key_x, space_unique_key(&x.clone(), &bn).unwrap());
        // Unknown variables are rejected.
        let unknown = space_from_values(&[("X", true)]);
        assert!(space_unique_key(&unknown, &bn).is_err());
    }

    #[test]
    fn test_extend_space() {
        let node = space_from_values(&[("A", true)]);
        let inner = space_from_values(&[("B", false)]);
        let lifted = extend_space(&node, &inner);
        assert_eq!(lifted, space_from_values(&[("A", true), ("B", false)]));

        // Values of the base space win over the extension.
        let conflicting = space_from_values(&[("A", false)]);
        let lifted = extend_space(&node, &conflicting);
        assert_eq!(lifted, space_from_values(&[("A", true)]));
    }
}
