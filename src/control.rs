//! Permanent target control of Boolean networks based on the structure of a
//! succession diagram.

use crate::spaces::{BooleanSpace, extend_space, is_subspace, percolate_space};
use crate::succession_diagram::{NodeId, SuccessionDiagram};
use crate::symbolic::SymbolicFunctions;

use std::fmt;

/// A sequence of nested subspaces (successions of stable motifs).
pub type SubspaceSuccession = Vec<BooleanSpace>;

/// A list of alternative driver sets, each of which percolates to a target.
pub type ControlOverrides = Vec<BooleanSpace>;

/// Which variables may be overridden when searching for drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlStrategy {
    /// Drivers are chosen among the variables of the target trap space.
    Internal,
    /// Any variable can act as a driver, with any value.
    All,
}

/// An intervention that drives the network into a target subspace by
/// stabilizing a succession of trap spaces one by one.
///
/// Two interventions are equal if they act on the same succession with equal
/// controls at each step; each step imposes a duration condition (the
/// override must be maintained until its subspace is reached), so the same
/// overrides along different successions are distinct interventions.
#[derive(Clone, Debug)]
pub struct Intervention {
    control: Vec<ControlOverrides>,
    strategy: ControlStrategy,
    succession: SubspaceSuccession,
    successful: bool,
}

impl Intervention {
    /// Create an intervention; the controls of every step are normalized into
    /// a canonical (sorted) representation.
    pub fn new(
        control: Vec<ControlOverrides>,
        strategy: ControlStrategy,
        succession: SubspaceSuccession,
    ) -> Intervention {
        let successful = control.iter().all(|c| !c.is_empty());
        let mut canonical: Vec<ControlOverrides> = Vec::new();
        for mut overrides in control {
            overrides.sort();
            canonical.push(overrides);
        }
        Intervention {
            control: canonical,
            strategy,
            succession,
            successful,
        }
    }

    pub fn control(&self) -> &[ControlOverrides] {
        &self.control
    }

    pub fn strategy(&self) -> ControlStrategy {
        self.strategy
    }

    pub fn succession(&self) -> &SubspaceSuccession {
        &self.succession
    }

    /// `false` if some step of the succession has no usable drivers (which can
    /// happen with restricted driver pools or driver-set size limits).
    pub fn successful(&self) -> bool {
        self.successful
    }
}

impl PartialEq for Intervention {
    fn eq(&self, other: &Intervention) -> bool {
        if self.succession != other.succession {
            return false;
        }
        if self.control.len() != other.control.len() {
            return false;
        }
        self.control
            .iter()
            .zip(other.control.iter())
            .all(|(a, b)| controls_are_equal(a, b))
    }
}

impl fmt::Display for Intervention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Intervention is {}SUCCESSFUL operating on",
            if self.successful { "" } else { "UN" }
        )?;
        for space in &self.succession {
            writeln!(f, "{}", space_display(space))?;
        }
        writeln!(f, "override")?;
        let connective = match self.strategy {
            ControlStrategy::Internal => " and then\n",
            ControlStrategy::All => " temporarily, and then\n",
        };
        let steps: Vec<String> = self
            .control
            .iter()
            .map(|overrides| {
                let alternatives: Vec<String> =
                    overrides.iter().map(|o| space_display(o)).collect();
                format!("({})", alternatives.join(" or "))
            })
            .collect();
        write!(f, "{}", steps.join(connective))
    }
}

/// Render a space as `{'A': 0, 'B': 1}`, the same human-readable shape used in
/// the intervention reports.
fn space_display(space: &BooleanSpace) -> String {
    let entries: Vec<String> = space
        .iter()
        .map(|(name, value)| format!("'{name}': {}", *value as u8))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Compute succession-diagram control interventions that reach the target
/// subspace. The diagram is expanded towards the target as needed.
pub fn succession_control(
    sd: &mut SuccessionDiagram,
    target: &BooleanSpace,
    strategy: ControlStrategy,
    max_drivers_per_succession_node: Option<usize>,
    forbidden_drivers: &[String],
    successful_only: bool,
) -> Result<Vec<Intervention>, String> {
    let mut interventions: Vec<Intervention> = Vec::new();

    let successions = successions_to_target(sd, target, true)?;
    for succession in successions {
        let controls = drivers_of_succession(
            &sd.functions,
            &succession,
            strategy,
            max_drivers_per_succession_node,
            forbidden_drivers,
        )?;
        let intervention = Intervention::new(controls, strategy, succession);
        if !successful_only || intervention.successful() {
            interventions.push(intervention);
        }
    }

    Ok(interventions)
}

/// Find all successions (sequences of reduced stable motifs along paths from
/// the root) leading to nodes inside the target subspace.
///
/// With `expand_diagram`, the diagram is first expanded so that every path
/// relevant for the target is materialized.
pub fn successions_to_target(
    sd: &mut SuccessionDiagram,
    target: &BooleanSpace,
    expand_diagram: bool,
) -> Result<Vec<SubspaceSuccession>, String> {
    if expand_diagram {
        sd.expand_to_target(target, None)?;
    }

    let mut successions: Vec<SubspaceSuccession> = Vec::new();
    for node in sd.node_ids() {
        if !is_subspace(&sd.node_data(node).space, target) {
            continue;
        }
        for path in all_simple_paths(sd, sd.root(), node) {
            let mut succession: SubspaceSuccession = Vec::new();
            for window in path.windows(2) {
                succession.push(sd.edge_stable_motif(window[0], window[1], true)?);
            }
            successions.push(succession);
        }
    }

    Ok(successions)
}

/// Enumerate all simple paths between two nodes of the diagram DAG.
fn all_simple_paths(sd: &SuccessionDiagram, from: NodeId, to: NodeId) -> Vec<Vec<NodeId>> {
    let mut results: Vec<Vec<NodeId>> = Vec::new();
    let mut path: Vec<NodeId> = vec![from];
    all_simple_paths_rec(sd, to, &mut path, &mut results);
    results
}

fn all_simple_paths_rec(
    sd: &SuccessionDiagram,
    to: NodeId,
    path: &mut Vec<NodeId>,
    results: &mut Vec<Vec<NodeId>>,
) {
    let last = *path.last().unwrap();
    if last == to {
        results.push(path.clone());
        return;
    }
    let mut successors = sd.node_data(last).successor_ids();
    successors.sort();
    for child in successors {
        // The diagram is acyclic, so simple paths never revisit a node.
        path.push(child);
        all_simple_paths_rec(sd, to, path, results);
        path.pop();
    }
}

/// Find driver node sets for a list of sequentially nested trap spaces.
/// Every step assumes that the previous steps already percolated.
pub fn drivers_of_succession(
    functions: &SymbolicFunctions,
    succession: &[BooleanSpace],
    strategy: ControlStrategy,
    max_drivers_per_succession_node: Option<usize>,
    forbidden_drivers: &[String],
) -> Result<Vec<ControlOverrides>, String> {
    let mut control_strategies: Vec<ControlOverrides> = Vec::new();
    let mut assume_fixed = BooleanSpace::new();

    for trap_space in succession {
        control_strategies.push(find_drivers(
            functions,
            trap_space,
            strategy,
            &assume_fixed,
            max_drivers_per_succession_node,
            forbidden_drivers,
        )?);
        let with_assumed = extend_space(&assume_fixed, trap_space);
        let ldoi = percolate_space(functions, &with_assumed);
        for (var, value) in ldoi {
            assume_fixed.insert(var, value);
        }
    }

    Ok(control_strategies)
}

/// Find the driver sets of a single target trap space.
///
/// An empty result means no drivers were found, which can happen when
/// `max_drivers_per_succession_node` is too small or all usable drivers are
/// forbidden.
pub fn find_drivers(
    functions: &SymbolicFunctions,
    target_trap_space: &BooleanSpace,
    strategy: ControlStrategy,
    assume_fixed: &BooleanSpace,
    max_drivers_per_succession_node: Option<usize>,
    forbidden_drivers: &[String],
) -> Result<ControlOverrides, String> {
    let target_inner: BooleanSpace = target_trap_space
        .iter()
        .filter(|(k, _)| !assume_fixed.contains_key(*k))
        .map(|(k, v)| (k.clone(), *v))
        .collect();

    let driver_pool: Vec<String> = match strategy {
        ControlStrategy::Internal => target_inner
            .keys()
            .filter(|k| !forbidden_drivers.contains(*k))
            .cloned()
            .collect(),
        ControlStrategy::All => functions
            .variable_names()
            .iter()
            .filter(|k| !forbidden_drivers.contains(*k))
            .cloned()
            .collect(),
    };

    let max_driver_set_size = max_drivers_per_succession_node.unwrap_or(target_inner.len());

    let mut drivers: ControlOverrides = Vec::new();
    for driver_set_size in 0..=max_driver_set_size {
        for driver_set in subsets_of_size(&driver_pool, driver_set_size) {
            // A superset of a known driver set carries no new information.
            let redundant = drivers
                .iter()
                .any(|d| d.keys().all(|k| driver_set.contains(k)));
            if redundant {
                continue;
            }

            match strategy {
                ControlStrategy::Internal => {
                    let driver_dict: BooleanSpace = driver_set
                        .iter()
                        .map(|k| (k.clone(), target_inner[k]))
                        .collect();
                    let ldoi =
                        percolate_space(functions, &extend_space(assume_fixed, &driver_dict));
                    if is_subspace(&ldoi, target_trap_space) {
                        drivers.push(driver_dict);
                    }
                }
                ControlStrategy::All => {
                    for mask in 0..(1usize << driver_set_size) {
                        let driver_dict: BooleanSpace = driver_set
                            .iter()
                            .enumerate()
                            .map(|(i, k)| (k.clone(), (mask >> i) & 1 == 1))
                            .collect();
                        let ldoi =
                            percolate_space(functions, &extend_space(assume_fixed, &driver_dict));
                        if is_subspace(&ldoi, target_trap_space) {
                            drivers.push(driver_dict);
                        }
                    }
                }
            }
        }
    }

    Ok(drivers)
}

/// All subsets of the given size, in a deterministic order.
fn subsets_of_size(pool: &[String], size: usize) -> Vec<Vec<String>> {
    let mut results: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    subsets_of_size_rec(pool, size, 0, &mut current, &mut results);
    results
}

fn subsets_of_size_rec(
    pool: &[String],
    size: usize,
    start: usize,
    current: &mut Vec<String>,
    results: &mut Vec<Vec<String>>,
) {
    if current.len() == size {
        results.push(current.clone());
        return;
    }
    for i in start..pool.len() {
        current.push(pool[i].clone());
        subsets_of_size_rec(pool, size, i + 1, current, results);
        current.pop();
    }
}

/// `true` if two controls contain the same driver sets, regardless of order.
pub fn controls_are_equal(a: &ControlOverrides, b: &ControlOverrides) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;
    use biodivine_lib_param_bn::BooleanNetwork;

    const MODEL_SUCCESSION: &str =
        "targets,factors\nS, S\nA, S | B\nB, A\nC, A | D\nD, C\nE, false\n";

    fn target() -> BooleanSpace {
        space_from_values(&[
            ("S", false),
            ("E", false),
            ("A", false),
            ("B", false),
            ("C", true),
            ("D", true),
        ])
    }

    #[test]
    fn test_successions_to_target() {
        let bn = BooleanNetwork::try_from_bnet(MODEL_SUCCESSION).unwrap();
        let mut sd = SuccessionDiagram::new(&bn).unwrap();

        let mut successions = successions_to_target(&mut sd, &target(), true).unwrap();
        successions.sort();
        assert_eq!(successions.len(), 2);
        assert!(successions.iter().all(|s| s.len() == 3));

        // Both successions start by fixing the source `S` to zero, and then
        // stabilize `{A, B}` and `{C, D}` in either order.
        for succession in &successions {
            assert_eq!(succession[0], space_from_values(&[("S", false)]));
        }
        let ab = space_from_values(&[("A", false), ("B", false)]);
        let cd = space_from_values(&[("C", true), ("D", true)]);
        assert!(successions.contains(&vec![succession_step_s(), ab.clone(), cd.clone()]));
        assert!(successions.contains(&vec![succession_step_s(), cd, ab]));
    }

    fn succession_step_s() -> BooleanSpace {
        space_from_values(&[("S", false)])
    }

    #[test]
    fn test_drivers_of_succession() {
        let bn = BooleanNetwork::try_from_bnet(MODEL_SUCCESSION).unwrap();
        let sd = SuccessionDiagram::new(&bn).unwrap();

        let succession = vec![
            space_from_values(&[("S", false)]),
            space_from_values(&[("A", false), ("B", false)]),
            space_from_values(&[("C", true), ("D", true)]),
        ];
        let controls = drivers_of_succession(
            &sd.functions,
            &succession,
            ControlStrategy::Internal,
            None,
            &[],
        )
        .unwrap();

        assert_eq!(controls.len(), 3);
        assert!(controls_are_equal(
            &controls[0],
            &vec![space_from_values(&[("S", false)])]
        ));
        assert!(controls_are_equal(
            &controls[1],
            &vec![
                space_from_values(&[("A", false)]),
                space_from_values(&[("B", false)]),
            ]
        ));
        assert!(controls_are_equal(
            &controls[2],
            &vec![
                space_from_values(&[("C", true)]),
                space_from_values(&[("D", true)]),
            ]
        ));
    }

    #[test]
    fn test_succession_control() {
        let bn = BooleanNetwork::try_from_bnet(MODEL_SUCCESSION).unwrap();
        let mut sd = SuccessionDiagram::new(&bn).unwrap();

        let interventions = succession_control(
            &mut sd,
            &target(),
            ControlStrategy::Internal,
            None,
            &[],
            true,
        )
        .unwrap();
        assert_eq!(interventions.len(), 2);
        for intervention in &interventions {
            assert!(intervention.successful());
            assert_eq!(intervention.control().len(), 3);
        }

        // Forbidding `A` removes the `{A=0}` alternative but the intervention
        // still succeeds through `B`.
        let interventions = succession_control(
            &mut sd,
            &target(),
            ControlStrategy::Internal,
            None,
            &["A".to_string()],
            true,
        )
        .unwrap();
        assert_eq!(interventions.len(), 2);
        for intervention in &interventions {
            let ab_step = intervention
                .control()
                .iter()
                .find(|c| c.iter().any(|d| d.contains_key("B")))
                .unwrap();
            assert_eq!(ab_step.len(), 1);
        }
    }

    #[test]
    fn test_intervention_equality() {
        let succession = vec![space_from_values(&[("S", false)])];
        let a = Intervention::new(
            vec![vec![space_from_values(&[("S", false)])]],
            ControlStrategy::Internal,
            succession.clone(),
        );
        let b = Intervention::new(
            vec![vec![space_from_values(&[("S", false)])]],
            ControlStrategy::Internal,
            succession,
        );
        assert_eq!(a, b);
        assert!(a.successful());

        let unsuccessful = Intervention::new(
            vec![Vec::new()],
            ControlStrategy::Internal,
            vec![space_from_values(&[("S", true)])],
        );
        assert!(!unsuccessful.successful());
        assert_ne!(a, unsuccessful);
    }
}
