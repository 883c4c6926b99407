//! Expansion that guarantees every attractor has its smallest enclosing trap
//! space expanded, without expanding more than necessary.

use crate::attractors::make_heuristic_retained_set;
use crate::spaces::{BooleanSpace, intersect};
use crate::succession_diagram::{NodeId, SuccessionDiagram};
use crate::symbolic::SymbolicFunctions;
use crate::trappist::fixed_points_reduced_stg;

use std::collections::HashSet;

/// See [SuccessionDiagram::expand_attractor_seeds] for documentation.
pub fn expand_attractor_seeds(
    sd: &mut SuccessionDiagram,
    size_limit: Option<usize>,
) -> Result<bool, String> {
    // First, make sure all minimal trap spaces are present: for attractors in
    // minimal traps, the closest enclosing trap space is then known, and only
    // potential motif-avoidant attractors remain to be handled.
    if !sd.expand_minimal_spaces(None, size_limit, false)? {
        return Ok(false);
    }

    log::debug!("Minimal trap space expansion finished. Proceeding to attractor expansion.");

    let root = sd.root();
    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(root);
    let mut stack: Vec<(NodeId, Option<Vec<NodeId>>)> = vec![(root, None)];

    while let Some((node, successors)) = stack.pop() {
        let mut successors = match successors {
            Some(successors) => successors,
            None => {
                if let Some(limit) = size_limit {
                    if sd.len() >= limit {
                        return Ok(false);
                    }
                }
                let mut successors = sd.node_successors(node, true)?;
                // Reversed because we explore the list from the back.
                successors.sort();
                successors.reverse();
                successors
            }
        };

        // Stable motifs of the children that are already expanded.
        let expanded_children: Vec<NodeId> = sd
            .node_successors(node, false)?
            .into_iter()
            .filter(|x| sd.node_data(*x).expanded)
            .collect();
        let mut expanded_motifs: Vec<BooleanSpace> = Vec::new();
        for child in &expanded_children {
            expanded_motifs.push(sd.edge_stable_motif(node, *child, false)?);
        }

        // Skip successors that are seen, or that contain no candidate states
        // for motif-avoidant attractors beyond the expanded children.
        while let Some(s) = successors.last().copied() {
            if seen.contains(&s) {
                successors.pop();
                continue;
            }
            if sd.node_data(s).expanded {
                // Expanded by a previous procedure but not yet visited here;
                // we have to visit it regardless of other conditions.
                break;
            }

            let successor_space = sd.node_data(s).space.clone();
            let successor_bn = sd.node_percolated_network(s, true)?;
            let successor_nfvs = sd.node_percolated_nfvs(s, true)?;
            let successor_pn = sd.node_percolated_petri_net(s, true, None)?;
            let successor_functions = SymbolicFunctions::new(&successor_bn)?;

            let avoid: Vec<BooleanSpace> = expanded_motifs
                .iter()
                .filter_map(|child| intersect(&successor_space, child))
                .collect();
            let avoid_restricted: Vec<BooleanSpace> = avoid
                .iter()
                .map(|x| {
                    x.iter()
                        .filter(|(var, _)| !successor_space.contains_key(*var))
                        .map(|(var, value)| (var.clone(), *value))
                        .collect()
                })
                .collect();

            let retained_set =
                make_heuristic_retained_set(&successor_functions, &successor_nfvs, &avoid);

            // One ASP solution is enough to prove a new candidate exists.
            let successor_seeds = fixed_points_reduced_stg(
                &successor_pn,
                &retained_set,
                &BooleanSpace::new(),
                &avoid_restricted,
                Some(1),
                &sd.config.solver,
            )?;

            if successor_seeds.is_empty() {
                // Either there are no candidate states in this successor, or
                // they are all covered by some expanded sibling.
                successors.pop();
                continue;
            }

            log::debug!("[{node}] Found successor with new attractor candidate seeds. Expand node {s}.");
            break;
        }

        let Some(s) = successors.pop() else {
            log::debug!("[{node}] Finished node attractor expansion.");
            continue;
        };

        seen.insert(s);
        stack.push((node, Some(successors)));
        stack.push((s, None));
    }

    Ok(true)
}
