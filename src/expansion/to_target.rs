//! BFS expansion restricted to the nodes relevant for a target subspace.

use crate::spaces::{BooleanSpace, intersect, is_subspace};
use crate::succession_diagram::{NodeId, SuccessionDiagram};

use std::collections::HashSet;

/// See [SuccessionDiagram::expand_to_target] for documentation.
pub fn expand_to_target(
    sd: &mut SuccessionDiagram,
    target: &BooleanSpace,
    size_limit: Option<usize>,
) -> Result<bool, String> {
    let root = sd.root();
    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(root);

    let mut current_level = vec![root];
    let mut next_level: Vec<NodeId> = Vec::new();

    while !current_level.is_empty() {
        for node in &current_level {
            let node_space = sd.node_data(*node).space.clone();

            if intersect(&node_space, target).is_none() {
                // The node does not intersect the target: it is irrelevant and
                // can safely remain an unexpanded stub.
                continue;
            }
            if is_subspace(&node_space, target) && node_space != *target {
                // The node is already inside the target; expanding it adds no
                // new information.
                continue;
            }

            if let Some(limit) = size_limit {
                if sd.len() >= limit {
                    return Ok(false);
                }
            }

            let mut successors = sd.node_successors(*node, true)?;
            successors.sort();

            for s in successors {
                if seen.insert(s) {
                    next_level.push(s);
                }
            }
        }

        current_level = std::mem::take(&mut next_level);
    }

    Ok(true)
}
