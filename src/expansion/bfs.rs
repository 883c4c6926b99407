//! Breadth-first expansion.

use crate::succession_diagram::{NodeId, SuccessionDiagram};

use std::collections::HashSet;

/// See [SuccessionDiagram::expand_bfs] for documentation.
pub fn expand_bfs(
    sd: &mut SuccessionDiagram,
    node_id: Option<NodeId>,
    bfs_level_limit: Option<usize>,
    size_limit: Option<usize>,
) -> Result<bool, String> {
    let node_id = node_id.unwrap_or(sd.root());

    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(node_id);

    let mut level_id = 0usize;
    let mut current_level = vec![node_id];
    let mut next_level: Vec<NodeId> = Vec::new();

    while !current_level.is_empty() {
        for node in &current_level {
            // Check if the size limit has been exceeded already.
            if let Some(limit) = size_limit {
                if sd.len() >= limit {
                    return Ok(false);
                }
            }

            // Compute successors if necessary; sort to avoid non-determinism.
            let mut successors = sd.node_successors(*node, true)?;
            successors.sort();

            for s in successors {
                if seen.insert(s) {
                    next_level.push(s);
                }
            }
        }

        // The level is explored; check if this exceeds the level limit.
        if let Some(limit) = bfs_level_limit {
            if level_id >= limit {
                return Ok(false);
            }
        }

        level_id += 1;
        current_level = std::mem::take(&mut next_level);
    }

    Ok(true)
}
