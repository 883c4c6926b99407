//! Depth-first expansion.

use crate::succession_diagram::{NodeId, SuccessionDiagram};

use std::collections::HashSet;

/// See [SuccessionDiagram::expand_dfs] for documentation.
pub fn expand_dfs(
    sd: &mut SuccessionDiagram,
    node_id: Option<NodeId>,
    dfs_stack_limit: Option<usize>,
    size_limit: Option<usize>,
) -> Result<bool, String> {
    let node_id = node_id.unwrap_or(sd.root());

    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(node_id);

    let mut stack: Vec<(NodeId, Option<Vec<NodeId>>)> = vec![(node_id, None)];
    let mut result_is_complete = true;

    while let Some((node, successors)) = stack.pop() {
        let mut successors = match successors {
            Some(successors) => successors,
            None => {
                // Only allow successor computation below the size limit.
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

        // Remove all immediate successors that are already visited.
        while let Some(last) = successors.last() {
            if seen.contains(last) {
                successors.pop();
            } else {
                break;
            }
        }

        // This node is done; nothing else to push onto the stack.
        let Some(s) = successors.pop() else {
            continue;
        };

        if let Some(limit) = dfs_stack_limit {
            if stack.len() >= limit {
                // We cannot push the successor because it would exceed the
                // stack limit; remember that the result is thus incomplete.
                result_is_complete = false;
                continue;
            }
        }

        seen.insert(s);
        // Push the node back with the remaining successors, then the successor.
        stack.push((node, Some(successors)));
        stack.push((s, None));
    }

    Ok(result_is_complete)
}
