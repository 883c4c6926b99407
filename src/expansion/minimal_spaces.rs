//! Expansion that reaches every minimal trap space while greedily avoiding
//! unnecessary node expansions.

use crate::spaces::{BooleanSpace, extend_space, is_subspace};
use crate::succession_diagram::{NodeId, SuccessionDiagram};
use crate::trappist::{TrapSpaceOptions, TrapSpaceProblem, trap_spaces};

use std::collections::HashSet;

/// See [SuccessionDiagram::expand_minimal_spaces] for documentation.
pub fn expand_minimal_spaces(
    sd: &mut SuccessionDiagram,
    node_id: Option<NodeId>,
    size_limit: Option<usize>,
    skip_ignored: bool,
) -> Result<bool, String> {
    let node_id = node_id.unwrap_or(sd.root());

    let petri_net = sd.node_percolated_petri_net(node_id, true, None)?;
    let node_space = sd.node_data(node_id).space.clone();

    let options = TrapSpaceOptions {
        ensure_subspace: node_space.clone(),
        ..Default::default()
    };
    let all_minimal_traps: Vec<BooleanSpace> = trap_spaces(
        &petri_net,
        TrapSpaceProblem::Min,
        &options,
        &sd.config.solver,
    )?
    .iter()
    .map(|x| extend_space(&node_space, x))
    .collect();

    // The unvisited minimal traps; the full list is kept for skip nodes.
    let mut minimal_traps = all_minimal_traps.clone();

    log::debug!(
        "Start minimal trap SD expansion using {} minimal traps.",
        minimal_traps.len()
    );

    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(node_id);

    let mut stack: Vec<(NodeId, Option<Vec<NodeId>>)> = vec![(node_id, None)];

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

        let node_space = sd.node_data(node).space.clone();

        // Remove successors that are already visited, and those which do not
        // cover any so-far unvisited minimal trap space.
        while let Some(last) = successors.last().copied() {
            if seen.contains(&last) {
                // Everything in `seen` is expanded, so no need to skip it.
                successors.pop();
                continue;
            }
            let covers_new = minimal_traps
                .iter()
                .any(|m| is_subspace(m, &node_space));
            if !covers_new {
                successors.pop();
                if skip_ignored {
                    make_skip_node(sd, last, &all_minimal_traps)?;
                }
                continue;
            }
            break;
        }

        // This node is done: every minimal trap space below it is already in
        // the succession diagram.
        let Some(s) = successors.pop() else {
            if sd.node_is_minimal(node) {
                let space = sd.node_data(node).space.clone();
                if let Some(position) = minimal_traps.iter().position(|m| *m == space) {
                    minimal_traps.remove(position);
                }
                log::debug!("Remaining minimal traps: {}.", minimal_traps.len());
            }
            continue;
        };

        // `s` is unvisited and covers at least one minimal trap space that
        // does not appear in the diagram yet.
        seen.insert(s);
        stack.push((node, Some(successors)));
        stack.push((s, None));
        log::debug!("[{s}] Expanding...");
    }

    debug_assert!(minimal_traps.is_empty());
    Ok(true)
}

/// Turn an unexpanded node into a skip node by connecting it to the minimal
/// trap spaces it contains.
fn make_skip_node(
    sd: &mut SuccessionDiagram,
    node_id: NodeId,
    all_minimal_traps: &[BooleanSpace],
) -> Result<(), String> {
    if sd.node_data(node_id).expanded {
        return Ok(());
    }

    let node_space = sd.node_data(node_id).space.clone();
    let mut skip_edges = 0;
    for m_trap in all_minimal_traps {
        if is_subspace(m_trap, &node_space) {
            let m_id = sd.ensure_node(Some(node_id), m_trap)?;
            sd.nodes[m_id].expanded = true;
            debug_assert!(sd.node_is_minimal(m_id));
            skip_edges += 1;
        }
    }

    sd.nodes[node_id].expanded = true;
    sd.nodes[node_id].skipped = true;
    log::debug!("[{node_id}] Node skipped with {skip_edges} edges.");
    Ok(())
}
