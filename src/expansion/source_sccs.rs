//! Expansion by source strongly connected components.
//!
//! The root is first expanded by fixing every combination of source variables.
//! Then, at every level, each source SCC of the percolated network gets its
//! own subdiagram, which is expanded in isolation and attached back to the
//! current branch. When no source SCCs remain, the node is finished with a
//! plain BFS.
//!
//! With `check_maa`, subdiagrams with motif-avoidant attractors are not
//! attached and the ambient node falls back to BFS. In that case the same
//! attractor can be discovered in several subdiagram copies; the duplicates
//! are not removed, which can over-count motif-avoidant attractors.

use crate::spaces::{BooleanSpace, extend_space, percolate_network, percolate_space};
use crate::succession_diagram::{NodeId, SuccessionDiagram};
use crate::symbolic::SymbolicFunctions;

use std::collections::HashMap;

/// See [SuccessionDiagram::expand_scc] for documentation.
pub fn expand_source_sccs(sd: &mut SuccessionDiagram, check_maa: bool) -> Result<bool, String> {
    let root = sd.root();

    let mut current_level: Vec<NodeId> = vec![root];
    let mut next_level: Vec<NodeId> = Vec::new();
    // Nodes with no more source SCCs; expanded by BFS at the end.
    let mut final_level: Vec<NodeId> = Vec::new();

    // Percolate constant nodes, then find the source variables.
    let perc_space = percolate_space(&sd.functions, &BooleanSpace::new());
    let perc_bn = percolate_network(&sd.network, &sd.functions, &perc_space, false)?;
    let perc_functions = SymbolicFunctions::new(&perc_bn)?;
    let source_nodes = crate::interaction_graph::source_nodes(&perc_functions);

    // Fix all source node combinations and expand the root accordingly.
    if !source_nodes.is_empty() {
        for mask in 0..(1usize << source_nodes.len()) {
            let mut sub_space = perc_space.clone();
            for (i, source) in source_nodes.iter().enumerate() {
                sub_space.insert(source.clone(), (mask >> i) & 1 == 1);
            }
            next_level.push(sd.ensure_node(Some(root), &sub_space)?);
        }
        sd.nodes[root].expanded = true;
        // No attractors can live here; we are only fixing source nodes.
        sd.nodes[root].attractor_seeds = Some(Vec::new());
        current_level = std::mem::take(&mut next_level);
    }

    while !current_level.is_empty() {
        log::debug!("Source SCC expansion level: {current_level:?}");

        // Each level consists of one round of fixing all source SCCs.
        for node_id in current_level {
            let sub_sds = sd.source_scc_subdiagrams(Some(node_id))?;
            if sub_sds.is_empty() {
                // No more source SCCs here; finish the node later.
                final_level.push(node_id);
                continue;
            }

            // Attach all source SCC subdiagrams one by one.
            let mut current_branches = vec![node_id];
            let mut next_branches: Vec<NodeId> = Vec::new();
            for mut scc_sd in sub_sds {
                let has_maa = expand_subnetwork_diagram(&mut scc_sd, check_maa)?;
                if has_maa {
                    // Ignore source SCCs with motif-avoidant attractors.
                    continue;
                }
                for branch in &current_branches {
                    next_branches.extend(attach_scc_diagram(sd, &scc_sd, *branch)?);
                }
                current_branches = std::mem::take(&mut next_branches);
            }

            if current_branches == vec![node_id] {
                // Nothing was attached: only source SCCs with motif-avoidant
                // attractors remain, so the node is finished by BFS.
                final_level.push(node_id);
            } else {
                next_level.extend(current_branches);
            }
        }

        current_level = std::mem::take(&mut next_level);
    }

    log::debug!("Source SCC expansion final level: {final_level:?}");
    for node_id in final_level {
        sd.expand_bfs(Some(node_id), None, None)?;
    }

    Ok(true)
}

/// Fully expand a subnetwork diagram, and (optionally) check whether it admits
/// motif-avoidant attractors.
fn expand_subnetwork_diagram(
    scc_sd: &mut SuccessionDiagram,
    check_maa: bool,
) -> Result<bool, String> {
    let fully_expanded = scc_sd.expand_bfs(None, None, None)?;
    debug_assert!(fully_expanded);

    let mut has_maa = false;
    if check_maa {
        let mut motif_avoidant_count = 0;
        for node in scc_sd.node_ids() {
            let attractors = scc_sd.node_attractor_seeds(node, true, false)?;
            if !scc_sd.node_is_minimal(node) {
                motif_avoidant_count += attractors.len();
            }
        }
        has_maa = motif_avoidant_count != 0;
    }
    Ok(has_maa)
}

/// Attach a fully expanded subnetwork diagram below the given branch node.
/// Returns the new branching points (the attached minimal trap spaces).
fn attach_scc_diagram(
    sd: &mut SuccessionDiagram,
    scc_sd: &SuccessionDiagram,
    branch: NodeId,
) -> Result<Vec<NodeId>, String> {
    if scc_sd.len() == 1 {
        return Ok(vec![branch]);
    }

    let branch_space = sd.node_data(branch).space.clone();
    let scc_root = scc_sd.root();
    let mut next_branches: Vec<NodeId> = Vec::new();

    // First add all the nodes through their first discovered parent.
    let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
    mapping.insert(scc_root, branch);
    for scc_node_id in scc_sd.node_ids() {
        if scc_node_id == scc_root {
            continue;
        }
        let scc_parent_id = scc_sd.node_data(scc_node_id).predecessors[0];
        debug_assert!(scc_parent_id < scc_node_id);
        let parent_id = mapping[&scc_parent_id];

        let motif = scc_sd.edge_stable_motif(scc_parent_id, scc_node_id, false)?;
        let motif = extend_space(&branch_space, &motif);
        let child_id = sd.ensure_node(Some(parent_id), &motif)?;
        mapping.insert(scc_node_id, child_id);

        if scc_sd.node_is_minimal(scc_node_id) && !next_branches.contains(&child_id) {
            next_branches.push(child_id);
        }
    }

    // Now add all the remaining edges.
    for scc_node_id in scc_sd.node_ids() {
        let parent_id = mapping[&scc_node_id];
        let scc_children = scc_sd.node_data(scc_node_id).successor_ids();
        for scc_child_id in &scc_children {
            let motif = scc_sd.edge_stable_motif(scc_node_id, *scc_child_id, false)?;
            let motif = extend_space(&branch_space, &motif);
            let child_id = sd.ensure_node(Some(parent_id), &motif)?;
            debug_assert_eq!(child_id, mapping[scc_child_id]);
        }
        // A node with attached children is expanded.
        if !scc_children.is_empty() {
            sd.nodes[parent_id].expanded = true;
        }
    }

    Ok(next_branches)
}
