//! Expansion by stable-motif blocks.
//!
//! The successors of a node are grouped into *blocks*: the backward closures
//! (in the percolated network) of the variables fixed by their stable motifs.
//! Expanding a minimal block is independent of the other minimal blocks, so it
//! suffices to continue through one of them. With motif-avoidant attractor
//! checking, only a block whose inner diagram has no attractor candidates is
//! safe to choose; if no such block exists, all successors are expanded.

use crate::interaction_graph::{InfluenceGraph, source_nodes};
use crate::succession_diagram::{NodeId, SuccessionDiagram};
use crate::symbolic::SymbolicFunctions;

use std::collections::BTreeSet;

/// See [SuccessionDiagram::expand_block] for documentation.
pub fn expand_source_blocks(
    sd: &mut SuccessionDiagram,
    check_maa: bool,
    size_limit: Option<usize>,
    optimize_source_nodes: bool,
) -> Result<bool, String> {
    log::debug!("Start SD expansion using block decomposition.");

    let root = sd.root();
    let mut current_level: BTreeSet<NodeId> = BTreeSet::from([root]);
    let mut next_level: BTreeSet<NodeId> = BTreeSet::new();
    let mut bfs_depth = 0usize;

    while !current_level.is_empty() {
        bfs_depth += 1;
        log::debug!(
            " > Start block expansion of BFS level {bfs_depth} with {} node(s).",
            current_level.len()
        );

        // The ordered set gives a deterministic iteration order.
        for node in current_level {
            if sd.node_data(node).expanded {
                // We re-discovered a previously expanded node.
                continue;
            }

            if let Some(limit) = size_limit {
                if sd.len() >= limit {
                    return Ok(false);
                }
            }

            let node_bn = sd.node_percolated_network(node, true)?;
            let node_space = sd.node_data(node).space.clone();
            let node_functions = SymbolicFunctions::new(&node_bn)?;

            // Source nodes in the percolated network can be "fast-forwarded"
            // the same way we would fix them in the root node.
            let sources = source_nodes(&node_functions);
            if !sources.is_empty() && optimize_source_nodes {
                log::debug!(
                    " > Found {} source nodes in node {node}. Fast-forwarding instead of expansion.",
                    sources.len()
                );

                let expected_size = sd.len() + (1usize << sources.len());
                if expected_size > sd.config.max_motifs_per_node {
                    return Err(format!(
                        "Exceeded the maximum amount of stable motifs per node ({}).",
                        sd.config.max_motifs_per_node
                    ));
                }
                if let Some(limit) = size_limit {
                    if expected_size > limit {
                        // Cannot expand, the size limit would be exceeded.
                        return Ok(false);
                    }
                }

                for mask in 0..(1usize << sources.len()) {
                    let mut sub_space = node_space.clone();
                    for (i, source) in sources.iter().enumerate() {
                        sub_space.insert(source.clone(), (mask >> i) & 1 == 1);
                    }
                    next_level.insert(sd.ensure_node(Some(node), &sub_space)?);
                }

                // There can be no attractors here because we are just fixing
                // the source nodes.
                sd.nodes[node].expanded = true;
                sd.nodes[node].attractor_seeds = Some(Vec::new());
                sd.nodes[node].attractor_sets = Some(Vec::new());
                continue;
            }

            // Compute successors as in a normal expansion procedure.
            let mut successors = sd.node_successors(node, true)?;
            successors.sort();

            if successors.is_empty() {
                // This is a minimal trap space.
                continue;
            }

            if successors.len() == 1 && !check_maa {
                // This space is not minimal, but there is no "choice" to make.
                // (When checking for MAAs we continue as normal, because most
                // of the non-trivial results are needed anyway.)
                next_level.insert(successors[0]);
                continue;
            }

            // Group successors into blocks by the backward closure of the
            // variables their stable motifs fix.
            let influence = InfluenceGraph::new(&node_functions);
            let mut blocks: Vec<(BTreeSet<String>, Vec<NodeId>)> = Vec::new();
            for s in &successors {
                let motif = sd.edge_stable_motif(node, *s, true)?;
                let motif_indices: Vec<usize> = motif
                    .keys()
                    .filter_map(|name| node_functions.index_of(name))
                    .collect();
                let block: BTreeSet<String> = influence
                    .backward_closure(&motif_indices)
                    .into_iter()
                    .map(|v| node_functions.name(v).to_string())
                    .collect();

                if let Some(position) = blocks.iter().position(|(b, _)| *b == block) {
                    blocks[position].1.push(*s);
                } else {
                    blocks.push((block, vec![*s]));
                }
            }

            log::debug!(
                " > [{node}] Computed blocks: {:?}",
                blocks.iter().map(|(b, n)| (b.len(), n.len())).collect::<Vec<_>>()
            );

            // Keep only the inclusion-minimal blocks; the non-minimal ones are
            // not independent of them.
            let mut minimal_blocks: Vec<(BTreeSet<String>, Vec<NodeId>)> = Vec::new();
            if blocks.len() > 1 {
                for (block, nodes) in &blocks {
                    let is_minimal = !blocks.iter().any(|(b2, _)| b2.is_subset(block) && b2 != block);
                    if is_minimal {
                        minimal_blocks.push((block.clone(), nodes.clone()));
                    }
                }
            } else {
                minimal_blocks = blocks;
            }

            // Prefer the block that leads to the smallest expansion.
            minimal_blocks.sort_by_key(|(_, nodes)| nodes.len());

            log::debug!(
                " > [{node}] Minimal blocks: {:?}",
                minimal_blocks.iter().map(|(b, n)| (b.len(), n.len())).collect::<Vec<_>>()
            );

            if !check_maa {
                // Expand all nodes of the smallest minimal block.
                let to_expand = &minimal_blocks[0].1;
                log::debug!(" > [{node}] Final block ({}): {to_expand:?}", to_expand.len());
                next_level.extend(to_expand.iter().copied());
            } else {
                // Find the smallest block without any MAAs and choose it. If no
                // such block exists, expand the whole node, because the MAAs
                // can be either in this node or in any of the child nodes.
                let mut clean_block_found = false;
                for (block, block_nodes) in &minimal_blocks {
                    let block_variables: Vec<String> = block.iter().cloned().collect();
                    let mut block_sd = sd.component_subdiagram(&block_variables, Some(node))?;

                    // Instead of expanding the inner diagram from scratch, copy
                    // the stable motifs we already know into its root.
                    let block_root = block_sd.root();
                    for succ_id in block_nodes {
                        let succ_motif = sd.edge_stable_motif(node, *succ_id, true)?;
                        block_sd.ensure_node(Some(block_root), &succ_motif)?;
                    }
                    block_sd.nodes[block_root].expanded = true;

                    // We use candidates rather than seeds: candidate detection
                    // (almost) always finishes, so nodes whose MAAs cannot be
                    // ruled out simply delay their expansion instead of
                    // blocking the whole procedure.
                    let is_clean = match block_sd.node_attractor_candidates(block_root, true) {
                        Ok(candidates) => candidates.is_empty(),
                        Err(_) => false,
                    };

                    if is_clean {
                        log::debug!(
                            " > [{node}] Found clean block with no MAAs ({}): {block_nodes:?}",
                            block_nodes.len()
                        );
                        clean_block_found = true;
                        next_level.extend(block_nodes.iter().copied());
                        sd.nodes[node].attractor_seeds = Some(Vec::new());
                        sd.nodes[node].attractor_sets = Some(Vec::new());
                        break;
                    }
                    log::debug!(
                        "[{node}] > Found MAA candidates in a block or could not find candidates at all. Delaying expansion."
                    );
                }
                if !clean_block_found {
                    // All blocks may have MAAs; expand all successors.
                    log::debug!(
                        " > [{node}] No clean block found. Expanding all {} successors.",
                        successors.len()
                    );
                    next_level.extend(successors.iter().copied());
                }
            }
        }

        current_level = std::mem::take(&mut next_level);
    }

    log::debug!(" > Block expansion terminated with {} node(s).", sd.len());
    Ok(true)
}
