//! Exact symbolic confirmation of attractor candidates, and the fully
//! symbolic fallback attractor search.

use crate::spaces::{BooleanSpace, extend_space};
use crate::succession_diagram::{NodeId, SuccessionDiagram};

use biodivine_lib_param_bn::BooleanNetwork;
use biodivine_lib_param_bn::VariableId;
use biodivine_lib_param_bn::biodivine_std::traits::Set;
use biodivine_lib_param_bn::symbolic_async_graph::{GraphColoredVertices, SymbolicAsyncGraph};

/// Use exhaustive symbolic reachability to eliminate spurious candidate states
/// and compute the exact attractor sets.
///
/// Returns the attractor seed states together with the corresponding attractor
/// sets (expressed in the diagram's global symbolic encoding). With
/// `seeds_only`, the search can terminate early once all seeds are guaranteed,
/// in which case the sets are `None`.
pub fn compute_attractors_symbolic(
    sd: &mut SuccessionDiagram,
    node_id: NodeId,
    candidate_states: &[BooleanSpace],
    seeds_only: bool,
) -> Result<(Vec<BooleanSpace>, Option<Vec<GraphColoredVertices>>), String> {
    let node_space = sd.node_data(node_id).space.clone();

    if node_space.len() == sd.network.num_vars() {
        // A fixed point is its own attractor; no reachability needed.
        let set = mk_subspace(sd.symbolic_graph(), &sd.network, &node_space)?;
        return Ok((vec![node_space], Some(vec![set])));
    }

    let bn_reduced = sd.node_percolated_network(node_id, true)?;
    let graph_reduced = SymbolicAsyncGraph::new(&bn_reduced)?;

    // Variables fixed in the node space do not exist in the reduced network.
    let candidate_states_reduced: Vec<BooleanSpace> = candidate_states
        .iter()
        .map(|candidate| {
            candidate
                .iter()
                .filter(|(k, _)| !node_space.contains_key(*k))
                .map(|(k, v)| (k.clone(), *v))
                .collect()
        })
        .collect();

    let mut child_motifs_reduced: Vec<BooleanSpace> = Vec::new();
    if sd.node_data(node_id).expanded {
        for child in sd.node_successors(node_id, false)? {
            child_motifs_reduced.push(sd.edge_stable_motif(node_id, child, true)?);
        }
    }

    let children_set = mk_subspace_list(&graph_reduced, &bn_reduced, &child_motifs_reduced)?;
    let candidate_set = mk_subspace_list(&graph_reduced, &bn_reduced, &candidate_states_reduced)?;
    let mut avoid = candidate_set.union(&children_set);

    log::debug!(
        "[{node_id}] > Start symbolic seed state identification with {} candidates.",
        candidate_states.len()
    );

    let mut seeds: Vec<BooleanSpace> = Vec::new();
    let mut sets: Vec<GraphColoredVertices> = Vec::new();
    for (i, candidate) in candidate_states_reduced.iter().enumerate() {
        let is_last = i == candidate_states_reduced.len() - 1;
        let is_minimal = child_motifs_reduced.is_empty();
        if seeds_only && is_minimal && is_last && seeds.is_empty() {
            // A pseudo-minimal node must contain at least one attractor seed,
            // so the last remaining candidate is a seed without any checking.
            log::debug!("[{node_id}] > Single seed remaining in a (pseudo) minimal space. Done.");
            return Ok((vec![extend_space(&node_space, candidate)], None));
        }

        let candidate_singleton = mk_subspace(&graph_reduced, &bn_reduced, candidate)?;
        avoid = avoid.minus(&candidate_singleton);

        let closure =
            symbolic_attractor_test(node_id, &graph_reduced, &bn_reduced, candidate, &avoid)?;

        let Some(closure) = closure else {
            // The candidate reaches another candidate or a child space, so it
            // is not an attractor.
            continue;
        };

        // An attractor set; it also becomes a part of the avoid set.
        avoid = avoid.union(&closure);
        seeds.push(extend_space(&node_space, candidate));
        sets.push(closure);
    }

    log::debug!(
        "[{node_id}] > Finished identification with {} seed states.",
        seeds.len()
    );

    // Transfer the attractor sets into the global symbolic encoding and extend
    // them with the fixed variables of the node space.
    let space_symbolic = mk_subspace(sd.symbolic_graph(), &sd.network, &node_space)?;
    let mut sets_converted: Vec<GraphColoredVertices> = Vec::new();
    for set in sets {
        let transferred = sd
            .symbolic_graph()
            .symbolic_context()
            .transfer_from(set.as_bdd(), graph_reduced.symbolic_context())
            .ok_or("Cannot transfer an attractor set to the global encoding.".to_string())?;
        let transferred =
            GraphColoredVertices::new(transferred, sd.symbolic_graph().symbolic_context());
        sets_converted.push(transferred.intersect(&space_symbolic));
    }

    Ok((seeds, Some(sets_converted)))
}

/// Symbolic reachability with saturation: compute the set of states reachable
/// from `pivot`, or `None` the moment the reachable set touches `avoid_set`.
///
/// Variables that disagree between the pivot and the avoid set (*conflict
/// variables*) are saturated with priority, because they *must* be updated if
/// the avoid set is ever to be reached.
pub fn symbolic_attractor_test(
    node_id: NodeId,
    graph: &SymbolicAsyncGraph,
    network: &BooleanNetwork,
    pivot: &BooleanSpace,
    avoid_set: &GraphColoredVertices,
) -> Result<Option<GraphColoredVertices>, String> {
    let avoid = if avoid_set.is_empty() {
        None
    } else {
        Some(avoid_set)
    };

    let mut reach_set = mk_subspace(graph, network, pivot)?;

    // Variables for which `reach_set` is already closed under the post
    // operator.
    let mut saturated_vars: Vec<VariableId> = Vec::new();
    // Variables where the pivot differs from some avoid state.
    let mut conflict_vars: Vec<VariableId> = Vec::new();

    if let Some(avoid) = avoid {
        let avoid_bdd = avoid.as_bdd();
        for (name, value) in pivot {
            let var = network
                .as_graph()
                .find_variable(name)
                .ok_or(format!("Unknown variable `{name}`."))?;
            let bdd_var = graph.symbolic_context().get_state_variable(var);
            let incompatible = avoid_bdd.var_select(bdd_var, !*value);
            if !incompatible.is_false() {
                conflict_vars.push(var);
            }
        }
        sort_variable_list(&mut conflict_vars);
    }

    // Remaining variables; relevant, but not necessary to reach `avoid`.
    let mut other_vars: Vec<VariableId> = network
        .variables()
        .filter(|x| !conflict_vars.contains(x))
        .collect();
    sort_variable_list(&mut other_vars);

    log::debug!(
        "[{node_id}] > Start symbolic reachability with {} conflict variables and {} other variables.",
        conflict_vars.len(),
        other_vars.len()
    );

    let mut all_done = false;
    while !all_done {
        all_done = true;

        // Saturate the reach set with the currently selected variables.
        let mut saturation_done = false;
        while !saturation_done {
            if let Some(avoid) = avoid {
                if !avoid.intersect(&reach_set).is_empty() {
                    log::debug!("[{node_id}] > Discovered avoid state. Done.");
                    return Ok(None);
                }
            }

            saturation_done = true;
            for var in &saturated_vars {
                let successors = graph.var_post_out(*var, &reach_set);
                if !successors.is_empty() {
                    reach_set = reach_set.union(&successors);
                    saturation_done = false;
                    break;
                }
            }
        }

        // Once saturated, try to pick up a new saturation variable, conflict
        // variables first.
        let mut picked: Option<(VariableId, GraphColoredVertices)> = None;
        for var in conflict_vars.iter().chain(other_vars.iter()).copied() {
            let successors = graph.var_post_out(var, &reach_set);
            if !successors.is_empty() {
                picked = Some((var, successors));
                break;
            }
        }
        if let Some((var, successors)) = picked {
            reach_set = reach_set.union(&successors);
            all_done = false;

            conflict_vars.retain(|x| *x != var);
            other_vars.retain(|x| *x != var);
            saturated_vars.push(var);
            sort_variable_list(&mut saturated_vars);

            log::debug!(
                "[{node_id}] > Saturation({}) Added saturation variable. {} conflict and {} other variables remaining.",
                saturated_vars.len(),
                conflict_vars.len(),
                other_vars.len()
            );
        }
    }

    log::debug!("[{node_id}] > Reachability completed.");
    Ok(Some(reach_set))
}

/// A fully symbolic attractor search inside the node space (minus the expanded
/// child motifs), used when the candidate-based method fails.
///
/// This is a pivot/forward/backward elimination: the forward closure of a
/// pivot is an attractor exactly when it cannot escape the pivot's backward
/// closure; otherwise the whole backward closure is removed from the search
/// universe and the search continues.
pub fn symbolic_attractor_fallback(
    sd: &mut SuccessionDiagram,
    node_id: NodeId,
) -> Result<(Vec<BooleanSpace>, Vec<GraphColoredVertices>), String> {
    let node_space = sd.node_data(node_id).space.clone();

    if node_space.len() == sd.network.num_vars() {
        let seed = node_space.clone();
        let set = mk_subspace(sd.symbolic_graph(), &sd.network, &node_space)?;
        return Ok((vec![seed], vec![set]));
    }

    let bn_reduced = sd.node_percolated_network(node_id, true)?;
    let graph_reduced = SymbolicAsyncGraph::new(&bn_reduced)?;

    let mut child_motifs_reduced: Vec<BooleanSpace> = Vec::new();
    if sd.node_data(node_id).expanded {
        for child in sd.node_successors(node_id, false)? {
            child_motifs_reduced.push(sd.edge_stable_motif(node_id, child, true)?);
        }
    }
    let children_set = mk_subspace_list(&graph_reduced, &bn_reduced, &child_motifs_reduced)?;

    let mut universe = graph_reduced.mk_unit_colored_vertices().minus(&children_set);
    let mut seeds: Vec<BooleanSpace> = Vec::new();
    let mut sets: Vec<GraphColoredVertices> = Vec::new();

    log::debug!("[{node_id}] > Start fully symbolic attractor search.");

    while !universe.is_empty() {
        let pivot_state = first_state(&graph_reduced, &bn_reduced, &universe)
            .expect("A non-empty set has a state.");
        let pivot = mk_subspace(&graph_reduced, &bn_reduced, &pivot_state)?;

        let forward = reach_fwd(&graph_reduced, &pivot);
        let backward = reach_bwd(&graph_reduced, &pivot);

        if forward.minus(&backward).is_empty() {
            // The forward closure cannot escape the pivot's strongly connected
            // component, hence it is an attractor. An attractor intersecting a
            // child trap space would be contained in it, so this attractor
            // lies fully inside the universe.
            seeds.push(extend_space(&node_space, &pivot_state));
            sets.push(forward.clone());
            universe = universe.minus(&backward).minus(&forward);
        } else {
            // The forward closure escapes the pivot's component, so only the
            // pivot's basin can be eliminated; the closure itself can still
            // hold attractors.
            universe = universe.minus(&backward);
        }
    }

    log::debug!(
        "[{node_id}] > Fully symbolic search found {} attractors.",
        seeds.len()
    );

    // Transfer the sets into the global encoding.
    let space_symbolic = mk_subspace(sd.symbolic_graph(), &sd.network, &node_space)?;
    let mut sets_converted: Vec<GraphColoredVertices> = Vec::new();
    for set in sets {
        let transferred = sd
            .symbolic_graph()
            .symbolic_context()
            .transfer_from(set.as_bdd(), graph_reduced.symbolic_context())
            .ok_or("Cannot transfer an attractor set to the global encoding.".to_string())?;
        let transferred =
            GraphColoredVertices::new(transferred, sd.symbolic_graph().symbolic_context());
        sets_converted.push(transferred.intersect(&space_symbolic));
    }

    Ok((seeds, sets_converted))
}

/// Forward closure under the asynchronous transitions.
pub(crate) fn reach_fwd(
    graph: &SymbolicAsyncGraph,
    initial: &GraphColoredVertices,
) -> GraphColoredVertices {
    let mut result = initial.clone();
    loop {
        let post = graph.post(&result);
        if post.minus(&result).is_empty() {
            return result;
        }
        result = result.union(&post);
    }
}

/// Backward closure under the asynchronous transitions.
pub(crate) fn reach_bwd(
    graph: &SymbolicAsyncGraph,
    initial: &GraphColoredVertices,
) -> GraphColoredVertices {
    let mut result = initial.clone();
    loop {
        let pre = graph.pre(&result);
        if pre.minus(&result).is_empty() {
            return result;
        }
        result = result.union(&pre);
    }
}

/// The set of states of one subspace, in the encoding of the given graph.
pub(crate) fn mk_subspace(
    graph: &SymbolicAsyncGraph,
    network: &BooleanNetwork,
    space: &BooleanSpace,
) -> Result<GraphColoredVertices, String> {
    let mut values: Vec<(VariableId, bool)> = Vec::new();
    for (name, value) in space {
        let var = network
            .as_graph()
            .find_variable(name)
            .ok_or(format!("Unknown variable `{name}`."))?;
        values.push((var, *value));
    }
    Ok(graph.mk_subspace(&values))
}

/// The union of the state sets of the given subspaces.
pub(crate) fn mk_subspace_list(
    graph: &SymbolicAsyncGraph,
    network: &BooleanNetwork,
    spaces: &[BooleanSpace],
) -> Result<GraphColoredVertices, String> {
    let mut result = graph.mk_empty_colored_vertices();
    for space in spaces {
        result = result.union(&mk_subspace(graph, network, space)?);
    }
    Ok(result)
}

/// Extract an arbitrary (but deterministic) state from a non-empty set.
fn first_state(
    graph: &SymbolicAsyncGraph,
    network: &BooleanNetwork,
    set: &GraphColoredVertices,
) -> Option<BooleanSpace> {
    let valuation = set.as_bdd().sat_witness()?;
    let ctx = graph.symbolic_context();
    let mut state = BooleanSpace::new();
    for var in network.variables() {
        let bdd_var = ctx.get_state_variable(var);
        state.insert(network.get_variable_name(var).clone(), valuation.value(bdd_var));
    }
    Some(state)
}

fn sort_variable_list(variables: &mut [VariableId]) {
    variables.sort();
    variables.reverse();
}
