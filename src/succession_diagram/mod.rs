//! The succession diagram: a lazily expanded directed acyclic graph whose
//! nodes are nested percolated trap spaces and whose edges are the stable
//! motifs refining a parent trap space into a child.
//!
//! Nodes are identified by dense integer ids (the root is `0`). A node is born
//! as an unexpanded *stub*; expansion materializes its successors (the maximal
//! trap spaces strictly inside the node). Nodes also carry lazily computed
//! caches (percolated network/Petri net/NFVS and attractor data) which can be
//! released through [SuccessionDiagram::reclaim_node_data].

mod snapshot;

pub use snapshot::SuccessionDiagramSnapshot;

use crate::attractors;
use crate::config::SuccessionDiagramConfig;
use crate::expansion;
use crate::interaction_graph::{InfluenceGraph, feedback_vertex_set};
use crate::petri_net::{PetriNet, network_to_petri_net, sanitize_network_names};
use crate::spaces::{
    BooleanSpace, extend_space, network_to_bnet, percolate_network, percolate_space,
    space_to_binary_string, space_unique_key,
};
use crate::symbolic::SymbolicFunctions;
use crate::trappist::{TrapSpaceOptions, TrapSpaceProblem, trap_spaces};

use biodivine_lib_param_bn::BooleanNetwork;
use biodivine_lib_param_bn::RegulatoryGraph;
use biodivine_lib_param_bn::symbolic_async_graph::{GraphColoredVertices, SymbolicAsyncGraph};
use num_bigint::BigUint;

use std::collections::HashMap;

/// Identifier of a succession diagram node.
pub type NodeId = usize;

/// One parent-to-child edge, annotated with the stable motif whose percolation
/// produced the child. At most one edge exists per node pair; the first
/// discovered motif is the one recorded.
#[derive(Clone, Debug)]
pub struct SdEdge {
    pub child: NodeId,
    pub motif: BooleanSpace,
}

/// The data associated with one succession diagram node.
#[derive(Clone)]
pub struct NodeData {
    /// The percolated trap space the node represents.
    pub space: BooleanSpace,
    /// Length of the longest path from the root to this node.
    pub depth: usize,
    /// Whether the outgoing edges are materialized.
    pub expanded: bool,
    /// Whether the outgoing edges short-circuit to minimal trap spaces instead
    /// of the maximal stable motifs.
    pub skipped: bool,
    /// One of the parents through which this node was first discovered.
    pub parent_node: Option<NodeId>,
    pub(crate) successors: Vec<SdEdge>,
    pub(crate) predecessors: Vec<NodeId>,
    pub(crate) percolated_network: Option<BooleanNetwork>,
    pub(crate) percolated_petri_net: Option<PetriNet>,
    pub(crate) percolated_nfvs: Option<Vec<String>>,
    pub(crate) attractor_candidates: Option<Vec<BooleanSpace>>,
    pub(crate) attractor_seeds: Option<Vec<BooleanSpace>>,
    pub(crate) attractor_sets: Option<Vec<GraphColoredVertices>>,
}

impl NodeData {
    fn stub(space: BooleanSpace, parent_node: Option<NodeId>) -> NodeData {
        NodeData {
            space,
            depth: 0,
            expanded: false,
            skipped: false,
            parent_node,
            successors: Vec::new(),
            predecessors: Vec::new(),
            percolated_network: None,
            percolated_petri_net: None,
            percolated_nfvs: None,
            attractor_candidates: None,
            attractor_seeds: None,
            attractor_sets: None,
        }
    }

    /// The ids of the successor nodes, in edge insertion order.
    pub fn successor_ids(&self) -> Vec<NodeId> {
        self.successors.iter().map(|e| e.child).collect()
    }

    /// The cached attractor candidates, if computed.
    pub fn attractor_candidates(&self) -> Option<&Vec<BooleanSpace>> {
        self.attractor_candidates.as_ref()
    }

    /// The cached attractor seeds, if computed.
    pub fn attractor_seeds(&self) -> Option<&Vec<BooleanSpace>> {
        self.attractor_seeds.as_ref()
    }

    /// The cached symbolic attractor sets, if computed.
    pub fn attractor_sets(&self) -> Option<&Vec<GraphColoredVertices>> {
        self.attractor_sets.as_ref()
    }
}

/// Succession diagram of a Boolean network.
///
/// The diagram encodes relationships between the trap spaces of the network
/// and can be used for attractor detection and control. It is expanded lazily:
/// it is not built until [SuccessionDiagram::build] or one of the `expand_*`
/// methods is called.
pub struct SuccessionDiagram {
    pub(crate) network: BooleanNetwork,
    pub(crate) functions: SymbolicFunctions,
    pub(crate) graph: SymbolicAsyncGraph,
    pub(crate) petri_net: PetriNet,
    pub(crate) nfvs: Option<Vec<String>>,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) node_indices: HashMap<BigUint, NodeId>,
    pub(crate) config: SuccessionDiagramConfig,
}

impl SuccessionDiagram {
    /// Create an unexpanded succession diagram with the default configuration.
    pub fn new(network: &BooleanNetwork) -> Result<SuccessionDiagram, String> {
        SuccessionDiagram::with_config(network, SuccessionDiagramConfig::default())
    }

    /// Create an unexpanded succession diagram with the given configuration.
    ///
    /// The network is normalized first: names are sanitized, free inputs
    /// receive identity update functions, variables are ordered
    /// lexicographically and the regulatory graph is re-inferred from the
    /// update functions. Parametrized networks are rejected.
    pub fn with_config(
        network: &BooleanNetwork,
        config: SuccessionDiagramConfig,
    ) -> Result<SuccessionDiagram, String> {
        let network = sanitize_network_names(network, false)?;
        let network = if network.num_vars() > 0 {
            BooleanNetwork::try_from_bnet(network_to_bnet(&network)?.as_str())?
        } else {
            network
        };
        let functions = SymbolicFunctions::new(&network)?;
        let graph = SymbolicAsyncGraph::new(&network)?;
        let petri_net = network_to_petri_net(&network, &functions)?;

        log::debug!(
            "Generated global Petri net with {} places and {} transitions.",
            petri_net.num_places(),
            petri_net.transitions().len()
        );

        let mut sd = SuccessionDiagram {
            network,
            functions,
            graph,
            petri_net,
            nfvs: None,
            nodes: Vec::new(),
            node_indices: HashMap::new(),
            config,
        };
        // Create an un-expanded root node.
        sd.ensure_node(None, &BooleanSpace::new())?;
        Ok(sd)
    }

    /// Generate a succession diagram from a model string in the given format
    /// (one of `bnet`, `aeon`, `sbml`).
    pub fn from_rules(rules: &str, format: &str) -> Result<SuccessionDiagram, String> {
        let network = match format {
            "bnet" => BooleanNetwork::try_from_bnet(rules)?,
            "aeon" => BooleanNetwork::try_from(rules)?,
            "sbml" => BooleanNetwork::try_from_sbml(rules)?.0,
            _ => return Err(format!("Unknown model format: `{format}`.")),
        };
        SuccessionDiagram::new(&network)
    }

    /// Read a network from the given file path; the format is inferred from
    /// the file extension.
    pub fn from_file(path: &str) -> Result<SuccessionDiagram, String> {
        let network = BooleanNetwork::try_from_file(path)?;
        SuccessionDiagram::new(&network)
    }

    pub fn network(&self) -> &BooleanNetwork {
        &self.network
    }

    pub fn petri_net(&self) -> &PetriNet {
        &self.petri_net
    }

    pub fn config(&self) -> &SuccessionDiagramConfig {
        &self.config
    }

    pub fn symbolic_graph(&self) -> &SymbolicAsyncGraph {
        &self.graph
    }

    /// The ID of the root node.
    pub fn root(&self) -> NodeId {
        0
    }

    /// The number of nodes in the diagram.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The maximal node depth in the diagram (the root has depth zero).
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// All node IDs.
    pub fn node_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len()).collect()
    }

    /// IDs of the nodes that are currently *not* expanded.
    pub fn stub_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|id| !self.nodes[*id].expanded)
            .collect()
    }

    /// IDs of the nodes that are currently expanded.
    pub fn expanded_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|id| self.nodes[*id].expanded)
            .collect()
    }

    /// IDs of the expanded nodes that represent minimal trap spaces. Note that
    /// stub nodes do not count as minimal.
    pub fn minimal_trap_spaces(&self) -> Vec<NodeId> {
        self.expanded_ids()
            .into_iter()
            .filter(|id| self.node_is_minimal(*id))
            .collect()
    }

    /// The data associated with the given node.
    pub fn node_data(&self, node_id: NodeId) -> &NodeData {
        &self.nodes[node_id]
    }

    /// `true` if the node is expanded and has no successors, i.e. it is a
    /// minimal trap space.
    pub fn node_is_minimal(&self, node_id: NodeId) -> bool {
        let node = &self.nodes[node_id];
        node.expanded && node.successors.is_empty()
    }

    /// Return the ID of the node matching the provided space, if any.
    pub fn find_node(&self, space: &BooleanSpace) -> Option<NodeId> {
        // An unknown variable means the space belongs to a different network,
        // in which case there is certainly no matching node.
        let key = space_unique_key(space, &self.network).ok()?;
        self.node_indices.get(&key).copied()
    }

    /// `true` if this succession diagram is a subgraph of the `other` one.
    ///
    /// This works even for diagrams of different networks, as long as both
    /// only depend on the same subset of variables. Stable motifs on the edges
    /// are not compared, only node spaces and edge presence.
    pub fn is_subgraph(&self, other: &SuccessionDiagram) -> bool {
        // Every stub node is reachable through an expanded node, so the
        // following checks cover the whole diagram.
        for id in self.expanded_ids() {
            let Some(other_id) = other.find_node(&self.nodes[id].space) else {
                return false;
            };
            let other_successors: Vec<NodeId> = if other.nodes[other_id].expanded {
                other.nodes[other_id].successor_ids()
            } else {
                Vec::new()
            };
            for edge in &self.nodes[id].successors {
                let other_child = other.find_node(&self.nodes[edge.child].space);
                match other_child {
                    Some(other_child) if other_successors.contains(&other_child) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// `true` if the two succession diagrams are isomorphic (as per
    /// [SuccessionDiagram::is_subgraph] in both directions).
    pub fn is_isomorphic(&self, other: &SuccessionDiagram) -> bool {
        self.is_subgraph(other) && other.is_subgraph(self)
    }

    /// Return the successors of the given node.
    ///
    /// If the node is not expanded and `compute` is set, the node is expanded
    /// first; without `compute`, the query fails. Note that the order of the
    /// returned ids is the edge creation order; sort them if a canonical order
    /// is needed.
    pub fn node_successors(&mut self, node_id: NodeId, compute: bool) -> Result<Vec<NodeId>, String> {
        if !self.nodes[node_id].expanded {
            if !compute {
                return Err(format!("Node {node_id} is not expanded."));
            }
            self.expand_one_node(node_id)?;
        }
        Ok(self.nodes[node_id].successor_ids())
    }

    /// The stable motif associated with the given parent-to-child edge.
    ///
    /// With `reduced`, the variables fixed in the parent space are removed,
    /// yielding a maximal trap space of the network percolated to the parent.
    pub fn edge_stable_motif(
        &self,
        parent_id: NodeId,
        child_id: NodeId,
        reduced: bool,
    ) -> Result<BooleanSpace, String> {
        let edge = self.nodes[parent_id]
            .successors
            .iter()
            .find(|e| e.child == child_id)
            .ok_or(format!("No edge between nodes {parent_id} and {child_id}."))?;
        if reduced {
            let parent_space = &self.nodes[parent_id].space;
            Ok(edge
                .motif
                .iter()
                .filter(|(k, _)| !parent_space.contains_key(*k))
                .map(|(k, v)| (k.clone(), *v))
                .collect())
        } else {
            Ok(edge.motif.clone())
        }
    }

    /// The Boolean network percolated to the node's space, with constant
    /// variables removed. The result is cached on the node.
    pub fn node_percolated_network(
        &mut self,
        node_id: NodeId,
        compute: bool,
    ) -> Result<BooleanNetwork, String> {
        if self.nodes[node_id].space.len() == self.network.num_vars() {
            // A fixed point; the percolated network is always empty.
            return Ok(BooleanNetwork::new(RegulatoryGraph::new(Vec::new())));
        }
        if let Some(network) = &self.nodes[node_id].percolated_network {
            return Ok(network.clone());
        }
        if !compute {
            return Err(format!("Percolated network not computed for node {node_id}."));
        }
        let space = self.nodes[node_id].space.clone();
        let network = percolate_network(&self.network, &self.functions, &space, true)?;
        log::debug!(
            "[{node_id}] Computed percolated network with {} variables (vs {}).",
            network.num_vars(),
            self.network.num_vars()
        );
        self.nodes[node_id].percolated_network = Some(network.clone());
        Ok(network)
    }

    /// The Petri net of the network percolated to the node's space. The result
    /// is cached on the node.
    ///
    /// If a `parent_id` is given (or the discovering parent has a cached net),
    /// the restriction starts from the parent's Petri net, which is faster but
    /// yields the same result as restricting the global one.
    pub fn node_percolated_petri_net(
        &mut self,
        node_id: NodeId,
        compute: bool,
        parent_id: Option<NodeId>,
    ) -> Result<PetriNet, String> {
        if self.nodes[node_id].space.len() == self.network.num_vars() {
            // A fixed point; the restriction is always empty.
            return Ok(PetriNet::default());
        }
        if let Some(petri_net) = &self.nodes[node_id].percolated_petri_net {
            return Ok(petri_net.clone());
        }
        if !compute {
            return Err(format!("Percolated Petri net not computed for node {node_id}."));
        }
        let space = self.nodes[node_id].space.clone();
        let parent_id = parent_id.or(self.nodes[node_id].parent_node);
        let base = parent_id
            .and_then(|p| self.nodes[p].percolated_petri_net.as_ref())
            .unwrap_or(&self.petri_net);
        let restricted = base.restrict_to_subspace(&space);
        log::debug!(
            "[{node_id}] Generated Petri net restriction with {} places and {} transitions.",
            restricted.num_places(),
            restricted.transitions().len()
        );
        self.nodes[node_id].percolated_petri_net = Some(restricted.clone());
        Ok(restricted)
    }

    /// An approximate minimum negative feedback vertex set of the node's
    /// percolated network. The result is cached on the node.
    ///
    /// Above [SuccessionDiagramConfig::nfvs_size_threshold] variables, the
    /// unsigned FVS is used instead (still correct, possibly larger).
    pub fn node_percolated_nfvs(
        &mut self,
        node_id: NodeId,
        compute: bool,
    ) -> Result<Vec<String>, String> {
        if let Some(nfvs) = &self.nodes[node_id].percolated_nfvs {
            return Ok(nfvs.clone());
        }
        if !compute {
            return Err(format!("NFVS not computed for node {node_id}."));
        }
        let network = self.node_percolated_network(node_id, compute)?;
        let nfvs = if network.num_vars() == 0 {
            Vec::new()
        } else {
            let functions = SymbolicFunctions::new(&network)?;
            // Computing the *negative* variant of the FVS is surprisingly
            // costly, hence it only makes sense for the smaller networks.
            let negative = network.num_vars() < self.config.nfvs_size_threshold;
            feedback_vertex_set(&functions, negative)
        };
        self.nodes[node_id].percolated_nfvs = Some(nfvs.clone());
        Ok(nfvs)
    }

    /// The global NFVS of the whole network (cached).
    pub fn network_nfvs(&mut self) -> Result<Vec<String>, String> {
        if let Some(nfvs) = &self.nfvs {
            return Ok(nfvs.clone());
        }
        let negative = self.network.num_vars() < self.config.nfvs_size_threshold;
        let nfvs = feedback_vertex_set(&self.functions, negative);
        self.nfvs = Some(nfvs.clone());
        Ok(nfvs)
    }

    /// Attractor candidate states of the given node: every attractor inside
    /// the node's space (and outside of the expanded child spaces) is
    /// witnessed by at least one candidate. Results are cached.
    ///
    /// Candidates can also be computed for unexpanded nodes, but several
    /// unexpanded nodes can then witness the same attractor, and the data is
    /// erased if the node is later expanded.
    pub fn node_attractor_candidates(
        &mut self,
        node_id: NodeId,
        compute: bool,
    ) -> Result<Vec<BooleanSpace>, String> {
        self.node_attractor_candidates_with(node_id, compute, true, true, false)
    }

    /// As [SuccessionDiagram::node_attractor_candidates], with explicit control
    /// over the greedy ASP minification, the simulation pruning and the
    /// external-oracle pruning steps.
    pub fn node_attractor_candidates_with(
        &mut self,
        node_id: NodeId,
        compute: bool,
        greedy_asp_minification: bool,
        simulation_minification: bool,
        oracle_minification: bool,
    ) -> Result<Vec<BooleanSpace>, String> {
        if let Some(candidates) = &self.nodes[node_id].attractor_candidates {
            return Ok(candidates.clone());
        }
        // If candidates are already cleared but seeds are known, seeds are
        // valid (and even more precise) candidates.
        if let Some(seeds) = &self.nodes[node_id].attractor_seeds {
            return Ok(seeds.clone());
        }
        if !compute {
            return Err(format!("Attractor candidates not computed for node {node_id}."));
        }

        let candidates = attractors::compute_attractor_candidates(
            self,
            node_id,
            greedy_asp_minification,
            simulation_minification,
            oracle_minification,
        )?;
        self.nodes[node_id].attractor_candidates = Some(candidates.clone());

        // If the computed candidates are actually valid as seeds, propagate
        // the value so that it doesn't need to be computed later.
        let pseudo_minimal = !self.nodes[node_id].expanded || self.node_is_minimal(node_id);
        if candidates.is_empty() || (pseudo_minimal && candidates.len() == 1) {
            self.nodes[node_id].attractor_seeds = Some(candidates.clone());
        }
        Ok(candidates)
    }

    /// Attractor seed states of the given node: exactly one state per
    /// attractor inside the node's space (and outside of the expanded child
    /// spaces). Results are cached.
    ///
    /// With `symbolic_fallback`, a candidate-set explosion makes the method
    /// fall back to exhaustive symbolic reachability instead of failing.
    pub fn node_attractor_seeds(
        &mut self,
        node_id: NodeId,
        compute: bool,
        symbolic_fallback: bool,
    ) -> Result<Vec<BooleanSpace>, String> {
        if let Some(seeds) = &self.nodes[node_id].attractor_seeds {
            return Ok(seeds.clone());
        }
        if !compute {
            return Err(format!("Attractor seeds not computed for node {node_id}."));
        }

        let result = self.compute_attractor_seeds(node_id);
        let seeds = match result {
            Ok(seeds) => seeds,
            Err(e) if symbolic_fallback && e.contains("Exceeded the maximum") => {
                // The NFVS method failed, likely because the candidate set was
                // too large. We can still compute the attractors symbolically.
                let (seeds, sets) = attractors::symbolic_attractor_fallback(self, node_id)?;
                self.nodes[node_id].attractor_seeds = Some(seeds.clone());
                self.nodes[node_id].attractor_sets = Some(sets);
                seeds
            }
            Err(e) => return Err(e),
        };

        if seeds.is_empty() {
            // Release memory once we know there is nothing else to compute.
            let node = &mut self.nodes[node_id];
            node.percolated_network = None;
            node.percolated_petri_net = None;
            node.percolated_nfvs = None;
        }
        Ok(seeds)
    }

    fn compute_attractor_seeds(&mut self, node_id: NodeId) -> Result<Vec<BooleanSpace>, String> {
        let candidates = self.node_attractor_candidates(node_id, true)?;
        if let Some(seeds) = &self.nodes[node_id].attractor_seeds {
            // Computing the candidates can already resolve the seeds.
            return Ok(seeds.clone());
        }
        let pseudo_minimal = !self.nodes[node_id].expanded || self.node_is_minimal(node_id);
        if candidates.is_empty() || (pseudo_minimal && candidates.len() == 1) {
            self.nodes[node_id].attractor_seeds = Some(candidates.clone());
            return Ok(candidates);
        }
        let (seeds, sets) =
            attractors::compute_attractors_symbolic(self, node_id, &candidates, true)?;
        self.nodes[node_id].attractor_seeds = Some(seeds.clone());
        // The sets could be absent here; that is valid as long as we compute
        // them later when they are needed.
        self.nodes[node_id].attractor_sets = sets;
        Ok(seeds)
    }

    /// Symbolic attractor sets of the given node: the complete state sets of
    /// the attractors witnessed by [SuccessionDiagram::node_attractor_seeds].
    /// Results are cached.
    pub fn node_attractor_sets(
        &mut self,
        node_id: NodeId,
        compute: bool,
    ) -> Result<Vec<GraphColoredVertices>, String> {
        if let Some(sets) = &self.nodes[node_id].attractor_sets {
            return Ok(sets.clone());
        }
        if !compute {
            return Err(format!("Attractor sets not computed for node {node_id}."));
        }
        let seeds = self.node_attractor_seeds(node_id, true, false)?;
        if let Some(sets) = &self.nodes[node_id].attractor_sets {
            // The seed computation can resolve the sets as a side effect.
            return Ok(sets.clone());
        }
        let sets = if seeds.is_empty() {
            Vec::new()
        } else {
            let (_, sets) = attractors::compute_attractors_symbolic(self, node_id, &seeds, false)?;
            sets.expect("Complete attractor computation always produces sets.")
        };
        self.nodes[node_id].attractor_sets = Some(sets.clone());
        Ok(sets)
    }

    /// Attractor candidates of every expanded node (computing missing data).
    pub fn expanded_attractor_candidates(
        &mut self,
    ) -> Result<HashMap<NodeId, Vec<BooleanSpace>>, String> {
        let mut result = HashMap::new();
        for id in self.expanded_ids() {
            let candidates = self.node_attractor_candidates(id, true)?;
            if !candidates.is_empty() {
                result.insert(id, candidates);
            }
        }
        Ok(result)
    }

    /// Attractor seeds of every expanded node (computing missing data).
    pub fn expanded_attractor_seeds(
        &mut self,
    ) -> Result<HashMap<NodeId, Vec<BooleanSpace>>, String> {
        let mut result = HashMap::new();
        for id in self.expanded_ids() {
            let seeds = self.node_attractor_seeds(id, true, false)?;
            if !seeds.is_empty() {
                result.insert(id, seeds);
            }
        }
        Ok(result)
    }

    /// Attractor sets of every expanded node (computing missing data).
    pub fn expanded_attractor_sets(
        &mut self,
    ) -> Result<HashMap<NodeId, Vec<GraphColoredVertices>>, String> {
        let mut result = HashMap::new();
        for id in self.expanded_ids() {
            let sets = self.node_attractor_sets(id, true)?;
            if !sets.is_empty() {
                result.insert(id, sets);
            }
        }
        Ok(result)
    }

    /// Removes non-essential data from every node: the percolated network,
    /// Petri net and NFVS caches, and the attractor candidates of nodes whose
    /// seeds are already known. All of it can be recomputed on demand.
    pub fn reclaim_node_data(&mut self) {
        for node in &mut self.nodes {
            node.percolated_network = None;
            node.percolated_petri_net = None;
            node.percolated_nfvs = None;
            if node.attractor_seeds.is_some() {
                node.attractor_candidates = None;
            }
        }
    }

    /// Skip the expansion of this node: connect it directly to its minimal
    /// trap spaces (see [NodeData::skipped]). Returns `false` if the node is
    /// already expanded.
    ///
    /// Note that attractor detection in skip nodes can witness the same
    /// attractor in several nodes; deduplicate seeds across skip nodes if
    /// exact counts are needed.
    pub fn skip_to_minimal(&mut self, node_id: NodeId) -> Result<bool, String> {
        if self.nodes[node_id].expanded {
            return Ok(false);
        }

        let petri_net = self.node_percolated_petri_net(node_id, true, None)?;
        let node_space = self.nodes[node_id].space.clone();
        let minimal_traps = trap_spaces(
            &petri_net,
            TrapSpaceProblem::Min,
            &TrapSpaceOptions::default(),
            &self.config.solver,
        )?;
        let minimal_traps: Vec<BooleanSpace> = minimal_traps
            .iter()
            .map(|x| extend_space(&node_space, x))
            .collect();

        if minimal_traps.len() == 1 && minimal_traps[0] == node_space {
            // This node is itself a minimal trap space and cannot be skipped.
            self.nodes[node_id].expanded = true;
            return Ok(true);
        }

        for m_trap in &minimal_traps {
            let m_id = self.ensure_node(Some(node_id), m_trap)?;
            // The minimal trap space has no successors, so we can expand it.
            self.nodes[m_id].expanded = true;
        }

        self.nodes[node_id].expanded = true;
        self.nodes[node_id].skipped = true;
        log::debug!("[{node_id}] Added {} skip edges.", minimal_traps.len());
        Ok(true)
    }

    /// Apply [SuccessionDiagram::skip_to_minimal] to every unexpanded node.
    /// Faster than skipping the nodes one by one, because the minimal trap
    /// spaces are only computed once. Returns the number of created skip nodes.
    pub fn skip_remaining(&mut self) -> Result<usize, String> {
        let root = self.root();
        let petri_net = self.node_percolated_petri_net(root, true, None)?;
        let root_space = self.nodes[root].space.clone();
        let minimal_traps = trap_spaces(
            &petri_net,
            TrapSpaceProblem::Min,
            &TrapSpaceOptions::default(),
            &self.config.solver,
        )?;
        let minimal_traps: Vec<BooleanSpace> = minimal_traps
            .iter()
            .map(|x| extend_space(&root_space, x))
            .collect();

        log::debug!(
            "Skipping remaining nodes. Found {} trap spaces.",
            minimal_traps.len()
        );

        let mut traps_with_id: Vec<(NodeId, BooleanSpace)> = Vec::new();
        for m_trap in &minimal_traps {
            let m_id = self.ensure_node(None, m_trap)?;
            self.nodes[m_id].expanded = true;
            traps_with_id.push((m_id, m_trap.clone()));
        }

        let mut skipped_nodes = 0;
        for node_id in self.node_ids() {
            if self.nodes[node_id].expanded {
                continue;
            }
            for (m_id, m_trap) in &traps_with_id {
                if crate::spaces::is_subspace(m_trap, &self.nodes[node_id].space) {
                    self.ensure_edge(node_id, *m_id, m_trap);
                }
            }
            self.nodes[node_id].skipped = true;
            self.nodes[node_id].expanded = true;
            skipped_nodes += 1;

            // All minimal traps are expanded already, so a skip node can
            // never itself become minimal.
            debug_assert!(!self.node_is_minimal(node_id));
        }

        log::debug!("Skipped {skipped_nodes} nodes.");
        Ok(skipped_nodes)
    }

    /// Return an *unexpanded* succession diagram restricted to the subnetwork
    /// induced by `component_variables` (percolated to the space of `node_id`
    /// first, if given).
    ///
    /// The component must be backward-closed in the considered network,
    /// otherwise the subnetwork construction fails. The symbolic encoding of
    /// the new diagram is not compatible with this one, as the underlying
    /// networks have different variable sets.
    pub fn component_subdiagram(
        &mut self,
        component_variables: &[String],
        node_id: Option<NodeId>,
    ) -> Result<SuccessionDiagram, String> {
        let network = match node_id {
            Some(node_id) => self.node_percolated_network(node_id, true)?,
            None => self.network.clone(),
        };
        let functions = SymbolicFunctions::new(&network)?;

        let mut lines: Vec<(String, String)> = Vec::new();
        for name in component_variables {
            let index = functions
                .index_of(name)
                .ok_or(format!("Unknown component variable `{name}`."))?;
            let update = functions.update(index);
            for support_var in update.support_set() {
                let support_name = functions
                    .bdd_variable_set()
                    .name_of(support_var);
                if !component_variables.contains(&support_name) {
                    return Err(format!(
                        "Component is not backward-closed: `{name}` depends on `{support_name}`."
                    ));
                }
            }
            lines.push((
                name.clone(),
                crate::spaces::bdd_to_bnet_expression(functions.bdd_variable_set(), update),
            ));
        }
        let component_bn = BooleanNetwork::try_from_bnet(crate::spaces::render_bnet(&lines).as_str())?;
        SuccessionDiagram::with_config(&component_bn, self.config.clone())
    }

    /// Unexpanded subdiagrams for the source SCCs of the network percolated to
    /// the given node (the root by default).
    pub fn source_scc_subdiagrams(
        &mut self,
        node_id: Option<NodeId>,
    ) -> Result<Vec<SuccessionDiagram>, String> {
        let node_id = node_id.unwrap_or(self.root());
        let network = self.node_percolated_network(node_id, true)?;
        let functions = SymbolicFunctions::new(&network)?;
        let graph = InfluenceGraph::new(&functions);

        let mut result = Vec::new();
        for component in graph.source_sccs() {
            result.push(self.component_subdiagram(&component, Some(node_id))?);
        }
        Ok(result)
    }

    /// Expand the succession diagram and search for attractors using the
    /// default methods.
    pub fn build(&mut self) -> Result<(), String> {
        self.expand_block(true, None, true)?;
        for node_id in self.node_ids() {
            self.node_attractor_seeds(node_id, true, false)?;
        }
        Ok(())
    }

    /// Expand the diagram using the source SCC decomposition method.
    pub fn expand_scc(&mut self, find_motif_avoidant_attractors: bool) -> Result<bool, String> {
        expansion::expand_source_sccs(self, find_motif_avoidant_attractors)
    }

    /// Expand the diagram using the source block decomposition method.
    ///
    /// With `find_motif_avoidant_attractors`, only blocks proven free of
    /// motif-avoidant attractors are expanded in isolation; as a byproduct,
    /// nodes proven clean have their attractor data resolved to "none".
    /// `optimize_source_nodes` fast-forwards source variables by fixing all of
    /// their combinations at once.
    pub fn expand_block(
        &mut self,
        find_motif_avoidant_attractors: bool,
        size_limit: Option<usize>,
        optimize_source_nodes: bool,
    ) -> Result<bool, String> {
        expansion::expand_source_blocks(
            self,
            find_motif_avoidant_attractors,
            size_limit,
            optimize_source_nodes,
        )
    }

    /// Explore the succession diagram in BFS order from `node_id` (default:
    /// root), expanding stubs along the way. Returns `false` if the level or
    /// size limit stopped the exploration early.
    pub fn expand_bfs(
        &mut self,
        node_id: Option<NodeId>,
        bfs_level_limit: Option<usize>,
        size_limit: Option<usize>,
    ) -> Result<bool, String> {
        expansion::expand_bfs(self, node_id, bfs_level_limit, size_limit)
    }

    /// As [SuccessionDiagram::expand_bfs], but in DFS order with an optional
    /// stack depth limit.
    pub fn expand_dfs(
        &mut self,
        node_id: Option<NodeId>,
        dfs_stack_limit: Option<usize>,
        size_limit: Option<usize>,
    ) -> Result<bool, String> {
        expansion::expand_dfs(self, node_id, dfs_stack_limit, size_limit)
    }

    /// Expand the diagram so that every minimal trap space is reachable from
    /// the root, while greedily avoiding unnecessary expansions. With
    /// `skip_ignored`, the nodes this procedure decides not to expand are
    /// turned into skip nodes.
    pub fn expand_minimal_spaces(
        &mut self,
        node_id: Option<NodeId>,
        size_limit: Option<usize>,
        skip_ignored: bool,
    ) -> Result<bool, String> {
        expansion::expand_minimal_spaces(self, node_id, size_limit, skip_ignored)
    }

    /// Expand the diagram so that for every attractor, the smallest trap space
    /// containing it is expanded. Attractor identification afterwards only
    /// needs to consider expanded nodes.
    pub fn expand_attractor_seeds(&mut self, size_limit: Option<usize>) -> Result<bool, String> {
        expansion::expand_attractor_seeds(self, size_limit)
    }

    /// BFS expansion restricted to nodes that intersect `target` without being
    /// contained in it. Ensures all succession paths relevant for the target
    /// are materialized.
    pub fn expand_to_target(
        &mut self,
        target: &BooleanSpace,
        size_limit: Option<usize>,
    ) -> Result<bool, String> {
        expansion::expand_to_target(self, target, size_limit)
    }

    /// A human-readable summary of the succession diagram and its computed
    /// attractors.
    pub fn summary(&self) -> String {
        let mut var_ordering: Vec<String> = self
            .network
            .variables()
            .map(|v| self.network.get_variable_name(v).clone())
            .collect();
        var_ordering.sort();

        let mut report = format!(
            "Succession Diagram with {} nodes and depth {}.\nState order: {}\n\nAttractors in diagram:\n\n",
            self.len(),
            self.depth(),
            var_ordering.join(", ")
        );
        for node_id in self.node_ids() {
            let Some(seeds) = &self.nodes[node_id].attractor_seeds else {
                continue;
            };
            if seeds.is_empty() {
                continue;
            }
            let space = &self.nodes[node_id].space;
            let prefix = if self.node_is_minimal(node_id) {
                "minimal trap space "
            } else {
                "motif avoidance in "
            };
            let space_str = space_to_binary_string(space, &var_ordering);
            report.push_str(&format!("{prefix}{space_str}\n"));
            for seed in seeds {
                let seed_str = space_to_binary_string(seed, &var_ordering);
                report.push_str(&format!("{}{seed_str}\n", ".".repeat(prefix.len())));
            }
            report.push('\n');
        }
        report.pop();
        report
    }

    /// Ensure the node given by (the percolation of) `stable_motif` exists,
    /// creating a stub if necessary, and add the parent edge if a parent is
    /// given. Returns the node id.
    pub(crate) fn ensure_node(
        &mut self,
        parent_id: Option<NodeId>,
        stable_motif: &BooleanSpace,
    ) -> Result<NodeId, String> {
        let fixed_vars = percolate_space(&self.functions, stable_motif);
        let key = space_unique_key(&fixed_vars, &self.network)?;

        let child_id = match self.node_indices.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.nodes.len();
                self.nodes.push(NodeData::stub(fixed_vars, parent_id));
                self.node_indices.insert(key, id);
                id
            }
        };

        if let Some(parent_id) = parent_id {
            self.ensure_edge(parent_id, child_id, stable_motif);
        }
        Ok(child_id)
    }

    /// Add the parent edge if it is missing (keeping the first recorded motif)
    /// and raise the child's depth if the new path is longer.
    pub(crate) fn ensure_edge(
        &mut self,
        parent_id: NodeId,
        child_id: NodeId,
        stable_motif: &BooleanSpace,
    ) {
        let exists = self.nodes[parent_id]
            .successors
            .iter()
            .any(|e| e.child == child_id);
        if !exists {
            self.nodes[parent_id].successors.push(SdEdge {
                child: child_id,
                motif: stable_motif.clone(),
            });
            self.nodes[child_id].predecessors.push(parent_id);
        }
        let candidate_depth = self.nodes[parent_id].depth + 1;
        if candidate_depth > self.nodes[child_id].depth {
            self.nodes[child_id].depth = candidate_depth;
        }
    }

    /// Expand a single node: compute the maximal trap spaces inside it and
    /// materialize the corresponding successor nodes.
    pub(crate) fn expand_one_node(&mut self, node_id: NodeId) -> Result<(), String> {
        if self.nodes[node_id].expanded {
            return Ok(());
        }

        // Any attractor data computed for the unexpanded node is now stale.
        let node = &mut self.nodes[node_id];
        node.attractor_candidates = None;
        node.attractor_seeds = None;
        node.attractor_sets = None;

        let current_space = self.nodes[node_id].space.clone();
        log::debug!(
            "[{node_id}] Expanding: {} fixed vars.",
            current_space.len()
        );

        if current_space.len() == self.network.num_vars() {
            // A fixed point; the trap space query would just return it again.
            log::debug!("[{node_id}] Found fixed-point.");
            self.nodes[node_id].expanded = true;
            return Ok(());
        }

        // We use the non-restricted Petri net at the root so that input values
        // are fixed jointly rather than percolated one by one.
        let source_nodes = if node_id == self.root() {
            self.petri_net.source_variables()
        } else {
            Vec::new()
        };

        let mut sub_spaces: Vec<BooleanSpace>;
        if let Some(petri_net) = self.nodes[node_id].percolated_petri_net.clone() {
            // A pre-restricted net is available, use it directly.
            let options = TrapSpaceOptions {
                optimize_source_variables: Some(source_nodes),
                solution_limit: Some(self.config.max_motifs_per_node),
                ..Default::default()
            };
            let partial =
                trap_spaces(&petri_net, TrapSpaceProblem::Max, &options, &self.config.solver)?;
            sub_spaces = partial
                .iter()
                .map(|s| extend_space(&current_space, s))
                .collect();
        } else {
            // Otherwise use the global net and let the solver restrict it.
            let options = TrapSpaceOptions {
                ensure_subspace: current_space.clone(),
                optimize_source_variables: Some(source_nodes),
                solution_limit: Some(self.config.max_motifs_per_node),
                ..Default::default()
            };
            sub_spaces = trap_spaces(
                &self.petri_net,
                TrapSpaceProblem::Max,
                &options,
                &self.config.solver,
            )?;
        }

        // Release the restricted Petri net; keeping one per node uses a lot of
        // memory in large diagrams, and it can be recomputed if needed.
        self.nodes[node_id].percolated_petri_net = None;

        if sub_spaces.len() == self.config.max_motifs_per_node {
            return Err(format!(
                "Exceeded the maximum amount of stable motifs per node ({}).",
                self.config.max_motifs_per_node
            ));
        }

        // Sort for determinism in case the solver enumeration order changes.
        let mut keyed: Vec<(BigUint, BooleanSpace)> = Vec::new();
        for space in sub_spaces.drain(..) {
            keyed.push((space_unique_key(&space, &self.network)?, space));
        }
        keyed.sort();
        let sub_spaces: Vec<BooleanSpace> = keyed.into_iter().map(|(_, s)| s).collect();

        if sub_spaces.is_empty() {
            log::debug!("[{node_id}] Found minimum trap space.");
            self.nodes[node_id].expanded = true;
            return Ok(());
        }

        log::debug!("[{node_id}] Found sub-spaces: {}.", sub_spaces.len());
        for sub_space in &sub_spaces {
            self.ensure_node(Some(node_id), sub_space)?;
        }
        self.nodes[node_id].expanded = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::space_from_values;

    // A positive toggle plus an independent oscillator.
    const MODEL_FLIP_FLOP: &str = "targets,factors\nA, B\nB, A\nC, !C\n";

    // One minimal trap space plus a motif-avoidant cycle among 000/010/100.
    const MODEL_MOTIF_AVOIDANT: &str =
        "targets,factors\nA, (!A & !B) | C\nB, (!A & !B) | C\nC, A & B\n";

    const MODEL_SUCCESSION: &str =
        "targets,factors\nS, S\nA, S | B\nB, A\nC, A | D\nD, C\nE, false\n";

    const MODEL_SOURCE_SCC: &str = "targets,factors\nsource1, source1\nsource2, source2\nA, B & source1\nB, A\nC, D & source2\nD, C\n";

    // The motif-avoidant component combined with a second one over X/Y/Z.
    const MODEL_BLOCKS: &str = "targets,factors\nA, (!A & !B) | C\nB, (!A & !B) | C\nC, A & B\nX, !Z | (X & Y & Z)\nY, !X | (X & Y & Z)\nZ, !Y | (X & Y & Z)\n";

    fn diagram(model: &str) -> SuccessionDiagram {
        let bn = BooleanNetwork::try_from_bnet(model).unwrap();
        SuccessionDiagram::new(&bn).unwrap()
    }

    fn total_attractors(sd: &mut SuccessionDiagram) -> usize {
        let mut total = 0;
        for node_id in sd.node_ids() {
            total += sd.node_attractor_seeds(node_id, true, false).unwrap().len();
        }
        total
    }

    #[test]
    fn test_flip_flop_diagram() {
        let mut sd = diagram(MODEL_FLIP_FLOP);
        assert_eq!(sd.len(), 1);

        assert!(sd.expand_bfs(None, None, None).unwrap());
        assert_eq!(sd.len(), 3);
        assert_eq!(sd.depth(), 1);
        assert_eq!(sd.node_successors(sd.root(), false).unwrap().len(), 2);
        assert_eq!(sd.minimal_trap_spaces().len(), 2);

        let mut minimal: Vec<BooleanSpace> = sd
            .minimal_trap_spaces()
            .into_iter()
            .map(|id| sd.node_data(id).space.clone())
            .collect();
        minimal.sort();
        assert_eq!(
            minimal,
            vec![
                space_from_values(&[("A", false), ("B", false)]),
                space_from_values(&[("A", true), ("B", true)]),
            ]
        );

        // No motif-avoidant attractors: the root has no attractor of its own.
        assert!(sd.node_attractor_seeds(sd.root(), true, false).unwrap().is_empty());
        assert_eq!(total_attractors(&mut sd), 2);
    }

    #[test]
    fn test_motif_avoidant_diagram() {
        let mut sd = diagram(MODEL_MOTIF_AVOIDANT);
        assert!(sd.expand_bfs(None, None, None).unwrap());
        assert_eq!(sd.len(), 2);
        assert_eq!(sd.depth(), 1);

        let minimal = sd.minimal_trap_spaces();
        assert_eq!(minimal.len(), 1);
        assert_eq!(
            sd.node_data(minimal[0]).space,
            space_from_values(&[("A", true), ("B", true), ("C", true)])
        );

        // One attractor in the minimal trap space, plus one motif-avoidant
        // attractor in the root.
        let root_seeds = sd.node_attractor_seeds(sd.root(), true, false).unwrap();
        assert_eq!(root_seeds.len(), 1);
        assert_eq!(total_attractors(&mut sd), 2);

        // The motif-avoidant attractor set covers the 000/010/100 cycle.
        let root_sets = sd.node_attractor_sets(sd.root(), true).unwrap();
        assert_eq!(root_sets.len(), 1);
        assert_eq!(root_sets[0].exact_cardinality(), 3u32.into());
    }

    #[test]
    fn test_source_scc_expansion() {
        let mut sd = diagram(MODEL_SOURCE_SCC);
        assert!(sd.expand_scc(true).unwrap());

        assert_eq!(sd.len(), 15);
        assert_eq!(sd.depth(), 3);
        assert_eq!(sd.minimal_trap_spaces().len(), 9);

        // All attractors are fixed points.
        let mut attractors = 0;
        for node_id in sd.node_ids() {
            let seeds = sd.node_attractor_seeds(node_id, true, false).unwrap();
            for seed in &seeds {
                assert_eq!(seed.len(), sd.network().num_vars());
                assert!(sd.node_is_minimal(sd.find_node(seed).unwrap()));
            }
            attractors += seeds.len();
        }
        assert_eq!(attractors, 9);
    }

    #[test]
    fn test_source_block_expansion() {
        let mut sd = diagram(MODEL_BLOCKS);
        assert!(sd.expand_block(true, None, true).unwrap());

        assert_eq!(sd.len(), 4);
        assert_eq!(sd.expanded_ids().len(), 4);
        assert_eq!(sd.depth(), 2);

        // One fixed point in the global minimal trap space and three
        // motif-avoidant attractors partitioned by block.
        assert_eq!(sd.minimal_trap_spaces().len(), 1);
        assert_eq!(total_attractors(&mut sd), 4);
    }

    #[test]
    fn test_minimal_spaces_expansion() {
        let mut sd = diagram(MODEL_SUCCESSION);
        assert!(sd.expand_minimal_spaces(None, None, false).unwrap());
        assert_eq!(sd.minimal_trap_spaces().len(), 4);

        // The greedy variant must reach the same minimal traps as full BFS.
        let mut full = diagram(MODEL_SUCCESSION);
        assert!(full.expand_bfs(None, None, None).unwrap());
        assert_eq!(full.minimal_trap_spaces().len(), 4);
        assert!(sd.is_subgraph(&full));
        assert!(sd.len() <= full.len());
    }

    #[test]
    fn test_minimal_spaces_with_skipping() {
        let mut sd = diagram(MODEL_SUCCESSION);
        assert!(sd.expand_minimal_spaces(None, None, true).unwrap());

        // Every node is either properly expanded or a skip node, and each
        // minimal trap space is present.
        assert!(sd.stub_ids().is_empty());
        assert_eq!(sd.minimal_trap_spaces().len(), 4);
    }

    #[test]
    fn test_skip_remaining() {
        let mut sd = diagram(MODEL_SUCCESSION);
        // Expand just the first level, then skip everything else.
        assert!(!sd.expand_bfs(None, Some(0), None).unwrap());
        let skipped = sd.skip_remaining().unwrap();
        assert!(skipped > 0);

        assert!(sd.stub_ids().is_empty());
        assert_eq!(sd.minimal_trap_spaces().len(), 4);
        for node_id in sd.node_ids() {
            if sd.node_data(node_id).skipped {
                assert!(!sd.node_is_minimal(node_id));
            }
        }
    }

    #[test]
    fn test_attractor_seeds_expansion() {
        let mut sd = diagram(MODEL_MOTIF_AVOIDANT);
        assert!(sd.expand_attractor_seeds(None).unwrap());

        // Every attractor now lives in an expanded node.
        let mut total = 0;
        for node_id in sd.expanded_ids() {
            total += sd.node_attractor_seeds(node_id, true, false).unwrap().len();
        }
        assert_eq!(total, 2);
    }

    #[test]
    fn test_empty_network() {
        let bn = BooleanNetwork::new(RegulatoryGraph::new(Vec::new()));
        let mut sd = SuccessionDiagram::new(&bn).unwrap();
        assert_eq!(sd.len(), 1);
        assert_eq!(sd.depth(), 0);

        assert!(sd.expand_bfs(None, None, None).unwrap());
        assert_eq!(sd.len(), 1);
        assert_eq!(sd.minimal_trap_spaces(), vec![0]);
    }

    #[test]
    fn test_constant_network() {
        let mut sd = diagram("targets,factors\nA, true\nB, false\n");
        assert!(sd.expand_bfs(None, None, None).unwrap());

        // The root percolates to a fixed point with no children.
        assert_eq!(sd.len(), 1);
        assert_eq!(sd.depth(), 0);
        assert_eq!(
            sd.node_data(sd.root()).space,
            space_from_values(&[("A", true), ("B", false)])
        );
        let seeds = sd.node_attractor_seeds(sd.root(), true, false).unwrap();
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn test_source_only_network() {
        let mut sd = diagram("targets,factors\nS, S\nT, T\n");
        assert!(sd.expand_block(true, None, true).unwrap());

        // Two inputs: four minimal traps after source fixing, no MAAs.
        assert_eq!(sd.minimal_trap_spaces().len(), 4);
        assert_eq!(total_attractors(&mut sd), 4);
        assert!(sd.node_attractor_seeds(sd.root(), false, false).unwrap().is_empty());
    }

    #[test]
    fn test_find_node_and_unique_keys() {
        let mut sd = diagram(MODEL_FLIP_FLOP);
        sd.expand_bfs(None, None, None).unwrap();

        let space = space_from_values(&[("A", true), ("B", true)]);
        let id = sd.find_node(&space).unwrap();
        assert_eq!(sd.node_data(id).space, space);

        assert!(sd.find_node(&space_from_values(&[("A", true)])).is_none());
        // A space of a different network has no node here.
        assert!(sd.find_node(&space_from_values(&[("X", true)])).is_none());
    }

    #[test]
    fn test_queries_on_missing_data() {
        let mut sd = diagram(MODEL_FLIP_FLOP);
        assert!(sd.node_successors(sd.root(), false).is_err());
        assert!(sd.node_attractor_candidates(sd.root(), false).is_err());
        assert!(sd.node_attractor_seeds(sd.root(), false, false).is_err());
        assert!(sd.node_attractor_sets(sd.root(), false).is_err());
        assert!(sd.node_percolated_nfvs(sd.root(), false).is_err());
    }

    #[test]
    fn test_subgraph_and_isomorphism() {
        let mut partial = diagram(MODEL_SUCCESSION);
        assert!(!partial.expand_bfs(None, Some(0), None).unwrap());
        let mut full = diagram(MODEL_SUCCESSION);
        assert!(full.expand_bfs(None, None, None).unwrap());

        // Reflexivity, partial-order behaviour, and symmetry of isomorphism.
        assert!(partial.is_subgraph(&partial));
        assert!(full.is_subgraph(&full));
        assert!(partial.is_subgraph(&full));
        assert!(!full.is_subgraph(&partial));

        let mut full_again = diagram(MODEL_SUCCESSION);
        full_again.expand_bfs(None, None, None).unwrap();
        assert!(full.is_isomorphic(&full_again));
        assert!(full_again.is_isomorphic(&full));
    }

    #[test]
    fn test_edge_stable_motif() {
        let mut sd = diagram(MODEL_SUCCESSION);
        sd.expand_bfs(None, Some(0), None).unwrap();

        let children = sd.node_successors(sd.root(), false).unwrap();
        let target = space_from_values(&[("E", false), ("S", false)]);
        let child = *children
            .iter()
            .find(|c| sd.node_data(**c).space == target)
            .unwrap();

        // The reduced motif drops the variables fixed in the root (here `E`).
        let motif = sd.edge_stable_motif(sd.root(), child, false).unwrap();
        let reduced = sd.edge_stable_motif(sd.root(), child, true).unwrap();
        assert_eq!(reduced, space_from_values(&[("S", false)]));
        assert!(crate::spaces::is_subspace(&motif, &reduced));
    }

    #[test]
    fn test_reclaim_node_data() {
        let mut sd = diagram(MODEL_FLIP_FLOP);
        sd.expand_bfs(None, None, None).unwrap();
        let root = sd.root();
        sd.node_percolated_nfvs(root, true).unwrap();
        sd.node_attractor_seeds(root, true, false).unwrap();

        sd.reclaim_node_data();
        assert!(sd.node_percolated_nfvs(root, false).is_err());
        // Seeds survive reclamation and answer candidate queries as well.
        assert!(sd.node_attractor_seeds(root, false, false).is_ok());
        assert!(sd.node_attractor_candidates(root, false).is_ok());
    }

    #[test]
    fn test_component_subdiagram() {
        let mut sd = diagram(MODEL_SOURCE_SCC);

        // At the root, the only source SCCs are the two inputs themselves
        // (`A/B` and `C/D` are regulated by them).
        let sub_sds = sd.source_scc_subdiagrams(None).unwrap();
        assert_eq!(sub_sds.len(), 2);
        for mut sub_sd in sub_sds {
            assert_eq!(sub_sd.network().num_vars(), 1);
            sub_sd.expand_bfs(None, None, None).unwrap();
            assert_eq!(sub_sd.minimal_trap_spaces().len(), 2);
        }

        // Once the inputs are fixed, `A/B` becomes a proper source SCC.
        let fixed = sd
            .ensure_node(
                None,
                &space_from_values(&[("source1", true), ("source2", true)]),
            )
            .unwrap();
        let sub_sds = sd.source_scc_subdiagrams(Some(fixed)).unwrap();
        assert_eq!(sub_sds.len(), 2);
        for sub_sd in &sub_sds {
            assert_eq!(sub_sd.network().num_vars(), 2);
        }

        // A component that is not backward-closed is rejected.
        assert!(sd.component_subdiagram(&["B".to_string()], None).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut sd = diagram(MODEL_FLIP_FLOP);
        sd.expand_bfs(None, None, None).unwrap();
        for node_id in sd.node_ids() {
            sd.node_attractor_seeds(node_id, true, false).unwrap();
        }
        sd.node_attractor_sets(sd.root(), true).unwrap();

        let snapshot = sd.snapshot().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: SuccessionDiagramSnapshot = serde_json::from_str(&json).unwrap();
        let restored = SuccessionDiagram::from_snapshot(&parsed).unwrap();

        assert_eq!(restored.len(), sd.len());
        assert_eq!(restored.depth(), sd.depth());
        assert!(restored.is_isomorphic(&sd));
        for node_id in sd.node_ids() {
            assert_eq!(
                restored.node_data(node_id).space,
                sd.node_data(node_id).space
            );
            assert_eq!(
                restored.node_data(node_id).attractor_seeds(),
                sd.node_data(node_id).attractor_seeds()
            );
        }
    }

    #[test]
    fn test_summary() {
        let mut sd = diagram(MODEL_FLIP_FLOP);
        sd.expand_bfs(None, None, None).unwrap();
        for node_id in sd.node_ids() {
            sd.node_attractor_seeds(node_id, true, false).unwrap();
        }
        let summary = sd.summary();
        assert!(summary.contains("Succession Diagram with 3 nodes and depth 1."));
        assert!(summary.contains("State order: A, B, C"));
        assert!(summary.contains("minimal trap space 00*"));
        assert!(summary.contains("minimal trap space 11*"));
    }
}

