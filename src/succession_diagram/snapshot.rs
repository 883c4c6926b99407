//! Snapshot/restore support for succession diagrams.
//!
//! The snapshot holds the network rules as text, the Petri net, the NFVS, the
//! whole DAG with per-node data (symbolic attractor sets are stored as BDD
//! strings), the unique-key index and the configuration. It serializes
//! through `serde` and can be stored inside a zip archive together with the
//! model file.

use crate::config::SuccessionDiagramConfig;
use crate::petri_net::{PetriNet, network_to_petri_net};
use crate::spaces::{BooleanSpace, network_to_bnet};
use crate::succession_diagram::{NodeData, NodeId, SdEdge, SuccessionDiagram};
use crate::symbolic::SymbolicFunctions;

use biodivine_lib_bdd::Bdd;
use biodivine_lib_param_bn::BooleanNetwork;
use biodivine_lib_param_bn::symbolic_async_graph::{GraphColoredVertices, SymbolicAsyncGraph};
use num_bigint::BigUint;
use num_traits::Num;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Serializable image of one node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub space: BooleanSpace,
    pub depth: usize,
    pub expanded: bool,
    pub skipped: bool,
    pub parent_node: Option<NodeId>,
    /// `(child id, stable motif)` pairs in edge creation order.
    pub successors: Vec<(NodeId, BooleanSpace)>,
    pub percolated_network_rules: Option<String>,
    pub percolated_petri_net: Option<PetriNet>,
    pub percolated_nfvs: Option<Vec<String>>,
    pub attractor_candidates: Option<Vec<BooleanSpace>>,
    pub attractor_seeds: Option<Vec<BooleanSpace>>,
    /// Attractor sets as serialized BDD strings.
    pub attractor_sets: Option<Vec<String>>,
}

/// Serializable image of a whole succession diagram.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuccessionDiagramSnapshot {
    /// The network rules in the `.bnet` format.
    pub network_rules: String,
    pub petri_net: PetriNet,
    pub nfvs: Option<Vec<String>>,
    pub nodes: Vec<NodeSnapshot>,
    /// Unique subspace keys (hexadecimal) and their node ids.
    pub node_indices: Vec<(String, NodeId)>,
    pub config: SuccessionDiagramConfig,
}

impl SuccessionDiagram {
    /// Create a serializable snapshot of this succession diagram.
    pub fn snapshot(&self) -> Result<SuccessionDiagramSnapshot, String> {
        let mut nodes: Vec<NodeSnapshot> = Vec::new();
        for node in &self.nodes {
            let percolated_network_rules = match &node.percolated_network {
                Some(network) if network.num_vars() > 0 => Some(network_to_bnet(network)?),
                _ => None,
            };
            let attractor_sets = match &node.attractor_sets {
                Some(sets) => {
                    let mut strings = Vec::new();
                    for set in sets {
                        strings.push(bdd_to_string(set.as_bdd())?);
                    }
                    Some(strings)
                }
                None => None,
            };
            nodes.push(NodeSnapshot {
                space: node.space.clone(),
                depth: node.depth,
                expanded: node.expanded,
                skipped: node.skipped,
                parent_node: node.parent_node,
                successors: node
                    .successors
                    .iter()
                    .map(|e| (e.child, e.motif.clone()))
                    .collect(),
                percolated_network_rules,
                percolated_petri_net: node.percolated_petri_net.clone(),
                percolated_nfvs: node.percolated_nfvs.clone(),
                attractor_candidates: node.attractor_candidates.clone(),
                attractor_seeds: node.attractor_seeds.clone(),
                attractor_sets,
            });
        }

        let mut node_indices: Vec<(String, NodeId)> = self
            .node_indices
            .iter()
            .map(|(key, id)| (format!("{key:x}"), *id))
            .collect();
        node_indices.sort();

        Ok(SuccessionDiagramSnapshot {
            network_rules: network_to_bnet(&self.network)?,
            petri_net: self.petri_net.clone(),
            nfvs: self.nfvs.clone(),
            nodes,
            node_indices,
            config: self.config.clone(),
        })
    }

    /// Restore a succession diagram from a snapshot.
    pub fn from_snapshot(snapshot: &SuccessionDiagramSnapshot) -> Result<SuccessionDiagram, String> {
        let network = BooleanNetwork::try_from_bnet(snapshot.network_rules.as_str())?;
        let functions = SymbolicFunctions::new(&network)?;
        let graph = SymbolicAsyncGraph::new(&network)?;
        // Consistency check: the stored net must match the stored rules.
        let petri_net = network_to_petri_net(&network, &functions)?;
        if petri_net != snapshot.petri_net {
            return Err("Snapshot Petri net does not match the network rules.".to_string());
        }

        let mut nodes: Vec<NodeData> = Vec::new();
        for node in &snapshot.nodes {
            let percolated_network = match &node.percolated_network_rules {
                Some(rules) => Some(BooleanNetwork::try_from_bnet(rules.as_str())?),
                None => None,
            };
            let attractor_sets = match &node.attractor_sets {
                Some(strings) => {
                    let mut sets = Vec::new();
                    for string in strings {
                        let bdd = Bdd::from_string(string.as_str());
                        sets.push(GraphColoredVertices::new(bdd, graph.symbolic_context()));
                    }
                    Some(sets)
                }
                None => None,
            };
            nodes.push(NodeData {
                space: node.space.clone(),
                depth: node.depth,
                expanded: node.expanded,
                skipped: node.skipped,
                parent_node: node.parent_node,
                successors: node
                    .successors
                    .iter()
                    .map(|(child, motif)| SdEdge {
                        child: *child,
                        motif: motif.clone(),
                    })
                    .collect(),
                predecessors: Vec::new(),
                percolated_network,
                percolated_petri_net: node.percolated_petri_net.clone(),
                percolated_nfvs: node.percolated_nfvs.clone(),
                attractor_candidates: node.attractor_candidates.clone(),
                attractor_seeds: node.attractor_seeds.clone(),
                attractor_sets,
            });
        }

        // Rebuild the reverse edges.
        let mut predecessors: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
        for (id, node) in nodes.iter().enumerate() {
            for edge in &node.successors {
                predecessors[edge.child].push(id);
            }
        }
        for (id, preds) in predecessors.into_iter().enumerate() {
            nodes[id].predecessors = preds;
        }

        let mut node_indices: HashMap<BigUint, NodeId> = HashMap::new();
        for (key, id) in &snapshot.node_indices {
            let key = BigUint::from_str_radix(key, 16)
                .map_err(|e| format!("Invalid node key `{key}`: {e}"))?;
            node_indices.insert(key, *id);
        }

        Ok(SuccessionDiagram {
            network,
            functions,
            graph,
            petri_net,
            nfvs: snapshot.nfvs.clone(),
            nodes,
            node_indices,
            config: snapshot.config.clone(),
        })
    }

    /// Write the snapshot into a zip archive containing the model file and the
    /// diagram state as JSON.
    pub fn save_snapshot(&self, archive_path: &str) -> Result<(), String> {
        let snapshot = self.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;

        let archive = File::create(Path::new(archive_path)).map_err(|e| e.to_string())?;
        let mut zip_writer = ZipWriter::new(archive);
        zip_writer
            .start_file("model.bnet", FileOptions::default())
            .map_err(|e| e.to_string())?;
        zip_writer
            .write_all(snapshot.network_rules.as_bytes())
            .map_err(|e| e.to_string())?;
        zip_writer
            .start_file("succession_diagram.json", FileOptions::default())
            .map_err(|e| e.to_string())?;
        zip_writer
            .write_all(json.as_bytes())
            .map_err(|e| e.to_string())?;
        zip_writer.finish().map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Restore a succession diagram from an archive created by
    /// [SuccessionDiagram::save_snapshot].
    pub fn load_snapshot(archive_path: &str) -> Result<SuccessionDiagram, String> {
        let archive_file = File::open(archive_path).map_err(|e| e.to_string())?;
        let mut archive = ZipArchive::new(archive_file).map_err(|e| e.to_string())?;
        let mut json = String::new();
        archive
            .by_name("succession_diagram.json")
            .map_err(|e| e.to_string())?
            .read_to_string(&mut json)
            .map_err(|e| e.to_string())?;
        let snapshot: SuccessionDiagramSnapshot =
            serde_json::from_str(json.as_str()).map_err(|e| e.to_string())?;
        SuccessionDiagram::from_snapshot(&snapshot)
    }
}

fn bdd_to_string(bdd: &Bdd) -> Result<String, String> {
    let mut buffer: Vec<u8> = Vec::new();
    bdd.write_as_string(&mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
