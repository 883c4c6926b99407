//! A library for analysing the long-term dynamics of asynchronous Boolean networks
//! through succession diagrams. As of now, the library supports:
//!  - Lazy construction of the succession diagram of nested maximal trap spaces,
//!    with several expansion strategies (BFS, DFS, minimal traps, attractor seeds,
//!    source SCC and source block decomposition, target-directed).
//!  - Trap space and fixed point enumeration through a Petri net siphon encoding,
//!    solved by a built-in ground solver or an external ASP system.
//!  - Attractor detection per diagram node: NFVS-guided candidate states, pruning
//!    through seeded stochastic simulation, and exact symbolic confirmation.
//!  - Permanent-intervention control: succession enumeration towards a target
//!    subspace and driver set search.
//!

pub mod attractors;
pub mod config;
pub mod control;
pub mod drivers;
pub mod expansion;
pub mod interaction_graph;
pub mod petri_net;
pub mod reachability;
pub mod spaces;
pub mod succession_diagram;
pub mod symbolic;
pub mod trappist;

pub use config::{SolverBackend, SuccessionDiagramConfig};
pub use spaces::BooleanSpace;
pub use succession_diagram::{NodeId, SuccessionDiagram};
