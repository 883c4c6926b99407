//! Attractor identification inside succession diagram nodes.
//!
//! The pipeline first produces *candidate states* through the NFVS-guided
//! retained-set construction (pruned by repeated ASP queries, stochastic
//! simulation and optionally an external reachability oracle), and then
//! confirms them through exact symbolic reachability, yielding *seed states*
//! (one per attractor) and the full symbolic *attractor sets*.

mod candidates;
mod symbolic;

pub use candidates::{compute_attractor_candidates, make_heuristic_retained_set};
pub use symbolic::{
    compute_attractors_symbolic, symbolic_attractor_fallback, symbolic_attractor_test,
};
