//! Configuration of a succession diagram.

use serde::{Deserialize, Serialize};

/// Selects how the siphon logic programs are solved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverBackend {
    /// The built-in ground solver. Requires no external tooling.
    Ground,
    /// An external `clingo` process invoked through its command line interface.
    Clingo { binary: String },
}

/// "Global" configuration of a succession diagram.
///
/// Use [SuccessionDiagramConfig::default] for a configuration pre-populated
/// with default values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuccessionDiagramConfig {
    /// Print progress messages describing the running operations.
    ///
    /// The messages are emitted through the `log` crate; this flag is mainly
    /// honored by the CLI, which raises the logger level accordingly.
    pub debug: bool,

    /// Limit on the number of stable motifs explored for one node of a
    /// succession diagram. If the limit is exceeded during node expansion, the
    /// expansion fails and the node remains unexpanded.
    ///
    /// This limit is in place mainly to avoid surprising out-of-memory errors.
    pub max_motifs_per_node: usize,

    /// For networks larger than this threshold, only the unsigned FVS is
    /// computed instead of the negative FVS. This is still correct, but can
    /// produce a larger retained set.
    pub nfvs_size_threshold: usize,

    /// The reachability oracle is called through a command line and can only
    /// accept a limited number of arguments. Goals are clipped to this number
    /// of literals to stay below the argument limit.
    pub pint_goal_size_limit: usize,

    /// If more than this number of states is produced during attractor
    /// candidate detection, the process fails.
    pub attractor_candidates_limit: usize,

    /// If there are more than this number of attractor candidates, the
    /// detection process re-builds the retained set dynamically.
    pub retained_set_optimization_threshold: usize,

    /// The minimum number of simulation steps per network variable that is
    /// guaranteed to be spent on eliminating attractor candidate states.
    ///
    /// The budget applies to all candidates collectively, and only once
    /// simulation stops making progress.
    pub minimum_simulation_budget: usize,

    /// The back end used to enumerate trap spaces and fixed points.
    pub solver: SolverBackend,

    /// The binary of the optional external reachability oracle. When absent,
    /// oracle-based candidate pruning is unavailable.
    pub oracle_binary: Option<String>,
}

impl Default for SuccessionDiagramConfig {
    fn default() -> SuccessionDiagramConfig {
        SuccessionDiagramConfig {
            debug: false,
            max_motifs_per_node: 100_000,
            nfvs_size_threshold: 2_000,
            pint_goal_size_limit: 8_192,
            attractor_candidates_limit: 100_000,
            retained_set_optimization_threshold: 1_000,
            minimum_simulation_budget: 1_000,
            solver: SolverBackend::Ground,
            oracle_binary: None,
        }
    }
}
