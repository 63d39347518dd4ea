//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Options governing scheduler behavior.
///
/// Passed explicitly into the scheduler constructor; there is no ambient
/// configuration state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Exploit the commutation of control operands (and of CNOT targets)
    /// when building the dependence graph. Disabling forces pessimistic
    /// program-order dependences between commuting gates.
    pub commute: bool,
    /// Run the uniform bundle-balancing pass instead of a plain
    /// directional schedule.
    pub uniform: bool,
    /// Emit DOT graphs from the scheduling entry points.
    pub print_dot_graphs: bool,
}

impl SchedulerConfig {
    /// Create the default configuration: commutation on, uniform off,
    /// no DOT output.
    pub fn new() -> Self {
        Self {
            commute: true,
            uniform: false,
            print_dot_graphs: false,
        }
    }

    /// Set whether commutation is exploited.
    #[must_use]
    pub fn with_commute(mut self, commute: bool) -> Self {
        self.commute = commute;
        self
    }

    /// Set whether the uniform bundle balancer runs.
    #[must_use]
    pub fn with_uniform(mut self, uniform: bool) -> Self {
        self.uniform = uniform;
        self
    }

    /// Set whether DOT graphs are emitted.
    #[must_use]
    pub fn with_print_dot_graphs(mut self, print: bool) -> Self {
        self.print_dot_graphs = print;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
