//! Error types for the scheduler crate.

use alsvid_ir::Cycle;
use thiserror::Error;

/// Errors that can occur during scheduling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedError {
    /// The constructed dependence graph contains a cycle.
    ///
    /// A cyclic graph cannot be scheduled; this signals an internal
    /// inconsistency or a malformed gate stream.
    #[error("Dependence graph is not acyclic")]
    CyclicDependenceGraph,

    /// A controlled unitary has no access-mode assignment for its operand
    /// shape.
    #[error("Gate '{gate}' has no consistent access-mode assignment")]
    InconsistentCommutativity {
        /// Name of the refused gate.
        gate: String,
    },

    /// The scheduler stopped making progress: gates are available but
    /// the resource oracle never admits any of them.
    #[error(
        "No gate became schedulable for {stalled} cycles (at cycle {cycle}); \
         '{gate}' is starved of resources"
    )]
    ResourceStarvation {
        /// The most critical gate that was waiting when the guard fired.
        gate: String,
        /// The cycle the scheduler had advanced to.
        cycle: Cycle,
        /// Consecutive cycle advances without a selection.
        stalled: u64,
    },

    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] alsvid_ir::IrError),
}

/// Result type for scheduling operations.
pub type SchedResult<T> = Result<T, SchedError>;
