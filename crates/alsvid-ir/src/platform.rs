//! Target platform description.

use serde::{Deserialize, Serialize};

use crate::gate::Cycle;

/// The platform attributes the scheduler depends on.
///
/// Gate durations are expressed in platform time units; `cycle_time` is
/// how many of those units make up one cycle. All rounding from
/// durations to cycles goes through [`duration_in_cycles`](Self::duration_in_cycles)
/// so every component rounds identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Number of qubits on the platform.
    pub qubit_number: u32,
    /// Time units per cycle. Must be positive.
    pub cycle_time: u64,
}

impl Platform {
    /// Create a new platform description.
    ///
    /// # Panics
    ///
    /// Panics if `cycle_time` is zero; a zero-length cycle has no meaning.
    pub fn new(qubit_number: u32, cycle_time: u64) -> Self {
        assert!(cycle_time > 0, "cycle_time must be positive");
        Self {
            qubit_number,
            cycle_time,
        }
    }

    /// Number of whole cycles a duration occupies, rounded up.
    #[inline]
    pub fn duration_in_cycles(&self, duration: u64) -> Cycle {
        duration.div_ceil(self.cycle_time)
    }
}
