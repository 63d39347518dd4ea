//! Resource oracle: the seam between the scheduler and a hardware model.

use alsvid_ir::{Cycle, Gate, Platform};

use crate::scheduler::Direction;

/// Answers whether a gate can start in a given cycle, given the
/// reservations made so far.
///
/// The scheduling direction is fixed when the oracle is constructed.
/// `available` must be idempotent within a cycle: the scheduler may
/// probe arbitrarily often before committing. `reserve` is called
/// exactly once per scheduled resource-bound gate, and its effects must
/// be visible to subsequent `available` calls on the same instance.
pub trait ResourceManager {
    /// The direction this oracle was constructed for.
    fn direction(&self) -> Direction;

    /// Whether `gate` can start in `cycle`.
    fn available(&self, cycle: Cycle, gate: &Gate) -> bool;

    /// Commit `gate` to start in `cycle`.
    fn reserve(&mut self, cycle: Cycle, gate: &Gate);
}

/// A resource model in which each qubit executes at most one gate at a
/// time.
///
/// Forward scheduling keeps a busy-until watermark per qubit: a gate may
/// start once every operand qubit's previous gate has completed.
/// Backward scheduling keeps the mirror busy-from watermark: a gate may
/// start if it completes before every operand qubit's next gate begins.
#[derive(Debug, Clone)]
pub struct QubitExclusiveResources {
    direction: Direction,
    cycle_time: u64,
    /// Forward: first free cycle per qubit. Backward: first occupied
    /// cycle per qubit.
    watermark: Vec<Cycle>,
}

impl QubitExclusiveResources {
    /// Create the oracle for a platform and direction.
    pub fn new(platform: &Platform, direction: Direction) -> Self {
        let initial = match direction {
            Direction::Forward => 0,
            Direction::Backward => Cycle::MAX,
        };
        Self {
            direction,
            cycle_time: platform.cycle_time,
            watermark: vec![initial; platform.qubit_number as usize],
        }
    }

    fn occupancy(&self, gate: &Gate) -> Cycle {
        gate.duration.div_ceil(self.cycle_time)
    }
}

impl ResourceManager for QubitExclusiveResources {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn available(&self, cycle: Cycle, gate: &Gate) -> bool {
        let occupancy = self.occupancy(gate);
        gate.qubits.iter().all(|&q| {
            let mark = self.watermark[q.0 as usize];
            match self.direction {
                Direction::Forward => cycle >= mark,
                Direction::Backward => cycle + occupancy <= mark,
            }
        })
    }

    fn reserve(&mut self, cycle: Cycle, gate: &Gate) {
        let occupancy = self.occupancy(gate);
        for &q in &gate.qubits {
            self.watermark[q.0 as usize] = match self.direction {
                Direction::Forward => cycle + occupancy,
                Direction::Backward => cycle,
            };
        }
    }
}
