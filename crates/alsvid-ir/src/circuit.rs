//! Straight-line circuit container with a validating builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{Cycle, Gate, GateKind};
use crate::qubit::{CregId, QubitId};

/// A straight-line sequence of gates over a fixed set of qubits and
/// classical registers.
///
/// The circuit is the region the scheduler works on: no branches, no
/// loops, gates in program order until a scheduler re-orders them into
/// cycle order. Builder helpers validate operand ranges up front so the
/// scheduler can trust every operand index it sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubits addressable by gates in this circuit.
    qubit_count: u32,
    /// Number of classical registers addressable by gates in this circuit.
    creg_count: u32,
    /// The gates, in program order (or cycle order after scheduling).
    gates: Vec<Gate>,
    /// Duration in time units given to gates added through the helpers.
    default_gate_duration: u64,
    /// Whether the gates' cycle attributes reflect a completed schedule.
    cycles_valid: bool,
}

impl Circuit {
    /// Create an empty circuit over the given register space.
    pub fn new(name: impl Into<String>, qubit_count: u32, creg_count: u32) -> Self {
        Self {
            name: name.into(),
            qubit_count,
            creg_count,
            gates: vec![],
            default_gate_duration: 1,
            cycles_valid: false,
        }
    }

    /// Set the duration used by the gate helpers, in time units.
    #[must_use]
    pub fn with_default_gate_duration(mut self, duration: u64) -> Self {
        self.default_gate_duration = duration;
        self
    }

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    #[inline]
    pub fn qubit_count(&self) -> u32 {
        self.qubit_count
    }

    /// Get the number of classical registers.
    #[inline]
    pub fn creg_count(&self) -> u32 {
        self.creg_count
    }

    /// Width of the combined qubit + classical register index space.
    #[inline]
    pub fn operand_count(&self) -> u32 {
        self.qubit_count + self.creg_count
    }

    /// Get the gates in their current order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Get mutable access to the gates.
    ///
    /// Any mutation invalidates previously assigned cycles.
    pub fn gates_mut(&mut self) -> &mut [Gate] {
        self.cycles_valid = false;
        &mut self.gates
    }

    /// Number of gates in the circuit.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if the circuit has no gates.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Whether the gates' cycle attributes reflect a completed schedule.
    pub fn cycles_valid(&self) -> bool {
        self.cycles_valid
    }

    /// Mark the cycle attributes as the result of a completed schedule.
    ///
    /// Called by schedulers after assigning every gate a cycle.
    pub fn mark_cycles_valid(&mut self) {
        self.cycles_valid = true;
    }

    /// The largest assigned start cycle, if any gate is scheduled.
    pub fn max_cycle(&self) -> Option<Cycle> {
        self.gates.iter().filter_map(|g| g.cycle).max()
    }

    /// Append a gate after validating its operands.
    pub fn push(&mut self, gate: Gate) -> IrResult<&mut Self> {
        self.validate(&gate)?;
        self.cycles_valid = false;
        self.gates.push(gate);
        Ok(self)
    }

    /// Apply a named single-qubit gate.
    pub fn gate1(&mut self, name: impl Into<String>, qubit: QubitId) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::generic(name, [qubit], d))
    }

    /// Apply a Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate1("h", qubit)
    }

    /// Apply a Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate1("x", qubit)
    }

    /// Apply a Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate1("y", qubit)
    }

    /// Apply a Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.gate1("z", qubit)
    }

    /// Apply a CNOT gate.
    pub fn cnot(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::cnot(control, target, d))
    }

    /// Apply a CZ gate.
    pub fn cz(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::cz(q1, q2, d))
    }

    /// Apply a controlled-phase gate.
    pub fn cphase(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::cphase(q1, q2, d))
    }

    /// Measure a qubit into a classical register.
    pub fn measure(&mut self, qubit: QubitId, creg: CregId) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::measure(qubit, creg, d))
    }

    /// Apply a classical operation on registers.
    pub fn classical(
        &mut self,
        op: impl Into<String>,
        cregs: impl IntoIterator<Item = CregId>,
    ) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::classical(op, cregs, d))
    }

    /// Insert a display barrier.
    pub fn display(&mut self) -> IrResult<&mut Self> {
        let d = self.default_gate_duration;
        self.push(Gate::display(d))
    }

    /// Insert an explicit wait on the given qubits.
    pub fn wait(
        &mut self,
        qubits: impl IntoIterator<Item = QubitId>,
        duration: u64,
    ) -> IrResult<&mut Self> {
        self.push(Gate::wait(qubits, duration))
    }

    /// Stable-sort the gates by assigned cycle, ascending.
    ///
    /// Unscheduled gates order after all scheduled ones. Gates sharing a
    /// cycle keep their relative program order.
    pub fn sort_by_cycle(&mut self) {
        self.gates
            .sort_by_key(|g| g.cycle.unwrap_or(Cycle::MAX));
    }

    fn validate(&self, gate: &Gate) -> IrResult<()> {
        let gate_name = || Some(gate.name().to_string());

        // Fixed-arity gates must carry exactly their operand count.
        if let GateKind::CNot | GateKind::CZ | GateKind::CPhase = gate.kind {
            if gate.qubits.len() != 2 {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: 2,
                    got: gate.qubits.len() as u32,
                });
            }
        }

        for &qubit in &gate.qubits {
            if qubit.0 >= self.qubit_count {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name(),
                });
            }
        }
        for &creg in &gate.cregs {
            if creg.0 >= self.creg_count {
                return Err(IrError::CregNotFound {
                    creg,
                    gate_name: gate_name(),
                });
            }
        }

        // A gate may not use the same qubit twice.
        for (i, &qubit) in gate.qubits.iter().enumerate() {
            if gate.qubits[..i].contains(&qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name(),
                });
            }
        }

        Ok(())
    }
}
