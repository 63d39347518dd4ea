//! Operand index space and per-gate access modes.
//!
//! Qubits and classical registers share one flat index space so the
//! dependence-graph bookkeeping is a plain vector per operand. Each gate
//! kind assigns one of three access modes to each of its operands; the
//! third mode, [`AccessMode::ControlTarget`], is what lets the graph
//! express that CNOT targets commute with each other while still
//! ordering against reads and writes.

use serde::{Deserialize, Serialize};
use std::fmt;

use alsvid_ir::{CregId, Gate, GateKind, QubitId};

use crate::error::SchedResult;
#[cfg(feature = "controlled-unitaries")]
use crate::error::SchedError;

/// Flat operand index unifying qubits and classical registers.
///
/// The first `qubit_count` indices are qubits; classical registers
/// follow at `qubit_count + creg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperandIndex(pub u32);

impl OperandIndex {
    /// Index of a qubit operand.
    #[inline]
    pub fn qubit(qubit: QubitId) -> Self {
        Self(qubit.0)
    }

    /// Index of a classical register operand.
    #[inline]
    pub fn creg(creg: CregId, qubit_count: u32) -> Self {
        Self(qubit_count + creg.0)
    }

    /// The flat index as a usize, for vector addressing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OperandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Flat diagnostic label; classical registers print with their
        // offset index.
        write!(f, "q{}", self.0)
    }
}

/// How a gate accesses one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// The operand is read; reads of one operand commute with each other.
    Read,
    /// The operand is written; writes order against everything.
    Write,
    /// CNOT-target access: behaves as a write toward reads and as a read
    /// toward other control-targets of the same operand.
    ControlTarget,
}

/// Per-operand access events of one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// The listed operands, each with its access mode.
    Operands(Vec<(OperandIndex, AccessMode)>),
    /// Write on the entire operand index space (global barrier).
    Barrier,
}

/// Determine the access-mode signature of a gate.
///
/// The rules, in the order tested:
/// - `Measure`: every qubit and classical operand is written.
/// - `Display`: barrier over the whole index space.
/// - `Classical`: every classical operand is written; no qubit events.
/// - `CNot`: control is read, target is control-target.
/// - `CZ` / `CPhase`: both qubits are read.
/// - `Controlled` (with the `controlled-unitaries` feature): controls
///   are read, the last operand is written.
/// - Everything else (`Generic`, `Wait`, `Dummy`, malformed arities):
///   every operand is written.
pub fn signature(gate: &Gate, qubit_count: u32) -> SchedResult<Signature> {
    let qubit_ops = |gate: &Gate| {
        gate.qubits
            .iter()
            .map(|&q| OperandIndex::qubit(q))
            .collect::<Vec<_>>()
    };
    let creg_ops = |gate: &Gate| {
        gate.cregs
            .iter()
            .map(|&c| OperandIndex::creg(c, qubit_count))
            .collect::<Vec<_>>()
    };
    let all_write = |gate: &Gate| {
        let mut ops: Vec<(OperandIndex, AccessMode)> = qubit_ops(gate)
            .into_iter()
            .map(|op| (op, AccessMode::Write))
            .collect();
        ops.extend(creg_ops(gate).into_iter().map(|op| (op, AccessMode::Write)));
        Signature::Operands(ops)
    };

    let sig = match &gate.kind {
        GateKind::Measure => all_write(gate),
        GateKind::Display => Signature::Barrier,
        GateKind::Classical { .. } => Signature::Operands(
            creg_ops(gate)
                .into_iter()
                .map(|op| (op, AccessMode::Write))
                .collect(),
        ),
        GateKind::CNot => match gate.qubits.as_slice() {
            &[control, target] => Signature::Operands(vec![
                (OperandIndex::qubit(control), AccessMode::Read),
                (OperandIndex::qubit(target), AccessMode::ControlTarget),
            ]),
            // Malformed arity: fall back to the pessimistic row.
            _ => all_write(gate),
        },
        GateKind::CZ | GateKind::CPhase => Signature::Operands(
            qubit_ops(gate)
                .into_iter()
                .map(|op| (op, AccessMode::Read))
                .collect(),
        ),
        #[cfg(feature = "controlled-unitaries")]
        GateKind::Controlled { name } => {
            // The Read-on-controls row is only sound with at least one
            // control and one target operand.
            if gate.qubits.len() < 2 {
                return Err(SchedError::InconsistentCommutativity { gate: name.clone() });
            }
            let ops = qubit_ops(gate);
            let last = ops.len() - 1;
            Signature::Operands(
                ops.into_iter()
                    .enumerate()
                    .map(|(i, op)| {
                        let mode = if i == last { AccessMode::Write } else { AccessMode::Read };
                        (op, mode)
                    })
                    .collect(),
            )
        }
        #[cfg(not(feature = "controlled-unitaries"))]
        GateKind::Controlled { .. } => all_write(gate),
        GateKind::Generic { .. } | GateKind::Wait | GateKind::Dummy => all_write(gate),
    };
    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::Gate;

    fn modes(sig: &Signature) -> Vec<(u32, AccessMode)> {
        match sig {
            Signature::Operands(ops) => ops.iter().map(|&(op, m)| (op.0, m)).collect(),
            Signature::Barrier => panic!("expected operand list"),
        }
    }

    #[test]
    fn test_flat_index_space() {
        assert_eq!(OperandIndex::qubit(QubitId(3)).0, 3);
        assert_eq!(OperandIndex::creg(CregId(1), 5).0, 6);
    }

    #[test]
    fn test_measure_writes_qubit_and_creg() {
        let g = Gate::measure(QubitId(1), CregId(0), 1);
        let sig = signature(&g, 3).unwrap();
        assert_eq!(
            modes(&sig),
            vec![(1, AccessMode::Write), (3, AccessMode::Write)]
        );
    }

    #[test]
    fn test_display_is_barrier() {
        let g = Gate::display(1);
        assert_eq!(signature(&g, 3).unwrap(), Signature::Barrier);
    }

    #[test]
    fn test_classical_skips_qubits() {
        let g = Gate::classical("add", [CregId(2)], 1);
        let sig = signature(&g, 4).unwrap();
        assert_eq!(modes(&sig), vec![(6, AccessMode::Write)]);
    }

    #[test]
    fn test_cnot_control_reads_target_controltargets() {
        let g = Gate::cnot(QubitId(0), QubitId(2), 1);
        let sig = signature(&g, 3).unwrap();
        assert_eq!(
            modes(&sig),
            vec![(0, AccessMode::Read), (2, AccessMode::ControlTarget)]
        );
    }

    #[test]
    fn test_cz_reads_both() {
        let g = Gate::cz(QubitId(0), QubitId(1), 1);
        let sig = signature(&g, 2).unwrap();
        assert_eq!(
            modes(&sig),
            vec![(0, AccessMode::Read), (1, AccessMode::Read)]
        );
    }

    #[test]
    fn test_generic_writes_everything() {
        let g = Gate::generic("h", [QubitId(1)], 1);
        let sig = signature(&g, 2).unwrap();
        assert_eq!(modes(&sig), vec![(1, AccessMode::Write)]);
    }

    #[cfg(feature = "controlled-unitaries")]
    #[test]
    fn test_controlled_reads_controls_writes_target() {
        let g = Gate::controlled("cu", [QubitId(0), QubitId(1), QubitId(2)], 1);
        let sig = signature(&g, 3).unwrap();
        assert_eq!(
            modes(&sig),
            vec![
                (0, AccessMode::Read),
                (1, AccessMode::Read),
                (2, AccessMode::Write)
            ]
        );
    }

    #[cfg(feature = "controlled-unitaries")]
    #[test]
    fn test_controlled_needs_two_qubits() {
        let g = Gate::controlled("cu", [QubitId(0)], 1);
        assert!(matches!(
            signature(&g, 3),
            Err(crate::error::SchedError::InconsistentCommutativity { .. })
        ));
    }

    #[cfg(not(feature = "controlled-unitaries"))]
    #[test]
    fn test_controlled_defaults_to_writes() {
        let g = Gate::controlled("cu", [QubitId(0), QubitId(1)], 1);
        let sig = signature(&g, 2).unwrap();
        assert_eq!(
            modes(&sig),
            vec![(0, AccessMode::Write), (1, AccessMode::Write)]
        );
    }
}
