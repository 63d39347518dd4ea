//! Gate records: the unit of work the scheduler assigns cycles to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::qubit::{CregId, QubitId};

/// Integer time step; the atomic execution unit of a schedule.
pub type Cycle = u64;

/// The kind of operation a gate performs.
///
/// The kind drives the scheduler's hazard analysis: it decides which
/// access mode each operand gets and whether the gate competes for
/// hardware resources at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    /// Projective measurement of qubits into classical registers.
    Measure,
    /// Display barrier: orders against every qubit and classical register.
    Display,
    /// Purely classical operation on classical registers.
    Classical {
        /// Operation mnemonic (`add`, `mov`, ...).
        op: String,
    },
    /// Controlled-NOT; the control commutes with other controls, the
    /// target with other CNOT targets.
    CNot,
    /// Controlled-Z (symmetric; both operands commute as controls).
    CZ,
    /// Controlled phase (same commutation behavior as CZ).
    CPhase,
    /// Generic controlled unitary: control qubits first, target last.
    Controlled {
        /// Gate name.
        name: String,
    },
    /// Any other quantum gate.
    Generic {
        /// Gate name.
        name: String,
    },
    /// Explicit wait on the listed qubits.
    Wait,
    /// Synthetic placeholder gate.
    Dummy,
}

impl GateKind {
    /// Get the name of this gate kind.
    pub fn name(&self) -> &str {
        match self {
            GateKind::Measure => "measure",
            GateKind::Display => "display",
            GateKind::Classical { op } => op,
            GateKind::CNot => "cnot",
            GateKind::CZ => "cz",
            GateKind::CPhase => "cphase",
            GateKind::Controlled { name } | GateKind::Generic { name } => name,
            GateKind::Wait => "wait",
            GateKind::Dummy => "dummy",
        }
    }
}

/// A gate with operands, duration, and the cycle slot the scheduler fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Qubit operands, in gate-significant order (e.g. control before target).
    pub qubits: Vec<QubitId>,
    /// Classical register operands.
    pub cregs: Vec<CregId>,
    /// Duration in platform time units (not cycles).
    pub duration: u64,
    /// Start cycle assigned by the scheduler; `None` until scheduled.
    pub cycle: Option<Cycle>,
}

impl Gate {
    /// Create a gate from raw parts.
    pub fn new(
        kind: GateKind,
        qubits: impl IntoIterator<Item = QubitId>,
        cregs: impl IntoIterator<Item = CregId>,
        duration: u64,
    ) -> Self {
        Self {
            kind,
            qubits: qubits.into_iter().collect(),
            cregs: cregs.into_iter().collect(),
            duration,
            cycle: None,
        }
    }

    /// Create a measurement of `qubit` into `creg`.
    pub fn measure(qubit: QubitId, creg: CregId, duration: u64) -> Self {
        Self::new(GateKind::Measure, [qubit], [creg], duration)
    }

    /// Create a display barrier (no explicit operands; orders everything).
    pub fn display(duration: u64) -> Self {
        Self::new(GateKind::Display, [], [], duration)
    }

    /// Create a classical operation on the given registers.
    pub fn classical(
        op: impl Into<String>,
        cregs: impl IntoIterator<Item = CregId>,
        duration: u64,
    ) -> Self {
        Self::new(GateKind::Classical { op: op.into() }, [], cregs, duration)
    }

    /// Create a CNOT with `control` and `target`.
    pub fn cnot(control: QubitId, target: QubitId, duration: u64) -> Self {
        Self::new(GateKind::CNot, [control, target], [], duration)
    }

    /// Create a CZ on two qubits.
    pub fn cz(q1: QubitId, q2: QubitId, duration: u64) -> Self {
        Self::new(GateKind::CZ, [q1, q2], [], duration)
    }

    /// Create a controlled-phase on two qubits.
    pub fn cphase(q1: QubitId, q2: QubitId, duration: u64) -> Self {
        Self::new(GateKind::CPhase, [q1, q2], [], duration)
    }

    /// Create a generic controlled unitary (controls first, target last).
    pub fn controlled(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        duration: u64,
    ) -> Self {
        Self::new(GateKind::Controlled { name: name.into() }, qubits, [], duration)
    }

    /// Create a generic quantum gate.
    pub fn generic(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        duration: u64,
    ) -> Self {
        Self::new(GateKind::Generic { name: name.into() }, qubits, [], duration)
    }

    /// Create a wait on the given qubits.
    pub fn wait(qubits: impl IntoIterator<Item = QubitId>, duration: u64) -> Self {
        Self::new(GateKind::Wait, qubits, [], duration)
    }

    /// Create a synthetic dummy gate.
    pub fn dummy(duration: u64) -> Self {
        Self::new(GateKind::Dummy, [], [], duration)
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, GateKind::Measure)
    }

    /// Check if this is a purely classical operation.
    pub fn is_classical(&self) -> bool {
        matches!(self.kind, GateKind::Classical { .. })
    }

    /// Check if this is a wait.
    pub fn is_wait(&self) -> bool {
        matches!(self.kind, GateKind::Wait)
    }

    /// Check if this is a synthetic dummy gate.
    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, GateKind::Dummy)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        let mut sep = " ";
        for q in &self.qubits {
            write!(f, "{sep}{q}")?;
            sep = ",";
        }
        for c in &self.cregs {
            write!(f, "{sep}{c}")?;
            sep = ",";
        }
        Ok(())
    }
}
