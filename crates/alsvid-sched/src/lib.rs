//! Alsvid Instruction Scheduler
//!
//! A cycle-accurate instruction scheduler for straight-line quantum
//! circuits on hardware with shared quantum and classical resources.
//! Every gate is assigned a non-negative integer start cycle satisfying
//! data hazards and, optionally, per-cycle resource availability; the
//! circuit is then reordered into cycle order.
//!
//! # Architecture
//!
//! ```text
//! Circuit (program order)
//!       │
//!       ▼
//! ┌──────────────┐   access modes per operand (Read / Write / ControlTarget)
//! │   DepGraph   │ ◄─ SOURCE/SINK brackets, arcs weighted in cycles
//! └──────────────┘
//!       │
//!       ├── set_cycle sweep        (unconstrained ASAP / ALAP)
//!       ├── list scheduler         (resource-constrained, deep-criticality order)
//!       └── uniform balancer       (ASAP pre-pass + backward bundle filling)
//!       │
//!       ▼
//! Circuit (cycle order, cycles_valid)
//! ```
//!
//! The third access mode, `ControlTarget`, is what distinguishes this
//! graph from a plain read/write hazard graph: control operands of
//! controlled gates commute with each other, and CNOT targets commute
//! with other CNOT targets, so chains of CNOTs sharing a control or a
//! target can schedule in parallel while still ordering against genuine
//! reads and writes.
//!
//! # Example
//!
//! ```rust
//! use alsvid_ir::{Circuit, Platform, QubitId};
//! use alsvid_sched::{schedule_circuit, Direction, SchedulerConfig};
//!
//! let mut circuit = Circuit::new("demo", 3, 0);
//! circuit.cnot(QubitId(0), QubitId(1)).unwrap();
//! circuit.cnot(QubitId(0), QubitId(2)).unwrap();
//!
//! let platform = Platform::new(3, 1);
//! let outcome = schedule_circuit(
//!     &mut circuit,
//!     &platform,
//!     &SchedulerConfig::default(),
//!     Direction::Forward,
//! )
//! .unwrap();
//!
//! // The CNOTs share only their control, so they start together.
//! assert_eq!(outcome.cycle_count, 1);
//! ```

pub mod access;
pub mod config;
pub mod critical;
mod dot;
pub mod error;
pub mod graph;
pub mod resources;
pub mod scheduler;

pub use access::{signature, AccessMode, OperandIndex, Signature};
pub use config::SchedulerConfig;
pub use critical::{AvailableList, Criticality};
pub use error::{SchedError, SchedResult};
pub use graph::{DepArc, DepGraph, DepKind, DepNode};
pub use resources::{QubitExclusiveResources, ResourceManager};
pub use scheduler::{Direction, Scheduler, ALAP_SINK_CYCLE};

use alsvid_ir::{Circuit, Cycle, Platform};

/// Summary of one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// The last cycle in which a gate starts.
    pub cycle_count: Cycle,
    /// Number of gates scheduled.
    pub gate_count: usize,
    /// DOT of the dependence graph, when `print_dot_graphs` is set.
    pub dependence_dot: Option<String>,
    /// DOT of the scheduled graph, when `print_dot_graphs` is set.
    pub schedule_dot: Option<String>,
}

/// Schedule a circuit without resource constraints.
///
/// Routes to the uniform balancer when `config.uniform` is set
/// (direction is then immaterial), otherwise to the plain ASAP or ALAP
/// sweep.
pub fn schedule_circuit(
    circuit: &mut Circuit,
    platform: &Platform,
    config: &SchedulerConfig,
    direction: Direction,
) -> SchedResult<ScheduleOutcome> {
    let mut scheduler = Scheduler::new(circuit, platform, config.clone())?;
    let dependence_dot = config
        .print_dot_graphs
        .then(|| scheduler.dependence_dot());

    if config.uniform {
        scheduler.schedule_uniform()?;
    } else {
        match direction {
            Direction::Forward => scheduler.schedule_asap()?,
            Direction::Backward => scheduler.schedule_alap()?,
        }
    }

    let schedule_dot = config.print_dot_graphs.then(|| scheduler.schedule_dot());
    Ok(ScheduleOutcome {
        cycle_count: scheduler.cycle_count(),
        gate_count: scheduler.gate_count(),
        dependence_dot,
        schedule_dot,
    })
}

/// Schedule a circuit against a resource oracle.
///
/// The oracle's direction must match the requested direction; the
/// uniform flag is ignored here, as balancing is defined on the
/// unconstrained schedule.
pub fn schedule_circuit_rc(
    circuit: &mut Circuit,
    platform: &Platform,
    config: &SchedulerConfig,
    direction: Direction,
    resources: &mut dyn ResourceManager,
) -> SchedResult<ScheduleOutcome> {
    let mut scheduler = Scheduler::new(circuit, platform, config.clone())?;
    let dependence_dot = config
        .print_dot_graphs
        .then(|| scheduler.dependence_dot());

    match direction {
        Direction::Forward => scheduler.schedule_asap_rc(resources)?,
        Direction::Backward => scheduler.schedule_alap_rc(resources)?,
    }

    let schedule_dot = config.print_dot_graphs.then(|| scheduler.schedule_dot());
    Ok(ScheduleOutcome {
        cycle_count: scheduler.cycle_count(),
        gate_count: scheduler.gate_count(),
        dependence_dot,
        schedule_dot,
    })
}
