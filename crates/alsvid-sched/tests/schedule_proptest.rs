//! Property-based tests for schedule validity over random circuits.
//!
//! Random straight-line circuits must always schedule to valid,
//! idempotent cycle assignments, with or without commutation, in both
//! directions, and through the uniform balancer.

use alsvid_ir::{Circuit, CregId, Cycle, GateKind, Platform, QubitId};
use alsvid_sched::{
    schedule_circuit, schedule_circuit_rc, Direction, QubitExclusiveResources, SchedulerConfig,
};
use proptest::prelude::*;

const NUM_QUBITS: u32 = 4;
const NUM_CREGS: u32 = 2;

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    X(u32),
    CNot(u32, u32),
    CZ(u32, u32),
    Measure(u32, u32),
    Classical(u32),
    Wait(u32),
}

impl GateOp {
    fn apply(&self, circuit: &mut Circuit) {
        match *self {
            GateOp::H(q) => {
                circuit.h(QubitId(q)).unwrap();
            }
            GateOp::X(q) => {
                circuit.x(QubitId(q)).unwrap();
            }
            GateOp::CNot(c, t) => {
                circuit.cnot(QubitId(c), QubitId(t)).unwrap();
            }
            GateOp::CZ(a, b) => {
                circuit.cz(QubitId(a), QubitId(b)).unwrap();
            }
            GateOp::Measure(q, c) => {
                circuit.measure(QubitId(q), CregId(c)).unwrap();
            }
            GateOp::Classical(c) => {
                circuit.classical("add", [CregId(c)]).unwrap();
            }
            GateOp::Wait(q) => {
                circuit.wait([QubitId(q)], 2).unwrap();
            }
        }
    }
}

/// Generate two distinct qubit indices.
fn arb_qubit_pair() -> impl Strategy<Value = (u32, u32)> {
    (0..NUM_QUBITS, 1..NUM_QUBITS).prop_map(|(a, off)| (a, (a + off) % NUM_QUBITS))
}

fn arb_gate_op() -> impl Strategy<Value = GateOp> {
    prop_oneof![
        (0..NUM_QUBITS).prop_map(GateOp::H),
        (0..NUM_QUBITS).prop_map(GateOp::X),
        arb_qubit_pair().prop_map(|(c, t)| GateOp::CNot(c, t)),
        arb_qubit_pair().prop_map(|(a, b)| GateOp::CZ(a, b)),
        (0..NUM_QUBITS, 0..NUM_CREGS).prop_map(|(q, c)| GateOp::Measure(q, c)),
        (0..NUM_CREGS).prop_map(GateOp::Classical),
        (0..NUM_QUBITS).prop_map(GateOp::Wait),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<GateOp>> {
    prop::collection::vec(arb_gate_op(), 1..=16)
}

fn circuit_from(ops: &[GateOp]) -> Circuit {
    let mut circuit = Circuit::new("prop", NUM_QUBITS, NUM_CREGS);
    for op in ops {
        op.apply(&mut circuit);
    }
    circuit
}

fn platform() -> Platform {
    Platform::new(NUM_QUBITS, 1)
}

fn snapshot(circuit: &Circuit) -> Vec<(String, Option<Cycle>)> {
    circuit
        .gates()
        .iter()
        .map(|g| (g.to_string(), g.cycle))
        .collect()
}

proptest! {
    #[test]
    fn asap_schedules_are_valid_and_idempotent(ops in arb_ops()) {
        let mut circuit = circuit_from(&ops);
        let config = SchedulerConfig::default();
        let outcome =
            schedule_circuit(&mut circuit, &platform(), &config, Direction::Forward).unwrap();

        prop_assert!(circuit.cycles_valid());
        for gate in circuit.gates() {
            let cycle = gate.cycle.unwrap();
            prop_assert!(cycle >= 1);
            prop_assert!(cycle <= outcome.cycle_count);
        }

        let first = snapshot(&circuit);
        schedule_circuit(&mut circuit, &platform(), &config, Direction::Forward).unwrap();
        prop_assert_eq!(first, snapshot(&circuit));
    }

    #[test]
    fn commutation_flip_never_creates_a_cycle(ops in arb_ops()) {
        let config = SchedulerConfig::default().with_commute(false);
        let mut circuit = circuit_from(&ops);
        // Pessimistic ordering must still yield a schedulable DAG.
        schedule_circuit(&mut circuit, &platform(), &config, Direction::Forward).unwrap();
        prop_assert!(circuit.cycles_valid());
    }

    #[test]
    fn alap_depth_matches_asap_depth(ops in arb_ops()) {
        let mut asap = circuit_from(&ops);
        let mut alap = circuit_from(&ops);
        let config = SchedulerConfig::default();

        let fwd =
            schedule_circuit(&mut asap, &platform(), &config, Direction::Forward).unwrap();
        let bwd =
            schedule_circuit(&mut alap, &platform(), &config, Direction::Backward).unwrap();

        // Without resources both directions realize the critical path.
        prop_assert_eq!(fwd.cycle_count, bwd.cycle_count);
    }

    #[test]
    fn uniform_preserves_gate_count_and_depth(ops in arb_ops()) {
        let mut asap = circuit_from(&ops);
        let mut uniform = circuit_from(&ops);
        let gate_count = uniform.len();

        let plain = schedule_circuit(
            &mut asap,
            &platform(),
            &SchedulerConfig::default(),
            Direction::Forward,
        )
        .unwrap();
        let balanced = schedule_circuit(
            &mut uniform,
            &platform(),
            &SchedulerConfig::default().with_uniform(true),
            Direction::Forward,
        )
        .unwrap();

        prop_assert_eq!(balanced.gate_count, gate_count);
        prop_assert_eq!(uniform.len(), gate_count);
        prop_assert!(balanced.cycle_count <= plain.cycle_count);
    }

    #[test]
    fn rc_never_overlaps_a_qubit(ops in arb_ops()) {
        let mut circuit = circuit_from(&ops);
        let platform = platform();
        let mut rm = QubitExclusiveResources::new(&platform, Direction::Forward);

        schedule_circuit_rc(
            &mut circuit,
            &platform,
            &SchedulerConfig::default(),
            Direction::Forward,
            &mut rm,
        )
        .unwrap();

        // Resource-bound gates sharing a qubit must occupy disjoint
        // cycle windows.
        let bound: Vec<_> = circuit
            .gates()
            .iter()
            .filter(|g| {
                !matches!(
                    g.kind,
                    GateKind::Wait | GateKind::Classical { .. } | GateKind::Dummy
                )
            })
            .collect();
        for (i, a) in bound.iter().enumerate() {
            for b in &bound[i + 1..] {
                if a.qubits.iter().any(|q| b.qubits.contains(q)) {
                    let (ca, cb) = (a.cycle.unwrap(), b.cycle.unwrap());
                    let (da, db) = (a.duration, b.duration);
                    let disjoint = ca + da <= cb || cb + db <= ca;
                    prop_assert!(disjoint, "{} and {} overlap", a, b);
                }
            }
        }
    }
}
