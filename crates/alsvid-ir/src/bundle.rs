//! Bundle formation: grouping scheduled gates by start cycle.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::error::{IrError, IrResult};
use crate::gate::Cycle;
use crate::platform::Platform;

/// A set of gates that start in the same cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// The cycle every gate in the bundle starts in.
    pub start_cycle: Cycle,
    /// Cycles until the slowest gate of the bundle completes.
    pub duration_in_cycles: Cycle,
    /// Indices into the circuit's gate list, in circuit order.
    pub gates: Vec<usize>,
}

/// Group a scheduled circuit's gates into bundles, ordered by start cycle.
///
/// Requires a completed schedule (`cycles_valid`); every gate must carry
/// a cycle.
pub fn bundles(circuit: &Circuit, platform: &Platform) -> IrResult<Vec<Bundle>> {
    if !circuit.cycles_valid() {
        return Err(IrError::CyclesNotValid);
    }

    let mut by_cycle: FxHashMap<Cycle, Vec<usize>> = FxHashMap::default();
    for (i, gate) in circuit.gates().iter().enumerate() {
        let cycle = gate.cycle.ok_or(IrError::CyclesNotValid)?;
        by_cycle.entry(cycle).or_default().push(i);
    }

    let mut cycles: Vec<Cycle> = by_cycle.keys().copied().collect();
    cycles.sort_unstable();

    let gates = circuit.gates();
    Ok(cycles
        .into_iter()
        .map(|start_cycle| {
            let members = by_cycle.remove(&start_cycle).unwrap_or_default();
            let duration_in_cycles = members
                .iter()
                .map(|&i| platform.duration_in_cycles(gates[i].duration))
                .max()
                .unwrap_or(0);
            Bundle {
                start_cycle,
                duration_in_cycles,
                gates: members,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubit::QubitId;

    #[test]
    fn test_bundles_require_valid_cycles() {
        let mut c = Circuit::new("t", 1, 0);
        c.h(QubitId(0)).unwrap();
        let p = Platform::new(1, 1);
        assert!(matches!(bundles(&c, &p), Err(IrError::CyclesNotValid)));
    }

    #[test]
    fn test_bundles_group_by_cycle() {
        let mut c = Circuit::new("t", 3, 0);
        c.h(QubitId(0)).unwrap().h(QubitId(1)).unwrap().h(QubitId(2)).unwrap();
        c.gates_mut()[0].cycle = Some(1);
        c.gates_mut()[1].cycle = Some(1);
        c.gates_mut()[2].cycle = Some(2);
        c.mark_cycles_valid();

        let p = Platform::new(3, 1);
        let bs = bundles(&c, &p).unwrap();
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[0].start_cycle, 1);
        assert_eq!(bs[0].gates, vec![0, 1]);
        assert_eq!(bs[1].start_cycle, 2);
        assert_eq!(bs[1].gates, vec![2]);
    }

    #[test]
    fn test_bundle_duration_is_slowest_member() {
        let mut c = Circuit::new("t", 2, 0);
        c.push(crate::gate::Gate::generic("h", [QubitId(0)], 20)).unwrap();
        c.push(crate::gate::Gate::generic("x", [QubitId(1)], 45)).unwrap();
        c.gates_mut()[0].cycle = Some(1);
        c.gates_mut()[1].cycle = Some(1);
        c.mark_cycles_valid();

        let p = Platform::new(2, 20);
        let bs = bundles(&c, &p).unwrap();
        assert_eq!(bs.len(), 1);
        assert_eq!(bs[0].duration_in_cycles, 3); // ceil(45 / 20)
    }
}
