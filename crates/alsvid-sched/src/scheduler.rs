//! Cycle assignment: unconstrained sweeps, the resource-constrained
//! critical-path list scheduler, and the uniform bundle balancer.

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

use alsvid_ir::{Circuit, Cycle, GateKind, Platform};

use crate::config::SchedulerConfig;
use crate::critical::{AvailableList, Criticality};
use crate::error::{SchedError, SchedResult};
use crate::graph::DepGraph;
use crate::resources::ResourceManager;

/// Scheduling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// As soon as possible: cycles grow from SOURCE at 0.
    Forward,
    /// As late as possible: cycles shrink from SINK at the sentinel,
    /// then shift so SOURCE lands at 0.
    Backward,
}

/// Sentinel start cycle for backward scheduling. Far above any legal
/// schedule, so every cycle stays non-negative until the final
/// SOURCE-relative shift.
pub const ALAP_SINK_CYCLE: Cycle = Cycle::MAX / 2;

/// Extra selection-free cycle advances tolerated beyond the longest
/// remaining path before the scheduler reports starvation.
const STARVATION_SLACK: u64 = 1024;

/// Schedules one straight-line region.
///
/// A scheduler instance owns the dependence graph of its region and
/// borrows the circuit for its whole life; distinct regions need
/// distinct instances. All entry points leave the circuit stably sorted
/// by cycle with `cycles_valid` set.
pub struct Scheduler<'c> {
    circuit: &'c mut Circuit,
    platform: Platform,
    config: SchedulerConfig,
    graph: DepGraph,
    /// Working cycle per node; written back to the gates at the end.
    cycle: Vec<Cycle>,
}

impl<'c> Scheduler<'c> {
    /// Build the dependence graph for the circuit and wrap it in a
    /// scheduler.
    pub fn new(
        circuit: &'c mut Circuit,
        platform: &Platform,
        config: SchedulerConfig,
    ) -> SchedResult<Self> {
        let graph = DepGraph::build(circuit, platform, &config)?;
        let cycle = vec![0; graph.node_count()];
        Ok(Self {
            circuit,
            platform: *platform,
            config,
            graph,
            cycle,
        })
    }

    /// The dependence graph of the region.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// The configuration in effect.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The working cycle of a node (meaningful after scheduling).
    #[inline]
    pub fn node_cycle(&self, node: NodeIndex) -> Cycle {
        self.cycle[node.index()]
    }

    /// The last cycle in which a gate starts: SINK's cycle minus one.
    pub fn cycle_count(&self) -> Cycle {
        self.cycle[self.graph.sink().index()].saturating_sub(1)
    }

    /// Number of gates in the region.
    pub fn gate_count(&self) -> usize {
        self.circuit.len()
    }

    // ------------------------------------------------------------------
    // Unconstrained scheduling
    // ------------------------------------------------------------------

    /// Schedule as soon as possible, ignoring resources.
    #[instrument(skip(self), fields(circuit = self.circuit.name()))]
    pub fn schedule_asap(&mut self) -> SchedResult<()> {
        info!("scheduling ASAP");
        self.set_cycle(Direction::Forward);
        self.apply_cycles();
        Ok(())
    }

    /// Schedule as late as possible, ignoring resources.
    #[instrument(skip(self), fields(circuit = self.circuit.name()))]
    pub fn schedule_alap(&mut self) -> SchedResult<()> {
        info!("scheduling ALAP");
        self.set_cycle(Direction::Backward);
        self.apply_cycles();
        Ok(())
    }

    /// Closed-form cycle assignment: one topological sweep in the given
    /// direction, plus the SOURCE-relative shift for backward runs.
    fn set_cycle(&mut self, direction: Direction) {
        let topo = self.graph.topo().to_vec();
        match direction {
            Direction::Forward => {
                for &node in &topo {
                    let implied = self.dependence_cycle(node, direction);
                    self.cycle[node.index()] = implied;
                }
            }
            Direction::Backward => {
                for &node in topo.iter().rev() {
                    let implied = self.dependence_cycle(node, direction);
                    self.cycle[node.index()] = implied;
                }
                self.shift_to_source();
            }
        }
    }

    /// The earliest (forward) or latest (backward) cycle a node's
    /// dependences allow, given the neighbor cycles assigned so far.
    fn dependence_cycle(&self, node: NodeIndex, direction: Direction) -> Cycle {
        match direction {
            Direction::Forward => self
                .graph
                .in_arcs(node)
                .map(|(pred, arc)| self.cycle[pred.index()] + arc.weight)
                .max()
                .unwrap_or(0),
            Direction::Backward => self
                .graph
                .out_arcs(node)
                .map(|(succ, arc)| self.cycle[succ.index()] - arc.weight)
                .min()
                .unwrap_or(ALAP_SINK_CYCLE),
        }
    }

    /// Normalize backward cycles so SOURCE sits at 0. Must be the last
    /// cycle mutation of a backward run.
    fn shift_to_source(&mut self) {
        let shift = self.cycle[self.graph.source().index()];
        for cycle in &mut self.cycle {
            *cycle -= shift;
        }
    }

    // ------------------------------------------------------------------
    // Resource-constrained scheduling
    // ------------------------------------------------------------------

    /// Schedule ASAP under resource constraints.
    pub fn schedule_asap_rc(&mut self, resources: &mut dyn ResourceManager) -> SchedResult<()> {
        self.schedule_rc(Direction::Forward, resources)
    }

    /// Schedule ALAP under resource constraints.
    pub fn schedule_alap_rc(&mut self, resources: &mut dyn ResourceManager) -> SchedResult<()> {
        self.schedule_rc(Direction::Backward, resources)
    }

    /// Critical-path list scheduling against a resource oracle.
    #[instrument(skip(self, resources), fields(circuit = self.circuit.name()))]
    fn schedule_rc(
        &mut self,
        direction: Direction,
        resources: &mut dyn ResourceManager,
    ) -> SchedResult<()> {
        debug_assert_eq!(
            resources.direction(),
            direction,
            "resource oracle direction does not match scheduling direction"
        );
        info!(?direction, "scheduling with resource constraints");

        let criticality = Criticality::compute(&self.graph, direction);
        let mut scheduled = vec![false; self.graph.node_count()];
        let mut available = AvailableList::new();

        let start = match direction {
            Direction::Forward => self.graph.source(),
            Direction::Backward => self.graph.sink(),
        };
        let mut current_cycle = match direction {
            Direction::Forward => 0,
            Direction::Backward => ALAP_SINK_CYCLE,
        };
        self.cycle[start.index()] = current_cycle;
        available.insert(start, &criticality, &self.graph, direction);

        // The longest remaining path bounds how long dependence waits can
        // last; the slack covers resource waits of any sane oracle.
        let stall_limit = criticality.remaining(start) + STARVATION_SLACK;
        let mut stalled: u64 = 0;

        while !available.is_empty() {
            let oracle: &dyn ResourceManager = resources;
            let selected = available
                .iter()
                .find(|&node| self.schedulable(node, direction, current_cycle, oracle));

            let Some(node) = selected else {
                stalled += 1;
                if stalled > stall_limit {
                    let head = available.front().unwrap_or(start);
                    return Err(SchedError::ResourceStarvation {
                        gate: self.graph.label(self.circuit, head),
                        cycle: current_cycle,
                        stalled,
                    });
                }
                // Let running gates complete for one more cycle and
                // resources free up.
                current_cycle = match direction {
                    Direction::Forward => current_cycle + 1,
                    Direction::Backward => current_cycle - 1,
                };
                continue;
            };

            stalled = 0;
            self.cycle[node.index()] = current_cycle;
            if !self.bypasses_resources(node) {
                resources.reserve(current_cycle, self.graph.gate(self.circuit, node));
            }
            debug!(
                gate = %self.graph.label(self.circuit, node),
                cycle = current_cycle,
                remaining = criticality.remaining(node),
                "committed"
            );
            scheduled[node.index()] = true;
            available.remove(node);
            self.release_neighbors(node, direction, &scheduled, &mut available, &criticality);
        }

        if direction == Direction::Backward {
            self.shift_to_source();
        }
        self.apply_cycles();
        Ok(())
    }

    /// Whether a node is both dependence-ready and resource-ready in the
    /// given cycle.
    fn schedulable(
        &self,
        node: NodeIndex,
        direction: Direction,
        current_cycle: Cycle,
        resources: &dyn ResourceManager,
    ) -> bool {
        let dependence_ready = match direction {
            Direction::Forward => self.cycle[node.index()] <= current_cycle,
            Direction::Backward => current_cycle <= self.cycle[node.index()],
        };
        if !dependence_ready {
            return false;
        }
        self.bypasses_resources(node)
            || resources.available(current_cycle, self.graph.gate(self.circuit, node))
    }

    /// Gates that never compete for hardware resources.
    fn bypasses_resources(&self, node: NodeIndex) -> bool {
        match self.graph.gate_index(node) {
            None => true, // SOURCE and SINK
            Some(i) => matches!(
                self.circuit.gates()[i].kind,
                GateKind::Dummy
                    | GateKind::Classical { .. }
                    | GateKind::Wait
                    | GateKind::Controlled { .. }
            ),
        }
    }

    /// After committing `node`, make every neighbor in the scheduling
    /// direction available whose counter-direction neighbors are all
    /// scheduled, stamping its dependence-implied cycle first.
    fn release_neighbors(
        &mut self,
        node: NodeIndex,
        direction: Direction,
        scheduled: &[bool],
        available: &mut AvailableList,
        criticality: &Criticality,
    ) {
        let neighbors: Vec<NodeIndex> = match direction {
            Direction::Forward => self.graph.out_arcs(node).map(|(succ, _)| succ).collect(),
            Direction::Backward => self.graph.in_arcs(node).map(|(pred, _)| pred).collect(),
        };
        for neighbor in neighbors {
            let ready = match direction {
                Direction::Forward => self
                    .graph
                    .in_arcs(neighbor)
                    .all(|(pred, _)| scheduled[pred.index()]),
                Direction::Backward => self
                    .graph
                    .out_arcs(neighbor)
                    .all(|(succ, _)| scheduled[succ.index()]),
            };
            if ready {
                let implied = self.dependence_cycle(neighbor, direction);
                self.cycle[neighbor.index()] = implied;
                available.insert(neighbor, criticality, &self.graph, direction);
            }
        }
    }

    // ------------------------------------------------------------------
    // Uniform bundle balancing
    // ------------------------------------------------------------------

    /// Balance bundle sizes without extending the schedule.
    ///
    /// Starts from an ASAP schedule, then scans backward filling small
    /// bundles with the least critical legal gates from earlier bundles,
    /// re-targeting the average over non-empty bundles after every move.
    /// Candidates may run out before a bundle reaches the target; the
    /// residual non-uniformity is accepted.
    #[instrument(skip(self), fields(circuit = self.circuit.name()))]
    pub fn schedule_uniform(&mut self) -> SchedResult<()> {
        info!("scheduling uniform (ASAP pre-pass, backward balancing)");
        self.set_cycle(Direction::Forward);
        let criticality = Criticality::compute(&self.graph, Direction::Forward);

        let cycle_count = self.cycle[self.graph.sink().index()].saturating_sub(1);

        let mut bundles: FxHashMap<Cycle, Vec<usize>> = FxHashMap::default();
        for (i, &node) in self.graph.op_nodes().iter().enumerate() {
            bundles.entry(self.cycle[node.index()]).or_default().push(i);
        }

        let (max_before, mut non_empty, mut gates_to_go) = bundle_stats(&bundles, cycle_count);
        debug!(
            cycle_count,
            gate_count = gates_to_go,
            non_empty_bundles = non_empty,
            max_gates_per_cycle = max_before,
            "before uniform balancing"
        );

        let mut current_cycle = cycle_count;
        while current_cycle >= 1 {
            if non_empty == 0 {
                break;
            }
            let mut target = gates_to_go as f64 / non_empty as f64;
            let mut pred_cycle = current_cycle - 1;

            'fill: while (bundles.get(&current_cycle).map_or(0, Vec::len) as f64) < target
                && pred_cycle >= 1
            {
                // Least critical gate in the predecessor bundle that can
                // legally move up to the current cycle.
                let mut best: Option<usize> = None;
                let mut best_remaining = Cycle::MAX;
                if let Some(members) = bundles.get(&pred_cycle) {
                    for &gate_index in members {
                        let node = self.graph.op_nodes()[gate_index];
                        let duration = self.circuit.gates()[gate_index].duration;
                        let completion =
                            current_cycle + self.platform.duration_in_cycles(duration);
                        if completion > cycle_count + 1 {
                            continue; // would lengthen the schedule
                        }
                        let violates_successor = self
                            .graph
                            .out_arcs(node)
                            .any(|(succ, _)| completion > self.cycle[succ.index()]);
                        if violates_successor {
                            continue;
                        }
                        let remaining = criticality.remaining(node);
                        if remaining < best_remaining {
                            best_remaining = remaining;
                            best = Some(gate_index);
                        }
                    }
                }

                match best {
                    Some(gate_index) => {
                        if let Some(members) = bundles.get_mut(&pred_cycle) {
                            members.retain(|&m| m != gate_index);
                            if members.is_empty() {
                                non_empty -= 1;
                            }
                        }
                        let bundle = bundles.entry(current_cycle).or_default();
                        if bundle.is_empty() {
                            non_empty += 1;
                        }
                        bundle.push(gate_index);
                        let node = self.graph.op_nodes()[gate_index];
                        self.cycle[node.index()] = current_cycle;
                        debug!(
                            gate = %self.circuit.gates()[gate_index],
                            from = pred_cycle,
                            to = current_cycle,
                            "balancer move"
                        );
                        if non_empty == 0 {
                            break 'fill;
                        }
                        target = gates_to_go as f64 / non_empty as f64;
                    }
                    None => pred_cycle -= 1,
                }
            }

            // Exclude the finished bundle from the remaining totals.
            let finished = bundles.get(&current_cycle).map_or(0, Vec::len);
            gates_to_go -= finished;
            if finished > 0 {
                non_empty -= 1;
            }
            current_cycle -= 1;
        }

        let (max_after, non_empty_after, gate_count) = bundle_stats(&bundles, cycle_count);
        debug!(
            cycle_count,
            gate_count,
            non_empty_bundles = non_empty_after,
            max_gates_per_cycle = max_after,
            "after uniform balancing"
        );

        self.apply_cycles();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// DOT rendering of the bare dependence graph.
    pub fn dependence_dot(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = crate::dot::write_dot(&self.graph, self.circuit, None, false, &mut out);
        out
    }

    /// DOT rendering of the scheduled graph with per-cycle rank
    /// alignment.
    pub fn schedule_dot(&self) -> String {
        let mut out = String::new();
        let _ = crate::dot::write_dot(
            &self.graph,
            self.circuit,
            Some(&self.cycle),
            false,
            &mut out,
        );
        out
    }

    /// DOT rendering with explicit options.
    pub fn write_dot<W: fmt::Write>(
        &self,
        with_critical: bool,
        with_cycles: bool,
        out: &mut W,
    ) -> fmt::Result {
        let cycles = with_cycles.then_some(self.cycle.as_slice());
        crate::dot::write_dot(&self.graph, self.circuit, cycles, with_critical, out)
    }

    /// Write the node cycles into the gates, stably sort the circuit by
    /// cycle, and mark the cycles valid.
    fn apply_cycles(&mut self) {
        let gates = self.circuit.gates_mut();
        for (i, &node) in self.graph.op_nodes().iter().enumerate() {
            gates[i].cycle = Some(self.cycle[node.index()]);
        }
        self.circuit.sort_by_cycle();
        self.circuit.mark_cycles_valid();
    }
}

/// (max bundle size, non-empty bundle count, gate total) over the
/// cycles `1..=cycle_count`.
fn bundle_stats(
    bundles: &FxHashMap<Cycle, Vec<usize>>,
    cycle_count: Cycle,
) -> (usize, usize, usize) {
    let mut max_len = 0;
    let mut non_empty = 0;
    let mut total = 0;
    for cycle in 1..=cycle_count {
        let len = bundles.get(&cycle).map_or(0, Vec::len);
        max_len = max_len.max(len);
        if len > 0 {
            non_empty += 1;
        }
        total += len;
    }
    (max_len, non_empty, total)
}
