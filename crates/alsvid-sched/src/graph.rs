//! Dependence-graph construction over gate operands.
//!
//! The graph has one node per gate plus two synthetic brackets: SOURCE,
//! which implicitly writes every operand before the region, and SINK,
//! which implicitly writes every operand after it. Arcs are ordering
//! constraints weighted by the source gate's duration in cycles.
//!
//! Construction walks the gates in program order, keeping per operand
//! the last writer, the readers since that writer, and the
//! control-targets since that writer. Readers commute with readers and
//! control-targets with control-targets (unless commutation is
//! disabled), which is exactly what lets chains of CNOTs sharing a
//! control (or sharing a target) schedule in parallel.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as PetDirection;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use alsvid_ir::{Circuit, Cycle, Gate, Platform};

use crate::access::{signature, AccessMode, OperandIndex, Signature};
use crate::config::SchedulerConfig;
use crate::error::{SchedError, SchedResult};

/// Kind of a dependence arc, named (later access)-After-(earlier access).
///
/// Diagnostic only: the scheduler treats every arc as an ordering
/// constraint regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepKind {
    /// Write after write.
    Waw,
    /// Write after read.
    War,
    /// Write after control-target.
    Wad,
    /// Read after write.
    Raw,
    /// Read after read (only present with commutation disabled).
    Rar,
    /// Read after control-target.
    Rad,
    /// Control-target after write.
    Daw,
    /// Control-target after read.
    Dar,
    /// Control-target after control-target (only present with
    /// commutation disabled).
    Dad,
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DepKind::Waw => "WAW",
            DepKind::War => "WAR",
            DepKind::Wad => "WAD",
            DepKind::Raw => "RAW",
            DepKind::Rar => "RAR",
            DepKind::Rad => "RAD",
            DepKind::Daw => "DAW",
            DepKind::Dar => "DAR",
            DepKind::Dad => "DAD",
        };
        f.write_str(s)
    }
}

/// A dependence arc between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepArc {
    /// Ordering distance in cycles: the source gate's duration rounded
    /// up to whole cycles.
    pub weight: Cycle,
    /// The operand that caused the dependence (diagnostic).
    pub operand: OperandIndex,
    /// The access-mode pair that caused the dependence (diagnostic).
    pub kind: DepKind,
}

/// A node of the dependence graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepNode {
    /// Synthetic region entry; implicit writer of every operand.
    Source,
    /// Synthetic region exit; implicit writer of every operand.
    Sink,
    /// A circuit gate, by index into the circuit's gate list.
    Op(usize),
}

/// The dependence graph of one straight-line region.
///
/// Lives for one scheduling call; the synthetic SOURCE/SINK gate records
/// are owned here, all other gates stay owned by the circuit.
pub struct DepGraph {
    graph: DiGraph<DepNode, DepArc>,
    source: NodeIndex,
    sink: NodeIndex,
    source_gate: Gate,
    sink_gate: Gate,
    /// Node of each circuit gate, indexed by gate position.
    op_nodes: Vec<NodeIndex>,
    /// A topological order of all nodes (SOURCE first, SINK last).
    topo: Vec<NodeIndex>,
    operand_count: u32,
}

impl DepGraph {
    /// Build the dependence graph for a circuit.
    ///
    /// Fails with [`SchedError::CyclicDependenceGraph`] if the result is
    /// not acyclic and with [`SchedError::InconsistentCommutativity`] if
    /// a gate has no access-mode assignment.
    pub fn build(
        circuit: &Circuit,
        platform: &Platform,
        config: &SchedulerConfig,
    ) -> SchedResult<Self> {
        let operand_count = circuit.operand_count();
        let qubit_count = circuit.qubit_count();
        debug!(
            gates = circuit.len(),
            operands = operand_count,
            commute = config.commute,
            "building dependence graph"
        );

        let mut graph: DiGraph<DepNode, DepArc> = DiGraph::new();

        // SOURCE takes one cycle, so its arcs get weight 1; SINK emits
        // no arcs at all.
        let source_gate = Gate::dummy(platform.cycle_time);
        let sink_gate = Gate::dummy(0);

        let source = graph.add_node(DepNode::Source);
        // Weight of every arc leaving a node, fixed when the node is added.
        let mut out_weight: Vec<Cycle> = vec![platform.duration_in_cycles(source_gate.duration)];

        let add_arc = |graph: &mut DiGraph<DepNode, DepArc>,
                           out_weight: &[Cycle],
                           from: NodeIndex,
                           to: NodeIndex,
                           operand: OperandIndex,
                           kind: DepKind| {
            let weight = out_weight[from.index()];
            trace!(?from, ?to, %operand, %kind, weight, "dependence arc");
            graph.add_edge(from, to, DepArc { weight, operand, kind });
        };

        // Last-access state per operand. Invariant: readers and
        // control-targets never coexist for one operand.
        let n = operand_count as usize;
        let mut last_writer: Vec<NodeIndex> = vec![source; n];
        let mut last_readers: Vec<Vec<NodeIndex>> = vec![vec![]; n];
        let mut last_targets: Vec<Vec<NodeIndex>> = vec![vec![]; n];

        let mut op_nodes = Vec::with_capacity(circuit.len());
        for (i, gate) in circuit.gates().iter().enumerate() {
            let node = graph.add_node(DepNode::Op(i));
            out_weight.push(platform.duration_in_cycles(gate.duration));
            op_nodes.push(node);

            let events: Vec<(OperandIndex, AccessMode)> =
                match signature(gate, qubit_count)? {
                    Signature::Operands(ops) => ops,
                    Signature::Barrier => (0..operand_count)
                        .map(|op| (OperandIndex(op), AccessMode::Write))
                        .collect(),
                };

            for (operand, mode) in events {
                let o = operand.index();
                match mode {
                    AccessMode::Write => {
                        add_arc(&mut graph, &out_weight, last_writer[o], node, operand, DepKind::Waw);
                        for &reader in &last_readers[o] {
                            add_arc(&mut graph, &out_weight, reader, node, operand, DepKind::War);
                        }
                        for &target in &last_targets[o] {
                            add_arc(&mut graph, &out_weight, target, node, operand, DepKind::Wad);
                        }
                        last_writer[o] = node;
                        last_readers[o].clear();
                        last_targets[o].clear();
                    }
                    AccessMode::Read => {
                        add_arc(&mut graph, &out_weight, last_writer[o], node, operand, DepKind::Raw);
                        if !config.commute {
                            for &reader in &last_readers[o] {
                                add_arc(&mut graph, &out_weight, reader, node, operand, DepKind::Rar);
                            }
                        }
                        for &target in &last_targets[o] {
                            add_arc(&mut graph, &out_weight, target, node, operand, DepKind::Rad);
                        }
                        last_readers[o].push(node);
                        last_targets[o].clear();
                    }
                    AccessMode::ControlTarget => {
                        add_arc(&mut graph, &out_weight, last_writer[o], node, operand, DepKind::Daw);
                        for &reader in &last_readers[o] {
                            add_arc(&mut graph, &out_weight, reader, node, operand, DepKind::Dar);
                        }
                        if !config.commute {
                            for &target in &last_targets[o] {
                                add_arc(&mut graph, &out_weight, target, node, operand, DepKind::Dad);
                            }
                        }
                        last_targets[o].push(node);
                        last_readers[o].clear();
                    }
                }
            }
        }

        // SINK closes every dependence chain: it behaves as a writer of
        // every operand so still-executing gates complete before it.
        let sink = graph.add_node(DepNode::Sink);
        out_weight.push(platform.duration_in_cycles(sink_gate.duration));
        for op in 0..operand_count {
            let operand = OperandIndex(op);
            let o = operand.index();
            add_arc(&mut graph, &out_weight, last_writer[o], sink, operand, DepKind::Waw);
            for &reader in &last_readers[o] {
                add_arc(&mut graph, &out_weight, reader, sink, operand, DepKind::War);
            }
            for &target in &last_targets[o] {
                add_arc(&mut graph, &out_weight, target, sink, operand, DepKind::Wad);
            }
        }

        // By construction the graph cannot be cyclic; the check guards
        // against future arc-adding passes and yields the topological
        // order the metric sweeps run over.
        let topo = petgraph::algo::toposort(&graph, None)
            .map_err(|_| SchedError::CyclicDependenceGraph)?;

        debug!(
            nodes = graph.node_count(),
            arcs = graph.edge_count(),
            "dependence graph complete"
        );

        Ok(Self {
            graph,
            source,
            sink,
            source_gate,
            sink_gate,
            op_nodes,
            topo,
            operand_count,
        })
    }

    /// The underlying graph.
    pub fn graph(&self) -> &DiGraph<DepNode, DepArc> {
        &self.graph
    }

    /// The synthetic SOURCE node.
    #[inline]
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// The synthetic SINK node.
    #[inline]
    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    /// A topological order of all nodes.
    pub fn topo(&self) -> &[NodeIndex] {
        &self.topo
    }

    /// The node of each circuit gate, indexed by gate position.
    pub fn op_nodes(&self) -> &[NodeIndex] {
        &self.op_nodes
    }

    /// Total number of nodes, including SOURCE and SINK.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Width of the flat operand index space.
    #[inline]
    pub fn operand_count(&self) -> u32 {
        self.operand_count
    }

    /// The gate index of an operation node, or `None` for SOURCE/SINK.
    pub fn gate_index(&self, node: NodeIndex) -> Option<usize> {
        match self.graph[node] {
            DepNode::Op(i) => Some(i),
            DepNode::Source | DepNode::Sink => None,
        }
    }

    /// Resolve a node to its gate record.
    pub fn gate<'a>(&'a self, circuit: &'a Circuit, node: NodeIndex) -> &'a Gate {
        match self.graph[node] {
            DepNode::Source => &self.source_gate,
            DepNode::Sink => &self.sink_gate,
            DepNode::Op(i) => &circuit.gates()[i],
        }
    }

    /// Human-readable label of a node, for diagnostics.
    pub fn label(&self, circuit: &Circuit, node: NodeIndex) -> String {
        match self.graph[node] {
            DepNode::Source => "SOURCE".to_string(),
            DepNode::Sink => "SINK".to_string(),
            DepNode::Op(i) => circuit.gates()[i].to_string(),
        }
    }

    /// Iterate the arcs into `node` as `(source, arc)` pairs.
    pub fn in_arcs(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &DepArc)> + '_ {
        self.graph
            .edges_directed(node, PetDirection::Incoming)
            .map(|e| (e.source(), e.weight()))
    }

    /// Iterate the arcs out of `node` as `(target, arc)` pairs.
    pub fn out_arcs(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &DepArc)> + '_ {
        self.graph
            .edges_directed(node, PetDirection::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    /// Iterate every arc as `(edge, source, target, arc)`.
    pub fn arcs(
        &self,
    ) -> impl Iterator<Item = (EdgeIndex, NodeIndex, NodeIndex, &DepArc)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.id(), e.source(), e.target(), e.weight()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{CregId, QubitId};

    fn platform() -> Platform {
        Platform::new(3, 1)
    }

    fn arcs_between(g: &DepGraph, from: NodeIndex, to: NodeIndex) -> Vec<DepKind> {
        g.out_arcs(from)
            .filter(|&(t, _)| t == to)
            .map(|(_, a)| a.kind)
            .collect()
    }

    #[test]
    fn test_empty_circuit_graph() {
        let circuit = Circuit::new("empty", 2, 1);
        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();

        assert_eq!(g.node_count(), 2);
        // One writer arc per operand closes the region.
        assert_eq!(g.graph().edge_count(), 3);
        assert_eq!(g.topo()[0], g.source());
        assert_eq!(g.topo()[1], g.sink());
    }

    #[test]
    fn test_shared_control_commutes() {
        let mut circuit = Circuit::new("t", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(0), QubitId(2)).unwrap();

        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        // Reads of the shared control commute: no arc between the CNOTs.
        assert!(arcs_between(&g, n1, n2).is_empty());
    }

    #[test]
    fn test_shared_control_pessimistic_without_commute() {
        let mut circuit = Circuit::new("t", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(0), QubitId(2)).unwrap();

        let config = SchedulerConfig::default().with_commute(false);
        let g = DepGraph::build(&circuit, &platform(), &config).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        assert_eq!(arcs_between(&g, n1, n2), vec![DepKind::Rar]);
    }

    #[test]
    fn test_shared_target_commutes() {
        let mut circuit = Circuit::new("t", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(2), QubitId(1)).unwrap();

        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        // Control-targets of the shared target qubit commute.
        assert!(arcs_between(&g, n1, n2).is_empty());
    }

    #[test]
    fn test_read_after_controltarget_orders() {
        let mut circuit = Circuit::new("t", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cz(QubitId(2), QubitId(1)).unwrap();

        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        // CZ reads q1, which the CNOT control-targeted: must order.
        assert_eq!(arcs_between(&g, n1, n2), vec![DepKind::Rad]);
    }

    #[test]
    fn test_controltarget_after_read_orders() {
        let mut circuit = Circuit::new("t", 3, 0);
        circuit.cz(QubitId(2), QubitId(1)).unwrap();
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();

        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        assert_eq!(arcs_between(&g, n1, n2), vec![DepKind::Dar]);
    }

    #[test]
    fn test_write_chain_sequentializes() {
        let mut circuit = Circuit::new("t", 1, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), CregId(0)).unwrap();

        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        assert_eq!(arcs_between(&g, n1, n2), vec![DepKind::Waw]);
    }

    #[test]
    fn test_display_orders_against_everything() {
        let mut circuit = Circuit::new("t", 2, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.display().unwrap();
        circuit.h(QubitId(1)).unwrap();

        let g = DepGraph::build(&circuit, &platform(), &SchedulerConfig::default()).unwrap();
        let (h0, disp, h1) = (g.op_nodes()[0], g.op_nodes()[1], g.op_nodes()[2]);

        assert_eq!(arcs_between(&g, h0, disp), vec![DepKind::Waw]);
        assert_eq!(arcs_between(&g, disp, h1), vec![DepKind::Waw]);
    }

    #[test]
    fn test_arc_weight_is_source_duration_in_cycles() {
        let mut circuit = Circuit::new("t", 1, 0).with_default_gate_duration(45);
        circuit.h(QubitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();

        let platform = Platform::new(1, 20);
        let g = DepGraph::build(&circuit, &platform, &SchedulerConfig::default()).unwrap();
        let (n1, n2) = (g.op_nodes()[0], g.op_nodes()[1]);

        let weights: Vec<Cycle> = g
            .out_arcs(n1)
            .filter(|&(t, _)| t == n2)
            .map(|(_, a)| a.weight)
            .collect();
        assert_eq!(weights, vec![3]); // ceil(45 / 20)

        // SOURCE arcs always weigh one cycle.
        let source_weights: Vec<Cycle> =
            g.out_arcs(g.source()).map(|(_, a)| a.weight).collect();
        assert!(source_weights.iter().all(|&w| w == 1));
    }

    #[test]
    fn test_commute_flip_changes_arcs_but_stays_acyclic() {
        let mut circuit = Circuit::new("t", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(0), QubitId(2)).unwrap();
        circuit.cz(QubitId(1), QubitId(2)).unwrap();

        let platform = platform();
        let with = DepGraph::build(&circuit, &platform, &SchedulerConfig::default()).unwrap();
        let without = DepGraph::build(
            &circuit,
            &platform,
            &SchedulerConfig::default().with_commute(false),
        )
        .unwrap();

        assert!(with.graph().edge_count() < without.graph().edge_count());
    }
}
