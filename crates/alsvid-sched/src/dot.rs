//! DOT emission for dependence graphs and schedules.

use petgraph::graph::EdgeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction as PetDirection;
use rustc_hash::FxHashSet;
use std::fmt::{self, Write};

use alsvid_ir::{Circuit, Cycle};

use crate::critical::Criticality;
use crate::graph::DepGraph;
use crate::scheduler::Direction;

const NODE_STYLE: &str = "fontcolor=black, style=filled, fontsize=16";
const EDGE_STYLE: &str = "color=black";
const EDGE_STYLE_CRITICAL: &str = "color=red";

/// Write the graph in DOT syntax.
///
/// When `cycles` is given, a timeline of cycle labels is emitted and
/// every node is rank-aligned with its start cycle. When
/// `with_critical` is set, the arcs of one longest SOURCE→SINK path are
/// colored red.
pub(crate) fn write_dot<W: Write>(
    graph: &DepGraph,
    circuit: &Circuit,
    cycles: Option<&[Cycle]>,
    with_critical: bool,
    out: &mut W,
) -> fmt::Result {
    let critical = if with_critical {
        critical_path_edges(graph)
    } else {
        FxHashSet::default()
    };

    writeln!(out, "digraph {{")?;
    writeln!(out, "graph [ rankdir=TD; ];")?;
    writeln!(out, "edge [fontsize=16, arrowhead=vee, arrowsize=0.5];")?;

    for node in graph.graph().node_indices() {
        writeln!(
            out,
            "\"{}\" [label=\" {} \" {NODE_STYLE}];",
            node.index(),
            graph.label(circuit, node)
        )?;
    }

    if let Some(cycles) = cycles {
        let total = cycles.iter().copied().max().unwrap_or(0);

        writeln!(out, "{{")?;
        writeln!(out, "node [shape=plaintext, fontsize=16, fontcolor=blue];")?;
        let timeline = (0..=total)
            .map(|c| format!("Cycle{c}"))
            .collect::<Vec<_>>()
            .join(" -> ");
        writeln!(out, "{timeline};")?;
        writeln!(out, "}}")?;

        for node in graph.graph().node_indices() {
            writeln!(
                out,
                "{{ rank=same; Cycle{}; {}; }}",
                cycles[node.index()],
                node.index()
            )?;
        }
    }

    for (edge, from, to, arc) in graph.arcs() {
        let style = if critical.contains(&edge) {
            EDGE_STYLE_CRITICAL
        } else {
            EDGE_STYLE
        };
        writeln!(
            out,
            "\"{}\"->\"{}\" [ label=\"{} , {} , {}\" {style} ]",
            from.index(),
            to.index(),
            arc.operand,
            arc.weight,
            arc.kind
        )?;
    }

    writeln!(out, "}}")
}

/// The arcs of one longest SOURCE→SINK path, chosen deterministically by
/// following the first out-arc that preserves the remaining metric.
fn critical_path_edges(graph: &DepGraph) -> FxHashSet<EdgeIndex> {
    let criticality = Criticality::compute(graph, Direction::Forward);
    let mut edges = FxHashSet::default();
    let mut current = graph.source();
    while current != graph.sink() {
        let step = graph
            .graph()
            .edges_directed(current, PetDirection::Outgoing)
            .find(|e| {
                criticality.remaining(current)
                    == criticality.remaining(e.target()) + e.weight().weight
            });
        match step {
            Some(edge) => {
                edges.insert(edge.id());
                current = edge.target();
            }
            None => break,
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{Platform, QubitId};

    use crate::config::SchedulerConfig;

    #[test]
    fn test_dot_structure() {
        let mut circuit = Circuit::new("t", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();

        let graph =
            DepGraph::build(&circuit, &Platform::new(2, 1), &SchedulerConfig::default()).unwrap();

        let mut dot = String::new();
        write_dot(&graph, &circuit, None, false, &mut dot).unwrap();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("SOURCE"));
        assert!(dot.contains("SINK"));
        assert!(dot.contains("cnot q0,q1"));
        assert!(dot.contains("RAW"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_with_cycles_emits_timeline() {
        let mut circuit = Circuit::new("t", 1, 0);
        circuit.h(QubitId(0)).unwrap();

        let graph =
            DepGraph::build(&circuit, &Platform::new(1, 1), &SchedulerConfig::default()).unwrap();
        let cycles = vec![0, 1, 2];

        let mut dot = String::new();
        write_dot(&graph, &circuit, Some(&cycles), false, &mut dot).unwrap();

        assert!(dot.contains("Cycle0 -> Cycle1 -> Cycle2"));
        assert!(dot.contains("rank=same"));
    }

    #[test]
    fn test_critical_path_reaches_sink() {
        let mut circuit = Circuit::new("t", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        circuit.h(QubitId(1)).unwrap();

        let graph =
            DepGraph::build(&circuit, &Platform::new(2, 1), &SchedulerConfig::default()).unwrap();
        let edges = critical_path_edges(&graph);

        // SOURCE -> h -> x -> SINK: three arcs on the longest path.
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn test_critical_edges_colored() {
        let mut circuit = Circuit::new("t", 1, 0);
        circuit.h(QubitId(0)).unwrap();

        let graph =
            DepGraph::build(&circuit, &Platform::new(1, 1), &SchedulerConfig::default()).unwrap();

        let mut dot = String::new();
        write_dot(&graph, &circuit, None, true, &mut dot).unwrap();
        assert!(dot.contains("color=red"));
    }
}
