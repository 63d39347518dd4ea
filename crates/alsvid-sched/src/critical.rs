//! Critical-path metrics and the deep-criticality available list.

use petgraph::graph::NodeIndex;

use alsvid_ir::Cycle;

use crate::graph::DepGraph;
use crate::scheduler::Direction;

/// Per-node criticality metric: the longest weighted path from the node
/// to SINK (forward scheduling) or from SOURCE (backward scheduling).
///
/// Constant once computed; the list scheduler uses it to order the
/// available list and the uniform balancer to pick move candidates.
pub struct Criticality {
    remaining: Vec<Cycle>,
}

impl Criticality {
    /// Compute the metric for every node in the given direction.
    pub fn compute(graph: &DepGraph, direction: Direction) -> Self {
        let mut remaining = vec![0; graph.node_count()];
        match direction {
            Direction::Forward => {
                // Reverse topological order: successors are final when
                // a node is visited.
                for &node in graph.topo().iter().rev() {
                    remaining[node.index()] = graph
                        .out_arcs(node)
                        .map(|(succ, arc)| remaining[succ.index()] + arc.weight)
                        .max()
                        .unwrap_or(0);
                }
            }
            Direction::Backward => {
                for &node in graph.topo() {
                    remaining[node.index()] = graph
                        .in_arcs(node)
                        .map(|(pred, arc)| remaining[pred.index()] + arc.weight)
                        .max()
                        .unwrap_or(0);
                }
            }
        }
        Self { remaining }
    }

    /// The remaining-cycles metric of a node.
    #[inline]
    pub fn remaining(&self, node: NodeIndex) -> Cycle {
        self.remaining[node.index()]
    }

    /// Whether `a` is strictly less deep-critical than `b`.
    ///
    /// Deep-criticality refines the remaining metric by recursing into
    /// the nodes that depend on the compared ones (successors forward,
    /// predecessors backward):
    ///
    /// 1. larger `remaining` wins;
    /// 2. a node with no depending nodes loses to one that has some;
    /// 3. the larger maximum `remaining` among depending nodes wins;
    /// 4. of the depending nodes at that maximum, the larger set loses;
    /// 5. still tied: recurse on the most critical depending node of each.
    ///
    /// The ordering is total, deterministic, and free of pointer
    /// identity, so identical inputs always schedule identically.
    pub fn less_critical(
        &self,
        graph: &DepGraph,
        a: NodeIndex,
        b: NodeIndex,
        direction: Direction,
    ) -> bool {
        if a == b {
            return false;
        }
        if self.remaining(a) != self.remaining(b) {
            return self.remaining(a) < self.remaining(b);
        }

        let deps_a = depending_nodes(graph, a, direction);
        let deps_b = depending_nodes(graph, b, direction);
        if deps_b.is_empty() {
            return false;
        }
        if deps_a.is_empty() {
            return true;
        }

        let max_a = deps_a.iter().map(|&n| self.remaining(n)).max().unwrap_or(0);
        let max_b = deps_b.iter().map(|&n| self.remaining(n)).max().unwrap_or(0);
        if max_a != max_b {
            return max_a < max_b;
        }

        let top_a: Vec<NodeIndex> = deps_a
            .into_iter()
            .filter(|&n| self.remaining(n) == max_a)
            .collect();
        let top_b: Vec<NodeIndex> = deps_b
            .into_iter()
            .filter(|&n| self.remaining(n) == max_b)
            .collect();
        if top_a.len() != top_b.len() {
            // The tie over more equally-critical dependents loses.
            return top_a.len() > top_b.len();
        }

        let best_a = self.most_critical(graph, &top_a, direction);
        let best_b = self.most_critical(graph, &top_b, direction);
        self.less_critical(graph, best_a, best_b, direction)
    }

    /// The most deep-critical node of a non-empty slice.
    fn most_critical(
        &self,
        graph: &DepGraph,
        nodes: &[NodeIndex],
        direction: Direction,
    ) -> NodeIndex {
        let mut best = nodes[0];
        for &node in &nodes[1..] {
            if self.less_critical(graph, best, node, direction) {
                best = node;
            }
        }
        best
    }
}

/// The nodes directly depending on `node` in the scheduling direction,
/// without duplicates (parallel arcs collapse to one entry).
fn depending_nodes(graph: &DepGraph, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut nodes: Vec<NodeIndex> = Vec::new();
    match direction {
        Direction::Forward => {
            for (succ, _) in graph.out_arcs(node) {
                if !nodes.contains(&succ) {
                    nodes.push(succ);
                }
            }
        }
        Direction::Backward => {
            for (pred, _) in graph.in_arcs(node) {
                if !nodes.contains(&pred) {
                    nodes.push(pred);
                }
            }
        }
    }
    nodes
}

/// The list of nodes whose dependences are all resolved, kept ordered
/// from highest to lowest deep-criticality.
#[derive(Debug, Default)]
pub struct AvailableList {
    nodes: Vec<NodeIndex>,
}

impl AvailableList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no node is available.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of available nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate nodes from highest to lowest deep-criticality.
    pub fn iter(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes.iter().copied()
    }

    /// The most critical available node, if any.
    pub fn front(&self) -> Option<NodeIndex> {
        self.nodes.first().copied()
    }

    /// Insert a node at its deep-criticality position.
    ///
    /// Duplicates (from parallel arcs releasing a node twice) are
    /// dropped. A node ties after existing nodes of equal criticality,
    /// so insertion order, and with it the schedule, is stable.
    pub fn insert(
        &mut self,
        node: NodeIndex,
        criticality: &Criticality,
        graph: &DepGraph,
        direction: Direction,
    ) {
        let mut position = None;
        for (i, &existing) in self.nodes.iter().enumerate() {
            if existing == node {
                return;
            }
            if position.is_none() && criticality.less_critical(graph, existing, node, direction) {
                position = Some(i);
            }
        }
        match position {
            Some(i) => self.nodes.insert(i, node),
            None => self.nodes.push(node),
        }
    }

    /// Remove a node after it has been scheduled.
    pub fn remove(&mut self, node: NodeIndex) {
        self.nodes.retain(|&n| n != node);
    }
}
