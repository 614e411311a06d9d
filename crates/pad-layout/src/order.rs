use crate::{GraphLayout, NodeId};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Result of a topological sort of the node store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOutcome {
    /// Number of nodes at the front of the store that are in topological
    /// order
    pub sorted: usize,

    /// Nodes the sort could not order, in store order. They either sit on
    /// a cycle or downstream of one.
    pub stranded: Vec<NodeId>,

    /// Cycles among the stranded nodes, each one sorted by handle
    pub cycles: Vec<Vec<NodeId>>,
}

impl SortOutcome {
    pub fn is_complete(&self) -> bool {
        self.stranded.is_empty()
    }
}

impl GraphLayout {
    /// Reorder the node store so that every source comes before its
    /// destinations, and resolve the store indices of the connections
    ///
    /// Ready nodes are swapped one at a time into the sorted prefix, and the
    /// scan restarts right after the prefix. When a whole scan finds no
    /// ready node the sort stops there: the remaining nodes keep their
    /// relative order and the connections touching them stay unresolved.
    pub fn sort(&mut self) -> SortOutcome {
        self.invalidate_order();

        let mut incoming: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut outgoing: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (i, connection) in self.connections.iter().enumerate() {
            incoming.entry(connection.to).or_default().push(i);
            outgoing.entry(connection.from).or_default().push(i);
        }

        let mut connection_done = vec![false; self.connections.len()];
        let mut sorted = 0;

        'scan: loop {
            for node_no in sorted..self.nodes.len() {
                let id = self.nodes[node_no].id;
                let ready = incoming
                    .get(&id)
                    .map_or(true, |conns| conns.iter().all(|&c| connection_done[c]));
                if !ready {
                    continue;
                }

                for &c in outgoing.get(&id).into_iter().flatten() {
                    connection_done[c] = true;
                }
                self.nodes.swap(node_no, sorted);
                sorted += 1;
                continue 'scan;
            }
            break;
        }

        self.reindex();

        for connection in &mut self.connections {
            let from = self.slots.get(&connection.from).copied();
            let to = self.slots.get(&connection.to).copied();
            if let (Some(from), Some(to)) = (from, to) {
                if from < sorted && to < sorted {
                    connection.resolved = Some((from, to));
                }
            }
        }

        let stranded: Vec<NodeId> = self.nodes[sorted..].iter().map(|n| n.id).collect();
        let cycles = if stranded.is_empty() {
            Vec::new()
        } else {
            self.cycles_among(&stranded)
        };

        if stranded.is_empty() {
            debug!("Sorted {sorted} nodes");
        } else {
            warn!(
                "Sorted {sorted} of {} nodes, {} left unordered, cycles: {cycles:?}",
                self.nodes.len(),
                stranded.len()
            );
        }

        SortOutcome {
            sorted,
            stranded,
            cycles,
        }
    }

    /// Strongly connected components of the subgraph induced by `nodes`
    /// that actually loop: more than one node, or a node feeding itself
    fn cycles_among(&self, nodes: &[NodeId]) -> Vec<Vec<NodeId>> {
        let members: HashSet<NodeId> = nodes.iter().copied().collect();

        let mut graph = DiGraphMap::<NodeId, ()>::new();
        for &id in nodes {
            graph.add_node(id);
        }
        for connection in &self.connections {
            if members.contains(&connection.from) && members.contains(&connection.to) {
                graph.add_edge(connection.from, connection.to, ());
            }
        }

        let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn chain(graph: &mut GraphLayout, ids: &[NodeId]) {
        for pair in ids.windows(2) {
            graph.set_outpads(pair[0], 1).unwrap();
            graph.set_inpads(pair[1], 1).unwrap();
            graph.connect(pair[0], 0, pair[1], 0).unwrap();
        }
    }

    fn store_order(graph: &GraphLayout) -> Vec<NodeId> {
        graph.nodes().iter().map(|n| n.id()).collect()
    }

    #[test]
    fn sorts_reversed_chain() {
        let mut graph = GraphLayout::new();
        let ids: Vec<_> = (0..4).map(|_| graph.new_node().unwrap()).collect();
        // 4 -> 3 -> 2 -> 1, inserted in the opposite order
        let reversed: Vec<_> = ids.iter().rev().copied().collect();
        chain(&mut graph, &reversed);

        let outcome = graph.sort();
        assert!(outcome.is_complete());
        assert_eq!(outcome.sorted, 4);
        assert_eq!(store_order(&graph), reversed);

        for connection in graph.connections() {
            let (from, to) = connection.resolved().unwrap();
            assert!(from < to);
            assert_eq!(graph.index_of(connection.from()).unwrap(), from);
            assert_eq!(graph.index_of(connection.to()).unwrap(), to);
        }
    }

    #[test]
    fn sort_is_stable_on_sorted_store() {
        let mut graph = GraphLayout::new();
        let ids: Vec<_> = (0..5).map(|_| graph.new_node().unwrap()).collect();
        graph.connect(ids[3], 0, ids[0], 0).unwrap();
        graph.connect(ids[4], 0, ids[1], 0).unwrap();
        graph.connect(ids[0], 0, ids[2], 0).unwrap();

        graph.sort();
        let first = store_order(&graph);
        graph.sort();
        assert_eq!(store_order(&graph), first);
    }

    #[test]
    fn diamond_sources_precede_destinations() {
        let mut graph = GraphLayout::new();
        let ids: Vec<_> = (0..4).map(|_| graph.new_node().unwrap()).collect();
        // sink first in the store
        graph.connect(ids[1], 0, ids[0], 0).unwrap();
        graph.connect(ids[2], 0, ids[0], 1).unwrap();
        graph.connect(ids[3], 0, ids[1], 0).unwrap();
        graph.connect(ids[3], 1, ids[2], 0).unwrap();

        assert!(graph.sort().is_complete());
        for connection in graph.connections() {
            let (from, to) = connection.resolved().unwrap();
            assert!(from < to, "{connection:?}");
        }
        assert_eq!(graph.nodes()[0].id(), ids[3]);
        assert_eq!(graph.nodes()[3].id(), ids[0]);
    }

    #[test]
    fn cycle_stops_the_sort() {
        let mut graph = GraphLayout::new();
        let ids: Vec<_> = (0..4).map(|_| graph.new_node().unwrap()).collect();
        // 1 -> 2 <-> 3 -> 4
        graph.connect(ids[0], 0, ids[1], 0).unwrap();
        graph.connect(ids[1], 0, ids[2], 0).unwrap();
        graph.connect(ids[2], 0, ids[1], 1).unwrap();
        graph.connect(ids[2], 1, ids[3], 0).unwrap();

        let outcome = graph.sort();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.sorted, 1);
        assert_eq!(outcome.stranded, vec![ids[1], ids[2], ids[3]]);
        assert_eq!(outcome.cycles, vec![vec![ids[1], ids[2]]]);

        // Only edges between ordered nodes are resolved
        assert!(graph.connections().iter().all(|c| c.resolved().is_none()));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = GraphLayout::new();
        let a = graph.new_node().unwrap();
        let b = graph.new_node().unwrap();
        graph.connect(b, 0, b, 0).unwrap();

        let outcome = graph.sort();
        assert_eq!(outcome.sorted, 1);
        assert_eq!(store_order(&graph), vec![a, b]);
        assert_eq!(outcome.cycles, vec![vec![b]]);
    }

    #[test]
    fn store_changes_invalidate_resolution() {
        let mut graph = GraphLayout::new();
        let ids: Vec<_> = (0..3).map(|_| graph.new_node().unwrap()).collect();
        graph.connect(ids[0], 0, ids[1], 0).unwrap();

        graph.sort();
        assert!(graph.connections()[0].resolved().is_some());

        graph.free_node(ids[2]).unwrap();
        assert!(graph.connections()[0].resolved().is_none());

        graph.sort();
        graph.new_node().unwrap();
        assert!(graph.connections()[0].resolved().is_none());
    }

    #[test]
    fn empty_graph() {
        let mut graph = GraphLayout::new();
        assert_eq!(graph.sort(), SortOutcome::default());
    }
}
