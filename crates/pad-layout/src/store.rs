use crate::{LayoutConfig, LayoutError, Point, Rect, Vec2};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Stable handle of a node
///
/// Handles are allocated in increasing order starting at 1 and are never
/// reissued while the graph lives, even after the node is freed. Only
/// [`GraphLayout::clear`] resets the allocator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct NodeId(u64);

/// A vertex of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    /// Center of the node, `None` when the last layout did not reach it
    pub(crate) position: Option<Point>,
    pub(crate) size: Vec2,
    pub(crate) inpads: usize,
    pub(crate) outpads: usize,
    /// Scratch flag of the placement pass
    pub(crate) done: bool,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn inpads(&self) -> usize {
        self.inpads
    }

    pub fn outpads(&self) -> usize {
        self.outpads
    }

    /// Bounding box of the node, if it has a position
    pub fn bounds(&self) -> Option<Rect> {
        self.position
            .map(|center| Rect::from_center_size(center, self.size))
    }
}

/// A directed edge from an output pad of one node to an input pad of another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub(crate) from: NodeId,
    pub(crate) from_pad: usize,
    pub(crate) to: NodeId,
    pub(crate) to_pad: usize,
    /// Store indices of both ends, only set by a sort and cleared by any
    /// change to the node store
    pub(crate) resolved: Option<(usize, usize)>,
}

impl Connection {
    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn from_pad(&self) -> usize {
        self.from_pad
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn to_pad(&self) -> usize {
        self.to_pad
    }

    /// Store indices of the source and destination as computed by the last
    /// sort, or `None` if the sort could not order both ends
    pub fn resolved(&self) -> Option<(usize, usize)> {
        self.resolved
    }
}

/// Graph store and layout engine
///
/// Nodes live in a vector whose order is the store order: it changes when a
/// node is freed (the last node takes its slot) and when the graph is
/// sorted. A handle to slot map gives constant time lookups.
#[derive(Debug, Clone, Default)]
pub struct GraphLayout {
    pub(crate) nodes: Vec<Node>,
    pub(crate) slots: HashMap<NodeId, usize>,
    pub(crate) connections: Vec<Connection>,
    max_node_id: u64,
    pub(crate) config: LayoutConfig,
}

impl GraphLayout {
    /// Create an empty graph with the default tunables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with the given tunables
    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> LayoutConfig {
        self.config
    }

    pub fn nodesep(&self) -> f64 {
        self.config.nodesep
    }

    pub fn set_nodesep(&mut self, nodesep: f64) {
        self.config.nodesep = nodesep;
    }

    pub fn ranksep(&self) -> f64 {
        self.config.ranksep
    }

    pub fn set_ranksep(&mut self, ranksep: f64) {
        self.config.ranksep = ranksep;
    }

    /// Add a node and return its handle
    ///
    /// # Errors
    /// Returns [`LayoutError::OutOfMemory`] if the store can't grow
    pub fn new_node(&mut self) -> Result<NodeId, LayoutError> {
        self.nodes.try_reserve(1)?;
        self.slots.try_reserve(1)?;

        self.max_node_id += 1;
        let id = NodeId(self.max_node_id);

        self.slots.insert(id, self.nodes.len());
        self.nodes.push(Node {
            id,
            position: Some(Point::origin()),
            size: self.config.node_size,
            inpads: 0,
            outpads: 0,
            done: false,
        });
        self.invalidate_order();

        trace!("New node {id}");
        Ok(id)
    }

    /// Remove a node along with every connection going into or out of it
    ///
    /// The last node of the store moves into the freed slot.
    pub fn free_node(&mut self, id: NodeId) -> Result<(), LayoutError> {
        let slot = self.index_of(id)?;

        let mut i = 0;
        while i < self.connections.len() {
            let connection = &self.connections[i];
            if connection.from == id || connection.to == id {
                trace!("Removing connection {connection:?} of freed node {id}");
                self.connections.swap_remove(i);
            } else {
                i += 1;
            }
        }

        self.nodes.swap_remove(slot);
        self.slots.remove(&id);
        if let Some(moved) = self.nodes.get(slot) {
            self.slots.insert(moved.id, slot);
        }
        self.invalidate_order();

        trace!("Freed node {id}");
        Ok(())
    }

    /// Remove all nodes and connections and restart handle allocation
    pub fn clear(&mut self) {
        trace!(
            "Clearing {} nodes and {} connections",
            self.nodes.len(),
            self.connections.len()
        );
        self.nodes.clear();
        self.slots.clear();
        self.connections.clear();
        self.max_node_id = 0;
    }

    /// Bind an input pad to an output pad, or unbind it
    ///
    /// An input pad has at most one source: if `(dest, dest_pad)` is already
    /// connected its source is replaced, or the connection is removed when
    /// `source` is `None`. Removing a connection that doesn't exist does
    /// nothing.
    ///
    /// # Errors
    /// Returns [`LayoutError::NodeNotFound`] when binding to or from an
    /// unknown node.
    pub fn set_connection(
        &mut self,
        source: Option<(NodeId, usize)>,
        dest: NodeId,
        dest_pad: usize,
    ) -> Result<(), LayoutError> {
        if let Some((from, _)) = source {
            self.index_of(from)?;
            self.index_of(dest)?;
        }

        let existing = self
            .connections
            .iter()
            .position(|c| c.to == dest && c.to_pad == dest_pad);

        match (existing, source) {
            (Some(i), None) => {
                trace!("Disconnecting {dest}:{dest_pad}");
                self.connections.swap_remove(i);
            }
            (Some(i), Some((from, from_pad))) => {
                trace!("Rebinding {dest}:{dest_pad} to {from}:{from_pad}");
                let connection = &mut self.connections[i];
                connection.from = from;
                connection.from_pad = from_pad;
                connection.resolved = None;
            }
            (None, Some((from, from_pad))) => {
                self.connections.try_reserve(1)?;
                trace!("Connecting {from}:{from_pad} to {dest}:{dest_pad}");
                self.connections.push(Connection {
                    from,
                    from_pad,
                    to: dest,
                    to_pad: dest_pad,
                    resolved: None,
                });
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// Connect output pad `from_pad` of `from` to input pad `to_pad` of `to`
    pub fn connect(
        &mut self,
        from: NodeId,
        from_pad: usize,
        to: NodeId,
        to_pad: usize,
    ) -> Result<(), LayoutError> {
        self.set_connection(Some((from, from_pad)), to, to_pad)
    }

    /// Remove the connection feeding input pad `to_pad` of `to`, if any
    pub fn disconnect(&mut self, to: NodeId, to_pad: usize) -> Result<(), LayoutError> {
        self.set_connection(None, to, to_pad)
    }

    /// Current store index of a node
    ///
    /// The index is only meaningful until the next structural change or
    /// relayout.
    pub fn index_of(&self, id: NodeId) -> Result<usize, LayoutError> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(LayoutError::NodeNotFound(id))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, LayoutError> {
        let slot = self.index_of(id)?;
        Ok(&self.nodes[slot])
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, LayoutError> {
        let slot = self.index_of(id)?;
        Ok(&mut self.nodes[slot])
    }

    pub fn node_size(&self, id: NodeId) -> Result<Vec2, LayoutError> {
        Ok(self.node(id)?.size)
    }

    pub fn set_node_size(&mut self, id: NodeId, size: Vec2) -> Result<(), LayoutError> {
        self.node_mut(id)?.size = size;
        Ok(())
    }

    pub fn inpads(&self, id: NodeId) -> Result<usize, LayoutError> {
        Ok(self.node(id)?.inpads)
    }

    pub fn set_inpads(&mut self, id: NodeId, inpads: usize) -> Result<(), LayoutError> {
        self.node_mut(id)?.inpads = inpads;
        Ok(())
    }

    pub fn outpads(&self, id: NodeId) -> Result<usize, LayoutError> {
        Ok(self.node(id)?.outpads)
    }

    pub fn set_outpads(&mut self, id: NodeId, outpads: usize) -> Result<(), LayoutError> {
        self.node_mut(id)?.outpads = outpads;
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Nodes in store order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Connections in store order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Drop the resolved indices of all connections
    pub(crate) fn invalidate_order(&mut self) {
        for connection in &mut self.connections {
            connection.resolved = None;
        }
    }

    /// Rebuild the handle to slot map after the node vector was permuted
    pub(crate) fn reindex(&mut self) {
        self.slots.clear();
        for (slot, node) in self.nodes.iter().enumerate() {
            self.slots.insert(node.id, slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_log::test;

    fn graph_with_nodes(count: usize) -> (GraphLayout, Vec<NodeId>) {
        let mut graph = GraphLayout::new();
        let ids = (0..count).map(|_| graph.new_node().unwrap()).collect();
        (graph, ids)
    }

    #[test]
    fn new_node_defaults() {
        let (graph, ids) = graph_with_nodes(1);
        let node = graph.node(ids[0]).unwrap();
        assert_eq!(node.id(), NodeId(1));
        assert_eq!(node.size(), Vec2::new(32.0, 32.0));
        assert_eq!(node.inpads(), 0);
        assert_eq!(node.outpads(), 0);
        assert_eq!(node.position(), Some(Point::origin()));
    }

    #[test]
    fn new_node_uses_configured_size() {
        let mut graph = GraphLayout::with_config(LayoutConfig {
            node_size: Vec2::new(80.0, 20.0),
            ..Default::default()
        });
        let id = graph.new_node().unwrap();
        assert_eq!(graph.node_size(id).unwrap(), Vec2::new(80.0, 20.0));
    }

    #[test]
    fn handles_are_never_reissued() {
        let (mut graph, ids) = graph_with_nodes(3);
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);

        graph.free_node(ids[2]).unwrap();
        graph.free_node(ids[0]).unwrap();
        let next = graph.new_node().unwrap();
        assert_eq!(next, NodeId(4));

        let mut seen = HashSet::new();
        for node in graph.nodes() {
            assert!(seen.insert(node.id()));
        }
        assert_eq!(seen, HashSet::from([NodeId(2), NodeId(4)]));
    }

    #[test]
    fn handles_survive_swap_delete() {
        let (mut graph, ids) = graph_with_nodes(4);
        graph.set_inpads(ids[3], 7).unwrap();

        graph.free_node(ids[0]).unwrap();

        // The last node took the freed slot
        assert_eq!(graph.index_of(ids[3]).unwrap(), 0);
        assert_eq!(graph.inpads(ids[3]).unwrap(), 7);
        for &id in &ids[1..] {
            assert_eq!(graph.node(id).unwrap().id(), id);
        }
        assert_eq!(
            graph.index_of(ids[0]),
            Err(LayoutError::NodeNotFound(ids[0]))
        );
    }

    #[test]
    fn unknown_handle_is_an_error() {
        let (mut graph, _) = graph_with_nodes(1);
        let unknown = NodeId::from(42);
        assert_eq!(
            graph.set_inpads(unknown, 1),
            Err(LayoutError::NodeNotFound(unknown))
        );
        assert_eq!(
            graph.node_size(unknown),
            Err(LayoutError::NodeNotFound(unknown))
        );
        assert_eq!(
            graph.free_node(unknown),
            Err(LayoutError::NodeNotFound(unknown))
        );
    }

    #[test]
    fn one_source_per_input_pad() {
        let (mut graph, ids) = graph_with_nodes(3);
        graph.connect(ids[0], 0, ids[2], 0).unwrap();
        graph.connect(ids[1], 1, ids[2], 0).unwrap();

        assert_eq!(graph.connection_count(), 1);
        let connection = &graph.connections()[0];
        assert_eq!(connection.from(), ids[1]);
        assert_eq!(connection.from_pad(), 1);
        assert_eq!(connection.to(), ids[2]);
        assert_eq!(connection.to_pad(), 0);

        graph.connect(ids[0], 0, ids[2], 1).unwrap();
        assert_eq!(graph.connection_count(), 2);
    }

    #[test]
    fn disconnect_removes_only_that_pad() {
        let (mut graph, ids) = graph_with_nodes(3);
        graph.connect(ids[0], 0, ids[2], 0).unwrap();
        graph.connect(ids[1], 0, ids[2], 1).unwrap();

        graph.disconnect(ids[2], 0).unwrap();
        assert_eq!(graph.connection_count(), 1);
        assert_eq!(graph.connections()[0].from(), ids[1]);

        // Nothing bound there anymore
        graph.disconnect(ids[2], 0).unwrap();
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn connecting_unknown_nodes_fails() {
        let (mut graph, ids) = graph_with_nodes(1);
        let unknown = NodeId::from(9);
        assert_eq!(
            graph.connect(unknown, 0, ids[0], 0),
            Err(LayoutError::NodeNotFound(unknown))
        );
        assert_eq!(
            graph.connect(ids[0], 0, unknown, 0),
            Err(LayoutError::NodeNotFound(unknown))
        );
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn free_node_removes_its_connections() {
        let (mut graph, ids) = graph_with_nodes(4);
        graph.connect(ids[0], 0, ids[1], 0).unwrap();
        graph.connect(ids[1], 0, ids[2], 0).unwrap();
        graph.connect(ids[1], 1, ids[3], 0).unwrap();
        graph.connect(ids[0], 1, ids[3], 1).unwrap();

        graph.free_node(ids[1]).unwrap();

        assert_eq!(graph.connection_count(), 1);
        let remaining = &graph.connections()[0];
        assert_eq!((remaining.from(), remaining.to()), (ids[0], ids[3]));

        let next = graph.new_node().unwrap();
        assert_ne!(next, ids[1]);
    }

    #[test]
    fn clear_resets_allocator() {
        let (mut graph, ids) = graph_with_nodes(3);
        graph.connect(ids[0], 0, ids[1], 0).unwrap();

        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(graph.new_node().unwrap(), NodeId(1));
    }

    #[test]
    fn tunables() {
        let mut graph = GraphLayout::new();
        assert_eq!(graph.config(), LayoutConfig::default());
        graph.set_nodesep(2.0);
        graph.set_ranksep(3.0);
        assert_eq!(graph.nodesep(), 2.0);
        assert_eq!(graph.ranksep(), 3.0);
    }
}
