use crate::{Connection, GraphLayout, LayoutError, Node, NodeId, Point};

/// Share of the node width over which pads are spread
const PAD_SPREAD: f64 = 0.9;

/// Horizontal offset from the node center of the middle of pad `pad` out of
/// `pads` on a node `width` wide
fn pad_offset(width: f64, pads: usize, pad: usize) -> f64 {
    let span = width * PAD_SPREAD;
    let share = span / pads.max(1) as f64;
    -span / 2.0 + share * (pad as f64 + 0.5)
}

impl GraphLayout {
    /// Center of a node
    pub fn node_position(&self, id: NodeId) -> Result<Point, LayoutError> {
        self.node(id)?
            .position
            .ok_or(LayoutError::NodeNotPlaced(id))
    }

    /// Center of the node at a store index, for renderers walking the store
    pub fn node_position_at(&self, index: usize) -> Result<Point, LayoutError> {
        let node = self.node_at_index(index)?;
        node.position.ok_or(LayoutError::NodeNotPlaced(node.id))
    }

    /// Handle of the node at a store index
    pub fn node_id_at(&self, index: usize) -> Result<NodeId, LayoutError> {
        Ok(self.node_at_index(index)?.id)
    }

    fn node_at_index(&self, index: usize) -> Result<&Node, LayoutError> {
        self.nodes
            .get(index)
            .ok_or(LayoutError::NodeIndexOutOfRange(index))
    }

    /// First node in store order whose box contains `point`
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.bounds().is_some_and(|b| b.contains(point)))
            .map(|n| n.id)
    }

    pub fn connection(&self, index: usize) -> Result<&Connection, LayoutError> {
        self.connections
            .get(index)
            .ok_or(LayoutError::ConnectionOutOfRange(index))
    }

    /// Source and destination handles of a connection
    pub fn connection_nodes(&self, index: usize) -> Result<(NodeId, NodeId), LayoutError> {
        let connection = self.connection(index)?;
        Ok((connection.from, connection.to))
    }

    /// End points of a connection, anchored on its pads
    ///
    /// The start sits on the bottom edge of the source, under its output
    /// pad, and the end on the top edge of the destination, over its input
    /// pad. Pads are spread evenly over 90% of the node width.
    pub fn connection_coords(&self, index: usize) -> Result<(Point, Point), LayoutError> {
        let connection = self.connection(index)?;
        let from = self.node(connection.from)?;
        let to = self.node(connection.to)?;
        let from_center = from.position.ok_or(LayoutError::NodeNotPlaced(from.id))?;
        let to_center = to.position.ok_or(LayoutError::NodeNotPlaced(to.id))?;

        let start = from_center.offset(
            pad_offset(from.size.x, from.outpads, connection.from_pad),
            from.size.y / 2.0,
        );
        let end = to_center.offset(
            pad_offset(to.size.x, to.inpads, connection.to_pad),
            -to.size.y / 2.0,
        );
        Ok((start, end))
    }
}
