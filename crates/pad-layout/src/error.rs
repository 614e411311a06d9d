use crate::NodeId;
use std::collections::TryReserveError;
use thiserror::Error;

/// Errors returned by the graph store and the geometry queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// No live node has the given handle
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// The node exists but was not reached by the last relayout
    #[error("node {0} has no position, it was not reached by the last layout")]
    NodeNotPlaced(NodeId),

    /// A store index past the number of nodes
    #[error("node index {0} is out of range")]
    NodeIndexOutOfRange(usize),

    /// A connection index past the number of connections
    #[error("connection index {0} is out of range")]
    ConnectionOutOfRange(usize),

    /// Growing the node or connection storage failed
    #[error("out of memory while growing graph storage")]
    OutOfMemory,
}

impl From<TryReserveError> for LayoutError {
    fn from(_: TryReserveError) -> Self {
        LayoutError::OutOfMemory
    }
}
