//! Layout of pad-to-pad connected directed acyclic graphs
//!
//! Nodes are referenced by stable [`NodeId`] handles and expose numbered
//! input and output pads. Connections bind an output pad of one node to an
//! input pad of another. [`GraphLayout::relayout`] sorts the nodes, puts the
//! sinks on a common rank and stacks their providers one `ranksep` above
//! them, then centers the drawing on the origin.
//!
//! # Example
//!
//! ```
//! use pad_layout::GraphLayout;
//!
//! let mut graph = GraphLayout::new();
//! let src = graph.new_node().unwrap();
//! let sink = graph.new_node().unwrap();
//! graph.set_outpads(src, 1).unwrap();
//! graph.set_inpads(sink, 1).unwrap();
//! graph.connect(src, 0, sink, 0).unwrap();
//!
//! let report = graph.relayout();
//! assert!(report.is_complete());
//!
//! let src_pos = graph.node_position(src).unwrap();
//! let sink_pos = graph.node_position(sink).unwrap();
//! assert_eq!(sink_pos.y - src_pos.y, graph.ranksep());
//!
//! // Edge end points, anchored on the pads
//! let (start, end) = graph.connection_coords(0).unwrap();
//! assert!(start.y < end.y);
//! ```

mod config;
mod error;
mod geometry;
mod order;
mod place;
mod query;
mod store;

pub use config::LayoutConfig;
pub use error::LayoutError;
pub use geometry::{Point, Rect, Vec2};
pub use order::SortOutcome;
pub use place::LayoutReport;
pub use store::{Connection, GraphLayout, Node, NodeId};
