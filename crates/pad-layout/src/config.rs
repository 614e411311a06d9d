use crate::Vec2;
use serde::{Deserialize, Serialize};

/// Tunables of the layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum horizontal gap between two nodes of the same rank
    pub nodesep: f64,

    /// Vertical distance between the centers of two adjacent ranks
    pub ranksep: f64,

    /// Size given to newly created nodes
    pub node_size: Vec2,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            nodesep: 16.0,
            ranksep: 64.0,
            node_size: Vec2::new(32.0, 32.0),
        }
    }
}
