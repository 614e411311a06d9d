use crate::{GraphLayout, NodeId, Point, Rect, SortOutcome};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Summary of a relayout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub sort: SortOutcome,

    /// Nodes that were not reached from any sink and have no position
    pub unplaced: Vec<NodeId>,
}

impl LayoutReport {
    pub fn is_complete(&self) -> bool {
        self.sort.is_complete() && self.unplaced.is_empty()
    }
}

impl GraphLayout {
    /// Sort the graph, place every node reachable from a sink, and center
    /// the drawing on the origin
    ///
    /// Sinks share the rank `y = 0` and their providers go one `ranksep`
    /// above their first placed consumer. Cycles and nodes only feeding into
    /// them don't make the layout fail, they are left without a position
    /// and listed in the report.
    pub fn relayout(&mut self) -> LayoutReport {
        let sort = self.sort();
        self.place();
        self.center();

        let unplaced: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.position.is_none())
            .map(|n| n.id)
            .collect();

        if unplaced.is_empty() {
            debug!("Placed {} nodes", self.nodes.len());
        } else {
            warn!("Could not place nodes {unplaced:?}");
        }

        LayoutReport { sort, unplaced }
    }

    fn place(&mut self) {
        for node in &mut self.nodes {
            node.position = None;
            node.done = false;
        }

        let providers = self.providers();
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for sink in 0..self.nodes.len() {
            if !self.is_sink(sink) {
                continue;
            }

            let x = self.hor_coord(0.0, self.nodes[sink].size.x);
            let node = &mut self.nodes[sink];
            node.done = true;
            node.position = Some(Point::new(x, 0.0));
            trace!("Sink {} at {x}", node.id);

            // Depth first over input pads in increasing order, each frame
            // holds a node and the next pad to visit
            stack.push((sink, 0));
            while let Some(frame) = stack.last_mut() {
                let (consumer, pad) = *frame;
                if pad >= self.nodes[consumer].inpads {
                    stack.pop();
                    continue;
                }
                frame.1 += 1;

                let Some(&provider) = providers.get(&(consumer, pad)) else {
                    continue;
                };
                if self.nodes[provider].done {
                    continue;
                }
                let Some(below) = self.nodes[consumer].position else {
                    continue;
                };

                let y = below.y - self.config.ranksep;
                let x = self
                    .hor_coord(y, self.nodes[provider].size.x)
                    .max(below.x);

                let node = &mut self.nodes[provider];
                node.done = true;
                node.position = Some(Point::new(x, y));
                trace!("Provider {} at ({x}, {y})", node.id);

                stack.push((provider, 0));
            }
        }
    }

    /// A node is a sink when it has no output pads or none of them is
    /// connected
    fn is_sink(&self, slot: usize) -> bool {
        let node = &self.nodes[slot];
        node.outpads == 0 || !self.connections.iter().any(|c| c.from == node.id)
    }

    /// Source store index of each resolved `(destination index, input pad)`
    fn providers(&self) -> HashMap<(usize, usize), usize> {
        self.connections
            .iter()
            .filter_map(|c| c.resolved.map(|(from, to)| ((to, c.to_pad), from)))
            .collect()
    }

    /// First free horizontal slot on the rank at `y` for a node `width` wide
    ///
    /// Nodes of a rank are packed left to right with `nodesep` between
    /// their boxes, the first one is centered at `nodesep`.
    fn hor_coord(&self, y: f64, width: f64) -> f64 {
        let nodesep = self.config.nodesep;
        self.nodes
            .iter()
            .filter_map(|n| {
                let p = n.position?;
                // Ranks are exact: they come from the same chain of
                // subtractions.
                (p.y == y).then(|| p.x + n.size.x / 2.0 + nodesep + width / 2.0)
            })
            .fold(nodesep, f64::max)
    }

    fn center(&mut self) {
        let Some(bounds) = self.nodes.iter().filter_map(|n| n.bounds()).reduce(Rect::union)
        else {
            return;
        };

        let shift = bounds.center();
        for node in &mut self.nodes {
            if let Some(p) = node.position.as_mut() {
                *p = p.offset(-shift.x, -shift.y);
            }
        }
    }
}
