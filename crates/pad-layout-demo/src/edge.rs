use anyhow::{anyhow, bail, Context, Result};
use pad_layout::{GraphLayout, NodeId};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// One end of an edge argument, a node name and a pad number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadRef {
    pub node: String,
    pub pad: usize,
}

impl FromStr for PadRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (node, pad) = match s.split_once(':') {
            Some((node, pad)) => (
                node,
                pad.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid pad number in {s:?}"))?,
            ),
            None => (s, 0),
        };
        let node = node.trim();
        if node.is_empty() {
            bail!("Missing node name in {s:?}");
        }
        Ok(Self {
            node: node.to_string(),
            pad,
        })
    }
}

/// A connection given on the command line as `SRC[:PAD]->DST[:PAD]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeArg {
    pub from: PadRef,
    pub to: PadRef,
}

impl FromStr for EdgeArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (from, to) = s
            .split_once("->")
            .ok_or_else(|| anyhow!("Expected SRC[:PAD]->DST[:PAD], got {s:?}"))?;
        Ok(Self {
            from: from.parse()?,
            to: to.parse()?,
        })
    }
}

/// Build a graph from edge arguments
///
/// Nodes are created in order of first appearance and get enough pads for
/// every pad number the edges mention. Returns the node handles by name.
pub fn build_graph(
    graph: &mut GraphLayout,
    edges: &[EdgeArg],
) -> Result<Vec<(String, NodeId)>> {
    let mut names: Vec<(String, NodeId)> = Vec::new();
    let mut by_name: HashMap<String, NodeId> = HashMap::new();

    for edge in edges {
        for end in [&edge.from, &edge.to] {
            if !by_name.contains_key(&end.node) {
                let id = graph.new_node()?;
                debug!("Node {} is {id}", end.node);
                by_name.insert(end.node.clone(), id);
                names.push((end.node.clone(), id));
            }
        }

        let from = by_name[&edge.from.node];
        let to = by_name[&edge.to.node];

        let outpads = graph.outpads(from)?.max(edge.from.pad + 1);
        graph.set_outpads(from, outpads)?;
        let inpads = graph.inpads(to)?.max(edge.to.pad + 1);
        graph.set_inpads(to, inpads)?;

        graph.connect(from, edge.from.pad, to, edge.to.pad)?;
    }

    Ok(names)
}
