mod edge;

use anyhow::{Context, Result};
use clap::Parser;
use edge::{build_graph, EdgeArg};
use pad_layout::{GraphLayout, LayoutConfig};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Lay out a pipeline graph and print node centers and edge end points
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// RON file with the layout tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum horizontal gap between nodes of a rank
    #[arg(long)]
    nodesep: Option<f64>,

    /// Vertical distance between ranks
    #[arg(long)]
    ranksep: Option<f64>,

    /// Connections as SRC[:PAD]->DST[:PAD], nodes are created on first use.
    /// Defaults to a single `first->second` link.
    edges: Vec<EdgeArg>,
}

fn load_config(args: &Args) -> Result<LayoutConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ron::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => LayoutConfig::default(),
    };

    if let Some(nodesep) = args.nodesep {
        config.nodesep = nodesep;
    }
    if let Some(ranksep) = args.ranksep {
        config.ranksep = ranksep;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = load_config(&args)?;
    debug!("Using {config:?}");

    let edges = if args.edges.is_empty() {
        vec!["first->second".parse()?]
    } else {
        args.edges
    };

    let mut graph = GraphLayout::with_config(config);
    let names = build_graph(&mut graph, &edges)?;

    let report = graph.relayout();
    if !report.sort.cycles.is_empty() {
        warn!("Graph has cycles: {:?}", report.sort.cycles);
    }

    for (name, id) in &names {
        match graph.node_position(*id) {
            Ok(pos) => println!("{name} ({id}): {:.1} {:.1}", pos.x, pos.y),
            Err(e) => println!("{name} ({id}): {e}"),
        }
    }

    for index in 0..graph.connection_count() {
        let (from, to) = graph.connection_nodes(index)?;
        match graph.connection_coords(index) {
            Ok((start, end)) => println!(
                "{from} -> {to}: {:.1} {:.1} -> {:.1} {:.1}",
                start.x, start.y, end.x, end.y
            ),
            Err(e) => println!("{from} -> {to}: {e}"),
        }
    }

    Ok(())
}
