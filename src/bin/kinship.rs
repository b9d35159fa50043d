use ancesta::kinship::{render_label, resolve};
use ancesta::RelationGraph;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kinship")]
#[command(about = "Resolve kinship labels from a root over a graph snapshot")]
struct Args {
    /// Graph snapshot JSON ({targets, items, relations})
    snapshot: PathBuf,

    /// Root individual id to resolve from
    root: String,

    /// Only print the kinship of this individual
    #[arg(short, long)]
    target: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let graph: RelationGraph = serde_json::from_str(&raw)
        .with_context(|| format!("parsing snapshot {}", args.snapshot.display()))?;

    if !graph.items.contains_key(&args.root) {
        anyhow::bail!("root {} not present in snapshot", args.root);
    }

    let kinships = resolve(&args.root, &graph);

    let mut ids: Vec<&String> = kinships.keys().collect();
    ids.sort();

    let mut printed = 0usize;
    for id in ids {
        if let Some(target) = &args.target {
            if id != target {
                continue;
            }
        }
        let name = graph
            .items
            .get(id)
            .map(|p| p.name.as_str())
            .unwrap_or(id.as_str());
        for path in &kinships[id] {
            println!("{}  {}  {}", id, name, render_label(path));
            printed += 1;
        }
    }

    if printed == 0 {
        match &args.target {
            Some(target) => println!("No kinship path from {} to {}.", args.root, target),
            None => println!("No one reachable from {}.", args.root),
        }
    }

    Ok(())
}
