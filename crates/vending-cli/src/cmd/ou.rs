use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum OuSubcommand {
    /// Resolve a slash-separated OU path to its id
    Resolve {
        /// e.g. Root/Engineering/Platform
        path: String,
    },

    /// List every OU below the root, up to five levels deep
    List,
}

pub fn run(config: &Path, subcmd: OuSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        OuSubcommand::Resolve { path } => resolve(config, &path, json),
        OuSubcommand::List => list(config, json),
    }
}

fn resolve(config: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let provider = super::provider(config)?;
    let node = super::block_on(provider.resolve_org_unit(path))?
        .with_context(|| format!("failed to resolve '{path}'"))?;

    if json {
        return print_json(&node);
    }
    println!("{}  {}", node.id, node.path_string());
    Ok(())
}

fn list(config: &Path, json: bool) -> anyhow::Result<()> {
    let provider = super::provider(config)?;
    let tree = super::block_on(provider.list_org_units())?
        .context("failed to list organizational units")?;

    if json {
        return print_json(&tree);
    }

    if tree.nodes.is_empty() {
        println!("No organizational units.");
    } else {
        let rows = tree
            .nodes
            .iter()
            .map(|n| vec![n.path_string(), n.id.clone()])
            .collect();
        print_table(&["PATH", "ID"], rows);
    }
    for skipped in &tree.truncated {
        eprintln!("note: children of {} ({}) not listed; depth limit reached", skipped.path, skipped.id);
    }
    Ok(())
}
