//! Per-node commands: expand, collapse, acknowledge

use crate::session::Session;
use anyhow::Result;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

pub async fn run_expand(reference: &str, expanded: bool) -> Result<()> {
    let mut session = Session::open().await?;
    let key = session.resolve_node(reference)?;
    let Some(node) = session.engine.node(key) else {
        anyhow::bail!("Unknown node '{}'", reference);
    };
    if node.is_leaf() {
        anyhow::bail!("'{}' is a leaf and cannot be expanded", node.label);
    }
    let id = node.id.clone();
    let label = node.label.clone();

    session.engine.set_expanded(id.as_str(), expanded);
    let verb = if expanded { "Expanded" } else { "Collapsed" };
    println!(
        "{} {} {}",
        "✓".if_supports_color(Stdout, |t| t.green()),
        verb,
        label.if_supports_color(Stdout, |t| t.cyan())
    );
    Ok(())
}

pub async fn run_ack(reference: Option<&str>, all: bool) -> Result<()> {
    let mut session = Session::open().await?;

    let cleared = match (reference, all) {
        (_, true) => {
            let roots = session.engine.roots().to_vec();
            roots.into_iter().map(|root| session.engine.acknowledge(root)).sum()
        }
        (Some(reference), false) => {
            let key = session.resolve_node(reference)?;
            session.engine.acknowledge(key)
        }
        (None, false) => anyhow::bail!("Specify a node id or --all"),
    };

    if cleared == 0 {
        println!("{}", "Nothing to acknowledge".if_supports_color(Stdout, |t| t.dimmed()));
    } else {
        println!(
            "{} Acknowledged {} change(s)",
            "✓".if_supports_color(Stdout, |t| t.green()),
            cleared
        );
    }
    Ok(())
}
