//! Print the tree

use crate::session::Session;
use crate::util;
use anyhow::Result;
use gv_core::{Collapsible, FilterState, NodeKey, RootsView, TreeEngine};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

#[derive(Debug, Clone, Copy)]
struct ShowOptions {
    /// Ignore filters and expansion state
    all: bool,
    ids: bool,
}

pub async fn run(all: bool, ids: bool) -> Result<()> {
    let session = Session::open().await?;
    let engine = &session.engine;
    let options = ShowOptions { all, ids };

    println!("{}", "Review Tree".if_supports_color(Stdout, |t| t.bold()));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match session.snapshot_at_ms {
        Some(ts) => println!(
            "Fetched:  {}",
            util::format_relative_time(ts).if_supports_color(Stdout, |t| t.dimmed())
        ),
        None => {
            println!("{}", "Never refreshed".if_supports_color(Stdout, |t| t.yellow()));
            let tip = "Tip: Run 'gview refresh'";
            println!("  {}", tip.if_supports_color(Stdout, |t| t.dimmed()));
            return Ok(());
        }
    }
    let filters = engine.filter_state();
    if filters.is_active() {
        let described = describe_filters(filters);
        println!("Filters:  {}", described.if_supports_color(Stdout, |t| t.cyan()));
    }
    println!();

    let roots = if all {
        engine.roots().to_vec()
    } else {
        match engine.visible_roots() {
            RootsView::Nodes(keys) => keys,
            RootsView::Empty => Vec::new(),
            RootsView::AllHidden => {
                let message = "Nothing matches the active filters";
                let tip = "Tip: 'gview filter clear' or 'gview show --all'";
                println!("{}", message.if_supports_color(Stdout, |t| t.yellow()));
                println!("  {}", tip.if_supports_color(Stdout, |t| t.dimmed()));
                return Ok(());
            }
        }
    };
    if roots.is_empty() {
        println!("{}", "Nothing found".if_supports_color(Stdout, |t| t.dimmed()));
        return Ok(());
    }

    for root in roots {
        print_node(engine, root, 0, options);
    }
    Ok(())
}

fn print_node(engine: &TreeEngine, key: NodeKey, depth: usize, options: ShowOptions) {
    let (Some(item), Some(node)) = (engine.tree_item(key), engine.node(key)) else {
        return;
    };

    let marker = match item.collapsible {
        Collapsible::None => " ",
        Collapsible::Collapsed => "▸",
        Collapsible::Expanded => "▾",
    };
    let icon = item
        .icon
        .as_deref()
        .map(|icon| format!("[{}] ", icon))
        .unwrap_or_default();

    let mut line = format!(
        "{}{} {}",
        "  ".repeat(depth),
        marker,
        icon.if_supports_color(Stdout, |t| t.dimmed())
    );
    if !node.visible {
        line.push_str(&item.label.if_supports_color(Stdout, |t| t.dimmed()).to_string());
    } else if item.changed {
        line.push_str(&format!(
            "{} {}",
            item.label.if_supports_color(Stdout, |t| t.bold()),
            "●".if_supports_color(Stdout, |t| t.yellow())
        ));
    } else {
        line.push_str(&item.label);
    }
    if let Some(tooltip) = item.tooltip.as_deref().filter(|tip| !tip.is_empty()) {
        line.push_str(&format!("  {}", tooltip.if_supports_color(Stdout, |t| t.dimmed())));
    }
    if options.ids {
        line.push_str(&format!("  {}", item.id.as_str().if_supports_color(Stdout, |t| t.dimmed())));
    }
    println!("{}", line);

    let children = if options.all {
        engine.children(key).to_vec()
    } else if item.collapsible == Collapsible::Expanded {
        engine.visible_children(key)
    } else {
        Vec::new()
    };
    for child in children {
        print_node(engine, child, depth + 1, options);
    }
}

pub fn describe_filters(filters: &FilterState) -> String {
    let mut parts: Vec<String> = filters
        .terms
        .iter()
        .map(|t| format!("{}=~{}", t.key, t.pattern))
        .collect();
    if filters.changed_only {
        parts.push("changed-only".to_string());
    }
    parts.join(", ")
}
