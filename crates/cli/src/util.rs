//! Shared utilities for CLI commands

use gv_core::RefreshReport;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use std::time::Duration;

/// Spinner shown on stderr while the query runs
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Print the outcome of one refresh
pub fn print_report(report: &RefreshReport) {
    println!(
        "{} Refreshed: {} nodes ({} new, {} removed)",
        "✓".if_supports_color(Stdout, |t| t.green()),
        report.total_nodes,
        report.created,
        report.removed
    );
    if report.skipped > 0 {
        let skipped = format!("{} malformed records skipped", report.skipped);
        println!("  {}", skipped.if_supports_color(Stdout, |t| t.yellow()));
    }
    if report.first_population {
        print_note("First population: nothing flagged");
        return;
    }
    if report.changed.is_empty() {
        print_note("No changes");
        return;
    }

    println!(
        "  {} changed:",
        report.changed.len().if_supports_color(Stdout, |t| t.yellow())
    );
    for key in &report.changed {
        println!(
            "    {} {}",
            "●".if_supports_color(Stdout, |t| t.yellow()),
            report.label_of(key)
        );
    }
}

/// Indented, dimmed line on stdout
pub fn print_note(note: &str) {
    println!("  {}", note.if_supports_color(Stdout, |t| t.dimmed()));
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let datetime = UNIX_EPOCH + Duration::from_millis(ts_ms);

    if let Ok(elapsed) = SystemTime::now().duration_since(datetime) {
        let seconds = elapsed.as_secs();

        if seconds < 60 {
            format!("{} seconds ago", seconds)
        } else if seconds < 3600 {
            format!("{} minutes ago", seconds / 60)
        } else if seconds < 86400 {
            format!("{} hours ago", seconds / 3600)
        } else {
            format!("{} days ago", seconds / 86400)
        }
    } else {
        "in the future".to_string()
    }
}
