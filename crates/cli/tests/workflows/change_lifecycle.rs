//! Refresh, change detection and acknowledgement across invocations

use crate::common::{change, TestWorkspace};
use anyhow::Result;

#[test]
fn test_first_refresh_flags_nothing() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser"), change(2, "docs", "Typo")])?;

    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("Refreshed: 6 nodes (6 new, 0 removed)"));
    assert!(result.contains_stdout("First population: nothing flagged"));

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("▸ core"));
    assert!(show.contains_stdout("▸ docs"));
    assert!(!show.contains_stdout("1: Fix parser"), "collapsed by default");
    assert!(!show.contains_stdout("●"));

    let all = gview!(ws.path(), "show", "--all").assert_success()?;
    assert!(all.contains_stdout("1: Fix parser"));
    assert!(all.contains_stdout("+1  alice"));
    Ok(())
}

#[test]
fn test_unchanged_rerun_reports_no_changes() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;

    gview!(ws.path(), "refresh").assert_success()?;
    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("(0 new, 0 removed)"));
    assert!(result.contains_stdout("No changes"));
    Ok(())
}

#[test]
fn test_change_flag_survives_until_acknowledged() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser"), change(2, "core", "Add lexer")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    ws.write_batch(&[change(1, "core", "Fix parser v2"), change(2, "core", "Add lexer")])?;
    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("1 changed:"));
    assert!(result.contains_stdout("● 1: Fix parser v2"));

    // A later invocation still sees the flag
    let show = gview!(ws.path(), "show", "--all", "--ids").assert_success()?;
    let flagged = show
        .stdout
        .lines()
        .find(|line| line.contains("1: Fix parser v2"))
        .unwrap_or_default()
        .to_string();
    assert!(flagged.contains("●"), "flag missing: {flagged}");
    let unflagged = show
        .stdout
        .lines()
        .find(|line| line.contains("2: Add lexer"))
        .unwrap_or_default()
        .to_string();
    assert!(!unflagged.contains("●"));

    let id = show.node_id("1: Fix parser v2").expect("node id printed");
    let ack = gview!(ws.path(), "ack", &id[..8]).assert_success()?;
    assert!(ack.contains_stdout("Acknowledged 1 change(s)"));

    let show = gview!(ws.path(), "show", "--all").assert_success()?;
    assert!(!show.contains_stdout("●"));

    let again = gview!(ws.path(), "ack", "--all").assert_success()?;
    assert!(again.contains_stdout("Nothing to acknowledge"));
    Ok(())
}

#[test]
fn test_new_entity_is_flagged_and_removed_entity_pruned() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser"), change(2, "docs", "Typo")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    ws.write_batch(&[change(1, "core", "Fix parser"), change(3, "core", "New feature")])?;
    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("● 3: New feature"));
    // docs, 2: Typo and its approval leaf
    assert!(result.contains_stdout("3 removed"));

    let show = gview!(ws.path(), "show", "--all").assert_success()?;
    assert!(!show.contains_stdout("docs"));
    assert!(!show.contains_stdout("2: Typo"));
    Ok(())
}

#[test]
fn test_ack_all_clears_every_flag() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "A")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    ws.write_batch(&[change(1, "core", "A2"), change(2, "docs", "B")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let ack = gview!(ws.path(), "ack", "--all").assert_success()?;
    assert!(ack.contains_stdout("Acknowledged 2 change(s)"));
    Ok(())
}

#[test]
fn test_clear_resets_to_first_population() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "A")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let cleared = gview!(ws.path(), "clear").assert_success()?;
    assert!(cleared.contains_stdout("Cleared 3 nodes"));

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("Never refreshed"));

    ws.write_batch(&[change(1, "core", "A changed")])?;
    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("First population: nothing flagged"));
    Ok(())
}
