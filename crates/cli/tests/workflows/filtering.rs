//! Persistent filters

use crate::common::{change, TestWorkspace};
use anyhow::Result;

fn populated() -> Result<TestWorkspace> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[
        change(1, "core", "Fix parser"),
        change(2, "docs", "Typo"),
        change(3, "tools", "Lint"),
    ])?;
    gview!(ws.path(), "refresh").assert_success()?;
    Ok(ws)
}

#[test]
fn test_term_filter_persists_and_clears() -> Result<()> {
    let ws = populated()?;

    let added = gview!(ws.path(), "filter", "add", "PROJECT", "^(core|docs)$").assert_success()?;
    assert!(added.contains_stdout("Filter added"));
    assert!(added.contains_stdout("2 top-level nodes visible"));

    let list = gview!(ws.path(), "filter", "list").assert_success()?;
    assert!(list.contains_stdout("PROJECT=~^(core|docs)$"));

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("Filters:"));
    assert!(show.contains_stdout("core"));
    assert!(!show.contains_stdout("tools"));

    // --all ignores filters
    let all = gview!(ws.path(), "show", "--all").assert_success()?;
    assert!(all.contains_stdout("tools"));

    let cleared = gview!(ws.path(), "filter", "clear").assert_success()?;
    assert!(cleared.contains_stdout("3 top-level nodes visible"));
    let list = gview!(ws.path(), "filter", "list").assert_success()?;
    assert!(list.contains_stdout("No active filters"));
    Ok(())
}

#[test]
fn test_filter_matching_nothing() -> Result<()> {
    let ws = populated()?;

    let added = gview!(ws.path(), "filter", "add", "project", "^nomatch$").assert_success()?;
    assert!(added.contains_stdout("Nothing matches the active filters"));

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("Nothing matches the active filters"));
    Ok(())
}

#[test]
fn test_changed_only() -> Result<()> {
    let ws = populated()?;

    // Nothing is flagged after the first population
    let on = gview!(ws.path(), "filter", "changed-only", "on").assert_success()?;
    assert!(on.contains_stdout("Nothing matches the active filters"));

    ws.write_batch(&[
        change(1, "core", "Fix parser"),
        change(2, "docs", "Typo fixed"),
        change(3, "tools", "Lint"),
    ])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("docs"));
    assert!(!show.contains_stdout("core"));
    assert!(!show.contains_stdout("tools"));

    let off = gview!(ws.path(), "filter", "changed-only", "off").assert_success()?;
    assert!(off.contains_stdout("3 top-level nodes visible"));
    Ok(())
}

#[test]
fn test_remove_filter() -> Result<()> {
    let ws = populated()?;
    gview!(ws.path(), "filter", "add", "project", "core").assert_success()?;

    let removed = gview!(ws.path(), "filter", "remove", "project").assert_success()?;
    assert!(removed.contains_stdout("Removed 1 filter(s)"));

    let missing = gview!(ws.path(), "filter", "remove", "project").assert_failure()?;
    assert!(missing.contains_stderr("No filter on 'project'"));
    Ok(())
}

#[test]
fn test_invalid_regex_rejected() -> Result<()> {
    let ws = populated()?;
    let result = gview!(ws.path(), "filter", "add", "project", "(").assert_failure()?;
    assert!(result.contains_stderr("Failed to add filter"));

    let list = gview!(ws.path(), "filter", "list").assert_success()?;
    assert!(list.contains_stdout("No active filters"));
    Ok(())
}
