//! Failure paths and unusual input

use crate::common::{change, TestWorkspace, TEST_CONFIG};
use anyhow::Result;
use tempfile::TempDir;

#[test]
fn test_commands_outside_workspace_fail() -> Result<()> {
    let dir = TempDir::new()?;
    let result = gview!(dir.path(), "show").assert_failure()?;
    assert!(result.contains_stderr("Not a gview workspace"));
    Ok(())
}

#[test]
fn test_init_twice_requires_force() -> Result<()> {
    let dir = TempDir::new()?;
    let first = gview!(dir.path(), "init").assert_success()?;
    assert!(first.contains_stdout("Initialized gview"));

    let second = gview!(dir.path(), "init").assert_failure()?;
    assert!(second.contains_stderr("already initialized"));

    gview!(dir.path(), "init", "--force").assert_success()?;
    Ok(())
}

#[test]
fn test_show_before_refresh() -> Result<()> {
    let ws = TestWorkspace::new()?;
    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("Never refreshed"));
    Ok(())
}

#[test]
fn test_empty_batch() -> Result<()> {
    let ws = TestWorkspace::new()?;
    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("Refreshed: 0 nodes"));

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("Nothing found"));
    Ok(())
}

#[test]
fn test_query_stderr_leaves_tree_untouched() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let failing = TEST_CONFIG.replace("cat batch.jsonl", "echo 'permission denied' >&2");
    std::fs::write(ws.path().join(".gview/config.toml"), failing)?;

    let result = gview!(ws.path(), "refresh").assert_failure()?;
    assert!(result.contains_stderr("Refresh aborted"));
    assert!(result.contains_stderr("permission denied"));

    let show = gview!(ws.path(), "show", "--all").assert_success()?;
    assert!(show.contains_stdout("1: Fix parser"));
    Ok(())
}

#[test]
fn test_query_exit_status_reported() -> Result<()> {
    let config = TEST_CONFIG.replace("cat batch.jsonl", "exit 3");
    let ws = TestWorkspace::with_config(&config)?;

    let result = gview!(ws.path(), "refresh").assert_failure()?;
    assert!(result.contains_stderr("Query exited with status 3"));
    Ok(())
}

#[test]
fn test_missing_query_command() -> Result<()> {
    let config = TEST_CONFIG.replace("cat batch.jsonl", "");
    let ws = TestWorkspace::with_config(&config)?;

    let result = gview!(ws.path(), "refresh").assert_failure()?;
    assert!(result.contains_stderr("No query command configured"));
    Ok(())
}

#[test]
fn test_malformed_records_skipped() -> Result<()> {
    let ws = TestWorkspace::new()?;
    let good = change(1, "core", "Fix parser").to_string();
    ws.write_raw(&format!("{good}\nnot json at all\n42\n\n"))?;

    let result = gview!(ws.path(), "refresh").assert_success()?;
    assert!(result.contains_stdout("Refreshed: 3 nodes"));
    assert!(result.contains_stdout("1 malformed records skipped"));
    Ok(())
}

#[test]
fn test_unknown_node_reference() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let result = gview!(ws.path(), "expand", "ffffffff").assert_failure()?;
    assert!(result.contains_stderr("Unknown node 'ffffffff'"));

    let result = gview!(ws.path(), "ack").assert_failure()?;
    assert!(result.contains_stderr("Specify a node id or --all"));
    Ok(())
}

#[test]
fn test_invalid_config_rejected() -> Result<()> {
    let config = TEST_CONFIG.replace("interval_secs = 10", "interval_secs = 5");
    let ws = TestWorkspace::with_config(&config)?;

    let result = gview!(ws.path(), "show").assert_failure()?;
    assert!(result.contains_stderr("interval_secs must be between 10 and 86400"));
    Ok(())
}
