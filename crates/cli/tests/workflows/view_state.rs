//! Expansion state and config inspection

use crate::common::{change, TestWorkspace};
use anyhow::Result;

#[test]
fn test_expand_and_collapse_persist() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let ids = gview!(ws.path(), "show", "--ids").assert_success()?;
    let core = ids.node_id("core").expect("root id printed");

    let expanded = gview!(ws.path(), "expand", &core).assert_success()?;
    assert!(expanded.contains_stdout("Expanded core"));

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("▾ core"));
    assert!(show.contains_stdout("▸ 1: Fix parser"));

    gview!(ws.path(), "collapse", &core).assert_success()?;
    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("▸ core"));
    assert!(!show.contains_stdout("1: Fix parser"));
    Ok(())
}

#[test]
fn test_leaf_cannot_be_expanded() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;
    gview!(ws.path(), "refresh").assert_success()?;

    let all = gview!(ws.path(), "show", "--all", "--ids").assert_success()?;
    let leaf = all.node_id("+1").expect("leaf id printed");

    let result = gview!(ws.path(), "expand", &leaf).assert_failure()?;
    assert!(result.contains_stderr("is a leaf"));
    Ok(())
}

#[test]
fn test_ids_are_stable_across_refreshes() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;
    gview!(ws.path(), "refresh").assert_success()?;
    let before = gview!(ws.path(), "show", "--all", "--ids").assert_success()?;

    ws.write_batch(&[change(1, "core", "Fix parser v2")])?;
    gview!(ws.path(), "refresh").assert_success()?;
    let after = gview!(ws.path(), "show", "--all", "--ids").assert_success()?;

    assert_eq!(before.node_id("core"), after.node_id("core"));
    assert_eq!(before.node_id("1: Fix parser"), after.node_id("1: Fix parser v2"));
    Ok(())
}

#[test]
fn test_config_get_and_path() -> Result<()> {
    let ws = TestWorkspace::new()?;

    let interval = gview!(ws.path(), "config", "get", "query.interval_secs").assert_success()?;
    assert_eq!(interval.stdout.trim(), "10");

    let command = gview!(ws.path(), "config", "get", "query.command").assert_success()?;
    assert_eq!(command.stdout.trim(), "cat batch.jsonl");

    let path = gview!(ws.path(), "config", "path").assert_success()?;
    assert!(path.stdout.trim().ends_with("config.toml"));

    let list = gview!(ws.path(), "config", "list").assert_success()?;
    assert!(list.contains_stdout("level 1: number"));
    Ok(())
}
