//! Commands run against a workspace while `watch` is active

use crate::common::{change, TestWorkspace};
use anyhow::Result;
use std::process::Child;
use std::time::{Duration, Instant};

/// Kills the background watcher even when an assertion fails
struct Watcher(Child);

impl Drop for Watcher {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Re-run `show --all` until the watcher has applied its first batch
fn wait_for_tree(ws: &TestWorkspace, label: &str) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(20);
    while Instant::now() < deadline {
        let show = gview!(ws.path(), "show", "--all").execute()?;
        if show.success() && show.contains_stdout(label) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(200));
    }
    anyhow::bail!("watch never populated the tree with '{}'", label)
}

#[test]
fn test_commands_work_while_watching() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser"), change(2, "docs", "Typo")])?;

    let _watcher = Watcher(gview!(ws.path(), "watch").spawn()?);
    wait_for_tree(&ws, "1: Fix parser")?;

    let ids = gview!(ws.path(), "show", "--ids").assert_success()?;
    let core = ids.node_id("core").expect("core id printed");
    gview!(ws.path(), "expand", &core).assert_success()?;

    let show = gview!(ws.path(), "show").assert_success()?;
    assert!(show.contains_stdout("▾ core"));
    assert!(show.contains_stdout("1: Fix parser"));

    gview!(ws.path(), "filter", "add", "project", "docs").assert_success()?;
    let filtered = gview!(ws.path(), "show").assert_success()?;
    assert!(filtered.contains_stdout("docs"));
    assert!(!filtered.contains_stdout("core"));
    Ok(())
}

#[test]
fn test_watch_logs_to_workspace_by_default() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_batch(&[change(1, "core", "Fix parser")])?;

    let _watcher = Watcher(gview!(ws.path(), "watch").spawn()?);
    wait_for_tree(&ws, "1: Fix parser")?;

    let logs = std::fs::read_dir(ws.path().join(".gview/logs"))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("gview.log"))
        .count();
    assert_eq!(logs, 1);
    Ok(())
}
