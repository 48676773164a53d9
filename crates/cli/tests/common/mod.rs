//! Common utilities for integration tests

#[macro_use]
pub mod cli;

use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

/// Config used by the workflow tests: the query reads `batch.jsonl`
pub const TEST_CONFIG: &str = r#"
[query]
command = "cat batch.jsonl"
interval_secs = 10

[tree]
key_field = "number"

[[schema.levels]]
children = ["project"]

[[schema.levels]]
parent = "project"
children = [{ property = "number", format = "${number}: ${subject}", tracks_changes = true }]

[[schema.levels]]
parent = "number"
children = [{ property = "approvals.value", formatter = "score", tooltip = "${approvals.by}" }]
"#;

/// Initialized workspace in a temp directory
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Run `gview init` and install [`TEST_CONFIG`]
    pub fn new() -> Result<Self> {
        Self::with_config(TEST_CONFIG)
    }

    pub fn with_config(config: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        gview!(dir.path(), "init").assert_success()?;
        std::fs::write(dir.path().join(".gview/config.toml"), config)?;
        let workspace = Self { dir };
        workspace.write_batch(&[])?;
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Replace the records the query returns
    pub fn write_batch(&self, records: &[Value]) -> Result<()> {
        let lines: Vec<String> = records.iter().map(Value::to_string).collect();
        std::fs::write(self.path().join("batch.jsonl"), lines.join("\n"))?;
        Ok(())
    }

    /// Write raw query output
    pub fn write_raw(&self, text: &str) -> Result<()> {
        std::fs::write(self.path().join("batch.jsonl"), text)?;
        Ok(())
    }
}

/// A review-style record
pub fn change(number: u64, project: &str, subject: &str) -> Value {
    serde_json::json!({
        "number": number,
        "project": project,
        "subject": subject,
        "approvals": [{"value": "1", "by": "alice"}]
    })
}
