//! Shell-command record source
//!
//! Runs the configured command through `sh -c` and parses stdout as JSON
//! lines. Any stderr output fails the query, matching how review tools
//! report authentication and query-syntax problems.

use crate::{RecordSource, SourceError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Output cap applied when none is configured (200 KiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 200 * 1024;

/// Runs a shell command and parses its JSON-lines output
pub struct CommandSource {
    command: String,
    max_output_bytes: usize,
    cwd: Option<PathBuf>,
    /// Bumped by `kill`; in-flight queries watch for the change
    cancel: watch::Sender<u64>,
}

impl CommandSource {
    pub fn new(command: impl Into<String>) -> Self {
        let (cancel, _) = watch::channel(0);
        Self {
            command: command.into(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            cwd: None,
            cancel,
        }
    }

    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Run the command from `dir` instead of the current directory
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl RecordSource for CommandSource {
    async fn query(&self) -> Result<Vec<Value>, SourceError> {
        let mut cancelled = self.cancel.subscribe();

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        debug!("Running query: {}", self.command);
        let mut child = cmd.spawn().map_err(|source| SourceError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.max_output_bytes;

        let collect = async {
            let (out, err) = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
            let status = child.wait().await?;
            Ok::<_, SourceError>((out, err, status))
        };

        let outcome = tokio::select! {
            result = collect => Some(result),
            _ = cancelled.changed() => None,
        };
        let Some(result) = outcome else {
            if let Err(e) = child.start_kill() {
                debug!("Query already exited on cancel: {}", e);
            }
            debug!("Query cancelled");
            return Err(SourceError::Cancelled);
        };
        let (stdout, stderr, status) = result?;

        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        if !stderr.is_empty() {
            return Err(SourceError::Stderr {
                message: "Query failed".to_string(),
                stderr,
            });
        }
        if !status.success() {
            return Err(SourceError::ExitStatus {
                code: status.code(),
            });
        }

        Ok(parse_lines(&String::from_utf8_lossy(&stdout)))
    }

    fn kill(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }
}

async fn read_capped<R>(reader: Option<R>, limit: usize) -> Result<Vec<u8>, SourceError>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(SourceError::OutputTooLarge { limit });
    }
    Ok(buf)
}

/// Parse JSON-lines output; blank output is an empty batch
pub fn parse_lines(output: &str) -> Vec<Value> {
    let output = output.trim();
    if output.is_empty() {
        return Vec::new();
    }

    let mut records = Vec::new();
    for (index, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed output line {}: {}", index + 1, e),
        }
    }
    records
}
