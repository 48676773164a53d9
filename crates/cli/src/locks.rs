//! Workspace lock serializing gview processes
//!
//! The state database belongs to one process at a time: a command holds the
//! lock while it loads, reconciles and saves, never while a query runs. The
//! lock is an exclusive `flock` on `.gview/locks/refresh.lock`; the kernel
//! drops it when the holder exits, so a crashed process never leaves a stale
//! lock behind.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Delay between attempts while waiting for the lock
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Held for the lifetime of a command
pub struct RefreshLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Diagnostic content of the lock file
#[derive(Debug, Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: u64,
}

impl RefreshLock {
    /// Acquire the lock without blocking
    ///
    /// Fails while another process holds it, naming the holder's pid.
    pub fn acquire(locks_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(locks_dir).context("Failed to create locks directory")?;
        let lock_path = locks_dir.join("refresh.lock");

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            let holder = Self::read_lock_content(&mut file)
                .map(|c| format!(" (held by pid {})", c.pid))
                .unwrap_or_default();
            anyhow::bail!("Workspace locked by another gview command{}", holder);
        }

        Self::write_lock_content(&mut file)?;

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Acquire the lock, retrying for up to `wait`
    ///
    /// Another command only holds it for one load/reconcile/save sequence,
    /// so a short wait rides out a concurrent `watch` cycle.
    pub async fn acquire_within(locks_dir: &Path, wait: Duration) -> Result<Self> {
        let deadline = Instant::now() + wait;
        loop {
            match Self::acquire(locks_dir) {
                Ok(lock) => return Ok(lock),
                Err(e) if Instant::now() >= deadline => return Err(e),
                Err(e) => {
                    debug!("Waiting for workspace lock: {}", e);
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: current_timestamp_ms(),
        };

        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        serde_json::from_str(&contents).context("Failed to deserialize lock content")
    }
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
