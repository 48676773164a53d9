//! On-disk layout of a gview state directory

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the state directory
pub const DIR_NAME: &str = ".gview";

/// A `.gview/` directory and the paths inside it
///
/// ```text
/// .gview/
///   config.toml
///   locks/
///     refresh.lock
///   state/
///     view.db/
///   logs/
///   tmp/
/// ```
#[derive(Debug, Clone)]
pub struct StateDir {
    /// Directory containing `.gview/`
    root: PathBuf,
    /// Path to `.gview/`
    dir: PathBuf,
}

impl StateDir {
    /// Create the directory structure under `root` (existing dirs are kept)
    pub fn init(root: &Path) -> Result<Self> {
        let state = Self::at(root);
        for dir in [
            state.dir.clone(),
            state.locks_dir(),
            state.state_dir(),
            state.logs_dir(),
            state.tmp_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(state)
    }

    /// Open an existing state directory under `root`
    pub fn open(root: &Path) -> Result<Self> {
        let state = Self::at(root);
        if !state.dir.is_dir() {
            anyhow::bail!("No {} directory in {}", DIR_NAME, root.display());
        }
        // later directories may be missing in older layouts
        Self::init(root)
    }

    /// Walk up from `start` to the nearest directory containing `.gview/`
    pub fn discover(start: &Path) -> Result<Self> {
        let mut current = start.to_path_buf();
        loop {
            if current.join(DIR_NAME).is_dir() {
                return Self::open(&current);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => anyhow::bail!(
                    "Not a gview workspace (no {} directory found, run `gview init`)",
                    DIR_NAME
                ),
            }
        }
    }

    fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            dir: root.join(DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("config.toml")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.dir.join("locks")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.join("state")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.dir.join("tmp")
    }
}

/// Write `data` to `target` via a synced temp file and rename
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(tmp_dir)
        .with_context(|| format!("Failed to create temp file in {}", tmp_dir.display()))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}
