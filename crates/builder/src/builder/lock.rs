//! Build lock for an output directory.
//!
//! Two builds writing the same output directory would race on the artifact
//! delete/rename. The lock file records its owner so a crashed build can be
//! detected and its lock reclaimed.

use super::BuildError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = ".appbuild.lock";

/// Contents of the lock file.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockOwner {
    pub pid: u32,
    pub started_at: String,
}

impl LockOwner {
    /// Check if the owning process is still running.
    #[cfg(target_os = "linux")]
    pub fn is_alive(&self) -> bool {
        Path::new(&format!("/proc/{}", self.pid)).exists()
    }

    /// Without procfs there is no cheap liveness check; assume the owner runs.
    #[cfg(not(target_os = "linux"))]
    pub fn is_alive(&self) -> bool {
        true
    }
}

/// Held lock; removes the lock file when dropped.
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    /// Take the lock for `dir`, reclaiming it from a dead owner.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let owner = LockOwner {
            pid: std::process::id(),
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        let contents = serde_json::to_string_pretty(&owner)?;

        // One retry: the first attempt may find a stale lock and remove it.
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(contents.as_bytes())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log::debug!("Acquired {}", path.display());
                    return Ok(BuildLock { path });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    reclaim_if_stale(dir, &path)?;
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("Failed to create {}", path.display()));
                }
            }
        }

        anyhow::bail!("Lost the race for {}", path.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to remove {}: {err}", self.path.display());
        }
    }
}

/// Remove the lock at `path` if its owner is gone, else fail with
/// [`BuildError::Locked`].
fn reclaim_if_stale(dir: &Path, path: &Path) -> Result<()> {
    let owner = match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<LockOwner>(&contents).ok(),
        // Released between our create attempt and this read
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    match owner {
        Some(owner) if owner.is_alive() => Err(BuildError::Locked {
            dir: dir.to_path_buf(),
            pid: owner.pid,
            lock_file: path.to_path_buf(),
        }
        .into()),
        Some(owner) => {
            log::warn!(
                "Removing stale lock from process {} (started {})",
                owner.pid,
                owner.started_at
            );
            remove_lock_file(path)
        }
        None => {
            log::warn!("Removing unreadable lock file {}", path.display());
            remove_lock_file(path)
        }
    }
}

fn remove_lock_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
