//! Quarantine for removed and conflicting bundles
//!
//! Nothing is ever deleted: directories are moved into the trash directory
//! under the first free name among `name`, `name-01`, `name-02`, ... An
//! existing quarantine entry is never overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::fs::move_dir;
use crate::error::{BundleError, Result};

/// Highest numeric suffix tried before giving up
pub const DEFAULT_MAX_SUFFIX: u32 = 99;

#[derive(Debug, Clone)]
pub struct TrashManager {
    trash_dir: PathBuf,
    max_suffix: u32,
}

impl TrashManager {
    pub fn new(trash_dir: impl Into<PathBuf>) -> Self {
        Self {
            trash_dir: trash_dir.into(),
            max_suffix: DEFAULT_MAX_SUFFIX,
        }
    }

    pub fn with_max_suffix(mut self, max_suffix: u32) -> Self {
        self.max_suffix = max_suffix;
        self
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    /// First unused quarantine path for `base_name`
    pub fn free_slot(&self, base_name: &str) -> Result<PathBuf> {
        std::iter::once(base_name.to_string())
            .chain((1..=self.max_suffix).map(|n| format!("{base_name}-{n:02}")))
            .map(|candidate| self.trash_dir.join(candidate))
            .find(|candidate| fs::symlink_metadata(candidate).is_err())
            .ok_or_else(|| BundleError::QuarantineExhausted {
                name: base_name.to_string(),
                trash_dir: self.trash_dir.display().to_string(),
            })
    }

    /// Move `path` into the trash; returns where it ended up
    pub fn quarantine(&self, path: &Path, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.trash_dir).map_err(|e| BundleError::FileWriteFailed {
            path: self.trash_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let target = self.free_slot(base_name)?;
        debug!(from = %path.display(), to = %target.display(), "quarantining");

        move_dir(path, &target).map_err(|e| BundleError::IoError {
            message: format!(
                "failed to move {} to {}: {e}",
                path.display(),
                target.display()
            ),
        })?;

        info!(name = base_name, path = %target.display(), "quarantined");
        Ok(target)
    }
}
