//! Installed state scanner
//!
//! Reads the bundle directory and reports one [`InstalledBundle`] per
//! visible subdirectory. Hidden entries (staging directories, `.git` of an
//! embedding superproject) are skipped. Nothing is modified.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::{InstalledBundle, InstalledKind};
use crate::error::{BundleError, Result};
use crate::git::Vcs;

pub struct InstalledStateScanner<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
}

impl<'a, V: Vcs + ?Sized> InstalledStateScanner<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        Self { vcs }
    }

    /// Installed bundles sorted by name; a missing bundle directory is empty
    pub fn scan(
        &self,
        bundle_dir: &Path,
        static_names: &BTreeSet<String>,
    ) -> Result<Vec<InstalledBundle>> {
        if !bundle_dir.is_dir() {
            debug!(dir = %bundle_dir.display(), "bundle directory does not exist yet");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(bundle_dir).map_err(|e| BundleError::FileReadFailed {
            path: bundle_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut installed = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }

            let path = entry.path();
            let state = self.vcs.inspect(&path);
            let kind = if static_names.contains(&name) {
                InstalledKind::Static
            } else if state.is_some() {
                InstalledKind::Checkout
            } else {
                InstalledKind::Foreign
            };
            let state = state.unwrap_or_default();

            debug!(name = %name, ?kind, remote = ?state.remote_url, "found installed bundle");
            installed.push(InstalledBundle {
                name,
                path,
                remote_source: state.remote_url,
                current_ref: state.head,
                kind,
            });
        }

        installed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(installed)
    }
}
