//! Settings file (`~/.bundlesync.yaml`)

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BundleError, Result};

/// Optional settings file; every key may be omitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub vim_dir: Option<PathBuf>,
    pub bundle_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub trash_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub listing_file: Option<PathBuf>,
    pub no_updates: Option<bool>,
    pub submodule: Option<bool>,
}

impl FileConfig {
    /// Parse settings from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Read settings from `path`; relative paths inside are taken relative
    /// to the file's directory
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| BundleError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_yaml(&yaml).map_err(|e| match e {
            BundleError::ConfigParseFailed { reason, .. } => BundleError::ConfigParseFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        Ok(config.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        let fix = |p: Option<PathBuf>| {
            p.map(|p| {
                if p.is_relative() && !p.starts_with("~") {
                    base.join(p)
                } else {
                    p
                }
            })
        };
        Self {
            vim_dir: fix(self.vim_dir),
            bundle_dir: fix(self.bundle_dir),
            manifest: fix(self.manifest),
            trash_dir: fix(self.trash_dir),
            log_file: fix(self.log_file),
            listing_file: fix(self.listing_file),
            ..self
        }
    }
}
