//! Run configuration
//!
//! Built once at start-up from, lowest precedence first:
//! - defaults derived from the home directory
//! - the settings file (`--config` or `~/.bundlesync.yaml`)
//! - command-line flags and `BUNDLESYNC_*` environment variables

pub mod file;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{BundleError, Result};
pub use file::FileConfig;

const DEFAULT_CONFIG_FILE: &str = ".bundlesync.yaml";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vim_dir: Option<PathBuf>,
    pub bundle_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub trash_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub listing_file: Option<PathBuf>,
    pub no_updates: bool,
    pub submodule: bool,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub bundle_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub trash_dir: PathBuf,
    pub log_path: PathBuf,
    pub listing_path: PathBuf,
    pub no_updates: bool,
    pub submodule: bool,
}

/// Expand a leading `~` against `home`
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

impl RunConfig {
    /// Combine defaults, settings file and overrides
    pub fn resolve(home: &Path, file: &FileConfig, overrides: &Overrides) -> Self {
        let pick = |cli: &Option<PathBuf>, file: &Option<PathBuf>| {
            cli.as_ref()
                .or(file.as_ref())
                .map(|p| expand_home(p, home))
        };

        let vim_dir = pick(&overrides.vim_dir, &file.vim_dir).unwrap_or_else(|| home.join(".vim"));

        Self {
            bundle_dir: pick(&overrides.bundle_dir, &file.bundle_dir)
                .unwrap_or_else(|| vim_dir.join("bundle")),
            manifest_path: pick(&overrides.manifest, &file.manifest)
                .unwrap_or_else(|| home.join(".vimrc")),
            trash_dir: pick(&overrides.trash_dir, &file.trash_dir)
                .unwrap_or_else(|| vim_dir.join("Trashed-Bundles")),
            log_path: pick(&overrides.log_file, &file.log_file)
                .unwrap_or_else(|| vim_dir.join("doc").join("bundle-log.txt")),
            listing_path: pick(&overrides.listing_file, &file.listing_file)
                .unwrap_or_else(|| vim_dir.join("doc").join("bundles.txt")),
            no_updates: overrides.no_updates || file.no_updates.unwrap_or(false),
            submodule: overrides.submodule || file.submodule.unwrap_or(false),
        }
    }

    /// Load the settings file (if any) and resolve the run configuration
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let home = dirs::home_dir().ok_or(BundleError::HomeDirNotFound)?;

        let file = match config_file {
            Some(path) => FileConfig::load(&expand_home(path, &home))?,
            None => {
                let default = home.join(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    FileConfig::load(&default)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let config = Self::resolve(&home, &file, overrides);
        debug!(?config, "configuration resolved");
        Ok(config)
    }
}
