//! Manifest parsing
//!
//! Turns vimrc-style manifest text into an ordered list of [`BundleSpec`]s
//! and the set of directory names declared static. Validation of bundle
//! names happens here, so a broken manifest never reaches the disk.

pub mod directive;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{BundleSpec, same_source};
use crate::error::{BundleError, Result};
use directive::Directive;

/// Everything the synchronizer needs from the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Bundles in declaration order
    pub bundles: Vec<BundleSpec>,

    /// Directory names that must be left alone
    pub static_names: BTreeSet<String>,
}

impl Manifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BundleError::ManifestNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| BundleError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        parse(&text)
    }

    /// Whether `name` is declared static
    pub fn is_static(&self, name: &str) -> bool {
        self.static_names.contains(name)
    }
}

/// Parse manifest text.
///
/// Fails with `DuplicateEntry` when a repository is declared twice and with
/// `ConflictingSource` when two different sources map to the same name.
pub fn parse(text: &str) -> Result<Manifest> {
    let mut manifest = Manifest::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let Some(directive) = directive::parse_line(line) else {
            continue;
        };

        match directive {
            Directive::Bundle {
                source,
                git_ref,
                is_static,
            } => {
                let mut spec = BundleSpec::new(expand_source(&source));
                spec.git_ref = git_ref;
                spec.is_static = is_static;
                spec.line = line_no;

                if spec.name.is_empty() || spec.name.starts_with('.') {
                    return Err(BundleError::InvalidDirective {
                        line: line_no,
                        reason: format!("'{source}' does not give a usable bundle directory name"),
                    });
                }

                if let Some(&existing) = seen.get(&spec.name) {
                    let first = &manifest.bundles[existing];
                    if same_source(&first.source, &spec.source) {
                        return Err(BundleError::DuplicateEntry {
                            name: spec.name,
                            source_url: spec.source,
                        });
                    }
                    return Err(BundleError::ConflictingSource {
                        name: spec.name,
                        first: first.source.clone(),
                        second: spec.source,
                    });
                }

                debug!(name = %spec.name, source = %spec.source, line = line_no, "bundle declared");
                seen.insert(spec.name.clone(), manifest.bundles.len());
                if is_static {
                    manifest.static_names.insert(spec.name.clone());
                }
                manifest.bundles.push(spec);
            }
            Directive::Command(command) => match manifest.bundles.last_mut() {
                Some(spec) => spec.add_command(&command),
                None => return Err(BundleError::OrphanCommand { line: line_no }),
            },
            Directive::Static(name) => {
                manifest.static_names.insert(name);
            }
            Directive::Invalid(reason) => {
                return Err(BundleError::InvalidDirective {
                    line: line_no,
                    reason,
                });
            }
        }
    }

    for spec in &mut manifest.bundles {
        if manifest.static_names.contains(&spec.name) && !spec.is_static {
            warn!(name = %spec.name, "bundle is also declared static, leaving it alone");
            spec.is_static = true;
        }
    }

    Ok(manifest)
}

/// Expand source shorthands.
///
/// - `user/repo` becomes a GitHub URL
/// - a bare `name` becomes a vim-scripts mirror URL
/// - `~/path` is expanded against the home directory
/// - URLs and filesystem paths are kept as written
pub fn expand_source(raw: &str) -> String {
    let raw = raw.trim();

    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
        return raw.to_string();
    }

    if raw.contains("://")
        || raw.starts_with("git@")
        || raw.starts_with('/')
        || raw.starts_with('.')
        || Path::new(raw).is_absolute()
    {
        return raw.to_string();
    }

    let is_word = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };

    match raw.split_once('/') {
        Some((user, repo)) if is_word(user) && is_word(repo) => {
            format!("https://github.com/{user}/{repo}.git")
        }
        None if is_word(raw) => format!("https://github.com/vim-scripts/{raw}.git"),
        _ => raw.to_string(),
    }
}
