//! Bundle domain types
//!
//! `BundleSpec` is what the manifest asks for, `InstalledBundle` is what the
//! scanner found in the bundle directory.

use std::path::PathBuf;

use serde::Serialize;

/// Desired state for one bundle, produced by the manifest parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleSpec {
    /// Directory name under the bundle root, unique per run
    pub name: String,

    /// Repository location (URL or local path)
    pub source: String,

    /// Branch, tag or commit to pin to; `None` tracks the default branch
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Shell command run inside the checkout after it is added or updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_command: Option<String>,

    /// Leave the directory alone
    #[serde(rename = "static")]
    pub is_static: bool,

    /// 1-based manifest line the bundle was declared on
    #[serde(skip)]
    pub line: usize,
}

impl BundleSpec {
    /// Create a spec for `source`, deriving its name
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            name: bundle_name_from_source(&source),
            source,
            git_ref: None,
            post_command: None,
            is_static: false,
            line: 0,
        }
    }

    /// Set git ref
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Attach a post-install command, chaining after any existing one
    pub fn add_command(&mut self, command: &str) {
        self.post_command = Some(match self.post_command.take() {
            Some(existing) => format!("{existing} && {command}"),
            None => command.to_string(),
        });
    }
}

/// How a directory in the bundle root is managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstalledKind {
    /// A checkout with version-control metadata
    Checkout,
    /// Declared static in the manifest; never touched
    Static,
    /// No version-control metadata and not declared static
    Foreign,
}

/// Observed state for one directory in the bundle root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledBundle {
    pub name: String,
    pub path: PathBuf,

    /// URL of the checkout's `origin` remote
    pub remote_source: Option<String>,

    /// Commit currently checked out
    pub current_ref: Option<String>,

    pub kind: InstalledKind,
}

impl InstalledBundle {
    pub fn is_managed(&self) -> bool {
        self.kind == InstalledKind::Checkout
    }
}

/// Derive the bundle directory name from a source location.
///
/// Takes the last path segment (after `/`, `\` or the `:` of an scp-style
/// URL) and drops a trailing `.git`.
pub fn bundle_name_from_source(source: &str) -> String {
    let trimmed = source.trim().trim_end_matches(['/', '\\']);
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        last.to_string()
    } else {
        name.to_string()
    }
}

/// Sources are equal when they only differ by a trailing `/` or `.git`
pub fn same_source(a: &str, b: &str) -> bool {
    fn canonical(s: &str) -> &str {
        let s = s.trim().trim_end_matches('/');
        s.strip_suffix(".git").unwrap_or(s)
    }
    canonical(a) == canonical(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_github_url() {
        assert_eq!(
            bundle_name_from_source("https://github.com/tpope/vim-rails.git"),
            "vim-rails"
        );
    }

    #[test]
    fn test_name_from_scp_url() {
        assert_eq!(
            bundle_name_from_source("git@github.com:tpope/vim-fugitive.git"),
            "vim-fugitive"
        );
        assert_eq!(bundle_name_from_source("git@host:solo.git"), "solo");
    }

    #[test]
    fn test_name_from_local_path_with_trailing_slash() {
        assert_eq!(bundle_name_from_source("/srv/git/repoA/"), "repoA");
        assert_eq!(bundle_name_from_source("/srv/git/repoA.git//"), "repoA");
    }

    #[test]
    fn test_name_keeps_inner_dots() {
        assert_eq!(bundle_name_from_source("/x/vim-less.vim"), "vim-less.vim");
    }

    #[test]
    fn test_add_command_chains() {
        let mut spec = BundleSpec::new("/x/repoA");
        spec.add_command("make");
        spec.add_command("make install");
        assert_eq!(spec.post_command.as_deref(), Some("make && make install"));
    }

    #[test]
    fn test_installed_kind_predicates() {
        let bundle = InstalledBundle {
            name: "x".to_string(),
            path: PathBuf::from("/b/x"),
            remote_source: None,
            current_ref: None,
            kind: InstalledKind::Foreign,
        };
        assert!(!bundle.is_managed());
    }

    #[test]
    fn test_same_source_ignores_suffixes() {
        assert!(same_source("/srv/repoA", "/srv/repoA.git/"));
        assert!(same_source(
            "https://github.com/tpope/vim-rails",
            "https://github.com/tpope/vim-rails.git"
        ));
        assert!(!same_source("/srv/one/snipmate", "/srv/two/snipmate"));
    }
}
