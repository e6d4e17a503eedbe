//! Version-control seam
//!
//! Everything the engine needs from git goes through the [`Vcs`] trait so the
//! reconciliation logic can be exercised against an in-memory fake.
//! [`GitVcs`] is the real implementation:
//! - clone, fetch, checkout and repository inspection via `git2`
//! - remote listing and submodule registration via the `git` command line

mod cli;
mod repo;
mod transport;

#[cfg(test)]
pub mod fake;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

pub use repo::GitVcs;

/// Kind of a ref advertised by a remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteRefKind {
    Head,
    Branch,
    Tag,
}

/// One ref advertised by a remote, with the commit it points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub kind: RemoteRefKind,
    /// Short name (`main`, `v1.0`); `HEAD` for the default branch head
    pub name: String,
    pub sha: String,
}

impl RemoteRef {
    pub fn new(kind: RemoteRefKind, name: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            sha: sha.into(),
        }
    }
}

/// What a directory looks like to version control
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutState {
    /// URL of the `origin` remote
    pub remote_url: Option<String>,
    /// Commit checked out, `None` for an empty repository
    pub head: Option<String>,
}

/// Version-control operations used by the synchronizer.
///
/// Calls are synchronous and block until the underlying tool finishes.
pub trait Vcs {
    /// Clone `source` into `dest`, which must not exist yet
    fn clone_repo(&self, source: &str, dest: &Path) -> Result<()>;

    /// Fetch all branches and tags of `source` into the checkout
    fn fetch(&self, checkout: &Path, source: &str) -> Result<()>;

    /// Check out `rev` (commit id, branch or tag) detached; returns the commit id
    fn checkout_ref(&self, checkout: &Path, rev: &str) -> Result<String>;

    /// List the refs `source` advertises
    fn list_remote_refs(&self, source: &str) -> Result<Vec<RemoteRef>>;

    /// Inspect a directory; `None` when it is not a checkout
    fn inspect(&self, dir: &Path) -> Option<CheckoutState>;

    /// Uncommitted modifications or untracked files
    fn has_local_changes(&self, checkout: &Path) -> Result<bool>;

    /// Whether HEAD and `rev` share a common ancestor
    fn shares_history(&self, checkout: &Path, rev: &str) -> Result<bool>;

    /// Human-readable name of the checked out commit (nearest tag or short id)
    fn describe(&self, checkout: &Path) -> Result<String>;

    /// Add `pattern` to the checkout's private ignore list; idempotent
    fn add_to_ignore(&self, checkout: &Path, pattern: &str) -> Result<()>;

    /// Working tree root of the repository containing `dir`
    fn superproject_root(&self, dir: &Path) -> Result<PathBuf>;

    /// Clone `source` at `rel_path` and register it as a submodule of `superproject`
    fn register_submodule(&self, superproject: &Path, source: &str, rel_path: &Path)
    -> Result<()>;

    /// Drop the submodule registration for `rel_path`.
    ///
    /// Returns the submodule's git directory when one was left behind under
    /// the superproject's `.git/modules`; the caller decides where it goes.
    fn deregister_submodule(&self, superproject: &Path, rel_path: &Path)
    -> Result<Option<PathBuf>>;
}

/// Abbreviate a commit id for display
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sha() {
        assert_eq!(
            short_sha("0123456789abcdef0123456789abcdef01234567"),
            "0123456"
        );
        assert_eq!(short_sha("abc"), "abc");
    }
}
