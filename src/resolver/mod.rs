//! Ref resolution for bundle sources
//!
//! This module handles:
//! - Looking up the default branch head when no ref is declared
//! - Matching a declared ref against the remote's branches and tags
//! - Accepting commit ids, which are only verified once fetched

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::domain::BundleSpec;
use crate::error::{BundleError, Result};
use crate::git::{RemoteRef, RemoteRefKind, Vcs};

static COMMIT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{4,40}$").expect("valid commit id regex"));

/// What a declared ref turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    DefaultBranch,
    Branch,
    Tag,
    Commit,
}

/// A ref resolved against the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRef {
    pub kind: RefKind,
    /// Token as declared in the manifest
    pub token: Option<String>,
    /// Revision to check out: the full commit id when the remote advertised
    /// one, otherwise the declared commit id
    pub rev: String,
}

impl ResolvedRef {
    /// Whether `head` already is the commit this ref designates
    pub fn matches(&self, head: &str) -> bool {
        match self.kind {
            RefKind::Commit => head.to_lowercase().starts_with(&self.rev.to_lowercase()),
            _ => head == self.rev,
        }
    }
}

pub struct RefResolver<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
}

impl<'a, V: Vcs + ?Sized> RefResolver<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        Self { vcs }
    }

    /// Resolve the ref declared by `spec` against its source.
    ///
    /// Fails with `UnknownRef` when the token is neither a branch, a tag nor
    /// something shaped like a commit id.
    pub fn resolve(&self, spec: &BundleSpec) -> Result<ResolvedRef> {
        let refs = self.vcs.list_remote_refs(&spec.source)?;
        let resolved = resolve_from_refs(spec, &refs)?;
        debug!(name = %spec.name, token = ?resolved.token, kind = ?resolved.kind, rev = %resolved.rev, "resolved ref");
        Ok(resolved)
    }
}

fn find<'r>(refs: &'r [RemoteRef], kind: RemoteRefKind, name: &str) -> Option<&'r RemoteRef> {
    refs.iter().find(|r| r.kind == kind && r.name == name)
}

pub fn resolve_from_refs(spec: &BundleSpec, refs: &[RemoteRef]) -> Result<ResolvedRef> {
    let token = spec.git_ref.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let Some(token) = token.filter(|t| *t != "HEAD") else {
        let head = find(refs, RemoteRefKind::Head, "HEAD").ok_or_else(|| {
            BundleError::GitRefResolveFailed {
                git_ref: "HEAD".to_string(),
                reason: format!("{} has no default branch", spec.source),
            }
        })?;
        return Ok(ResolvedRef {
            kind: RefKind::DefaultBranch,
            token: None,
            rev: head.sha.clone(),
        });
    };

    let branch = token.strip_prefix("refs/heads/").unwrap_or(token);
    if let Some(found) = find(refs, RemoteRefKind::Branch, branch) {
        return Ok(ResolvedRef {
            kind: RefKind::Branch,
            token: Some(token.to_string()),
            rev: found.sha.clone(),
        });
    }

    let tag = token.strip_prefix("refs/tags/").unwrap_or(token);
    if let Some(found) = find(refs, RemoteRefKind::Tag, tag) {
        return Ok(ResolvedRef {
            kind: RefKind::Tag,
            token: Some(token.to_string()),
            rev: found.sha.clone(),
        });
    }

    if COMMIT_ID.is_match(token) {
        return Ok(ResolvedRef {
            kind: RefKind::Commit,
            token: Some(token.to_string()),
            rev: token.to_string(),
        });
    }

    Err(BundleError::UnknownRef {
        bundle: spec.name.clone(),
        git_ref: token.to_string(),
        source_url: spec.source.clone(),
    })
}
