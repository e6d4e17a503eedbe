//! libgit2-backed [`Vcs`] implementation

use std::fs;
use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, Commit, DescribeFormatOptions, DescribeOptions, ErrorCode, Repository,
    StatusOptions,
};
use tracing::debug;

use super::transport::{describe_git_error, fetch_options, normalize_source};
use super::{CheckoutState, RemoteRef, Vcs, cli};
use crate::error::{BundleError, Result};

const FETCH_REFSPECS: &[&str] = &[
    "+refs/heads/*:refs/remotes/origin/*",
    "+refs/tags/*:refs/tags/*",
];

/// Production [`Vcs`] talking to real repositories
#[derive(Debug, Default, Clone, Copy)]
pub struct GitVcs;

impl GitVcs {
    pub fn new() -> Self {
        Self
    }
}

fn open(path: &Path) -> Result<Repository> {
    Repository::open(path).map_err(|e| BundleError::GitOpenFailed {
        path: path.display().to_string(),
        reason: e.message().to_string(),
    })
}

/// Resolve `rev` to a commit, preferring freshly fetched remote branches
/// over stale local ones.
fn resolve_commit<'r>(repo: &'r Repository, rev: &str) -> Option<Commit<'r>> {
    let candidates = [
        format!("refs/remotes/origin/{rev}"),
        format!("refs/tags/{rev}"),
    ];

    for candidate in &candidates {
        if let Ok(reference) = repo.find_reference(candidate) {
            if let Ok(commit) = reference.peel_to_commit() {
                return Some(commit);
            }
        }
    }

    repo.revparse_single(rev)
        .ok()
        .and_then(|object| object.peel_to_commit().ok())
}

fn head_commit(repo: &Repository) -> Option<Commit<'_>> {
    repo.head().ok().and_then(|head| head.peel_to_commit().ok())
}

impl Vcs for GitVcs {
    fn clone_repo(&self, source: &str, dest: &Path) -> Result<()> {
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options());

        let url = normalize_source(source);
        let repo = builder
            .clone(url.as_ref(), dest)
            .map_err(|e| BundleError::GitCloneFailed {
                url: source.to_string(),
                reason: describe_git_error(&e),
            })?;

        // Keep the URL exactly as declared so later runs compare equal
        if url.as_ref() != source {
            repo.remote_set_url("origin", source)?;
        }

        debug!(source, dest = %dest.display(), "cloned");
        Ok(())
    }

    fn fetch(&self, checkout: &Path, source: &str) -> Result<()> {
        let repo = open(checkout)?;
        let url = normalize_source(source);
        let mut remote = repo.remote_anonymous(url.as_ref())?;

        let mut options = fetch_options();
        options.download_tags(AutotagOption::All);

        remote
            .fetch(FETCH_REFSPECS, Some(&mut options), None)
            .map_err(|e| BundleError::GitFetchFailed {
                url: source.to_string(),
                reason: describe_git_error(&e),
            })?;

        debug!(source, checkout = %checkout.display(), "fetched");
        Ok(())
    }

    fn checkout_ref(&self, checkout: &Path, rev: &str) -> Result<String> {
        let repo = open(checkout)?;
        let commit = resolve_commit(&repo, rev).ok_or_else(|| BundleError::GitRefResolveFailed {
            git_ref: rev.to_string(),
            reason: "not a branch, tag or commit in this repository".to_string(),
        })?;

        let mut builder = CheckoutBuilder::new();
        builder.force();

        repo.checkout_tree(commit.as_object(), Some(&mut builder))
            .map_err(|e| BundleError::GitCheckoutFailed {
                rev: rev.to_string(),
                reason: e.message().to_string(),
            })?;
        repo.set_head_detached(commit.id())
            .map_err(|e| BundleError::GitCheckoutFailed {
                rev: rev.to_string(),
                reason: e.message().to_string(),
            })?;

        Ok(commit.id().to_string())
    }

    fn list_remote_refs(&self, source: &str) -> Result<Vec<RemoteRef>> {
        cli::ls_remote(source)
    }

    fn inspect(&self, dir: &Path) -> Option<CheckoutState> {
        let repo = Repository::open(dir).ok()?;
        let remote_url = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(str::to_string));
        let head = head_commit(&repo).map(|commit| commit.id().to_string());
        Some(CheckoutState { remote_url, head })
    }

    fn has_local_changes(&self, checkout: &Path) -> Result<bool> {
        let repo = open(checkout)?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn shares_history(&self, checkout: &Path, rev: &str) -> Result<bool> {
        let repo = open(checkout)?;
        let Some(head) = head_commit(&repo) else {
            return Ok(false);
        };
        let target = resolve_commit(&repo, rev).ok_or_else(|| BundleError::GitRefResolveFailed {
            git_ref: rev.to_string(),
            reason: "not a branch, tag or commit in this repository".to_string(),
        })?;

        match repo.merge_base(head.id(), target.id()) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self, checkout: &Path) -> Result<String> {
        let repo = open(checkout)?;
        let mut options = DescribeOptions::new();
        options.describe_tags().show_commit_oid_as_fallback(true);

        let mut format = DescribeFormatOptions::new();
        format.abbreviated_size(7);

        let described = repo.describe(&options)?.format(Some(&format))?;
        Ok(described)
    }

    fn add_to_ignore(&self, checkout: &Path, pattern: &str) -> Result<()> {
        let repo = open(checkout)?;
        let info_dir = repo.path().join("info");
        let exclude = info_dir.join("exclude");

        let existing = match fs::read_to_string(&exclude) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(BundleError::FileReadFailed {
                    path: exclude.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if existing.lines().any(|line| line.trim() == pattern) {
            return Ok(());
        }

        let mut updated = existing;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(pattern);
        updated.push('\n');

        fs::create_dir_all(&info_dir)?;
        fs::write(&exclude, updated).map_err(|e| BundleError::FileWriteFailed {
            path: exclude.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn superproject_root(&self, dir: &Path) -> Result<PathBuf> {
        let repo = Repository::discover(dir).map_err(|e| BundleError::GitOpenFailed {
            path: dir.display().to_string(),
            reason: e.message().to_string(),
        })?;
        repo.workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| BundleError::GitOpenFailed {
                path: dir.display().to_string(),
                reason: "repository has no working tree".to_string(),
            })
    }

    fn register_submodule(
        &self,
        superproject: &Path,
        source: &str,
        rel_path: &Path,
    ) -> Result<()> {
        cli::submodule_add(superproject, source, rel_path)
    }

    fn deregister_submodule(
        &self,
        superproject: &Path,
        rel_path: &Path,
    ) -> Result<Option<PathBuf>> {
        cli::submodule_remove(superproject, rel_path)?;
        let git_dir = open(superproject)?.path().join("modules").join(rel_path);
        Ok(git_dir.is_dir().then_some(git_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, file: &str, content: &str, message: &str) -> git2::Oid {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(file), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Test", "test@test.com").unwrap();
        let parents: Vec<Commit<'_>> = head_commit(repo).into_iter().collect();
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    fn upstream() -> (TempDir, Repository) {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        commit_file(&repo, "plugin.vim", "first\n", "first");
        (temp, repo)
    }

    fn source_of(temp: &TempDir) -> String {
        temp.path().display().to_string()
    }

    #[test]
    fn test_clone_keeps_declared_source() {
        let (up, _repo) = upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");

        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        let state = GitVcs.inspect(&dest).unwrap();
        assert_eq!(state.remote_url.as_deref(), Some(source_of(&up).as_str()));
        assert!(state.head.is_some());
        assert!(dest.join("plugin.vim").exists());
    }

    #[test]
    fn test_inspect_plain_directory() {
        let temp = TempDir::new().unwrap();
        assert!(GitVcs.inspect(temp.path()).is_none());
    }

    #[test]
    fn test_fetch_and_checkout_new_commit() {
        let (up, repo) = upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");
        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        let second = commit_file(&repo, "second.vim", "second\n", "second");
        GitVcs.fetch(&dest, &source_of(&up)).unwrap();
        let checked_out = GitVcs.checkout_ref(&dest, &second.to_string()).unwrap();

        assert_eq!(checked_out, second.to_string());
        assert!(dest.join("second.vim").exists());
        assert!(!GitVcs.has_local_changes(&dest).unwrap());
    }

    #[test]
    fn test_checkout_unknown_ref() {
        let (up, _repo) = upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");
        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        let err = GitVcs.checkout_ref(&dest, "no-such-branch").unwrap_err();
        assert!(matches!(err, BundleError::GitRefResolveFailed { .. }));
    }

    #[test]
    fn test_local_changes_detected() {
        let (up, _repo) = upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");
        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        fs::write(dest.join("plugin.vim"), "edited\n").unwrap();
        assert!(GitVcs.has_local_changes(&dest).unwrap());
    }

    #[test]
    fn test_add_to_ignore_is_idempotent() {
        let (up, _repo) = upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");
        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        GitVcs.add_to_ignore(&dest, "doc/tags").unwrap();
        GitVcs.add_to_ignore(&dest, "doc/tags").unwrap();

        let exclude = fs::read_to_string(dest.join(".git/info/exclude")).unwrap();
        assert_eq!(exclude.lines().filter(|l| *l == "doc/tags").count(), 1);

        fs::create_dir_all(dest.join("doc")).unwrap();
        fs::write(dest.join("doc/tags"), "generated").unwrap();
        assert!(!GitVcs.has_local_changes(&dest).unwrap());
    }

    #[test]
    fn test_shares_history_with_disjoint_root() {
        let (up, repo) = upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");
        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        // Orphan commit on a new branch: no common ancestor
        let sig = git2::Signature::now("Test", "test@test.com").unwrap();
        let tree = head_commit(&repo).unwrap().tree().unwrap();
        let orphan = repo
            .commit(Some("refs/heads/rewritten"), &sig, &sig, "orphan", &tree, &[])
            .unwrap();

        GitVcs.fetch(&dest, &source_of(&up)).unwrap();
        assert!(!GitVcs.shares_history(&dest, &orphan.to_string()).unwrap());
        assert!(GitVcs.shares_history(&dest, "HEAD").unwrap());
    }

    #[test]
    fn test_describe_prefers_tags() {
        let (up, repo) = upstream();
        let head = head_commit(&repo).unwrap();
        repo.tag_lightweight("v1.0", head.as_object(), false).unwrap();

        let work = TempDir::new().unwrap();
        let dest = work.path().join("repo");
        GitVcs.clone_repo(&source_of(&up), &dest).unwrap();

        assert_eq!(GitVcs.describe(&dest).unwrap(), "v1.0");
    }
}
