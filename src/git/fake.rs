//! In-memory [`Vcs`] used by unit tests
//!
//! Remotes live in memory as linear or rewritten commit histories. Checkouts
//! are real directories: the commit's files plus a `.fakevcs` state file
//! holding the remote URL, the checked out commit and ignore patterns, so a
//! checkout keeps its identity when it is moved around on disk.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{CheckoutState, RemoteRef, RemoteRefKind, Vcs, short_sha};
use crate::error::{BundleError, Result};

const STATE_FILE: &str = ".fakevcs";

#[derive(Debug, Clone)]
struct FakeCommit {
    sha: String,
    parent: Option<String>,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeRemote {
    commits: Vec<FakeCommit>,
    head: String,
    tags: BTreeMap<String, String>,
    branches: BTreeMap<String, String>,
}

impl FakeRemote {
    fn commit(&self, sha: &str) -> Option<&FakeCommit> {
        self.commits.iter().find(|c| c.sha == sha)
    }

    fn resolve(&self, rev: &str) -> Option<&FakeCommit> {
        if let Some(sha) = self.branches.get(rev).or_else(|| self.tags.get(rev)) {
            return self.commit(sha);
        }
        if rev == "HEAD" {
            return self.commit(&self.head);
        }
        if rev.len() >= 4 {
            return self.commits.iter().find(|c| c.sha.starts_with(rev));
        }
        None
    }

    fn ancestors(&self, sha: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut next = Some(sha.to_string());
        while let Some(sha) = next {
            next = self.commit(&sha).and_then(|c| c.parent.clone());
            seen.insert(sha);
        }
        seen
    }
}

#[derive(Debug, Default)]
struct CheckoutFile {
    remote: String,
    head: String,
    ignore: Vec<String>,
}

impl CheckoutFile {
    fn read(dir: &Path) -> Option<Self> {
        let text = fs::read_to_string(dir.join(STATE_FILE)).ok()?;
        let mut state = CheckoutFile::default();
        for line in text.lines() {
            match line.split_once('=') {
                Some(("remote", value)) => state.remote = value.to_string(),
                Some(("head", value)) => state.head = value.to_string(),
                Some(("ignore", value)) => state.ignore.push(value.to_string()),
                _ => {}
            }
        }
        Some(state)
    }

    fn write(&self, dir: &Path) -> Result<()> {
        let mut text = format!("remote={}\nhead={}\n", self.remote, self.head);
        for pattern in &self.ignore {
            text.push_str(&format!("ignore={pattern}\n"));
        }
        fs::write(dir.join(STATE_FILE), text)?;
        Ok(())
    }
}

/// Fake version control with scripted remotes
#[derive(Debug, Default)]
pub struct FakeVcs {
    remotes: RefCell<HashMap<String, FakeRemote>>,
    next_id: RefCell<u64>,
    calls: RefCell<Vec<String>>,
    submodules: RefCell<BTreeSet<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_sha(&self) -> String {
        let mut id = self.next_id.borrow_mut();
        *id += 1;
        format!("{:040x}", 0xc0ffee_0000_u64 + *id)
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    /// Every trait call made so far, e.g. `clone /srv/a`
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Registered submodule paths
    pub fn submodules(&self) -> BTreeSet<String> {
        self.submodules.borrow().clone()
    }

    /// Create a remote with one commit on `main`
    pub fn add_remote(&self, source: &str, files: &[(&str, &str)]) -> String {
        self.remotes
            .borrow_mut()
            .insert(source.to_string(), FakeRemote::default());
        self.commit(source, files, true)
    }

    /// Push a commit on top of `main`; files are merged into the previous tree
    pub fn push(&self, source: &str, files: &[(&str, &str)]) -> String {
        self.commit(source, files, false)
    }

    /// Replace the history of `main` with an unrelated root commit
    pub fn rewrite(&self, source: &str, files: &[(&str, &str)]) -> String {
        self.commit(source, files, true)
    }

    /// Tag the current head of `source`
    pub fn tag(&self, source: &str, name: &str) -> String {
        let mut remotes = self.remotes.borrow_mut();
        let remote = remotes.get_mut(source).expect("unknown fake remote");
        let head = remote.head.clone();
        remote.tags.insert(name.to_string(), head.clone());
        head
    }

    fn commit(&self, source: &str, files: &[(&str, &str)], root: bool) -> String {
        let sha = self.new_sha();
        let mut remotes = self.remotes.borrow_mut();
        let remote = remotes.get_mut(source).expect("unknown fake remote");

        let (parent, mut tree) = match remote.commit(&remote.head) {
            Some(head) if !root => (Some(head.sha.clone()), head.files.clone()),
            _ => (None, BTreeMap::new()),
        };
        for (path, content) in files {
            tree.insert((*path).to_string(), (*content).to_string());
        }

        remote.commits.push(FakeCommit {
            sha: sha.clone(),
            parent,
            files: tree,
        });
        remote.head = sha.clone();
        remote.branches.insert("main".to_string(), sha.clone());
        sha
    }

    fn materialize(dir: &Path, commit: &FakeCommit, state: &CheckoutFile) -> Result<()> {
        fs::create_dir_all(dir)?;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.file_name().is_some_and(|n| n == STATE_FILE) {
                continue;
            }
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        for (file, content) in &commit.files {
            let target = dir.join(file);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, content)?;
        }
        state.write(dir)
    }

    fn state(dir: &Path) -> Result<CheckoutFile> {
        CheckoutFile::read(dir).ok_or_else(|| BundleError::GitOpenFailed {
            path: dir.display().to_string(),
            reason: "not a fake checkout".to_string(),
        })
    }
}

impl Vcs for FakeVcs {
    fn clone_repo(&self, source: &str, dest: &Path) -> Result<()> {
        self.record(format!("clone {source}"));
        let remotes = self.remotes.borrow();
        let remote = remotes
            .get(source)
            .ok_or_else(|| BundleError::GitCloneFailed {
                url: source.to_string(),
                reason: "Repository not found".to_string(),
            })?;
        let head = remote.commit(&remote.head).cloned().unwrap_or_else(|| FakeCommit {
            sha: String::new(),
            parent: None,
            files: BTreeMap::new(),
        });
        let state = CheckoutFile {
            remote: source.to_string(),
            head: head.sha.clone(),
            ignore: Vec::new(),
        };
        Self::materialize(dest, &head, &state)
    }

    fn fetch(&self, checkout: &Path, source: &str) -> Result<()> {
        self.record(format!("fetch {source}"));
        if !self.remotes.borrow().contains_key(source) {
            return Err(BundleError::GitFetchFailed {
                url: source.to_string(),
                reason: "Repository not found".to_string(),
            });
        }
        Self::state(checkout).map(|_| ())
    }

    fn checkout_ref(&self, checkout: &Path, rev: &str) -> Result<String> {
        self.record(format!("checkout {rev}"));
        let mut state = Self::state(checkout)?;
        let remotes = self.remotes.borrow();
        let commit = remotes
            .get(&state.remote)
            .and_then(|remote| remote.resolve(rev))
            .cloned()
            .ok_or_else(|| BundleError::GitRefResolveFailed {
                git_ref: rev.to_string(),
                reason: "not a branch, tag or commit in this repository".to_string(),
            })?;
        state.head = commit.sha.clone();
        Self::materialize(checkout, &commit, &state)?;
        Ok(commit.sha)
    }

    fn list_remote_refs(&self, source: &str) -> Result<Vec<RemoteRef>> {
        self.record(format!("ls-remote {source}"));
        let remotes = self.remotes.borrow();
        let remote = remotes
            .get(source)
            .ok_or_else(|| BundleError::GitFetchFailed {
                url: source.to_string(),
                reason: "Repository not found".to_string(),
            })?;

        let mut refs = vec![RemoteRef::new(RemoteRefKind::Head, "HEAD", &remote.head)];
        refs.extend(
            remote
                .branches
                .iter()
                .map(|(name, sha)| RemoteRef::new(RemoteRefKind::Branch, name, sha)),
        );
        refs.extend(
            remote
                .tags
                .iter()
                .map(|(name, sha)| RemoteRef::new(RemoteRefKind::Tag, name, sha)),
        );
        Ok(refs)
    }

    fn inspect(&self, dir: &Path) -> Option<CheckoutState> {
        let state = CheckoutFile::read(dir)?;
        Some(CheckoutState {
            remote_url: Some(state.remote),
            head: Some(state.head).filter(|h| !h.is_empty()),
        })
    }

    fn has_local_changes(&self, checkout: &Path) -> Result<bool> {
        let state = Self::state(checkout)?;
        let remotes = self.remotes.borrow();
        let expected = remotes
            .get(&state.remote)
            .and_then(|remote| remote.commit(&state.head))
            .map(|commit| commit.files.clone())
            .unwrap_or_default();

        let mut actual = BTreeMap::new();
        for entry in WalkDir::new(checkout).min_depth(1) {
            let entry = entry.map_err(|e| BundleError::IoError {
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(checkout)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if rel == STATE_FILE || state.ignore.iter().any(|p| *p == rel) {
                continue;
            }
            actual.insert(rel, fs::read_to_string(entry.path())?);
        }

        Ok(actual != expected)
    }

    fn shares_history(&self, checkout: &Path, rev: &str) -> Result<bool> {
        let state = Self::state(checkout)?;
        let remotes = self.remotes.borrow();
        let Some(remote) = remotes.get(&state.remote) else {
            return Ok(false);
        };
        let target = remote
            .resolve(rev)
            .ok_or_else(|| BundleError::GitRefResolveFailed {
                git_ref: rev.to_string(),
                reason: "unknown".to_string(),
            })?;
        let ours = remote.ancestors(&state.head);
        Ok(remote.ancestors(&target.sha).iter().any(|sha| ours.contains(sha)))
    }

    fn describe(&self, checkout: &Path) -> Result<String> {
        let state = Self::state(checkout)?;
        let remotes = self.remotes.borrow();
        let tag = remotes.get(&state.remote).and_then(|remote| {
            remote
                .tags
                .iter()
                .find(|(_, sha)| **sha == state.head)
                .map(|(name, _)| name.clone())
        });
        Ok(tag.unwrap_or_else(|| short_sha(&state.head).to_string()))
    }

    fn add_to_ignore(&self, checkout: &Path, pattern: &str) -> Result<()> {
        let mut state = Self::state(checkout)?;
        if !state.ignore.iter().any(|p| p == pattern) {
            state.ignore.push(pattern.to_string());
        }
        state.write(checkout)
    }

    fn superproject_root(&self, dir: &Path) -> Result<PathBuf> {
        Ok(dir.parent().unwrap_or(dir).to_path_buf())
    }

    fn register_submodule(
        &self,
        superproject: &Path,
        source: &str,
        rel_path: &Path,
    ) -> Result<()> {
        self.record(format!("submodule add {}", rel_path.display()));
        self.clone_repo(source, &superproject.join(rel_path))?;
        self.submodules
            .borrow_mut()
            .insert(rel_path.to_string_lossy().replace('\\', "/"));
        Ok(())
    }

    fn deregister_submodule(
        &self,
        _superproject: &Path,
        rel_path: &Path,
    ) -> Result<Option<PathBuf>> {
        self.record(format!("submodule rm {}", rel_path.display()));
        self.submodules
            .borrow_mut()
            .remove(&rel_path.to_string_lossy().replace('\\', "/"));
        Ok(None)
    }
}
