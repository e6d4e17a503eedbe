//! Common test utilities for bundlesync integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Stdio;

use assert_cmd::Command;
use tempfile::TempDir;

/// Run git in `dir` with a fixed identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// An upstream plugin repository on the local file system
pub struct Upstream {
    pub path: PathBuf,
}

impl Upstream {
    /// Location to put in a Bundle directive
    pub fn source(&self) -> String {
        self.path.to_str().expect("Path is not valid UTF-8").to_string()
    }

    /// Write `file` and commit it; returns the new commit id
    pub fn commit(&self, file: &str, content: &str) -> String {
        let target = self.path.join(file);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&target, content).expect("Failed to write file");
        git(&self.path, &["add", "-A"]);
        git(&self.path, &["commit", "-q", "-m", &format!("update {file}")]);
        self.head()
    }

    pub fn tag(&self, name: &str) {
        git(&self.path, &["tag", name]);
    }

    pub fn head(&self) -> String {
        git(&self.path, &["rev-parse", "HEAD"]).trim().to_string()
    }

    /// Replace `main` with a single unrelated commit
    pub fn rewrite_history(&self, file: &str, content: &str) {
        git(&self.path, &["checkout", "-q", "--orphan", "rewritten"]);
        git(&self.path, &["rm", "-rfq", "."]);
        self.commit(file, content);
        git(&self.path, &["branch", "-q", "-D", "main"]);
        git(&self.path, &["branch", "-q", "-m", "main"]);
    }
}

/// A scratch home directory with a vim directory, a vimrc and upstreams
pub struct TestEnv {
    pub temp: TempDir,
    pub home: PathBuf,
    pub vim_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let home = temp.path().join("home");
        let vim_dir = home.join(".vim");
        std::fs::create_dir_all(&home).expect("Failed to create home directory");
        Self {
            temp,
            home,
            vim_dir,
        }
    }

    /// Create an upstream repository with one commit
    pub fn upstream(&self, name: &str) -> Upstream {
        let path = self.temp.path().join("upstream").join(name);
        std::fs::create_dir_all(&path).expect("Failed to create repo");
        git(&path, &["init", "-q", "-b", "main"]);
        let upstream = Upstream { path };
        upstream.commit("plugin/main.vim", &format!("\" {name}\n"));
        upstream
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.home.join(".vimrc")
    }

    pub fn write_manifest(&self, content: &str) {
        std::fs::write(self.manifest_path(), content).expect("Failed to write vimrc");
    }

    pub fn bundle(&self, rel: &str) -> PathBuf {
        self.vim_dir.join("bundle").join(rel)
    }

    pub fn trash(&self, rel: &str) -> PathBuf {
        self.vim_dir.join("Trashed-Bundles").join(rel)
    }

    pub fn read_log(&self) -> String {
        std::fs::read_to_string(self.vim_dir.join("doc").join("bundle-log.txt"))
            .expect("Failed to read log")
    }

    pub fn read_listing(&self) -> String {
        std::fs::read_to_string(self.vim_dir.join("doc").join("bundles.txt"))
            .expect("Failed to read listing")
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).expect("Failed to read file")
    }

    /// The binary, isolated from the real home directory
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("bundlesync").expect("binary not built");
        cmd.current_dir(self.temp.path())
            .env("HOME", &self.home)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("RUST_LOG", "bundlesync=warn")
            .env_remove("BUNDLESYNC_CONFIG")
            .env_remove("BUNDLESYNC_VIM_DIR")
            .env_remove("BUNDLESYNC_BUNDLE_DIR")
            .env_remove("BUNDLESYNC_MANIFEST")
            .env_remove("BUNDLESYNC_TRASH_DIR")
            .env_remove("BUNDLESYNC_LOG_FILE")
            .env_remove("BUNDLESYNC_LISTING_FILE")
            .env_remove("BUNDLESYNC_NO_UPDATES")
            .env_remove("BUNDLESYNC_SUBMODULE")
            .arg("--vim-dir")
            .arg(&self.vim_dir)
            .arg("--manifest")
            .arg(self.manifest_path());
        cmd
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
