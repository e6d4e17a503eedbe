//! Checkout synchronization
//!
//! Applies one [`ReconciliationAction`] to the bundle directory. Fresh
//! clones are prepared in a hidden staging directory next to their final
//! location and only renamed into place once the requested ref is checked
//! out, so a failure never leaves a half-written bundle behind. Existing
//! content is always quarantined, never deleted.

mod command;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::activity_log::{ActivityLog, LogEntry};
use crate::domain::{BundleSpec, InstalledBundle, ReconciliationAction};
use crate::error::{BundleError, Result};
use crate::git::Vcs;
use crate::trash::TrashManager;

use command::run_post_command;

/// Generated help tags, kept out of each checkout's status
const DOC_TAGS: &str = "doc/tags";

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Register bundles as submodules of the repository holding the bundle dir
    pub submodule: bool,
    /// Run post-install commands
    pub run_commands: bool,
}

/// A clone waiting in its staging directory
struct Staged {
    _dir: TempDir,
    checkout: PathBuf,
}

pub struct CheckoutSynchronizer<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    trash: &'a TrashManager,
    bundle_dir: &'a Path,
    options: SyncOptions,
}

impl<'a, V: Vcs + ?Sized> CheckoutSynchronizer<'a, V> {
    pub fn new(
        vcs: &'a V,
        trash: &'a TrashManager,
        bundle_dir: &'a Path,
        options: SyncOptions,
    ) -> Self {
        Self {
            vcs,
            trash,
            bundle_dir,
            options,
        }
    }

    /// Apply `action`, recording what changed in `log`
    pub fn apply(&self, action: &ReconciliationAction, log: &mut ActivityLog) -> Result<()> {
        match action {
            ReconciliationAction::Add { spec, rev } => self.add(spec, rev, log),
            ReconciliationAction::Update {
                spec,
                installed,
                from_ref,
                to_ref,
            } => self.update(spec, installed, from_ref, to_ref, log),
            ReconciliationAction::RemoteChanged {
                spec,
                installed,
                old_source,
                new_source,
                rev,
            } => {
                self.change_source(spec, installed, rev)?;
                log.record(LogEntry::SourceChanged {
                    name: spec.name.clone(),
                    from: old_source.clone(),
                    to: new_source.clone(),
                });
                self.post_command(spec, &installed.path)
            }
            ReconciliationAction::Remove { installed } => self.remove(installed, log),
            ReconciliationAction::Skip { name, reason } => {
                debug!(name = %name, reason = %reason, "skipped");
                Ok(())
            }
        }
    }

    fn add(&self, spec: &BundleSpec, rev: &str, log: &mut ActivityLog) -> Result<()> {
        let dest = self.bundle_dir.join(&spec.name);

        if self.options.submodule {
            self.add_submodule(spec, rev, &dest)?;
        } else {
            let staged = self.stage(spec, rev)?;
            self.install_staged(staged, &dest)?;
        }

        info!(name = %spec.name, rev, "added");
        log.record(LogEntry::Added {
            name: spec.name.clone(),
            git_ref: self.describe(&dest),
        });
        self.post_command(spec, &dest)
    }

    fn update(
        &self,
        spec: &BundleSpec,
        installed: &InstalledBundle,
        from_ref: &str,
        to_ref: &str,
        log: &mut ActivityLog,
    ) -> Result<()> {
        let dir = &installed.path;
        let before = self.describe(dir);

        self.vcs.fetch(dir, &spec.source)?;
        self.vcs.add_to_ignore(dir, DOC_TAGS)?;

        let conflict = if self.vcs.has_local_changes(dir)? {
            Some("local changes")
        } else if !self
            .vcs
            .shares_history(dir, to_ref)
            .map_err(|e| unknown_ref(spec, to_ref, e))?
        {
            Some("history rewritten upstream")
        } else {
            None
        };

        match conflict {
            Some(reason) => {
                warn!(name = %spec.name, reason, "replacing checkout with a fresh clone");
                let quarantined = self.reclone(spec, installed, to_ref)?;
                log.record(LogEntry::Reset {
                    name: spec.name.clone(),
                    reason: reason.to_string(),
                    quarantined,
                });
            }
            None => {
                let head = self.checkout(spec, dir, to_ref)?;
                if head == from_ref {
                    debug!(name = %spec.name, "already at requested commit");
                    return Ok(());
                }
            }
        }

        info!(name = %spec.name, from = from_ref, to = to_ref, "updated");
        log.record(LogEntry::Updated {
            name: spec.name.clone(),
            from: before,
            to: self.describe(dir),
        });
        self.post_command(spec, dir)
    }

    /// Replace the content of `installed` with a fresh clone of `spec`;
    /// returns where the old content went
    fn reclone(&self, spec: &BundleSpec, installed: &InstalledBundle, rev: &str) -> Result<PathBuf> {
        if self.options.submodule {
            let quarantined = self.remove_submodule(installed)?;
            self.add_submodule(spec, rev, &installed.path)?;
            return Ok(quarantined);
        }

        let staged = self.stage(spec, rev)?;
        let quarantined = self.trash.quarantine(&installed.path, &spec.name)?;
        self.install_staged(staged, &installed.path)?;
        Ok(quarantined)
    }

    fn change_source(&self, spec: &BundleSpec, installed: &InstalledBundle, rev: &str) -> Result<()> {
        if self.options.submodule && !installed.is_managed() {
            let quarantined = self.trash.quarantine(&installed.path, &spec.name)?;
            self.add_submodule(spec, rev, &installed.path)?;
            info!(name = %spec.name, old = %quarantined.display(), "source changed");
            return Ok(());
        }

        let quarantined = self.reclone(spec, installed, rev)?;
        info!(name = %spec.name, old = %quarantined.display(), "source changed");
        Ok(())
    }

    fn remove(&self, installed: &InstalledBundle, log: &mut ActivityLog) -> Result<()> {
        let git_ref = if installed.is_managed() {
            self.describe(&installed.path)
        } else {
            "unmanaged".to_string()
        };

        let result = if self.options.submodule && installed.is_managed() {
            self.remove_submodule(installed)
        } else {
            self.trash.quarantine(&installed.path, &installed.name)
        };
        let quarantined = result.map_err(|e| BundleError::RemovalFailed {
            name: installed.name.clone(),
            reason: e.to_string(),
        })?;

        info!(name = %installed.name, to = %quarantined.display(), "removed");
        log.record(LogEntry::Removed {
            name: installed.name.clone(),
            git_ref,
        });
        Ok(())
    }

    /// Clone `spec` into a hidden staging directory and check out `rev`
    fn stage(&self, spec: &BundleSpec, rev: &str) -> Result<Staged> {
        fs::create_dir_all(self.bundle_dir).map_err(|e| BundleError::FileWriteFailed {
            path: self.bundle_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!(".{}.", spec.name))
            .tempdir_in(self.bundle_dir)?;
        let checkout = dir.path().join(&spec.name);

        self.vcs.clone_repo(&spec.source, &checkout)?;
        self.checkout(spec, &checkout, rev)?;
        debug!(name = %spec.name, staging = %checkout.display(), "staged");

        Ok(Staged {
            _dir: dir,
            checkout,
        })
    }

    fn install_staged(&self, staged: Staged, dest: &Path) -> Result<()> {
        fs::rename(&staged.checkout, dest).map_err(|e| BundleError::IoError {
            message: format!("failed to move checkout into {}: {e}", dest.display()),
        })
    }

    /// Check out `rev` and hide generated tags; returns the new HEAD
    fn checkout(&self, spec: &BundleSpec, dir: &Path, rev: &str) -> Result<String> {
        let head = self
            .vcs
            .checkout_ref(dir, rev)
            .map_err(|e| unknown_ref(spec, rev, e))?;
        self.vcs.add_to_ignore(dir, DOC_TAGS)?;
        Ok(head)
    }

    fn describe(&self, dir: &Path) -> String {
        self.vcs.describe(dir).unwrap_or_else(|e| {
            warn!(dir = %dir.display(), error = %e, "could not describe checkout");
            "unknown".to_string()
        })
    }

    fn post_command(&self, spec: &BundleSpec, dir: &Path) -> Result<()> {
        match &spec.post_command {
            Some(command) if self.options.run_commands => {
                run_post_command(&spec.name, command, dir)
            }
            Some(_) => {
                debug!(name = %spec.name, "updates disabled, not running bundle command");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Superproject root and the path of `dest` relative to it
    fn submodule_paths(&self, dest: &Path) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(self.bundle_dir)?;
        let bundle_dir = dunce::canonicalize(self.bundle_dir)?;
        let root = dunce::canonicalize(self.vcs.superproject_root(&bundle_dir)?)?;

        let name = dest.file_name().ok_or_else(|| BundleError::IoError {
            message: format!("invalid bundle path {}", dest.display()),
        })?;
        let rel = bundle_dir
            .join(name)
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| BundleError::GitOperationFailed {
                message: format!(
                    "{} is not inside the repository at {}",
                    bundle_dir.display(),
                    root.display()
                ),
            })?;
        Ok((root, rel))
    }

    fn add_submodule(&self, spec: &BundleSpec, rev: &str, dest: &Path) -> Result<()> {
        let (root, rel) = self.submodule_paths(dest)?;
        self.vcs.register_submodule(&root, &spec.source, &rel)?;

        if let Err(e) = self.checkout(spec, dest, rev) {
            warn!(name = %spec.name, error = %e, "backing out submodule");
            if let Err(cleanup) = self.discard_submodule(&spec.name, &root, &rel, dest) {
                warn!(name = %spec.name, error = %cleanup, "could not back out submodule");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Quarantine the worktree, then drop the registration and stash the
    /// leftover git directory next to it
    fn remove_submodule(&self, installed: &InstalledBundle) -> Result<PathBuf> {
        let (root, rel) = self.submodule_paths(&installed.path)?;
        self.discard_submodule(&installed.name, &root, &rel, &installed.path)
    }

    fn discard_submodule(&self, name: &str, root: &Path, rel: &Path, dir: &Path) -> Result<PathBuf> {
        let quarantined = self.trash.quarantine(dir, name)?;
        if let Some(git_dir) = self.vcs.deregister_submodule(root, rel)? {
            let stashed = self.trash.quarantine(&git_dir, &format!("{name}.gitdir"))?;
            debug!(name, git_dir = %stashed.display(), "quarantined submodule git dir");
        }
        Ok(quarantined)
    }
}

/// A ref that fails to resolve after fetching is a bad manifest entry
fn unknown_ref(spec: &BundleSpec, rev: &str, err: BundleError) -> BundleError {
    match err {
        BundleError::GitRefResolveFailed { .. } => BundleError::UnknownRef {
            bundle: spec.name.clone(),
            git_ref: spec.git_ref.clone().unwrap_or_else(|| rev.to_string()),
            source_url: spec.source.clone(),
        },
        other => other,
    }
}
