//! Sync operation
//!
//! Steps are decided and applied one at a time in plan order. Failures that
//! concern a single bundle (clone or fetch errors) are reported and the run
//! continues; fatal failures stop it immediately. The log and listing are
//! written in both cases, reflecting what was actually applied.

use tracing::{debug, info, warn};

use crate::activity_log::ActivityLog;
use crate::config::RunConfig;
use crate::domain::{ActionCounts, ReconciliationAction};
use crate::error::{BundleError, Result};
use crate::git::Vcs;
use crate::listing;
use crate::manifest::Manifest;
use crate::progress::ProgressDisplay;
use crate::reconcile::{self, BundleReconciler, PlannedStep};
use crate::scanner::InstalledStateScanner;
use crate::synchronizer::{CheckoutSynchronizer, SyncOptions};
use crate::trash::TrashManager;

pub struct SyncOperation<'a, V: Vcs + ?Sized> {
    config: &'a RunConfig,
    vcs: &'a V,
    trash: TrashManager,
}

impl<'a, V: Vcs + ?Sized> SyncOperation<'a, V> {
    pub fn new(config: &'a RunConfig, vcs: &'a V) -> Self {
        Self {
            config,
            vcs,
            trash: TrashManager::new(&config.trash_dir),
        }
    }

    /// Use a specific trash manager
    pub fn with_trash(mut self, trash: TrashManager) -> Self {
        self.trash = trash;
        self
    }

    /// Run the sync; returns the counts of what changed
    pub fn execute(&self) -> Result<ActionCounts> {
        // Manifest problems surface before anything is touched
        let manifest = Manifest::load(&self.config.manifest_path)?;
        let scanner = InstalledStateScanner::new(self.vcs);
        let installed = scanner.scan(&self.config.bundle_dir, &manifest.static_names)?;
        let steps = reconcile::plan(&manifest, &installed, self.config.no_updates);

        let mut log = ActivityLog::new();
        let progress = ProgressDisplay::new(steps.len() as u64);
        let outcome = self.apply_steps(&steps, &mut log, &progress);

        match &outcome {
            Ok(()) => progress.finish(),
            Err(_) => progress.abandon(),
        }

        let persisted = self.persist(&log, &manifest);
        match (outcome, persisted) {
            (Err(e), Err(persist_err)) => {
                warn!(error = %persist_err, "could not write log or listing");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => {
                let counts = log.counts();
                if counts.removed > 0 {
                    info!(trash = %self.trash.trash_dir().display(), "removed bundles moved to trash");
                }
                Ok(counts)
            }
        }
    }

    fn apply_steps(
        &self,
        steps: &[PlannedStep],
        log: &mut ActivityLog,
        progress: &ProgressDisplay,
    ) -> Result<()> {
        let reconciler = BundleReconciler::new(self.vcs);
        let options = SyncOptions {
            submodule: self.config.submodule,
            run_commands: !self.config.no_updates,
        };
        let synchronizer =
            CheckoutSynchronizer::new(self.vcs, &self.trash, &self.config.bundle_dir, options);

        let mut first_failure: Option<BundleError> = None;
        for step in steps {
            progress.update_bundle(step.name());
            let applied_before = log.entries().len();

            let result = reconciler.decide(step).and_then(|action| {
                synchronizer.apply(&action, log)?;
                Ok(action)
            });
            progress.inc_bundle();

            match result {
                Ok(ReconciliationAction::Skip { .. }) => {}
                Ok(action) => {
                    if log.entries().len() > applied_before {
                        progress.report(action.verb(), action.name());
                    }
                }
                Err(e) if e.aborts_run() => return Err(e),
                Err(e) => {
                    warn!(name = step.name(), error = %e, "bundle failed, continuing with the rest");
                    first_failure.get_or_insert(e);
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Write the log and a fresh listing of the bundle directory
    fn persist(&self, log: &ActivityLog, manifest: &Manifest) -> Result<()> {
        let logged = log.write(&self.config.log_path);
        let listed = self.write_listing(manifest);

        match (logged, listed) {
            (Err(log_err), Err(listing_err)) => {
                warn!(error = %listing_err, "could not write listing");
                Err(log_err)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn write_listing(&self, manifest: &Manifest) -> Result<()> {
        let installed = InstalledStateScanner::new(self.vcs)
            .scan(&self.config.bundle_dir, &manifest.static_names)?;
        let entries = listing::collect(self.vcs, &installed);
        listing::write(&self.config.listing_path, &entries)?;
        debug!(bundles = entries.len(), "state written");
        Ok(())
    }
}
