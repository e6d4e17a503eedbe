//! Plan operation: decide every action without applying any

use crate::config::RunConfig;
use crate::domain::ReconciliationAction;
use crate::error::Result;
use crate::git::Vcs;
use crate::manifest::Manifest;
use crate::reconcile::{self, BundleReconciler};
use crate::scanner::InstalledStateScanner;

pub struct PlanOperation<'a, V: Vcs + ?Sized> {
    config: &'a RunConfig,
    vcs: &'a V,
}

impl<'a, V: Vcs + ?Sized> PlanOperation<'a, V> {
    pub fn new(config: &'a RunConfig, vcs: &'a V) -> Self {
        Self { config, vcs }
    }

    /// Actions a sync would take, in execution order.
    ///
    /// Refs are resolved against the remotes, so an unknown ref fails here
    /// exactly as it would during a sync.
    pub fn execute(&self) -> Result<Vec<ReconciliationAction>> {
        let manifest = Manifest::load(&self.config.manifest_path)?;
        let installed = InstalledStateScanner::new(self.vcs)
            .scan(&self.config.bundle_dir, &manifest.static_names)?;
        let steps = reconcile::plan(&manifest, &installed, self.config.no_updates);
        BundleReconciler::new(self.vcs).reconcile(&steps)
    }
}
