//! Reconciliation of declared and installed bundles
//!
//! Works in two stages so that nothing is resolved against a remote before
//! it is needed:
//! - [`plan`] pairs every declared bundle with what is on disk, without any
//!   network access, and orders the steps (declaration order, removals last)
//! - [`BundleReconciler::decide`] resolves the ref of one step and turns it
//!   into a [`ReconciliationAction`]
//!
//! The sync operation decides and applies one step at a time, so a bad ref
//! stops the run before any later bundle or any removal is touched.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::{
    BundleSpec, InstalledBundle, InstalledKind, ReconciliationAction, same_source,
};
use crate::error::Result;
use crate::git::Vcs;
use crate::manifest::Manifest;
use crate::resolver::RefResolver;

/// Pairing of a bundle name with its declared and installed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedStep {
    /// Declared, nothing on disk
    Install(BundleSpec),
    /// Declared and installed from the same source
    Check {
        spec: BundleSpec,
        installed: InstalledBundle,
    },
    /// Declared, but the directory comes from elsewhere
    Replace {
        spec: BundleSpec,
        installed: InstalledBundle,
    },
    /// On disk, no longer declared
    Remove(InstalledBundle),
    /// Nothing will be done
    Leave { name: String, reason: String },
}

impl PlannedStep {
    pub fn name(&self) -> &str {
        match self {
            PlannedStep::Install(spec)
            | PlannedStep::Check { spec, .. }
            | PlannedStep::Replace { spec, .. } => &spec.name,
            PlannedStep::Remove(installed) => &installed.name,
            PlannedStep::Leave { name, .. } => name,
        }
    }
}

fn leave(name: &str, reason: &str) -> PlannedStep {
    PlannedStep::Leave {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Pair declared bundles with installed ones.
///
/// With `no_updates`, bundles already on disk are left as they are; missing
/// ones are still installed and undeclared ones still removed.
pub fn plan(manifest: &Manifest, installed: &[InstalledBundle], no_updates: bool) -> Vec<PlannedStep> {
    let by_name: HashMap<&str, &InstalledBundle> =
        installed.iter().map(|b| (b.name.as_str(), b)).collect();

    let mut steps = Vec::with_capacity(manifest.bundles.len() + installed.len());

    for spec in &manifest.bundles {
        let current = by_name.get(spec.name.as_str()).copied();

        let step = match current {
            _ if spec.is_static => {
                if current.is_none() {
                    warn!(name = %spec.name, "static bundle is not installed");
                }
                leave(&spec.name, "static")
            }
            None => PlannedStep::Install(spec.clone()),
            Some(_) if no_updates => leave(&spec.name, "updates disabled"),
            Some(found) if found.kind == InstalledKind::Static => leave(&spec.name, "static"),
            Some(found) => {
                let unchanged = found.kind == InstalledKind::Checkout
                    && found
                        .remote_source
                        .as_deref()
                        .is_some_and(|remote| same_source(remote, &spec.source));
                if unchanged {
                    PlannedStep::Check {
                        spec: spec.clone(),
                        installed: found.clone(),
                    }
                } else {
                    PlannedStep::Replace {
                        spec: spec.clone(),
                        installed: found.clone(),
                    }
                }
            }
        };
        steps.push(step);
    }

    for bundle in installed {
        let declared = manifest.bundles.iter().any(|s| s.name == bundle.name);
        if declared || manifest.is_static(&bundle.name) {
            continue;
        }
        steps.push(PlannedStep::Remove(bundle.clone()));
    }

    debug!(steps = steps.len(), "planned");
    steps
}

pub struct BundleReconciler<'a, V: Vcs + ?Sized> {
    resolver: RefResolver<'a, V>,
}

impl<'a, V: Vcs + ?Sized> BundleReconciler<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        Self {
            resolver: RefResolver::new(vcs),
        }
    }

    /// Turn one planned step into an action, resolving its ref if needed
    pub fn decide(&self, step: &PlannedStep) -> Result<ReconciliationAction> {
        let action = match step {
            PlannedStep::Install(spec) => ReconciliationAction::Add {
                spec: spec.clone(),
                rev: self.resolver.resolve(spec)?.rev,
            },
            PlannedStep::Check { spec, installed } => {
                let resolved = self.resolver.resolve(spec)?;
                match installed.current_ref.as_deref() {
                    Some(head) if resolved.matches(head) => ReconciliationAction::Skip {
                        name: spec.name.clone(),
                        reason: "up to date".to_string(),
                    },
                    head => ReconciliationAction::Update {
                        spec: spec.clone(),
                        installed: installed.clone(),
                        from_ref: head.unwrap_or_default().to_string(),
                        to_ref: resolved.rev,
                    },
                }
            }
            PlannedStep::Replace { spec, installed } => ReconciliationAction::RemoteChanged {
                spec: spec.clone(),
                installed: installed.clone(),
                old_source: installed
                    .remote_source
                    .clone()
                    .unwrap_or_else(|| "unmanaged directory".to_string()),
                new_source: spec.source.clone(),
                rev: self.resolver.resolve(spec)?.rev,
            },
            PlannedStep::Remove(installed) => ReconciliationAction::Remove {
                installed: installed.clone(),
            },
            PlannedStep::Leave { name, reason } => ReconciliationAction::Skip {
                name: name.clone(),
                reason: reason.clone(),
            },
        };
        debug!(name = step.name(), verb = action.verb(), "decided");
        Ok(action)
    }

    /// Decide every step, stopping at the first failure
    pub fn reconcile(&self, steps: &[PlannedStep]) -> Result<Vec<ReconciliationAction>> {
        steps.iter().map(|step| self.decide(step)).collect()
    }
}
