//! Reconciliation actions and per-run counters

use serde::Serialize;

use super::bundle::{BundleSpec, InstalledBundle};

/// One decision taken for a bundle name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconciliationAction {
    /// Declared but not installed
    Add { spec: BundleSpec, rev: String },

    /// Installed from the same source but at a different commit
    Update {
        spec: BundleSpec,
        installed: InstalledBundle,
        from_ref: String,
        to_ref: String,
    },

    /// Installed, but from a different source than declared
    RemoteChanged {
        spec: BundleSpec,
        installed: InstalledBundle,
        old_source: String,
        new_source: String,
        rev: String,
    },

    /// Installed but no longer declared
    Remove { installed: InstalledBundle },

    /// Nothing to do
    Skip { name: String, reason: String },
}

impl ReconciliationAction {
    pub fn name(&self) -> &str {
        match self {
            ReconciliationAction::Add { spec, .. }
            | ReconciliationAction::Update { spec, .. }
            | ReconciliationAction::RemoteChanged { spec, .. } => &spec.name,
            ReconciliationAction::Remove { installed } => &installed.name,
            ReconciliationAction::Skip { name, .. } => name,
        }
    }

    /// Short verb used in progress output
    pub fn verb(&self) -> &'static str {
        match self {
            ReconciliationAction::Add { .. } => "Add",
            ReconciliationAction::Update { .. } => "Update",
            ReconciliationAction::RemoteChanged { .. } => "Replace",
            ReconciliationAction::Remove { .. } => "Remove",
            ReconciliationAction::Skip { .. } => "Skip",
        }
    }
}

/// Bundles added, updated and removed during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ActionCounts {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }

    /// Summary such as `1 bundle added, 2 bundles removed`.
    ///
    /// Only non-zero categories are mentioned; `None` when nothing changed.
    pub fn format(&self) -> Option<String> {
        let parts = [
            ("added", self.added),
            ("updated", self.updated),
            ("removed", self.removed),
        ];

        let non_zero: Vec<String> = parts
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(verb, count)| match *count {
                1 => format!("1 bundle {verb}"),
                _ => format!("{count} bundles {verb}"),
            })
            .collect();

        if non_zero.is_empty() {
            None
        } else {
            Some(non_zero.join(", "))
        }
    }
}
