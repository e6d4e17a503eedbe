//! Domain models for bundlesync
//!
//! Plain data describing the desired bundles, the bundles found on disk and
//! the actions that bring the two in line. No I/O happens here.

pub mod action;
pub mod bundle;

pub use action::{ActionCounts, ReconciliationAction};
pub use bundle::{BundleSpec, InstalledBundle, InstalledKind, same_source};
