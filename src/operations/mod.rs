//! Operations coordinating a whole run
//!
//! - SyncOperation: read the manifest, reconcile, apply, write the log and listing
//! - PlanOperation: the same up to reconciliation, without touching the disk
//!
//! The operations coordinate with:
//! - Manifest parser and installed state scanner
//! - Reconciler and ref resolver
//! - Checkout synchronizer and trash manager
//! - Activity log and listing

pub mod plan;
pub mod sync;

pub use plan::PlanOperation;
pub use sync::SyncOperation;
