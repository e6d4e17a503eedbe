//! Command implementations for bundlesync CLI

pub mod completions;
pub mod plan;
pub mod sync;
