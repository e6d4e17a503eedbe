//! Sync command CLI wrapper
//!
//! Resolves the run configuration and delegates to operations/sync.rs.

use console::Style;

use crate::cli::GlobalArgs;
use crate::config::{Overrides, RunConfig};
use crate::error::Result;
use crate::git::GitVcs;
use crate::operations::SyncOperation;

/// Run sync command
pub fn run(global: &GlobalArgs) -> Result<()> {
    let config = RunConfig::load(global.config.as_deref(), &Overrides::from(global))?;
    let vcs = GitVcs::new();

    let counts = SyncOperation::new(&config, &vcs).execute()?;

    match counts.format() {
        Some(summary) => println!("{}", Style::new().bold().apply_to(summary)),
        None => println!("All bundles up to date"),
    }
    Ok(())
}
