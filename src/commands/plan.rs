//! Plan command CLI wrapper

use console::Style;

use crate::cli::{GlobalArgs, PlanArgs};
use crate::config::{Overrides, RunConfig};
use crate::domain::ReconciliationAction;
use crate::error::{BundleError, Result};
use crate::git::{GitVcs, short_sha};
use crate::operations::PlanOperation;

/// One human-readable line per action
fn describe(action: &ReconciliationAction) -> String {
    match action {
        ReconciliationAction::Add { spec, rev } => {
            format!("{} {}", spec.source, short_sha(rev))
        }
        ReconciliationAction::Update {
            from_ref, to_ref, ..
        } => format!("{} -> {}", short_sha(from_ref), short_sha(to_ref)),
        ReconciliationAction::RemoteChanged {
            old_source,
            new_source,
            ..
        } => format!("{old_source} -> {new_source}"),
        ReconciliationAction::Remove { installed } => installed.path.display().to_string(),
        ReconciliationAction::Skip { reason, .. } => format!("({reason})"),
    }
}

/// Run plan command
pub fn run(global: &GlobalArgs, args: &PlanArgs) -> Result<()> {
    let config = RunConfig::load(global.config.as_deref(), &Overrides::from(global))?;
    let vcs = GitVcs::new();

    let actions = PlanOperation::new(&config, &vcs).execute()?;

    if args.json {
        let json = serde_json::to_string_pretty(&actions).map_err(|e| BundleError::IoError {
            message: format!("failed to serialize plan: {e}"),
        })?;
        println!("{json}");
        return Ok(());
    }

    if actions.is_empty() {
        println!("No bundles declared or installed");
        return Ok(());
    }

    for action in &actions {
        let verb = format!("{:<7}", action.verb());
        let verb = match action {
            ReconciliationAction::Skip { .. } => Style::new().dim().apply_to(verb),
            ReconciliationAction::Remove { .. } => Style::new().red().bold().apply_to(verb),
            _ => Style::new().green().bold().apply_to(verb),
        };
        println!("{verb} {} {}", action.name(), describe(action));
    }
    Ok(())
}
