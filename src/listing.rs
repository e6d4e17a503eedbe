//! Listing of installed bundles (`doc/bundles.txt`)

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::common::fs::write_atomic;
use crate::domain::{InstalledBundle, InstalledKind};
use crate::error::Result;
use crate::git::Vcs;

pub const LISTING_HEADER: &str = "*bundles.txt*  Bundles managed by bundlesync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    /// Nearest tag or abbreviated commit
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub source: Option<String>,
    pub is_static: bool,
}

impl ListingEntry {
    fn line(&self) -> String {
        let mut line = format!("- {}", self.name);
        if self.is_static {
            line.push_str(" (static)");
        } else if let Some(git_ref) = &self.git_ref {
            line.push(' ');
            line.push_str(git_ref);
        }
        if let Some(source) = &self.source {
            line.push_str("  ");
            line.push_str(source);
        }
        line
    }
}

/// Build listing entries for the bundles found on disk
pub fn collect<V: Vcs + ?Sized>(vcs: &V, installed: &[InstalledBundle]) -> Vec<ListingEntry> {
    installed
        .iter()
        .map(|bundle| {
            let git_ref = match bundle.kind {
                InstalledKind::Checkout => match vcs.describe(&bundle.path) {
                    Ok(desc) => Some(desc),
                    Err(e) => {
                        warn!(name = %bundle.name, error = %e, "could not describe checkout");
                        None
                    }
                },
                InstalledKind::Static | InstalledKind::Foreign => None,
            };
            ListingEntry {
                name: bundle.name.clone(),
                git_ref,
                source: bundle.remote_source.clone(),
                is_static: !bundle.is_managed(),
            }
        })
        .collect()
}

pub fn render(entries: &[ListingEntry]) -> String {
    let mut text = format!("{LISTING_HEADER}\n\n");
    for entry in entries {
        text.push_str(&entry.line());
        text.push('\n');
    }
    text
}

pub fn write(path: &Path, entries: &[ListingEntry]) -> Result<()> {
    write_atomic(path, &render(entries))?;
    debug!(path = %path.display(), count = entries.len(), "listing written");
    Ok(())
}
