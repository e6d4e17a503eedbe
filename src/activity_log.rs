//! Persistent log of bundle changes
//!
//! The log file is a fixed header line followed by run blocks, newest first.
//! Each run reads the whole file, drops every copy of the header, and
//! rewrites header + new block + previous body atomically.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::fs::write_atomic;
use crate::domain::ActionCounts;
use crate::error::{BundleError, Result};

pub const LOG_HEADER: &str = "*bundle-log.txt*  Log of bundle changes made by bundlesync";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line of a run block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Added {
        name: String,
        git_ref: String,
    },
    Updated {
        name: String,
        from: String,
        to: String,
    },
    Removed {
        name: String,
        git_ref: String,
    },
    SourceChanged {
        name: String,
        from: String,
        to: String,
    },
    /// Local content moved aside before a fresh checkout
    Reset {
        name: String,
        reason: String,
        quarantined: PathBuf,
    },
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Added { name, git_ref } => write!(f, "Add {name} {git_ref}"),
            LogEntry::Updated { name, from, to } => write!(f, "up {name} {from} -> {to}"),
            LogEntry::Removed { name, git_ref } => write!(f, "Del {name} {git_ref}"),
            LogEntry::SourceChanged { name, from, to } => {
                write!(f, "bundle for {name} changed from {from} to {to}")
            }
            LogEntry::Reset {
                name,
                reason,
                quarantined,
            } => write!(
                f,
                "reset {name}: {reason}, old content in {}",
                quarantined.display()
            ),
        }
    }
}

/// Entries collected during one run
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
    counts: ActionCounts,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Added { .. } => self.counts.added += 1,
            LogEntry::Updated { .. } | LogEntry::SourceChanged { .. } => self.counts.updated += 1,
            LogEntry::Removed { .. } => self.counts.removed += 1,
            LogEntry::Reset { .. } => {}
        }
        debug!(entry = %entry, "recorded");
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn counts(&self) -> ActionCounts {
        self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run block for this run, `None` when nothing happened
    pub fn render_run(&self, timestamp: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let summary = self
            .counts
            .format()
            .unwrap_or_else(|| "no bundles changed".to_string());
        let mut block = format!("{timestamp} -- {summary}\n");
        for entry in &self.entries {
            block.push_str(&format!("  {entry}\n"));
        }
        Some(block)
    }

    /// Prepend this run to the log file at `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.write_at(path, &timestamp)
    }

    pub fn write_at(&self, path: &Path, timestamp: &str) -> Result<()> {
        let Some(block) = self.render_run(timestamp) else {
            debug!("nothing to log");
            return Ok(());
        };

        let existing = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(BundleError::FileReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        write_atomic(path, &merge(&existing, &block))?;
        debug!(path = %path.display(), entries = self.entries.len(), "log written");
        Ok(())
    }
}

/// Header, then `block`, then the old body without any header copies
fn merge(existing: &str, block: &str) -> String {
    let body: Vec<&str> = existing
        .lines()
        .filter(|line| line.trim_end() != LOG_HEADER)
        .skip_while(|line| line.trim().is_empty())
        .collect();

    let mut merged = format!("{LOG_HEADER}\n\n{block}");
    if !body.is_empty() {
        merged.push('\n');
        merged.push_str(&body.join("\n"));
        merged.push('\n');
    }
    merged
}
