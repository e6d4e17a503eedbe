//! Progress output for sync runs

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};

/// Per-bundle progress bar plus one styled line per change
pub struct ProgressDisplay {
    bundle_pb: ProgressBar,
}

impl ProgressDisplay {
    /// Create a new progress display; hidden when stderr is not a terminal
    pub fn new(total_bundles: u64) -> Self {
        let bundle_pb = if Term::stderr().is_term() {
            ProgressBar::new(total_bundles)
        } else {
            ProgressBar::hidden()
        };

        let bundle_style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bundle_pb.set_style(bundle_style);

        Self { bundle_pb }
    }

    /// Show the bundle currently being processed
    pub fn update_bundle(&self, bundle_name: &str) {
        self.bundle_pb.set_message(bundle_name.to_string());
    }

    /// Print a change line (`Add foo`) above the bar
    pub fn report(&self, verb: &str, bundle_name: &str) {
        let style = match verb {
            "Add" => Style::new().green().bold(),
            "Remove" => Style::new().red().bold(),
            _ => Style::new().yellow().bold(),
        };
        let line = format!("{} {}", style.apply_to(verb), bundle_name);
        self.bundle_pb.suspend(|| println!("{line}"));
    }

    pub fn inc_bundle(&self) {
        self.bundle_pb.inc(1);
    }

    pub fn finish(&self) {
        self.bundle_pb.finish_and_clear();
    }

    /// Abandon on error
    pub fn abandon(&self) {
        self.bundle_pb.abandon();
    }
}
