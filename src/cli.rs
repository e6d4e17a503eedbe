//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

/// bundlesync - keep vim bundles in step with your vimrc
#[derive(Parser, Debug)]
#[command(
    name = "bundlesync",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Install, update and remove vim bundles declared in your vimrc",
    long_about = "bundlesync reads Bundle directives from your vimrc, clones missing bundles, \
                  updates existing ones to the declared branch, tag or commit, and moves bundles \
                  that are no longer declared into a trash directory.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  bundlesync\n    \
                  bundlesync plan --json\n    \
                  bundlesync --no-updates\n    \
                  bundlesync --vim-dir ~/dotfiles/vim --submodule"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by all subcommands
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Settings file (defaults to ~/.bundlesync.yaml when present)
    #[arg(long, global = true, env = "BUNDLESYNC_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Vim directory holding bundle/, doc/ and the trash
    #[arg(long, global = true, env = "BUNDLESYNC_VIM_DIR", value_name = "DIR")]
    pub vim_dir: Option<PathBuf>,

    /// Directory bundles are checked out into
    #[arg(long, global = true, env = "BUNDLESYNC_BUNDLE_DIR", value_name = "DIR")]
    pub bundle_dir: Option<PathBuf>,

    /// Manifest to read Bundle directives from (defaults to ~/.vimrc)
    #[arg(long, global = true, env = "BUNDLESYNC_MANIFEST", value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Where removed and conflicting bundles are moved
    #[arg(long, global = true, env = "BUNDLESYNC_TRASH_DIR", value_name = "DIR")]
    pub trash_dir: Option<PathBuf>,

    /// Change log file
    #[arg(long, global = true, env = "BUNDLESYNC_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Bundle listing file
    #[arg(long, global = true, env = "BUNDLESYNC_LISTING_FILE", value_name = "FILE")]
    pub listing_file: Option<PathBuf>,

    /// Install missing bundles only; leave installed ones alone
    #[arg(long, global = true, env = "BUNDLESYNC_NO_UPDATES")]
    pub no_updates: bool,

    /// Register bundles as git submodules of the repository holding them
    #[arg(long, global = true, env = "BUNDLESYNC_SUBMODULE")]
    pub submodule: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl From<&GlobalArgs> for Overrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            vim_dir: args.vim_dir.clone(),
            bundle_dir: args.bundle_dir.clone(),
            manifest: args.manifest.clone(),
            trash_dir: args.trash_dir.clone(),
            log_file: args.log_file.clone(),
            listing_file: args.listing_file.clone(),
            no_updates: args.no_updates,
            submodule: args.submodule,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring the bundle directory in line with the manifest (default)
    Sync,

    /// Show what sync would do without changing anything
    Plan(PlanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the plan command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show planned actions:\n    bundlesync plan\n\n\
                  Machine-readable output:\n    bundlesync plan --json")]
pub struct PlanArgs {
    /// Print actions as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for completions command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    bundlesync completions bash > ~/.bash_completion.d/bundlesync\n\n\
                  Generate zsh completions:\n    bundlesync completions zsh > ~/.zfunc/_bundlesync\n\n\
                  Generate fish completions:\n    bundlesync completions fish > ~/.config/fish/completions/bundlesync.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
