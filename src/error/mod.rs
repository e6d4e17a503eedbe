//! Error types and handling for bundlesync
//!
//! Uses `thiserror` for error definitions and `miette` for diagnostics.
//!
//! Variants are grouped by the stage that raises them:
//! - manifest validation (fatal before anything touches the disk)
//! - ref resolution (fatal, stops the remaining bundles)
//! - quarantine and removal (fatal, original content stays in place)
//! - external post-install commands (fatal, exit code passed through)
//! - git, configuration and file system plumbing

use miette::Diagnostic;
use thiserror::Error;

/// Exit code reserved for validation, resolution and removal failures.
pub const VALIDATION_EXIT_CODE: i32 = 2;

/// Exit code for every other failure that has no code of its own.
pub const GENERAL_EXIT_CODE: i32 = 1;

/// Main error type for bundlesync operations
#[derive(Error, Diagnostic, Debug)]
pub enum BundleError {
    // Manifest errors
    #[error("Bundle '{name}' is declared twice from {source_url}")]
    #[diagnostic(
        code(bundlesync::manifest::duplicate_entry),
        help("Remove one of the duplicate Bundle lines from the manifest")
    )]
    DuplicateEntry { name: String, source_url: String },

    #[error("Bundle '{name}' is declared from two different sources: {first} and {second}")]
    #[diagnostic(
        code(bundlesync::manifest::conflicting_source),
        help("Bundle names come from the last path segment of the source; keep only one of them")
    )]
    ConflictingSource {
        name: String,
        first: String,
        second: String,
    },

    #[error("Invalid directive on manifest line {line}: {reason}")]
    #[diagnostic(code(bundlesync::manifest::invalid_directive))]
    InvalidDirective { line: usize, reason: String },

    #[error("Bundle command on manifest line {line} does not follow a Bundle line")]
    #[diagnostic(
        code(bundlesync::manifest::orphan_command),
        help("Place BundleCommand directly below the Bundle it belongs to")
    )]
    OrphanCommand { line: usize },

    #[error("Manifest not found: {path}")]
    #[diagnostic(
        code(bundlesync::manifest::not_found),
        help("Pass --manifest or create the file")
    )]
    ManifestNotFound { path: String },

    // Resolution errors
    #[error("Bundle '{bundle}': ref '{git_ref}' is neither a branch, a tag nor a commit of {source_url}")]
    #[diagnostic(
        code(bundlesync::resolve::unknown_ref),
        help("Fix the ref in the manifest; no further bundles were processed")
    )]
    UnknownRef {
        bundle: String,
        git_ref: String,
        source_url: String,
    },

    // Quarantine errors
    #[error("No free quarantine name for '{name}' in {trash_dir}")]
    #[diagnostic(
        code(bundlesync::trash::exhausted),
        help("Empty the trash directory and run again")
    )]
    QuarantineExhausted { name: String, trash_dir: String },

    #[error("Failed to remove bundle '{name}': {reason}")]
    #[diagnostic(
        code(bundlesync::trash::removal_failed),
        help("The bundle directory was left untouched")
    )]
    RemovalFailed { name: String, reason: String },

    // External command errors
    #[error("Command for bundle '{bundle}' exited with status {code}: {command}")]
    #[diagnostic(code(bundlesync::command::failed))]
    ExternalCommandFailed {
        bundle: String,
        command: String,
        code: i32,
    },

    #[error("Failed to start command for bundle '{bundle}': {reason}")]
    #[diagnostic(code(bundlesync::command::spawn_failed))]
    CommandSpawnFailed { bundle: String, reason: String },

    // Git errors
    #[error("Git operation failed: {message}")]
    #[diagnostic(code(bundlesync::git::operation_failed))]
    GitOperationFailed { message: String },

    #[error("Failed to clone repository: {url}: {reason}")]
    #[diagnostic(
        code(bundlesync::git::clone_failed),
        help("Check that URL is correct and you have access to repository")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to fetch from {url}: {reason}")]
    #[diagnostic(code(bundlesync::git::fetch_failed))]
    GitFetchFailed { url: String, reason: String },

    #[error("Failed to resolve git ref '{git_ref}': {reason}")]
    #[diagnostic(code(bundlesync::git::ref_resolve_failed))]
    GitRefResolveFailed { git_ref: String, reason: String },

    #[error("Failed to checkout '{rev}': {reason}")]
    #[diagnostic(code(bundlesync::git::checkout_failed))]
    GitCheckoutFailed { rev: String, reason: String },

    #[error("Failed to open repository at '{path}': {reason}")]
    #[diagnostic(code(bundlesync::git::open_failed))]
    GitOpenFailed { path: String, reason: String },

    // Configuration errors
    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(bundlesync::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(bundlesync::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Home directory could not be determined")]
    #[diagnostic(
        code(bundlesync::config::no_home),
        help("Pass --vim-dir and --manifest explicitly")
    )]
    HomeDirNotFound,

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(bundlesync::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(bundlesync::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(bundlesync::fs::io_error))]
    IoError { message: String },
}

impl BundleError {
    /// Process exit code for this error.
    ///
    /// Post-install commands keep their own code so the caller sees exactly
    /// what the external tool reported.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundleError::ExternalCommandFailed { code, .. } => *code,
            BundleError::DuplicateEntry { .. }
            | BundleError::ConflictingSource { .. }
            | BundleError::InvalidDirective { .. }
            | BundleError::OrphanCommand { .. }
            | BundleError::UnknownRef { .. }
            | BundleError::QuarantineExhausted { .. }
            | BundleError::RemovalFailed { .. } => VALIDATION_EXIT_CODE,
            _ => GENERAL_EXIT_CODE,
        }
    }

    /// Whether this error stops processing of all remaining bundles.
    ///
    /// Other failures only affect the bundle that raised them.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            BundleError::UnknownRef { .. }
                | BundleError::QuarantineExhausted { .. }
                | BundleError::RemovalFailed { .. }
                | BundleError::ExternalCommandFailed { .. }
                | BundleError::CommandSpawnFailed { .. }
        ) || self.is_manifest_error()
    }

    /// Whether this error stops the run before any directory is touched.
    pub fn is_manifest_error(&self) -> bool {
        matches!(
            self,
            BundleError::DuplicateEntry { .. }
                | BundleError::ConflictingSource { .. }
                | BundleError::InvalidDirective { .. }
                | BundleError::OrphanCommand { .. }
        )
    }
}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        BundleError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for BundleError {
    fn from(err: serde_yaml::Error) -> Self {
        BundleError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<git2::Error> for BundleError {
    fn from(err: git2::Error) -> Self {
        BundleError::GitOperationFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, BundleError>;
