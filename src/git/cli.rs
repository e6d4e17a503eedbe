//! Operations delegated to the `git` command line
//!
//! - `ls-remote` so ref listing honours the user's git configuration
//! - submodule registration and removal, which libgit2 only half supports

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use super::transport::is_local_source;
use super::{RemoteRef, RemoteRefKind};
use crate::error::{BundleError, Result};

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| BundleError::GitOperationFailed {
            message: format!("failed to run git: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BundleError::GitOperationFailed {
            message: format!("git {}: {}", args.join(" "), stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn is_sha(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse `git ls-remote` output into refs.
///
/// Annotated tags are reported with the commit they peel to.
pub fn parse_ls_remote(stdout: &str) -> Vec<RemoteRef> {
    let mut refs: Vec<RemoteRef> = Vec::new();

    for line in stdout.lines() {
        let Some((sha, name)) = line.split_once('\t') else {
            continue;
        };
        if !is_sha(sha) {
            continue;
        }

        if name == "HEAD" {
            refs.push(RemoteRef::new(RemoteRefKind::Head, "HEAD", sha));
        } else if let Some(branch) = name.strip_prefix("refs/heads/") {
            refs.push(RemoteRef::new(RemoteRefKind::Branch, branch, sha));
        } else if let Some(tag) = name.strip_prefix("refs/tags/") {
            let (tag, peeled) = match tag.strip_suffix("^{}") {
                Some(tag) => (tag, true),
                None => (tag, false),
            };
            match refs
                .iter_mut()
                .find(|r| r.kind == RemoteRefKind::Tag && r.name == tag)
            {
                Some(existing) if peeled => existing.sha = sha.to_string(),
                Some(_) => {}
                None => refs.push(RemoteRef::new(RemoteRefKind::Tag, tag, sha)),
            }
        }
    }

    refs
}

/// List the refs advertised by `source`
pub fn ls_remote(source: &str) -> Result<Vec<RemoteRef>> {
    let cwd = std::env::current_dir()?;
    let stdout = run_git(&cwd, &["ls-remote", source]).map_err(|e| match e {
        BundleError::GitOperationFailed { message } => BundleError::GitFetchFailed {
            url: source.to_string(),
            reason: message,
        },
        other => other,
    })?;
    let refs = parse_ls_remote(&stdout);
    debug!(source, count = refs.len(), "listed remote refs");
    Ok(refs)
}

/// `git submodule add` at `rel_path`
pub fn submodule_add(superproject: &Path, source: &str, rel_path: &Path) -> Result<()> {
    let rel = rel_path.to_string_lossy().replace('\\', "/");
    let mut args = Vec::new();
    if is_local_source(source) {
        // Recent git refuses local submodule sources unless asked explicitly
        args.extend(["-c", "protocol.file.allow=always"]);
    }
    args.extend(["submodule", "add", "--quiet", "--", source, rel.as_str()]);
    run_git(superproject, &args)?;
    debug!(source, path = %rel, "registered submodule");
    Ok(())
}

/// Remove the registration of the submodule at `rel_path`.
///
/// Missing entries are not an error; the directory itself is left alone.
pub fn submodule_remove(superproject: &Path, rel_path: &Path) -> Result<()> {
    let rel = rel_path.to_string_lossy().replace('\\', "/");
    let section = format!("submodule.{rel}");

    run_git(
        superproject,
        &["rm", "--cached", "--quiet", "--ignore-unmatch", "-r", "--", &rel],
    )?;

    if superproject.join(".gitmodules").is_file() {
        if let Err(e) = run_git(
            superproject,
            &["config", "-f", ".gitmodules", "--remove-section", &section],
        ) {
            warn!(path = %rel, error = %e, "no .gitmodules entry to remove");
        }
        run_git(superproject, &["add", "--", ".gitmodules"])?;
    }

    if let Err(e) = run_git(superproject, &["config", "--remove-section", &section]) {
        debug!(path = %rel, error = %e, "no local submodule config to remove");
    }

    debug!(path = %rel, "deregistered submodule");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";
    const C: &str = "3333333333333333333333333333333333333333";

    #[test]
    fn test_parse_ls_remote() {
        let stdout = format!(
            "{A}\tHEAD\n{A}\trefs/heads/main\n{B}\trefs/heads/dev\n{C}\trefs/tags/v1.0\n{B}\trefs/tags/v1.0^{{}}\n{A}\trefs/tags/light\n"
        );
        let refs = parse_ls_remote(&stdout);

        assert_eq!(refs.len(), 5);
        assert_eq!(refs[0], RemoteRef::new(RemoteRefKind::Head, "HEAD", A));
        assert_eq!(refs[2], RemoteRef::new(RemoteRefKind::Branch, "dev", B));
        // Annotated tag resolves to the peeled commit
        assert_eq!(refs[3], RemoteRef::new(RemoteRefKind::Tag, "v1.0", B));
        assert_eq!(refs[4], RemoteRef::new(RemoteRefKind::Tag, "light", A));
    }

    #[test]
    fn test_parse_ls_remote_skips_garbage() {
        let refs = parse_ls_remote("warning: something\nnot-a-sha\trefs/heads/x\n");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_ls_remote_missing_repository() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = ls_remote(&missing.display().to_string()).unwrap_err();
        assert!(matches!(err, BundleError::GitFetchFailed { .. }));
    }
}
