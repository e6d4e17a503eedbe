//! Remote access helpers for libgit2
//!
//! - credential callbacks delegating to git's own mechanisms (agent, keys in
//!   `~/.ssh`, credential helpers)
//! - source normalisation (scp-style ssh, `file://`, local paths)
//! - translation of libgit2 errors into short user-facing reasons

use std::borrow::Cow;

use git2::{Cred, CredentialType, Error, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks};

const SSH_KEY_NAMES: &[&str] = &["id_ed25519", "id_rsa", "id_ecdsa"];

fn auth_failed(message: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, message)
}

fn ssh_key_from_disk(username: &str) -> Result<Cred, Error> {
    let ssh_dir = dirs::home_dir().unwrap_or_default().join(".ssh");

    SSH_KEY_NAMES
        .iter()
        .map(|key| (ssh_dir.join(key), ssh_dir.join(format!("{key}.pub"))))
        .filter(|(private_key, _)| private_key.exists())
        .find_map(|(private_key, public_key)| {
            let public_key = public_key.exists().then_some(public_key.as_path());
            Cred::ssh_key(username, public_key, &private_key, None).ok()
        })
        .ok_or_else(|| auth_failed("no usable SSH key"))
}

fn plaintext_credentials(url: &str, username: Option<&str>) -> Result<Cred, Error> {
    let config = git2::Config::open_default().or_else(|_| git2::Config::new())?;

    if let Ok(cred) = Cred::credential_helper(&config, url, username) {
        return Ok(cred);
    }

    // Anonymous access so the server reports the real error for public repos
    Cred::userpass_plaintext(username.unwrap_or(""), "")
}

/// Callbacks that resolve credentials the way the git CLI would
pub fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|url, username_from_url, allowed| {
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(username).or_else(|_| ssh_key_from_disk(username));
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return plaintext_credentials(url, username_from_url);
        }

        Err(auth_failed("authentication failed"))
    });
    callbacks
}

/// Fetch options carrying the credential callbacks
pub fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut options = FetchOptions::new();
    options.remote_callbacks(remote_callbacks());
    options
}

/// Rewrite a source so libgit2 accepts it.
///
/// scp-style `git@host:path` becomes `ssh://git@host/path`, and `file://`
/// URLs with a relative or backslashed path get a proper absolute form.
pub fn normalize_source(source: &str) -> Cow<'_, str> {
    if source.starts_with("git@") {
        if let Some((host, path)) = source.split_once(':') {
            let path = path.trim_start_matches('/');
            return Cow::Owned(format!("ssh://{host}/{path}"));
        }
    }

    if let Some(after) = source.strip_prefix("file://") {
        if after.contains('\\') || (!after.is_empty() && !after.starts_with('/')) {
            let path = after.replace('\\', "/");
            return Cow::Owned(format!("file:///{}", path.trim_start_matches('/')));
        }
    }

    Cow::Borrowed(source)
}

/// Whether `source` refers to a repository on the local filesystem
pub fn is_local_source(source: &str) -> bool {
    source.starts_with("file://")
        || source.starts_with('/')
        || source.starts_with('.')
        || std::path::Path::new(source).is_absolute()
}

type Classifier = fn(&str, ErrorClass) -> bool;

const REASONS: &[(Classifier, &str)] = &[
    (
        |msg, _| {
            msg.contains("not found")
                || msg.contains("404")
                || msg.contains("does not exist")
                || msg.contains("too many redirects")
                || msg.contains("authentication replays")
        },
        "Repository not found",
    ),
    (
        |msg, _| msg.contains("authentication") || msg.contains("credentials"),
        "Authentication failed",
    ),
    (
        |msg, _| msg.contains("permission denied") || msg.contains("access denied"),
        "Permission denied",
    ),
    (
        |msg, _| {
            msg.contains("connection")
                || msg.contains("network")
                || msg.contains("timeout")
                || msg.contains("timed out")
        },
        "Network error",
    ),
    (
        |msg, class| class == ErrorClass::Http && msg.contains("certificate"),
        "Certificate error",
    ),
    (
        |msg, class| class == ErrorClass::Http && msg.contains("ssl"),
        "SSL error",
    ),
];

/// Short reason for a libgit2 failure
pub fn describe_git_error(err: &Error) -> String {
    let message = err.message().to_lowercase();
    let class = err.class();

    if let Some((_, reason)) = REASONS.iter().find(|(check, _)| check(&message, class)) {
        return (*reason).to_string();
    }

    match class {
        ErrorClass::Http => format!("HTTP error: {}", err.message()),
        ErrorClass::Ssh => format!("SSH error: {}", err.message()),
        _ => err.message().to_string(),
    }
}
