//! Read-only inspection of a local git repository.

use std::path::{Path, PathBuf};

use gix::remote::Direction;
use tracing::debug;

use super::JugglerError;

/// What the identity tools need to know about a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    /// Working tree root, or the git dir for a bare repository.
    pub root: PathBuf,
    /// Name of the default fetch remote.
    pub remote_name: Option<String>,
    /// URL of the default fetch remote.
    pub remote_url: Option<String>,
    /// Host part of the remote URL; an SSH alias for scp-style remotes.
    pub host: Option<String>,
    /// Effective `user.name`.
    pub user_name: Option<String>,
    /// Effective `user.email`.
    pub user_email: Option<String>,
}

/// Finds the repository containing `path` and reads its remote and user
/// settings. Nothing is spawned; only the git config files are read.
pub fn inspect(path: &Path) -> Result<RepoInfo, JugglerError> {
    let repo = gix::discover(path).map_err(|e| {
        debug!(path = %path.display(), error = %e, "Repository discovery failed");
        JugglerError::NotARepository {
            path: path.to_path_buf(),
        }
    })?;

    let root = repo
        .workdir()
        .map_or_else(|| repo.git_dir().to_path_buf(), Path::to_path_buf);

    let mut info = RepoInfo {
        root,
        ..RepoInfo::default()
    };

    if let Some(remote) = repo.find_default_remote(Direction::Fetch) {
        let remote = remote.map_err(|e| JugglerError::Git(e.to_string()))?;
        info.remote_name = remote.name().map(|n| n.as_bstr().to_string());
        if let Some(url) = remote.url(Direction::Fetch) {
            info.host = url.host().map(str::to_string);
            info.remote_url = Some(url.to_bstring().to_string());
        }
    }

    let config = repo.config_snapshot();
    info.user_name = config.string("user.name").map(|v| v.to_string());
    info.user_email = config.string("user.email").map(|v| v.to_string());

    debug!(
        root = %info.root.display(),
        remote = ?info.remote_url,
        host = ?info.host,
        "Inspected repository"
    );

    Ok(info)
}
