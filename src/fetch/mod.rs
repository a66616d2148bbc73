//! Repository fetch: materializes a [`ScanRequest`] into a local working
//! tree, via `git2` for remote URLs or a direct reference for local paths
//! (used by tests and by `scan <path>` CLI invocations).

use std::path::{Path, PathBuf};

use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use tracing::{info, instrument};

use crate::core::errors::{HardGatesError, Result};
use crate::core::model::{ScanId, ScanRequest};
use crate::core::pipeline::context::StopSignal;

/// Where working trees are materialized, one subdirectory per scan.
fn workspace_root() -> PathBuf {
    std::env::temp_dir().join("hardgates-workspaces")
}

/// Allocate (and create) the working-tree directory for `scan_id`.
pub fn workspace_dir(scan_id: ScanId) -> Result<PathBuf> {
    let dir = workspace_root().join(scan_id.to_string());
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Remove a scan's working tree. Not an error if it's already gone.
pub fn cleanup_workspace(scan_id: ScanId) -> Result<()> {
    let dir = workspace_root().join(scan_id.to_string());
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Materialize `request.repository_url` under `dest`, returning the path to
/// the checked-out working tree (always `dest` itself).
///
/// A `repository_url` that resolves to an existing local directory is used
/// directly as a git checkout of convenience — no network access, no copy —
/// which is how the CLI's `scan <local-path>` form and the test suite avoid
/// a real clone. `stop` is checked from the transfer-progress callback
/// during a remote clone, so a hung or slow network fetch is one of the
/// cooperative cancellation checkpoints, not a blind spot (§5).
#[instrument(skip(request, stop), fields(url = %request.repository_url))]
pub fn fetch_repository(request: &ScanRequest, dest: &Path, stop: &StopSignal) -> Result<PathBuf> {
    let source = request.repository_url.trim();

    if let Some(local) = local_path(source) {
        info!(path = %local.display(), "using local path as working tree");
        return Ok(local);
    }

    clone_remote(
        source,
        request.branch.as_deref(),
        request.credential.as_deref(),
        dest,
        stop,
    )?;
    Ok(dest.to_path_buf())
}

fn local_path(source: &str) -> Option<PathBuf> {
    let candidate = source.strip_prefix("file://").unwrap_or(source);
    let path = PathBuf::from(candidate);
    if path.is_dir() {
        Some(path)
    } else {
        None
    }
}

fn clone_remote(
    url: &str,
    branch: Option<&str>,
    credential: Option<&str>,
    dest: &Path,
    stop: &StopSignal,
) -> Result<()> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = credential.map(str::to_owned) {
        callbacks.credentials(move |_url, username_from_url, _allowed| {
            Cred::userpass_plaintext(username_from_url.unwrap_or("git"), &token)
        });
    }

    let stop_for_progress = stop.clone();
    callbacks.transfer_progress(move |_progress| !stop_for_progress.should_stop());

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    builder.clone(url, dest).map_err(|e| {
        if stop.should_stop() {
            HardGatesError::deadline_exceeded(format!("cloning {url}"))
        } else {
            HardGatesError::repo_fetch_failed_with(format!("cloning {url}"), e)
        }
    })?;
    Ok(())
}

/// Resolve the HEAD commit hash and timestamp for a working tree, if it is
/// a git checkout. Thin wrapper kept separate from [`crate::inventory`]'s
/// copy so the fetch stage can surface fetch-time errors distinctly from
/// inventory-time ones.
pub fn head_commit(root: &Path) -> Option<(String, chrono::DateTime<chrono::Utc>)> {
    let repo = Repository::open(root).ok()?;
    let head = repo.head().ok()?;
    let commit = head.peel_to_commit().ok()?;
    let hash = commit.id().to_string();
    let timestamp = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)?;
    Some((hash, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::context::Deadline;
    use std::time::Duration;

    fn sample_request(url: &str) -> ScanRequest {
        ScanRequest {
            repository_url: url.to_string(),
            branch: None,
            credential: None,
            threshold: 70.0,
            report_format: crate::core::model::ReportFormat::Both,
            scan_timeout_secs: 900,
        }
    }

    fn live_stop() -> StopSignal {
        StopSignal::new(Deadline::after(Duration::from_secs(60)))
    }

    #[test]
    fn local_directory_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let request = sample_request(dir.path().to_str().unwrap());
        let dest = tempfile::tempdir().unwrap();

        let resolved = fetch_repository(&request, dest.path(), &live_stop()).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn file_scheme_prefix_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let request = sample_request(&format!("file://{}", dir.path().display()));
        let dest = tempfile::tempdir().unwrap();

        let resolved = fetch_repository(&request, dest.path(), &live_stop()).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn nonexistent_remote_url_fails_with_repo_fetch_error() {
        let request = sample_request("https://example.invalid/definitely-not-a-repo.git");
        let dest = tempfile::tempdir().unwrap();

        let err = fetch_repository(&request, dest.path(), &live_stop()).unwrap_err();
        assert!(matches!(err, HardGatesError::RepoFetchFailed { .. }));
    }

    #[test]
    fn an_already_expired_deadline_aborts_the_clone_as_deadline_exceeded() {
        let request = sample_request("https://example.invalid/definitely-not-a-repo.git");
        let dest = tempfile::tempdir().unwrap();
        let stop = StopSignal::new(Deadline::after(Duration::from_secs(0)));

        let err = fetch_repository(&request, dest.path(), &stop).unwrap_err();
        assert!(matches!(err, HardGatesError::DeadlineExceeded { .. }));
    }

    #[test]
    fn workspace_dir_is_created_and_cleanup_removes_it() {
        let scan_id = ScanId::new_v4();
        let dir = workspace_dir(scan_id).unwrap();
        assert!(dir.is_dir());
        cleanup_workspace(scan_id).unwrap();
        assert!(!dir.exists());
    }
}
