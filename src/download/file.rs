use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use crate::retry::{self, RetryConfig, RetryError};
use crate::source::{Asset, AssetSource};
use crate::types::VersionSize;

/// Result of moving one asset's bytes to disk.
#[derive(Debug)]
pub enum TransferOutcome {
    Written,
    /// Dry run; nothing was fetched.
    Skipped,
    Failed(TransferFailure),
}

#[derive(Debug, Error)]
pub enum TransferFailure {
    #[error("no content available")]
    NoContent,

    #[error("local I/O error: {0}")]
    LocalIo(std::io::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: DownloadError },

    #[error("rejected: {0}")]
    Rejected(DownloadError),
}

impl From<RetryError<DownloadError>> for TransferFailure {
    fn from(e: RetryError<DownloadError>) -> Self {
        match e {
            RetryError::Aborted(DownloadError::NoContent { .. }) => TransferFailure::NoContent,
            RetryError::Aborted(DownloadError::Disk(e)) => TransferFailure::LocalIo(e),
            RetryError::Aborted(other) => TransferFailure::Rejected(other),
            RetryError::Exhausted { attempts, last } => {
                TransferFailure::RetriesExhausted { attempts, last }
            }
        }
    }
}

impl TransferFailure {
    /// Re-login was attempted and the service refused the credentials.
    pub fn is_credential_rejected(&self) -> bool {
        let last = match self {
            TransferFailure::Rejected(e) => e,
            TransferFailure::RetriesExhausted { last, .. } => last,
            TransferFailure::NoContent | TransferFailure::LocalIo(_) => return false,
        };
        matches!(last, DownloadError::Source(e) if e.is_credential_rejected())
    }
}

/// Sibling `.part` path the bytes are streamed into before the final rename.
fn temp_download_path(download_path: &Path) -> PathBuf {
    let mut name = download_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    download_path.with_file_name(name)
}

/// Download one rendition of `asset` to `download_path` using a .part temp file.
///
/// Each attempt deletes any existing .part file and downloads from scratch.
/// On completion the .part file is renamed to the final destination path, so
/// an interrupted run never leaves a truncated file under the canonical name.
/// Transient failures are retried at a fixed interval; a stale session
/// triggers a re-login before the next attempt.
pub async fn download_file(
    source: &dyn AssetSource,
    asset: &Asset,
    size: VersionSize,
    download_path: &Path,
    dry_run: bool,
    retry_config: &RetryConfig,
) -> TransferOutcome {
    if dry_run {
        tracing::info!("[DRY RUN] Would download {}", download_path.display());
        return TransferOutcome::Skipped;
    }

    if let Some(parent) = download_path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            return TransferOutcome::Failed(TransferFailure::LocalIo(e));
        }
    }

    let part_path = temp_download_path(download_path);

    let result = retry::retry_with_backoff(
        retry_config,
        DownloadError::retry_action,
        || async { source.reauthenticate().await.map_err(DownloadError::from) },
        || async {
            let _ = fs::remove_file(&part_path).await;
            attempt_download(source, asset, size, download_path, &part_path).await
        },
    )
    .await;

    match result {
        Ok(()) => TransferOutcome::Written,
        Err(e) => {
            let _ = fs::remove_file(&part_path).await;
            TransferOutcome::Failed(e.into())
        }
    }
}

/// Single download attempt: fetch, stream to .part, rename.
async fn attempt_download(
    source: &dyn AssetSource,
    asset: &Asset,
    size: VersionSize,
    download_path: &Path,
    part_path: &Path,
) -> Result<(), DownloadError> {
    let mut stream = source
        .fetch(asset, size)
        .await?
        .ok_or_else(|| DownloadError::NoContent {
            path: download_path.display().to_string(),
        })?;

    let mut file = fs::File::create(part_path).await?;
    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.inspect_err(|e| {
            tracing::debug!(
                "Body error for {} after {} bytes: {}",
                download_path.display(),
                bytes_written,
                e
            );
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    fs::rename(part_path, download_path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{image_asset, FetchScript, MockSource};
    use std::fs as std_fs;

    fn instant() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            delay_secs: 0,
        }
    }

    fn asset() -> Asset {
        image_asset("A1", "a.jpg", &[VersionSize::Original])
    }

    #[test]
    fn test_temp_download_path() {
        assert_eq!(
            temp_download_path(Path::new("/lib/2025/a-original.jpg")),
            Path::new("/lib/2025/a-original.jpg.part")
        );
    }

    #[tokio::test]
    async fn test_download_writes_file_and_removes_part() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("2025/01/15/a-original.jpg");
        let source = MockSource::with_assets(vec![]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        assert!(matches!(outcome, TransferOutcome::Written));
        assert_eq!(std_fs::read(&dest).unwrap(), b"data");
        assert!(!temp_download_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_dry_run_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        let source = MockSource::with_assets(vec![]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, true, &instant()).await;

        assert!(matches!(outcome, TransferOutcome::Skipped));
        assert_eq!(source.fetches(), 0);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_no_content_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        let source = MockSource::with_assets(vec![]).script("A1", [FetchScript::NoContent]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        assert!(matches!(
            outcome,
            TransferOutcome::Failed(TransferFailure::NoContent)
        ));
        assert_eq!(source.fetches(), 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_always_transient_exhausts_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        let source =
            MockSource::with_assets(vec![]).script("A1", vec![FetchScript::Transient; 10]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        match outcome {
            TransferOutcome::Failed(TransferFailure::RetriesExhausted { attempts, .. }) => {
                assert_eq!(attempts, 5)
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(source.fetches(), 5);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_stale_session_reauthenticates_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        let source = MockSource::with_assets(vec![]).script("A1", [FetchScript::SessionExpired]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        assert!(matches!(outcome, TransferOutcome::Written));
        assert_eq!(source.reauths(), 1);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_refused_relogin_aborts_as_credential_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        let source = MockSource::with_assets(vec![])
            .script("A1", vec![FetchScript::SessionExpired; 5])
            .rejecting_login();

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        match outcome {
            TransferOutcome::Failed(reason) => assert!(reason.is_credential_rejected()),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(source.reauths(), 1);
        assert_eq!(source.fetches(), 1);
    }

    #[test]
    fn test_exhausted_transient_is_not_credential_rejection() {
        let failure = TransferFailure::RetriesExhausted {
            attempts: 5,
            last: DownloadError::Source(crate::source::SourceError::Connection("reset".into())),
        };
        assert!(!failure.is_credential_rejected());
        assert!(!TransferFailure::NoContent.is_credential_rejected());
    }

    #[tokio::test]
    async fn test_broken_body_restarts_from_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        let source = MockSource::with_assets(vec![]).script("A1", [FetchScript::BrokenBody]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        assert!(matches!(outcome, TransferOutcome::Written));
        assert_eq!(std_fs::read(&dest).unwrap(), b"data");
        assert!(!temp_download_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_stale_part_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a-original.jpg");
        std_fs::write(temp_download_path(&dest), b"leftover from a crash").unwrap();
        let source = MockSource::with_assets(vec![]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        assert!(matches!(outcome, TransferOutcome::Written));
        assert_eq!(std_fs::read(&dest).unwrap(), b"data");
        assert!(!temp_download_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_local_io() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std_fs::write(&blocker, b"not a directory").unwrap();
        let dest = blocker.join("a-original.jpg");
        let source = MockSource::with_assets(vec![]);

        let outcome =
            download_file(&source, &asset(), VersionSize::Original, &dest, false, &instant())
                .await;

        assert!(matches!(
            outcome,
            TransferOutcome::Failed(TransferFailure::LocalIo(_))
        ));
        assert_eq!(source.fetches(), 0);
    }
}
