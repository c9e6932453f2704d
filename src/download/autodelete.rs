//! Mirror remote deletions: anything in the service's "recently deleted"
//! folder is removed from the local library.

use futures_util::StreamExt;

use super::paths::ResolvedPaths;
use super::DownloadConfig;
use crate::source::AssetSource;

/// Counts from one deletion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub failed: usize,
}

/// Remove the local copy of every recently deleted asset.
///
/// Only the size-suffixed path for `config.size` is considered; the legacy
/// unsuffixed name is never deleted. Removal is immediate, with no trash or
/// confirmation. A listing error stops the pass; what was removed stays removed.
pub async fn autodelete_photos(source: &dyn AssetSource, config: &DownloadConfig) -> DeleteSummary {
    tracing::info!("Deleting any files found in 'Recently Deleted'...");

    let mut summary = DeleteSummary::default();
    let mut deleted = source.recently_deleted();

    while let Some(result) = deleted.next().await {
        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                tracing::error!("Error listing recently deleted photos: {}", e);
                break;
            }
        };

        let paths =
            ResolvedPaths::resolve(&config.directory, &config.folder_structure, &asset, config.size);
        let path = paths.sized;
        if !path.exists() {
            continue;
        }

        if config.dry_run {
            tracing::info!("[DRY RUN] Would delete {}", path.display());
            summary.deleted += 1;
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleting {}", path.display());
                summary.deleted += 1;
            }
            Err(e) => {
                tracing::error!("Could not delete {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Deleted {} files from 'Recently Deleted' ({} failed)",
        summary.deleted,
        summary.failed
    );
    summary
}
