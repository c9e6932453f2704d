//! Download engine. Assets are pulled one at a time and only fetched when
//! they are not already on disk. The listing is consumed lazily so
//! `--recent` and `--until-found` never enumerate more of the library than
//! they need.

pub mod autodelete;
pub mod cutoff;
pub mod error;
pub mod exif;
pub mod file;
pub mod metadata;
pub mod paths;
pub mod variant;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::retry::RetryConfig;
use crate::source::{Asset, AssetKind, AssetSource};
use crate::types::VersionSize;

use cutoff::{Cutoff, Disposition};
use file::{TransferFailure, TransferOutcome};
use paths::ResolvedPaths;
use variant::VariantChoice;

/// Subset of application config consumed by the download engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) folder_structure: String,
    pub(crate) size: VersionSize,
    pub(crate) force_size: bool,
    pub(crate) skip_videos: bool,
    pub(crate) skip_photos: bool,
    pub(crate) set_exif_datetime: bool,
    pub(crate) dry_run: bool,
    pub(crate) only_print_filenames: bool,
    pub(crate) recent: Option<u32>,
    pub(crate) until_found: Option<u32>,
    pub(crate) retry: RetryConfig,
    pub(crate) no_progress_bar: bool,
}

/// Why the main pass stopped pulling assets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    Exhausted,
    UntilFound,
    Shutdown,
    ListingError,
    /// The service refused our credentials when logging in again.
    AuthFailed(String),
}

/// Per-disposition counts for one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub downloaded: usize,
    pub present: usize,
    pub failed: usize,
    pub planned: usize,
    pub listed: usize,
    pub filtered: usize,
    pub stop: StopReason,
}

impl SyncSummary {
    fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Present => self.present += 1,
            Disposition::Downloaded => self.downloaded += 1,
            Disposition::Failed => self.failed += 1,
            Disposition::Planned => self.planned += 1,
            Disposition::Listed => self.listed += 1,
            Disposition::Filtered => self.filtered += 1,
        }
    }

    fn log(&self, config: &DownloadConfig, elapsed: Duration) {
        if config.dry_run {
            tracing::info!("── Dry Run Summary ──");
            tracing::info!("  {} files would be downloaded", self.planned);
            tracing::info!("  {} already present", self.present);
            tracing::info!("  destination: {}", config.directory.display());
            return;
        }
        if config.only_print_filenames {
            tracing::debug!("{} paths listed, {} already present", self.listed, self.present);
            return;
        }

        tracing::info!("── Summary ──");
        tracing::info!(
            "  {} downloaded, {} already present, {} failed",
            self.downloaded,
            self.present,
            self.failed
        );
        if self.filtered > 0 {
            tracing::info!("  {} skipped by type filter", self.filtered);
        }
        match &self.stop {
            StopReason::Exhausted => {}
            StopReason::UntilFound => tracing::info!("  stopped early: --until-found reached"),
            StopReason::Shutdown => tracing::info!("  interrupted by shutdown"),
            StopReason::ListingError => tracing::warn!("  photo listing ended with an error"),
            StopReason::AuthFailed(reason) => tracing::error!("  stopped: {}", reason),
        }
        tracing::info!("  elapsed: {}", format_duration(elapsed));
    }
}

/// Create a progress bar with a consistent template.
///
/// The listing length is unknown up front, so the bar only has a length when
/// `--recent` bounds it. Returns `ProgressBar::hidden()` when the user passed
/// `--no-progress-bar` or stdout is not a TTY.
fn create_progress_bar(no_progress_bar: bool, total: Option<u64>) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let (pb, template) = match total {
        Some(total) => (
            ProgressBar::new(total),
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ),
        None => (
            ProgressBar::new_spinner(),
            "[{elapsed_precise}] {spinner} {pos} photos {msg}",
        ),
    };
    match ProgressStyle::with_template(template) {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(e) => tracing::debug!("Falling back to default progress style: {}", e),
    }
    pb
}

/// Decide and carry out the work for a single asset.
///
/// `Err` means the service rejected our credentials during the transfer;
/// no later asset can succeed either.
async fn process_asset(
    source: &dyn AssetSource,
    asset: &Asset,
    config: &DownloadConfig,
    pb: &ProgressBar,
) -> Result<Disposition, TransferFailure> {
    let filtered = match asset.kind() {
        AssetKind::Movie => config.skip_videos,
        AssetKind::Image => config.skip_photos,
        AssetKind::Other => false,
    };
    if filtered {
        tracing::debug!("Skipping {} ({:?})", asset, asset.kind());
        return Ok(Disposition::Filtered);
    }

    let paths = ResolvedPaths::resolve(
        &config.directory,
        &config.folder_structure,
        asset,
        config.size,
    );

    if paths.exists() {
        pb.suspend(|| tracing::debug!("{} already exists.", paths.sized.display()));
        return Ok(Disposition::Present);
    }

    if config.only_print_filenames {
        pb.suspend(|| println!("{}", paths.sized.display()));
        return Ok(Disposition::Listed);
    }

    let choice = variant::select_variant(asset, config.size, config.force_size);
    if let VariantChoice::FellBack { requested, used } = choice {
        pb.suspend(|| {
            tracing::info!(
                "{} has no {} version, downloading {} instead",
                asset,
                requested,
                used
            )
        });
    }

    if let Some(version) = asset.versions().get(&choice.size()) {
        tracing::debug!(
            size_bytes = version.size,
            path = %paths.sized.display(),
            "downloading",
        );
    }
    pb.suspend(|| {
        tracing::info!(
            "Downloading {} to {}",
            asset.filename(),
            paths.sized.display()
        )
    });

    let outcome = file::download_file(
        source,
        asset,
        choice.size(),
        &paths.sized,
        config.dry_run,
        &config.retry,
    )
    .await;

    match outcome {
        TransferOutcome::Written => {
            metadata::backfill(
                &paths.sized,
                asset.created(),
                asset.kind(),
                config.set_exif_datetime,
            )
            .await;
            Ok(Disposition::Downloaded)
        }
        TransferOutcome::Skipped => Ok(Disposition::Planned),
        TransferOutcome::Failed(reason) => {
            pb.suspend(|| tracing::error!("Could not download {}: {}", asset, reason));
            if reason.is_credential_rejected() {
                Err(reason)
            } else {
                Ok(Disposition::Failed)
            }
        }
    }
}

/// Entry point for the download engine.
///
/// Assets are handled strictly one after another. The shutdown token is
/// checked before each pull. A listing error ends the pass but is not fatal,
/// so the deletion pass and summary still run. Rejected credentials end the
/// pass with [`StopReason::AuthFailed`] after a single login attempt.
pub async fn download_photos(
    source: &dyn AssetSource,
    config: &DownloadConfig,
    shutdown_token: CancellationToken,
) -> SyncSummary {
    let started = Instant::now();
    let mut cutoff = Cutoff::new(config.recent, config.until_found);
    let pb = create_progress_bar(config.no_progress_bar, config.recent.map(u64::from));
    let mut summary = SyncSummary::default();

    let mut assets = cutoff.limit(source.assets());

    loop {
        if shutdown_token.is_cancelled() {
            pb.suspend(|| tracing::info!("Shutdown requested, stopping before the next photo"));
            summary.stop = StopReason::Shutdown;
            break;
        }

        let asset = match assets.next().await {
            None => break,
            Some(Ok(asset)) => asset,
            Some(Err(e)) if e.is_credential_rejected() => {
                pb.suspend(|| tracing::error!("Login rejected while listing photos: {}", e));
                summary.stop = StopReason::AuthFailed(e.to_string());
                break;
            }
            Some(Err(e)) => {
                pb.suspend(|| tracing::error!("Error fetching photo list: {}", e));
                summary.stop = StopReason::ListingError;
                break;
            }
        };

        pb.set_message(asset.filename().to_string());
        let disposition = match process_asset(source, &asset, config, &pb).await {
            Ok(disposition) => disposition,
            Err(reason) => {
                summary.record(Disposition::Failed);
                summary.stop = StopReason::AuthFailed(reason.to_string());
                break;
            }
        };
        summary.record(disposition);
        pb.inc(1);

        if cutoff.observe(disposition).is_break() {
            summary.stop = StopReason::UntilFound;
            break;
        }
    }

    pb.finish_and_clear();
    summary.log(config, started.elapsed());
    summary
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
