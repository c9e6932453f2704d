//! Post-write timestamp stamping. Best effort: every failure is logged and
//! dropped so a stubborn file never fails the asset it belongs to.

use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, Utc};

use super::exif;
use crate::source::AssetKind;

/// Stamp the capture time onto a freshly written file.
///
/// JPEG images get `DateTimeOriginal` written when `set_exif_datetime` is on
/// and the tag is absent. Everything else gets its modification and access
/// time set to `created`, as does a JPEG whose EXIF could not be touched.
pub async fn backfill(
    path: &Path,
    created: DateTime<Utc>,
    kind: AssetKind,
    set_exif_datetime: bool,
) {
    let owned: PathBuf = path.to_path_buf();
    let embed = set_exif_datetime && kind == AssetKind::Image && exif::supports_capture_time(path);

    let result = tokio::task::spawn_blocking(move || {
        if embed && stamp_exif(&owned, &created.with_timezone(&Local)) {
            return;
        }
        if let Err(e) = set_file_mtime(&owned, created.timestamp()) {
            tracing::warn!("Could not set mtime on {}: {}", owned.display(), e);
        }
    })
    .await;

    if let Err(e) = result {
        tracing::warn!("Metadata task for {} panicked: {}", path.display(), e);
    }
}

/// Returns `false` when the EXIF tag is neither present nor written.
fn stamp_exif(path: &Path, created: &DateTime<Local>) -> bool {
    match exif::read_capture_time(path) {
        Ok(Some(existing)) => {
            tracing::debug!("{} already has DateTimeOriginal={}", path.display(), existing);
            true
        }
        Ok(None) => match exif::write_capture_time(path, &exif::exif_datetime(created)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to set EXIF on {}: {:#}", path.display(), e);
                false
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read EXIF from {}: {:#}", path.display(), e);
            false
        }
    }
}

/// Set the modification and access times of a file to the given Unix
/// timestamp. Dates before 1970 are supported where the platform allows
/// them and clamp to the epoch otherwise.
pub fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)
}
