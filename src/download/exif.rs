use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

/// Whether the file at `path` is a container we can embed a capture time in.
/// Only JPEG is written; HEIC, PNG and raw formats are left alone.
pub fn supports_capture_time(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
}

/// EXIF `DateTime*` string (`"YYYY:MM:DD HH:MM:SS"`) for a local timestamp.
pub fn exif_datetime(created: &DateTime<Local>) -> String {
    created.format("%Y:%m:%d %H:%M:%S").to_string()
}

/// Read the `DateTimeOriginal` EXIF tag.
///
/// `Ok(None)` covers both a missing tag and a file without readable EXIF;
/// `Err` is reserved for I/O failure.
pub fn read_capture_time(path: &Path) -> Result<Option<String>> {
    let file = std::fs::File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    let mut reader = std::io::BufReader::new(&file);

    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(data) => Ok(data
            .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
            .map(|field| field.display_value().to_string())),
        Err(e) => {
            tracing::debug!("No EXIF data in {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Write `DateTimeOriginal` into a JPEG in place. A file with no EXIF
/// block gets a fresh one holding just this tag.
pub fn write_capture_time(path: &Path, datetime: &str) -> Result<()> {
    use little_exif::exif_tag::ExifTag;
    use little_exif::metadata::Metadata;

    let mut metadata = match Metadata::new_from_path(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::debug!("Starting a new EXIF block for {}: {}", path.display(), e);
            Metadata::new()
        }
    };
    metadata.set_tag(ExifTag::DateTimeOriginal(datetime.to_string()));
    metadata
        .write_to_file(path)
        .with_context(|| format!("Writing EXIF metadata to {}", path.display()))?;

    tracing::debug!("Set EXIF DateTimeOriginal={} on {}", datetime, path.display());
    Ok(())
}
