use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::source::Asset;
use crate::types::VersionSize;

/// Where an asset lives locally for one requested size.
///
/// `sized` is the canonical download target (`IMG_0001-medium.JPG`).
/// `legacy` is the unsuffixed name used by older layouts; it is only
/// populated for [`VersionSize::Original`] and only ever probed, never
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub sized: PathBuf,
    pub legacy: Option<PathBuf>,
}

impl ResolvedPaths {
    /// Resolve both paths for `asset` at `size`. Pure: identical inputs give
    /// identical paths, which is what makes re-runs skip finished work.
    pub fn resolve(
        directory: &Path,
        folder_structure: &str,
        asset: &Asset,
        size: VersionSize,
    ) -> Self {
        let created_local = asset.created().with_timezone(&Local);
        let filename = sanitize_filename(asset.filename(), asset.id());

        let sized = local_download_path(
            directory,
            folder_structure,
            &created_local,
            &insert_suffix(&filename, size.as_str()),
        );
        let legacy = (size == VersionSize::Original).then(|| {
            local_download_path(directory, folder_structure, &created_local, &filename)
        });

        Self { sized, legacy }
    }

    /// Whether the asset is already materialized under either name. Only
    /// regular files count; a directory squatting on the name does not.
    pub fn exists(&self) -> bool {
        self.sized.is_file() || self.legacy.as_deref().is_some_and(Path::is_file)
    }
}

/// Build the local download path for a filename.
///
/// `folder_structure` is a date format string such as `"%Y/%m/%d"`, optionally
/// wrapped in format-string braces as `"{:%Y/%m/%d}"`. The special value `"none"`
/// (case-insensitive) disables date-based folders.
pub fn local_download_path(
    directory: &Path,
    folder_structure: &str,
    created_date: &DateTime<Local>,
    filename: &str,
) -> PathBuf {
    if folder_structure.eq_ignore_ascii_case("none") {
        return directory.join(filename);
    }

    let format_str = folder_structure
        .strip_prefix("{:")
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(folder_structure);

    let date_path = expand_date_format(format_str, created_date);

    // Split on "/" and join as components so the result is a native path.
    let mut path = directory.to_path_buf();
    for component in date_path.split('/') {
        if !component.is_empty() {
            path.push(component);
        }
    }
    path.join(filename)
}

/// Expand date format tokens (%Y, %m, %d, %H, %M, %S) in a single pass.
fn expand_date_format(format_str: &str, date: &DateTime<Local>) -> String {
    let mut result = String::with_capacity(format_str.len() + 8);
    let mut chars = format_str.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }
        let value = match chars.peek() {
            Some('Y') => format!("{:04}", date.year()),
            Some('m') => format!("{:02}", date.month()),
            Some('d') => format!("{:02}", date.day()),
            Some('H') => format!("{:02}", date.hour()),
            Some('M') => format!("{:02}", date.minute()),
            Some('S') => format!("{:02}", date.second()),
            _ => {
                result.push(c); // Unknown token, keep the %
                continue;
            }
        };
        chars.next();
        result.push_str(&value);
    }

    result
}

/// ASCII-only, filesystem-safe filename. Falls back to a fingerprint of the
/// asset id when nothing survives.
pub fn sanitize_filename(filename: &str, asset_id: &str) -> String {
    let clean = clean_filename(&remove_unicode_chars(filename));
    if clean.is_empty() {
        return generate_fingerprint_filename(asset_id, "");
    }
    clean
}

/// Remove characters that are invalid on common filesystems:
/// `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Remove non-ASCII characters from a filename.
pub fn remove_unicode_chars(filename: &str) -> String {
    filename.chars().filter(|c| c.is_ascii()).collect()
}

/// Insert `-{suffix}` before the last `.` of a filename, or append it when
/// there is no `.`.
///
/// `"photo.jpg"` with `"medium"` becomes `"photo-medium.jpg"`.
pub fn insert_suffix(filename: &str, suffix: &str) -> String {
    let mut result = String::with_capacity(filename.len() + 1 + suffix.len());
    match filename.rfind('.') {
        Some(dot_pos) => {
            let (stem, ext) = filename.split_at(dot_pos);
            result.push_str(stem);
            result.push('-');
            result.push_str(suffix);
            result.push_str(ext);
        }
        None => {
            let _ = write!(result, "{}-{}", filename, suffix);
        }
    }
    result
}

/// Map UTI item types to uppercase file extensions.
const ITEM_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("public.heic", "HEIC"),
    ("public.heif", "HEIF"),
    ("public.jpeg", "JPG"),
    ("public.png", "PNG"),
    ("public.tiff", "TIFF"),
    ("com.compuserve.gif", "GIF"),
    ("com.apple.quicktime-movie", "MOV"),
    ("public.mpeg-4", "MP4"),
    ("com.adobe.raw-image", "DNG"),
];

/// Look up the file extension for a UTI item type, if known.
pub fn item_type_extension(item_type: &str) -> Option<&'static str> {
    ITEM_TYPE_EXTENSIONS
        .iter()
        .find(|(key, _)| *key == item_type)
        .map(|(_, ext)| *ext)
}

/// Filename for assets that carry no usable name: the asset id with
/// non-alphanumerics replaced by `_`, truncated to 12 characters, plus the
/// extension for `item_type` when it is known.
pub fn generate_fingerprint_filename(asset_id: &str, item_type: &str) -> String {
    let fingerprint: String = asset_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(12)
        .collect();
    match item_type_extension(item_type) {
        Some(ext) => format!("{}.{}", fingerprint, ext),
        None => fingerprint,
    }
}
