use clap::Parser;

use crate::types::{LogLevel, VersionSize};

#[derive(Parser, Debug)]
#[command(
    name = "photosync",
    version,
    about = "Download a remote photo library to a local directory"
)]
pub struct Cli {
    /// Account username (usually an email address)
    #[arg(short = 'u', long)]
    pub username: String,

    /// Account password (if not provided, will prompt).
    /// WARNING: passing via --password is visible in process listings.
    /// Prefer the PHOTOSYNC_PASSWORD environment variable instead.
    #[arg(short = 'p', long, env = "PHOTOSYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Local directory for downloads; must already exist
    #[arg(short = 'd', long)]
    pub directory: String,

    /// Image size to download
    #[arg(long, value_enum, default_value = "original")]
    pub size: VersionSize,

    /// Number of recent photos to download
    #[arg(long)]
    pub recent: Option<u32>,

    /// Stop after finding X consecutive photos that are already downloaded
    #[arg(long)]
    pub until_found: Option<u32>,

    /// Don't download videos
    #[arg(long)]
    pub skip_videos: bool,

    /// Don't download photos
    #[arg(long)]
    pub skip_photos: bool,

    /// Only download requested size (don't fall back to original)
    #[arg(long)]
    pub force_size: bool,

    /// Scan "Recently Deleted" and delete local files found there
    #[arg(long)]
    pub auto_delete: bool,

    /// Only print the local paths of photos that would be downloaded
    #[arg(long)]
    pub only_print_filenames: bool,

    /// Folder structure for organizing downloads ("none" for a flat layout)
    #[arg(long, default_value = "%Y/%m/%d")]
    pub folder_structure: String,

    /// Write DateTimeOriginal EXIF tag to JPEGs if missing
    #[arg(long)]
    pub set_exif_datetime: bool,

    /// Email address to notify when authentication fails
    #[arg(long)]
    pub notification_email: Option<String>,

    /// Do not modify the local library
    #[arg(long)]
    pub dry_run: bool,

    /// Attempts per download, the first one included
    #[arg(long, default_value_t = crate::retry::MAX_ATTEMPTS)]
    pub max_retries: u32,

    /// Seconds to wait between download attempts
    #[arg(long, default_value_t = crate::retry::WAIT_SECONDS)]
    pub retry_delay: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Base URL of the photo library service
    #[arg(long, env = "PHOTOSYNC_ENDPOINT", default_value = "https://photos.example.com/api")]
    pub endpoint: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
