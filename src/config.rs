use std::path::PathBuf;

use crate::download::DownloadConfig;
use crate::retry::RetryConfig;
use crate::types::VersionSize;

/// Validated application configuration.
pub struct Config {
    pub username: String,
    pub password: Option<String>,
    pub directory: PathBuf,
    pub folder_structure: String,
    pub endpoint: String,
    pub notification_email: Option<String>,

    pub timeout_secs: Option<u64>,
    pub retry_delay_secs: u64,

    pub recent: Option<u32>,
    pub until_found: Option<u32>,
    pub max_retries: u32,

    pub size: VersionSize,

    pub skip_videos: bool,
    pub skip_photos: bool,
    pub force_size: bool,
    pub auto_delete: bool,
    pub only_print_filenames: bool,
    pub set_exif_datetime: bool,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("directory", &self.directory)
            .field("endpoint", &self.endpoint)
            .field("size", &self.size)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Validate and normalize CLI arguments. Runs before any network
    /// traffic; every error here is fatal.
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let directory = expand_tilde(&cli.directory);
        if !directory.is_dir() {
            anyhow::bail!("{} is not a valid directory", directory.display());
        }

        if cli.recent == Some(0) {
            anyhow::bail!("--recent must be a positive number");
        }
        if cli.until_found == Some(0) {
            anyhow::bail!("--until-found must be a positive number");
        }
        if cli.max_retries == 0 {
            anyhow::bail!("--max-retries must be at least 1");
        }
        if cli.skip_photos && cli.skip_videos {
            anyhow::bail!("--skip-photos and --skip-videos together would download nothing");
        }
        if cli.folder_structure.trim().is_empty() {
            anyhow::bail!("--folder-structure must not be empty (use \"none\" for a flat layout)");
        }

        Ok(Self {
            username: cli.username,
            password: cli.password,
            directory,
            folder_structure: cli.folder_structure,
            endpoint: cli.endpoint,
            notification_email: cli.notification_email,
            timeout_secs: cli.timeout,
            retry_delay_secs: cli.retry_delay,
            recent: cli.recent,
            until_found: cli.until_found,
            max_retries: cli.max_retries,
            size: cli.size,
            skip_videos: cli.skip_videos,
            skip_photos: cli.skip_photos,
            force_size: cli.force_size,
            auto_delete: cli.auto_delete,
            only_print_filenames: cli.only_print_filenames,
            set_exif_datetime: cli.set_exif_datetime,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries,
            delay_secs: self.retry_delay_secs,
        }
    }

    /// Engine-facing subset.
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            directory: self.directory.clone(),
            folder_structure: self.folder_structure.clone(),
            size: self.size,
            force_size: self.force_size,
            skip_videos: self.skip_videos,
            skip_photos: self.skip_photos,
            set_exif_datetime: self.set_exif_datetime,
            dry_run: self.dry_run,
            only_print_filenames: self.only_print_filenames,
            recent: self.recent,
            until_found: self.until_found,
            retry: self.retry_config(),
            no_progress_bar: self.no_progress_bar,
        }
    }
}
