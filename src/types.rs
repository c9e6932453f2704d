/// A named rendition of an asset. Not every asset carries every size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum VersionSize {
    Original,
    Medium,
    Thumb,
}

impl VersionSize {
    /// Label spliced into filenames, e.g. `IMG_0001-medium.JPG`.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionSize::Original => "original",
            VersionSize::Medium => "medium",
            VersionSize::Thumb => "thumb",
        }
    }
}

impl std::fmt::Display for VersionSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
