//! Remote asset source: the capability the download engine drives.
//!
//! A source yields a lazy, newest-first sequence of [`Asset`] descriptors,
//! a byte stream per (asset, size), the "recently deleted" listing, and a
//! re-authentication handshake for stale sessions.

pub mod error;
pub mod http;
#[cfg(test)]
pub mod mock;

pub use error::SourceError;
pub use http::HttpLibrary;

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

use crate::types::VersionSize;

/// Chunked body of a single download.
pub type ByteStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// Lazy listing of assets; may be unbounded and cannot be restarted mid-way.
pub type AssetStream<'a> = BoxStream<'a, Result<Asset, SourceError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Movie,
    Other,
}

/// One downloadable rendition of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetVersion {
    pub size: u64,
    pub url: String,
}

/// Remote descriptor of a photo or video. Immutable once read.
#[derive(Debug, Clone)]
pub struct Asset {
    id: String,
    filename: String,
    created: DateTime<Utc>,
    kind: AssetKind,
    versions: HashMap<VersionSize, AssetVersion>,
}

impl Asset {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        created: DateTime<Utc>,
        kind: AssetKind,
        versions: HashMap<VersionSize, AssetVersion>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            created,
            kind,
            versions,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn versions(&self) -> &HashMap<VersionSize, AssetVersion> {
        &self.versions
    }

    pub fn has_version(&self, size: VersionSize) -> bool {
        self.versions.contains_key(&size)
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.filename, self.id)
    }
}

#[async_trait::async_trait]
pub trait AssetSource: Send + Sync {
    /// All assets, newest first.
    fn assets(&self) -> AssetStream<'_>;

    /// Assets sitting in the remote "recently deleted" folder.
    fn recently_deleted(&self) -> AssetStream<'_>;

    /// Open a byte stream for one rendition. `Ok(None)` means the service
    /// has no content for that size.
    async fn fetch(
        &self,
        asset: &Asset,
        size: VersionSize,
    ) -> Result<Option<ByteStream>, SourceError>;

    /// Perform a fresh login, replacing the current session.
    async fn reauthenticate(&self) -> Result<(), SourceError>;
}
