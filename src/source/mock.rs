//! In-memory asset source for engine tests.
//!
//! Fetch behaviour is scripted per asset id; every pull from the listing and
//! every fetch/re-auth call is counted so tests can assert on laziness and
//! retry bounds.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures_util::stream::{self, StreamExt};

use super::{Asset, AssetKind, AssetSource, AssetStream, AssetVersion, ByteStream, SourceError};
use crate::types::VersionSize;

/// Scripted result for one fetch call.
#[derive(Debug, Clone)]
pub enum FetchScript {
    Bytes(Vec<u8>),
    NoContent,
    Transient,
    SessionExpired,
    /// Stream that yields one chunk and then breaks mid-body.
    BrokenBody,
}

#[derive(Default)]
pub struct MockSource {
    assets: Vec<Asset>,
    deleted: Vec<Asset>,
    scripts: Mutex<HashMap<String, VecDeque<FetchScript>>>,
    listing_error: Option<(usize, fn() -> SourceError)>,
    reject_login: bool,
    pulled: Arc<AtomicU32>,
    fetches: AtomicU32,
    reauths: AtomicU32,
    fetched_sizes: Mutex<Vec<(String, VersionSize)>>,
}

/// Build an image asset created at 2025-01-15 12:00 UTC with the given sizes.
pub fn image_asset(id: &str, filename: &str, sizes: &[VersionSize]) -> Asset {
    let versions = sizes
        .iter()
        .map(|s| {
            (
                *s,
                AssetVersion {
                    size: 4,
                    url: format!("mock://{id}/{s}"),
                },
            )
        })
        .collect();
    Asset::new(
        id,
        filename,
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        AssetKind::Image,
        versions,
    )
}

pub fn video_asset(id: &str, filename: &str) -> Asset {
    Asset::new(
        id,
        filename,
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        AssetKind::Movie,
        HashMap::from([(
            VersionSize::Original,
            AssetVersion {
                size: 4,
                url: format!("mock://{id}/original"),
            },
        )]),
    )
}

impl MockSource {
    pub fn with_assets(assets: Vec<Asset>) -> Self {
        Self {
            assets,
            ..Default::default()
        }
    }

    pub fn with_deleted(mut self, deleted: Vec<Asset>) -> Self {
        self.deleted = deleted;
        self
    }

    /// End the listing with `error()` in place of the asset at `index`.
    pub fn failing_listing_at(mut self, index: usize, error: fn() -> SourceError) -> Self {
        self.listing_error = Some((index, error));
        self
    }

    /// Every re-login is refused as if the password had changed.
    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// Queue fetch results for an asset. Once the queue is empty every
    /// further fetch returns `b"data"`.
    pub fn script(self, id: &str, steps: impl IntoIterator<Item = FetchScript>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into_iter().collect());
        self
    }

    /// Number of assets pulled from the listing stream so far.
    pub fn pulled(&self) -> u32 {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn reauths(&self) -> u32 {
        self.reauths.load(Ordering::SeqCst)
    }

    pub fn fetched_sizes(&self) -> Vec<(String, VersionSize)> {
        self.fetched_sizes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AssetSource for MockSource {
    fn assets(&self) -> AssetStream<'_> {
        let pulled = Arc::clone(&self.pulled);
        let mut items: Vec<Result<Asset, SourceError>> =
            self.assets.iter().cloned().map(Ok).collect();
        if let Some((index, error)) = self.listing_error {
            items.truncate(index);
            items.push(Err(error()));
        }
        Box::pin(stream::iter(items).map(move |item| {
            pulled.fetch_add(1, Ordering::SeqCst);
            item
        }))
    }

    fn recently_deleted(&self) -> AssetStream<'_> {
        Box::pin(stream::iter(self.deleted.iter().cloned().map(Ok)))
    }

    async fn fetch(
        &self,
        asset: &Asset,
        size: VersionSize,
    ) -> Result<Option<ByteStream>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched_sizes
            .lock()
            .unwrap()
            .push((asset.id().to_string(), size));

        if !asset.has_version(size) {
            return Ok(None);
        }

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(asset.id())
            .and_then(|queue| queue.pop_front())
            .unwrap_or(FetchScript::Bytes(b"data".to_vec()));

        match step {
            FetchScript::Bytes(data) => {
                let chunks: Vec<Result<Bytes, SourceError>> = data
                    .chunks(3)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                Ok(Some(Box::pin(stream::iter(chunks))))
            }
            FetchScript::NoContent => Ok(None),
            FetchScript::Transient => Err(SourceError::Connection("connection reset".into())),
            FetchScript::SessionExpired => Err(SourceError::SessionExpired("token".into())),
            FetchScript::BrokenBody => {
                let chunks: Vec<Result<Bytes, SourceError>> = vec![
                    Ok(Bytes::from_static(b"par")),
                    Err(SourceError::Connection("body truncated".into())),
                ];
                Ok(Some(Box::pin(stream::iter(chunks))))
            }
        }
    }

    async fn reauthenticate(&self) -> Result<(), SourceError> {
        self.reauths.fetch_add(1, Ordering::SeqCst);
        if self.reject_login {
            return Err(SourceError::FailedLogin("invalid credentials".into()));
        }
        Ok(())
    }
}
