//! HTTP-backed asset source speaking a records-style JSON API.
//!
//! Login exchanges credentials for a bearer token; listings are paged with
//! `offset`/`limit` and streamed lazily so the engine can stop early without
//! fetching the rest of the library.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_stream::try_stream;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::{Stream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Asset, AssetKind, AssetSource, AssetStream, AssetVersion, ByteStream, SourceError};
use crate::download::paths::generate_fingerprint_filename;
use crate::retry::{self, RetryConfig, RetryError};
use crate::types::VersionSize;

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("photosync/", env!("CARGO_PKG_VERSION"));

/// Resource field prefixes per size. Videos publish their renditions under
/// different field names than photos.
const PHOTO_VERSION_LOOKUP: &[(VersionSize, &str)] = &[
    (VersionSize::Original, "resOriginal"),
    (VersionSize::Medium, "resJPEGMed"),
    (VersionSize::Thumb, "resJPEGThumb"),
];

const VIDEO_VERSION_LOOKUP: &[(VersionSize, &str)] = &[
    (VersionSize::Original, "resOriginal"),
    (VersionSize::Medium, "resVidMed"),
    (VersionSize::Thumb, "resVidSmall"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum ListKind {
    All,
    RecentlyDeleted,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    session_token: String,
}

#[derive(Serialize)]
struct QueryRequest {
    list: ListKind,
    offset: u64,
    limit: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    records: Vec<Value>,
}

pub struct HttpLibrary {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    session_token: RwLock<Option<String>>,
    page_size: usize,
    retry: RetryConfig,
}

impl std::fmt::Debug for HttpLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLibrary")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HttpLibrary {
    pub fn new(
        endpoint: &str,
        username: &str,
        password: String,
        timeout_secs: Option<u64>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(
                timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password,
            session_token: RwLock::new(None),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryConfig::default(),
        })
    }

    /// Policy applied to each listing page request.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self) -> Result<(), SourceError> {
        let url = format!("{}/auth/login", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::FailedLogin(format!(
                "invalid credentials for {}",
                self.username
            )));
        }
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body: LoginResponse = response.json().await?;
        *self.session_token.write().await = Some(body.session_token);
        tracing::debug!("Logged in as {}", self.username);
        Ok(())
    }

    async fn bearer(&self) -> Result<String, SourceError> {
        self.session_token
            .read()
            .await
            .as_ref()
            .map(|token| format!("Bearer {token}"))
            .ok_or_else(|| SourceError::SessionExpired("not logged in".to_string()))
    }

    async fn query_page(&self, list: ListKind, offset: u64) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/records/query", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer().await?)
            .json(&QueryRequest {
                list,
                offset,
                limit: self.page_size,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        let page: QueryResponse = response.json().await?;
        tracing::debug!(
            "{:?}: got {} records at offset {}",
            list,
            page.records.len(),
            offset
        );
        Ok(page.records)
    }

    fn list_stream(
        &self,
        list: ListKind,
    ) -> impl Stream<Item = Result<Asset, SourceError>> + Send + '_ {
        paged_records(
            self.retry,
            move |offset| self.query_page(list, offset),
            move || self.reauthenticate(),
        )
        .filter_map(|record| async move {
            let record = match record {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            match parse_record(&record) {
                Ok(asset) => Some(Ok(asset)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable record: {}", e);
                    None
                }
            }
        })
    }
}

/// Walk an offset-paged listing lazily until a page comes back empty.
///
/// Every page request runs under `policy`: throttling and server errors are
/// retried after the usual pause, and a stale session is refreshed through
/// `relogin` first. Only a page that still fails ends the stream.
fn paged_records<'a, P, PFut, L, LFut>(
    policy: RetryConfig,
    fetch_page: P,
    relogin: L,
) -> impl Stream<Item = Result<Value, SourceError>> + Send + 'a
where
    P: Fn(u64) -> PFut + Send + Sync + 'a,
    PFut: Future<Output = Result<Vec<Value>, SourceError>> + Send + 'a,
    L: Fn() -> LFut + Send + Sync + 'a,
    LFut: Future<Output = Result<(), SourceError>> + Send + 'a,
{
    try_stream! {
        let mut offset: u64 = 0;
        loop {
            let records = retry::retry_with_backoff(
                &policy,
                SourceError::retry_action,
                &relogin,
                || fetch_page(offset),
            )
            .await
            .map_err(RetryError::into_inner)?;
            if records.is_empty() {
                break;
            }
            offset += records.len() as u64;
            for record in records {
                yield record;
            }
        }
    }
}

#[async_trait::async_trait]
impl AssetSource for HttpLibrary {
    fn assets(&self) -> AssetStream<'_> {
        Box::pin(self.list_stream(ListKind::All))
    }

    fn recently_deleted(&self) -> AssetStream<'_> {
        Box::pin(self.list_stream(ListKind::RecentlyDeleted))
    }

    async fn fetch(
        &self,
        asset: &Asset,
        size: VersionSize,
    ) -> Result<Option<ByteStream>, SourceError> {
        let url = match asset.versions().get(&size) {
            Some(version) if !version.url.is_empty() => version.url.clone(),
            _ => return Ok(None),
        };

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| SourceError::Connection(format!("reading body of {url}: {e}")))
        });
        Ok(Some(Box::pin(body)))
    }

    async fn reauthenticate(&self) -> Result<(), SourceError> {
        tracing::info!("Session expired, logging in again as {}", self.username);
        self.login().await
    }
}

/// Build an [`Asset`] from one listing record.
fn parse_record(record: &Value) -> Result<Asset, SourceError> {
    let id = record["recordName"]
        .as_str()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SourceError::MalformedRecord("missing recordName".to_string()))?;
    let fields = &record["fields"];
    let item_type = fields["itemType"]["value"].as_str().unwrap_or("");

    let filename = match decode_filename(&fields["filenameEnc"]) {
        Some(name) => name,
        None => {
            tracing::debug!(id, "Record has no filename, using fingerprint");
            generate_fingerprint_filename(id, item_type)
        }
    };

    let created = fields["assetDate"]["value"]
        .as_f64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
        .unwrap_or_else(|| {
            tracing::warn!(id, "Missing expected field: assetDate");
            DateTime::<Utc>::UNIX_EPOCH
        });

    let kind = item_kind(item_type, &filename);
    let lookup = if kind == AssetKind::Movie {
        VIDEO_VERSION_LOOKUP
    } else {
        PHOTO_VERSION_LOOKUP
    };

    let mut versions = HashMap::new();
    for (size, prefix) in lookup {
        let res = &fields[format!("{prefix}Res")]["value"];
        let Some(url) = res["downloadURL"].as_str() else {
            continue;
        };
        versions.insert(
            *size,
            AssetVersion {
                size: res["size"].as_u64().unwrap_or(0),
                url: url.to_string(),
            },
        );
    }

    Ok(Asset::new(id, filename, created, kind, versions))
}

/// Decode the `filenameEnc` field, which is either a plain string or
/// base64-encoded UTF-8.
fn decode_filename(enc: &Value) -> Option<String> {
    let value = enc["value"].as_str()?;
    match enc["type"].as_str().unwrap_or("STRING") {
        "STRING" => Some(value.to_string()),
        "ENCRYPTED_BYTES" => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(value)
                .ok()?;
            String::from_utf8(decoded).ok()
        }
        other => {
            tracing::warn!("Unsupported filenameEnc type: {}", other);
            None
        }
    }
}

/// Classify a UTI type string, falling back to the filename extension.
fn item_kind(item_type: &str, filename: &str) -> AssetKind {
    match item_type {
        "public.jpeg" | "public.heic" | "public.heif" | "public.png" | "public.tiff"
        | "com.compuserve.gif" => return AssetKind::Image,
        "com.apple.quicktime-movie" | "public.mpeg-4" => return AssetKind::Movie,
        t if t.contains("raw-image") => return AssetKind::Image,
        _ => {}
    }
    let lower = filename.to_ascii_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext {
        "jpg" | "jpeg" | "heic" | "heif" | "png" | "gif" | "tiff" | "dng" => AssetKind::Image,
        "mov" | "mp4" | "m4v" => AssetKind::Movie,
        _ => AssetKind::Other,
    }
}
