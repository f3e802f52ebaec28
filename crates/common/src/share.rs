//! Ephemeral share links
//!
//! A [`ShareLink`] is a public, time-limited capability to download one
//! file. Playlist exports mint a fresh link for every media file they list,
//! so the playlist stays playable without credentials for a day.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Raw token size before encoding (8 characters once base64 encoded).
pub const TOKEN_BYTES: usize = 6;

/// How long a minted link stays valid.
pub const LINK_TTL: Duration = Duration::hours(24);

/// A persisted ephemeral capability. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    /// URL-safe base64 token
    pub hash: String,
    /// Target file, canonical and relative to the owner's filesystem root
    pub path: String,
    #[serde(with = "time::serde::timestamp")]
    pub expire: OffsetDateTime,
    /// Owning principal
    pub user_id: u64,
}

impl ShareLink {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expire
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("link store error: {source}")]
pub struct StoreError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Durable persistence of issued links. Implementations serialize their
/// own writes; the engine issues one `save` per link and never batches.
pub trait LinkStore {
    fn save(&self, link: &ShareLink) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
#[error("random source failure: {0}")]
pub struct RandomError(pub String);

/// Cryptographically secure byte source, injectable for tests.
pub trait TokenSource {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomError>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn fill(&self, buf: &mut [u8]) -> Result<(), RandomError> {
        getrandom::getrandom(buf).map_err(|e| RandomError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("secure randomness unavailable: {0}")]
    RandomSource(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// Mints and persists share links.
pub struct LinkIssuer<'a> {
    store: &'a dyn LinkStore,
    tokens: &'a dyn TokenSource,
}

impl<'a> LinkIssuer<'a> {
    pub fn new(store: &'a dyn LinkStore, tokens: &'a dyn TokenSource) -> Self {
        Self { store, tokens }
    }

    /// Create a link to `path` owned by `owner`, valid for [`LINK_TTL`],
    /// and persist it before returning.
    pub fn issue(&self, path: &str, owner: u64) -> Result<ShareLink, IssueError> {
        let mut raw = [0u8; TOKEN_BYTES];
        self.tokens
            .fill(&mut raw)
            .map_err(|e| IssueError::RandomSource(e.0))?;

        let link = ShareLink {
            hash: URL_SAFE.encode(raw),
            path: path.to_string(),
            expire: OffsetDateTime::now_utc() + LINK_TTL,
            user_id: owner,
        };

        self.store.save(&link)?;
        tracing::debug!(path = %link.path, owner, "issued share link");
        Ok(link)
    }
}
