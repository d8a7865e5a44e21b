use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::db::models::MatchSnapshot;

/// Why a fetch produced no batch. Never surfaced to recipients.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Provider unreachable or timed out
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Payload missing a field or carrying an unexpected value
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Transport and provider failures are retried after the fixed retry
    /// delay; a malformed payload only skips the current cycle.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Malformed(_))
    }

    /// The provider has no such resource, e.g. a match removed from its feed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Provider { status: 404, .. })
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// Trait that every football data provider must implement.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// All matches of the configured competition kicking off within `[from, to]`.
    async fn matches_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MatchSnapshot>, FetchError>;

    /// Current state of the given matches, in one round trip.
    async fn matches_by_id(&self, ids: &[u64]) -> Result<Vec<MatchSnapshot>, FetchError>;

    /// Current state of a single match.
    async fn match_by_id(&self, id: u64) -> Result<MatchSnapshot, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
