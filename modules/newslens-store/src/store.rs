//! The `AnalysisStore` trait.
//!
//! Implemented by `PgStore` (production) and `MemoryStore` (tests/offline).
//! All upserts are insert-or-fully-overwrite keyed on natural identity;
//! the one exception is `record_search`, whose count is
//! increment-on-write. Same-identity concurrent upserts serialize to
//! last-writer-wins (Postgres: native atomic upsert; memory: a global lock).

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use newslens_common::{
    BiasRecord, Claim, ClaimVerification, Document, FeedSummary, LocationTopic, NewDocument,
    SearchHistory, SentimentRecord,
};

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Insert or overwrite a document, keyed on URL. Returns the persisted
    /// row — with the original `id` when the URL already existed.
    async fn upsert_document(&self, doc: NewDocument) -> Result<Document>;

    /// Insert or overwrite the sentiment record for a document (1:1).
    async fn upsert_sentiment(&self, rec: SentimentRecord) -> Result<()>;

    /// Insert or overwrite the bias record for a document (1:1).
    async fn upsert_bias(&self, rec: BiasRecord) -> Result<()>;

    /// Insert or overwrite a claim, keyed on (document_id, claim_text).
    /// Returns the effective claim id for verification linkage.
    async fn upsert_claim(&self, claim: Claim) -> Result<Uuid>;

    /// Insert or overwrite the verification for a claim (1:1).
    async fn upsert_claim_verification(&self, rec: ClaimVerification) -> Result<()>;

    /// Bump the per-topic search tally (case-insensitive identity) and add
    /// the location to its set.
    async fn record_search(&self, topic: &str, location: &str) -> Result<()>;

    /// Bump a topic's tally in a location's trending window. At most
    /// [`crate::LOCATION_TREND_WINDOW`] topics are retained per location.
    async fn record_location_trend(&self, location: &str, topic: &str) -> Result<()>;

    /// Insert or overwrite the feed headline card for a topic.
    async fn upsert_feed_summary(&self, summary: FeedSummary) -> Result<()>;

    /// All documents for a topic: case-insensitive exact match, newest
    /// `updated_at` first.
    async fn documents_by_topic(&self, topic: &str) -> Result<Vec<Document>>;

    /// Claims owned by the given documents, newest first, capped at
    /// [`crate::CLAIM_READ_LIMIT`].
    async fn claims_for_documents(&self, ids: &[Uuid]) -> Result<Vec<Claim>>;

    async fn sentiment_for_documents(&self, ids: &[Uuid]) -> Result<Vec<SentimentRecord>>;

    async fn bias_for_documents(&self, ids: &[Uuid]) -> Result<Vec<BiasRecord>>;

    /// Most-searched topics, for the global trending feed.
    async fn trending_topics(&self, limit: usize) -> Result<Vec<SearchHistory>>;

    /// Hottest topics within one location's trending window.
    async fn trending_for_location(&self, location: &str, limit: usize)
        -> Result<Vec<LocationTopic>>;
}
