//! In-memory store for tests and offline runs. No database required.
//! A single lock serializes all writes, which trivially satisfies the
//! last-writer-wins contract for same-identity upserts.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use newslens_common::{
    BiasRecord, Claim, ClaimVerification, Document, FeedSummary, LocationTopic, NewDocument,
    SearchHistory, SentimentRecord,
};

use crate::store::AnalysisStore;
use crate::{clamp_bias, clamp_document, clamp_sentiment, clamp_verification, CLAIM_READ_LIMIT,
    LOCATION_TREND_WINDOW};

#[derive(Default)]
struct Inner {
    /// Keyed by URL, the document's natural identity.
    documents: HashMap<String, Document>,
    /// Keyed by owning document id (1:1).
    sentiments: HashMap<Uuid, SentimentRecord>,
    /// Keyed by owning document id (1:1).
    biases: HashMap<Uuid, BiasRecord>,
    /// Keyed by (document id, claim text).
    claims: HashMap<(Uuid, String), Claim>,
    /// Keyed by owning claim id (1:1).
    verifications: HashMap<Uuid, ClaimVerification>,
    /// Keyed by lowercased topic.
    search_history: HashMap<String, SearchHistory>,
    /// Keyed by (location, topic).
    location_trends: HashMap<(String, String), LocationTopic>,
    /// Keyed by lowercased topic.
    feed_summaries: HashMap<String, FeedSummary>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: rewrite a document's `updated_at` so freshness
    /// scenarios can position the TTL boundary precisely.
    pub fn set_document_updated_at(&self, url: &str, at: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(doc) = inner.documents.get_mut(url) {
            doc.updated_at = at;
        }
    }

    /// Test helper: number of persisted documents across all topics.
    pub fn document_count(&self) -> usize {
        self.inner.lock().unwrap().documents.len()
    }

    /// Test helper: number of persisted claims across all documents.
    pub fn claim_count(&self) -> usize {
        self.inner.lock().unwrap().claims.len()
    }

    /// Test helper: the stored feed summary for a topic, if any.
    pub fn feed_summary(&self, topic: &str) -> Option<FeedSummary> {
        self.inner
            .lock()
            .unwrap()
            .feed_summaries
            .get(&topic.to_lowercase())
            .cloned()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn upsert_document(&self, mut doc: NewDocument) -> Result<Document> {
        clamp_document(&mut doc);

        let mut inner = self.inner.lock().unwrap();
        let id = inner
            .documents
            .get(&doc.url)
            .map(|existing| existing.id)
            .unwrap_or_else(Uuid::new_v4);

        let stored = Document {
            id,
            topic: doc.topic,
            title: doc.title,
            url: doc.url.clone(),
            source_name: doc.source_name,
            description: doc.description,
            published_at: doc.published_at,
            perspective: doc.perspective,
            stance_label: doc.stance_label,
            sentiment_label: doc.sentiment_label,
            sentiment_score: doc.sentiment_score,
            summary: doc.summary,
            key_points: doc.key_points,
            credibility_score: doc.credibility_score,
            bias_score: doc.bias_score,
            image_url: doc.image_url,
            author: doc.author,
            location: doc.location,
            updated_at: Utc::now(),
        };

        inner.documents.insert(doc.url, stored.clone());
        Ok(stored)
    }

    async fn upsert_sentiment(&self, mut rec: SentimentRecord) -> Result<()> {
        clamp_sentiment(&mut rec);
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.sentiments.get(&rec.document_id) {
            rec.id = existing.id;
        }
        inner.sentiments.insert(rec.document_id, rec);
        Ok(())
    }

    async fn upsert_bias(&self, mut rec: BiasRecord) -> Result<()> {
        clamp_bias(&mut rec);
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.biases.get(&rec.document_id) {
            rec.id = existing.id;
        }
        inner.biases.insert(rec.document_id, rec);
        Ok(())
    }

    async fn upsert_claim(&self, mut claim: Claim) -> Result<Uuid> {
        claim.verifiability = claim.verifiability.clamp(0, 100);
        claim.confidence = claim.confidence.clamp(0, 100);

        let mut inner = self.inner.lock().unwrap();
        let key = (claim.document_id, claim.claim_text.clone());
        if let Some(existing) = inner.claims.get(&key) {
            claim.id = existing.id;
            claim.created_at = existing.created_at;
        }
        let id = claim.id;
        inner.claims.insert(key, claim);
        Ok(id)
    }

    async fn upsert_claim_verification(&self, mut rec: ClaimVerification) -> Result<()> {
        clamp_verification(&mut rec);
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.verifications.get(&rec.claim_id) {
            rec.id = existing.id;
        }
        inner.verifications.insert(rec.claim_id, rec);
        Ok(())
    }

    async fn record_search(&self, topic: &str, location: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .search_history
            .entry(topic.to_lowercase())
            .or_insert_with(|| SearchHistory {
                topic: topic.to_string(),
                search_count: 0,
                last_searched_at: Utc::now(),
                locations: Vec::new(),
            });
        entry.search_count += 1;
        entry.last_searched_at = Utc::now();
        if !entry.locations.iter().any(|l| l == location) {
            entry.locations.push(location.to_string());
        }
        Ok(())
    }

    async fn record_location_trend(&self, location: &str, topic: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (location.to_string(), topic.to_string());
        let entry = inner.location_trends.entry(key).or_insert_with(|| LocationTopic {
            location: location.to_string(),
            topic: topic.to_string(),
            count: 0,
            last_seen: Utc::now(),
        });
        entry.count += 1;
        entry.last_seen = Utc::now();

        // Evict beyond the per-location window, oldest first.
        let mut seen: Vec<(String, DateTime<Utc>)> = inner
            .location_trends
            .values()
            .filter(|t| t.location == location)
            .map(|t| (t.topic.clone(), t.last_seen))
            .collect();
        if seen.len() > LOCATION_TREND_WINDOW {
            seen.sort_by_key(|(_, at)| *at);
            for (stale_topic, _) in seen.iter().take(seen.len() - LOCATION_TREND_WINDOW) {
                inner
                    .location_trends
                    .remove(&(location.to_string(), stale_topic.clone()));
            }
        }
        Ok(())
    }

    async fn upsert_feed_summary(&self, summary: FeedSummary) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .feed_summaries
            .insert(summary.topic.to_lowercase(), summary);
        Ok(())
    }

    async fn documents_by_topic(&self, topic: &str) -> Result<Vec<Document>> {
        let inner = self.inner.lock().unwrap();
        let wanted = topic.to_lowercase();
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.topic.to_lowercase() == wanted)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    async fn claims_for_documents(&self, ids: &[Uuid]) -> Result<Vec<Claim>> {
        let inner = self.inner.lock().unwrap();
        let mut claims: Vec<Claim> = inner
            .claims
            .values()
            .filter(|c| ids.contains(&c.document_id))
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        claims.truncate(CLAIM_READ_LIMIT);
        Ok(claims)
    }

    async fn sentiment_for_documents(&self, ids: &[Uuid]) -> Result<Vec<SentimentRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.sentiments.get(id).cloned())
            .collect())
    }

    async fn bias_for_documents(&self, ids: &[Uuid]) -> Result<Vec<BiasRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.biases.get(id).cloned())
            .collect())
    }

    async fn trending_topics(&self, limit: usize) -> Result<Vec<SearchHistory>> {
        let inner = self.inner.lock().unwrap();
        let mut all: Vec<SearchHistory> = inner.search_history.values().cloned().collect();
        all.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then(b.last_searched_at.cmp(&a.last_searched_at))
        });
        all.truncate(limit);
        Ok(all)
    }

    async fn trending_for_location(
        &self,
        location: &str,
        limit: usize,
    ) -> Result<Vec<LocationTopic>> {
        let inner = self.inner.lock().unwrap();
        let mut topics: Vec<LocationTopic> = inner
            .location_trends
            .values()
            .filter(|t| t.location == location)
            .cloned()
            .collect();
        topics.sort_by(|a, b| b.count.cmp(&a.count).then(b.last_seen.cmp(&a.last_seen)));
        topics.truncate(limit);
        Ok(topics)
    }
}
