//! The topic analysis orchestrator.
//!
//! Idle → CheckFreshness → {ServeCached | Refreshing} → Aggregating → Done.
//! Freshness is topic-level: the newest persisted document's age gates the
//! whole topic. A failed refresh degrades to serving whatever already
//! exists; the only caller-visible errors are an empty topic and (for
//! callers that opt in) an empty result set.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use newslens_common::{
    BiasRecord, Claim, ClaimVerification, ClassificationResult, Document, FeedSummary,
    NewDocument, NewsLensError, RawDocument, SentimentRecord, Verdict,
};
use newslens_store::AnalysisStore;

use crate::aggregate::{aggregate, Distribution, PerspectiveGroups};
use crate::oracle::Classifier;
use crate::source::DocumentSource;

const DEFAULT_LOCATION: &str = "global";

const VERIFICATION_REASONING: &str =
    "Initial automated assessment based on source credibility and claim structure.";

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Maximum age of the newest persisted document before the topic is due
    /// for refresh.
    pub ttl: Duration,
    /// Bound on concurrent per-document persistence bundles within one
    /// refresh.
    pub persist_concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(1),
            persist_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub topic: String,
    pub location: Option<String>,
    pub force_refresh: bool,
}

impl AnalysisRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            location: None,
            force_refresh: false,
        }
    }
}

/// The assembled response: perspective groups plus the flat records they
/// were built from.
#[derive(Debug, Clone, Serialize)]
pub struct TopicAnalysis {
    pub topic: String,
    pub location: String,
    pub refreshed: bool,
    pub articles: Vec<Document>,
    pub groups: PerspectiveGroups,
    pub distribution: Distribution,
    pub claims: Vec<Claim>,
    pub sentiments: Vec<SentimentRecord>,
    pub biases: Vec<BiasRecord>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TopicAnalysis {
    /// For callers whose contract requires non-empty results (compare-style
    /// endpoints). Search-style callers accept the empty set as-is.
    pub fn require_articles(&self) -> Result<(), NewsLensError> {
        if self.articles.is_empty() {
            Err(NewsLensError::NoDataAvailable(self.topic.clone()))
        } else {
            Ok(())
        }
    }
}

/// Topic-level staleness. The boundary is inclusive: a newest document aged
/// exactly `ttl` triggers a refresh, so a topic can never get stuck fresh.
pub fn is_stale(
    newest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    ttl: Duration,
    force_refresh: bool,
) -> bool {
    if force_refresh {
        return true;
    }
    match newest {
        None => true,
        Some(ts) => now - ts >= ttl,
    }
}

pub struct TopicAnalyzer {
    store: Arc<dyn AnalysisStore>,
    source: Arc<dyn DocumentSource>,
    classifier: Arc<dyn Classifier>,
    config: AnalyzerConfig,
}

impl TopicAnalyzer {
    pub fn new(
        store: Arc<dyn AnalysisStore>,
        source: Arc<dyn DocumentSource>,
        classifier: Arc<dyn Classifier>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            store,
            source,
            classifier,
            config,
        }
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<TopicAnalysis, NewsLensError> {
        let topic = request.topic.trim().to_string();
        if topic.is_empty() {
            return Err(NewsLensError::InvalidInput(
                "topic must not be empty".to_string(),
            ));
        }
        let location = request
            .location
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let existing = self
            .store
            .documents_by_topic(&topic)
            .await
            .map_err(store_err)?;
        let newest = existing.first().map(|d| d.updated_at);
        let stale = is_stale(newest, Utc::now(), self.config.ttl, request.force_refresh);

        let mut refreshed = false;
        if stale {
            info!(
                topic = topic.as_str(),
                location = location.as_str(),
                existing = existing.len(),
                "Refreshing topic analysis"
            );
            let fetched = self.source.fetch(&topic, request.location.as_deref()).await;
            if fetched.is_empty() {
                warn!(
                    topic = topic.as_str(),
                    "No documents fetched, serving existing data"
                );
            } else {
                let results = self.classifier.classify(&topic, &fetched).await;
                let persisted = self
                    .persist_batch(&topic, &location, &fetched, &results)
                    .await;
                if !persisted.is_empty() {
                    refreshed = true;
                    self.record_side_records(
                        &topic,
                        &location,
                        request.location.is_some(),
                        &persisted,
                    )
                    .await;
                }
            }
        }

        // Re-read so the response reflects exactly what persisted.
        let articles = self
            .store
            .documents_by_topic(&topic)
            .await
            .map_err(store_err)?;
        let ids: Vec<Uuid> = articles.iter().map(|d| d.id).collect();
        let claims = self
            .store
            .claims_for_documents(&ids)
            .await
            .map_err(store_err)?;
        let sentiments = self
            .store
            .sentiment_for_documents(&ids)
            .await
            .map_err(store_err)?;
        let biases = self.store.bias_for_documents(&ids).await.map_err(store_err)?;

        let last_updated = articles.first().map(|d| d.updated_at);
        let agg = aggregate(articles.clone(), claims);

        Ok(TopicAnalysis {
            topic,
            location,
            refreshed,
            articles,
            groups: agg.groups,
            distribution: agg.distribution,
            claims: agg.claims,
            sentiments,
            biases,
            last_updated,
        })
    }

    /// Persist each (document, result) pair as an independent bundle with
    /// bounded fan-out. One bundle failing must not abort the rest.
    async fn persist_batch(
        &self,
        topic: &str,
        location: &str,
        fetched: &[RawDocument],
        results: &[ClassificationResult],
    ) -> Vec<Document> {
        let outcomes: Vec<Option<Document>> = stream::iter(fetched.iter().zip(results.iter()))
            .map(|(raw, result)| async move {
                match self.persist_bundle(topic, location, raw, result).await {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        warn!(
                            topic,
                            url = raw.url.as_str(),
                            error = %e,
                            "Failed to persist analyzed document"
                        );
                        None
                    }
                }
            })
            .buffer_unordered(self.config.persist_concurrency.max(1))
            .collect()
            .await;

        outcomes.into_iter().flatten().collect()
    }

    /// Document first, then its dependents, so a claim always references an
    /// already-upserted document.
    async fn persist_bundle(
        &self,
        topic: &str,
        location: &str,
        raw: &RawDocument,
        result: &ClassificationResult,
    ) -> anyhow::Result<Document> {
        let doc = self
            .store
            .upsert_document(NewDocument {
                topic: topic.to_string(),
                title: raw.title.clone(),
                url: raw.url.clone(),
                source_name: raw.source_name.clone(),
                description: raw.description.clone(),
                published_at: raw.published_at,
                perspective: result.perspective,
                stance_label: result.stance_label.clone(),
                sentiment_label: result.sentiment_label,
                sentiment_score: result.sentiment_score,
                summary: result.summary.clone(),
                key_points: result.key_points.clone(),
                credibility_score: result.credibility_score,
                bias_score: result.bias_score,
                image_url: raw.image_url.clone(),
                author: raw.author.clone(),
                location: Some(location.to_string()),
            })
            .await?;

        self.store
            .upsert_sentiment(SentimentRecord {
                id: Uuid::new_v4(),
                document_id: doc.id,
                topic: topic.to_string(),
                overall_sentiment: result.sentiment_label,
                sentiment_score: result.sentiment_score,
                confidence: if result.sentiment_score >= 0.0 { 80 } else { 70 },
                entities: result.entities.clone(),
                emotional_tones: result.emotional_tones.clone(),
                key_topics: result.key_points.clone(),
            })
            .await?;

        self.store
            .upsert_bias(BiasRecord {
                id: Uuid::new_v4(),
                document_id: doc.id,
                topic: topic.to_string(),
                bias_score: result.bias_score,
                coverage_tilt: result.bias_analysis.coverage_tilt,
                loaded_terms: result.bias_analysis.loaded_terms.clone(),
                reasoning: result.bias_analysis.reasoning.clone(),
                confidence: 80,
            })
            .await?;

        for claim in &result.claims {
            let claim_id = self
                .store
                .upsert_claim(Claim {
                    id: Uuid::new_v4(),
                    document_id: doc.id,
                    topic: topic.to_string(),
                    claim_text: claim.text.clone(),
                    claim_type: claim.claim_type,
                    verifiability: claim.verifiability,
                    confidence: claim.confidence,
                    created_at: Utc::now(),
                })
                .await?;

            // Verdict derivation happens here, at persistence time, not in
            // the oracle result.
            self.store
                .upsert_claim_verification(ClaimVerification {
                    id: Uuid::new_v4(),
                    claim_id,
                    topic: topic.to_string(),
                    accuracy_score: claim.verifiability,
                    verdict: Verdict::from_verifiability(claim.verifiability),
                    evidence: Vec::new(),
                    reasoning: VERIFICATION_REASONING.to_string(),
                    confidence: claim.confidence,
                })
                .await?;
        }

        Ok(doc)
    }

    /// Trending/search-history side records. Best-effort: failures here are
    /// logged and never fail the analysis.
    async fn record_side_records(
        &self,
        topic: &str,
        location: &str,
        explicit_location: bool,
        persisted: &[Document],
    ) {
        if let Err(e) = self.store.record_search(topic, location).await {
            warn!(topic, error = %e, "Failed to record search history");
        }
        if explicit_location {
            if let Err(e) = self.store.record_location_trend(location, topic).await {
                warn!(topic, location, error = %e, "Failed to record location trend");
            }
        }
        if let Some(summary) = build_feed_summary(topic, location, persisted) {
            if let Err(e) = self.store.upsert_feed_summary(summary).await {
                warn!(topic, error = %e, "Failed to upsert feed summary");
            }
        }
    }
}

fn build_feed_summary(topic: &str, location: &str, docs: &[Document]) -> Option<FeedSummary> {
    let headline_doc = docs.iter().max_by_key(|d| d.credibility_score)?;

    let mut perspectives: Vec<String> = Vec::new();
    for doc in docs {
        if !doc.stance_label.is_empty() && !perspectives.contains(&doc.stance_label) {
            perspectives.push(doc.stance_label.clone());
        }
    }
    let perspective_count = if perspectives.is_empty() {
        2
    } else {
        perspectives.len() as i32
    };

    Some(FeedSummary {
        topic: topic.to_string(),
        headline: headline_doc.title.clone(),
        summary: headline_doc.summary.clone(),
        perspective_count,
        perspectives,
        source_count: docs.len() as i32,
        trending_score: docs.len() as i32,
        location: location.to_string(),
        image_url: headline_doc.image_url.clone(),
        published_at: Some(headline_doc.published_at),
    })
}

fn store_err(e: anyhow::Error) -> NewsLensError {
    NewsLensError::Store(e.to_string())
}
