//! Orchestrator scenarios: mock source + scripted classifier + the
//! in-memory store. No network, no database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use newslens_common::{
    ClassificationResult, NewsLensError, Perspective, Provenance, RawDocument,
};
use newslens_pipeline::{
    AnalysisRequest, AnalyzerConfig, Classifier, DocumentSource, HeuristicClassifier,
    OracleClassifier, TopicAnalyzer,
};
use newslens_store::{AnalysisStore, MemoryStore};

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

struct MockSource {
    docs: Vec<RawDocument>,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(docs: Vec<RawDocument>) -> Arc<Self> {
        Arc::new(Self {
            docs,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    async fn fetch(&self, _topic: &str, _location: Option<&str>) -> Vec<RawDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.docs.clone()
    }
}

/// Fills every field from the deterministic heuristic, then overrides the
/// perspective with a scripted sequence.
struct ScriptedClassifier {
    perspectives: Vec<Perspective>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn new(perspectives: Vec<Perspective>) -> Arc<Self> {
        Arc::new(Self {
            perspectives,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, topic: &str, docs: &[RawDocument]) -> Vec<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        docs.iter()
            .enumerate()
            .map(|(i, doc)| {
                let mut result = HeuristicClassifier::classify_one(topic, doc, i);
                result.perspective = self
                    .perspectives
                    .get(i)
                    .copied()
                    .unwrap_or(Perspective::Neutral);
                result
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn raw_doc(i: usize) -> RawDocument {
    RawDocument {
        title: format!("Article {i}"),
        url: format!("https://example.com/articles/{i}"),
        source_name: "Example Wire".into(),
        description: format!("Reporting number {i} on the matter"),
        published_at: Utc::now(),
        image_url: None,
        author: None,
    }
}

fn three_docs() -> Vec<RawDocument> {
    (0..3).map(raw_doc).collect()
}

fn analyzer(
    store: Arc<MemoryStore>,
    source: Arc<MockSource>,
    classifier: Arc<dyn Classifier>,
) -> TopicAnalyzer {
    TopicAnalyzer::new(
        store,
        source,
        classifier,
        AnalyzerConfig {
            ttl: Duration::hours(1),
            persist_concurrency: 2,
        },
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_topic_fails_before_any_io() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    let classifier = ScriptedClassifier::new(vec![]);
    let pipeline = analyzer(store, source.clone(), classifier);

    let err = pipeline
        .analyze(AnalysisRequest::new("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, NewsLensError::InvalidInput(_)));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn cold_topic_persists_and_groups_by_perspective() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    let classifier = ScriptedClassifier::new(vec![
        Perspective::Support,
        Perspective::Support,
        Perspective::Oppose,
    ]);
    let pipeline = analyzer(store.clone(), source, classifier);

    let analysis = pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();

    assert!(analysis.refreshed);
    assert_eq!(analysis.articles.len(), 3);
    assert_eq!(analysis.groups.support.len(), 2);
    assert_eq!(analysis.groups.oppose.len(), 1);
    assert_eq!(analysis.groups.neutral.len(), 0);
    assert_eq!(analysis.distribution.support_pct, 67);
    assert_eq!(analysis.distribution.oppose_pct, 33);
    assert_eq!(analysis.distribution.neutral_pct, 0);
    assert!(analysis.last_updated.is_some());

    // Everything made it into the store, including side records.
    assert_eq!(store.document_count(), 3);
    assert_eq!(store.claim_count(), 3);
    assert!(store.feed_summary("lunar exploration").is_some());

    // Sentiment and bias records are one per document.
    assert_eq!(analysis.sentiments.len(), 3);
    assert_eq!(analysis.biases.len(), 3);
}

#[tokio::test]
async fn fresh_topic_makes_zero_external_calls() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    let classifier = ScriptedClassifier::new(vec![
        Perspective::Support,
        Perspective::Support,
        Perspective::Oppose,
    ]);
    let pipeline = analyzer(store, source.clone(), classifier.clone());

    let first = pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();
    let second = pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(classifier.calls(), 1);
    assert!(!second.refreshed);
    assert_eq!(
        second.groups.support.len(),
        first.groups.support.len()
    );
    assert_eq!(second.groups.oppose.len(), first.groups.oppose.len());
    assert_eq!(second.distribution, first.distribution);
}

#[tokio::test]
async fn topic_lookup_is_case_insensitive_for_freshness() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    let classifier = ScriptedClassifier::new(vec![Perspective::Neutral]);
    let pipeline = analyzer(store, source.clone(), classifier);

    pipeline
        .analyze(AnalysisRequest::new("Lunar Exploration"))
        .await
        .unwrap();
    let again = pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(again.articles.len(), 3);
}

#[tokio::test]
async fn degraded_fetch_preserves_existing_documents() {
    let store = Arc::new(MemoryStore::new());

    // Seed three documents through a working pipeline.
    let seeder = analyzer(
        store.clone(),
        MockSource::new(three_docs()),
        ScriptedClassifier::new(vec![
            Perspective::Support,
            Perspective::Oppose,
            Perspective::Neutral,
        ]),
    );
    seeder
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();
    assert_eq!(store.document_count(), 3);

    // Now the provider goes dark and a forced refresh happens.
    let degraded = analyzer(
        store.clone(),
        MockSource::new(vec![]),
        ScriptedClassifier::new(vec![]),
    );
    let analysis = degraded
        .analyze(AnalysisRequest {
            topic: "lunar exploration".into(),
            location: None,
            force_refresh: true,
        })
        .await
        .unwrap();

    assert_eq!(store.document_count(), 3);
    assert_eq!(analysis.articles.len(), 3);
    assert!(!analysis.refreshed);
}

#[tokio::test]
async fn exactly_ttl_old_documents_trigger_a_refetch() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    let classifier = ScriptedClassifier::new(vec![Perspective::Neutral]);
    let pipeline = analyzer(store.clone(), source.clone(), classifier);

    pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();
    assert_eq!(source.calls(), 1);

    // Age every document to exactly the TTL boundary.
    let boundary = Utc::now() - Duration::hours(1);
    for i in 0..3 {
        store.set_document_updated_at(&format!("https://example.com/articles/{i}"), boundary);
    }

    pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn reclassification_does_not_duplicate_claims() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    let classifier = ScriptedClassifier::new(vec![
        Perspective::Support,
        Perspective::Oppose,
        Perspective::Neutral,
    ]);
    let pipeline = analyzer(store.clone(), source, classifier);

    let request = AnalysisRequest {
        topic: "lunar exploration".into(),
        location: None,
        force_refresh: true,
    };
    pipeline.analyze(request.clone()).await.unwrap();
    let after_first = store.claim_count();
    pipeline.analyze(request).await.unwrap();

    assert_eq!(store.claim_count(), after_first);
    assert_eq!(store.document_count(), 3);
}

#[tokio::test]
async fn oracle_outage_still_classifies_every_document() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(three_docs());
    // Unconfigured oracle: every batch takes the heuristic path.
    let classifier = Arc::new(OracleClassifier::new(""));
    let pipeline = analyzer(store.clone(), source, classifier);

    let analysis = pipeline
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();

    assert!(analysis.refreshed);
    assert_eq!(analysis.articles.len(), 3);
    assert_eq!(store.document_count(), 3);
}

#[tokio::test]
async fn heuristic_provenance_is_visible_to_callers() {
    let docs = three_docs();
    let results = OracleClassifier::new("").classify("lunar exploration", &docs).await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.provenance == Provenance::Heuristic));
}

#[tokio::test]
async fn empty_result_set_is_not_an_error_until_required() {
    let store = Arc::new(MemoryStore::new());
    let source = MockSource::new(vec![]);
    let classifier = ScriptedClassifier::new(vec![]);
    let pipeline = analyzer(store, source, classifier);

    let analysis = pipeline
        .analyze(AnalysisRequest::new("obscure nonsense"))
        .await
        .unwrap();

    assert!(analysis.articles.is_empty());
    assert!(!analysis.refreshed);

    let err = analysis.require_articles().unwrap_err();
    assert!(matches!(err, NewsLensError::NoDataAvailable(_)));
}

#[tokio::test]
async fn search_history_records_only_successful_refreshes() {
    let store = Arc::new(MemoryStore::new());

    // Failed fetch: no search history entry.
    let degraded = analyzer(
        store.clone(),
        MockSource::new(vec![]),
        ScriptedClassifier::new(vec![]),
    );
    degraded
        .analyze(AnalysisRequest::new("lunar exploration"))
        .await
        .unwrap();
    assert!(store.trending_topics(10).await.unwrap().is_empty());

    // Successful refresh with an explicit location: search history plus a
    // location trend entry.
    let working = analyzer(
        store.clone(),
        MockSource::new(three_docs()),
        ScriptedClassifier::new(vec![Perspective::Support]),
    );
    working
        .analyze(AnalysisRequest {
            topic: "lunar exploration".into(),
            location: Some("denver".into()),
            force_refresh: true,
        })
        .await
        .unwrap();

    let trending = store.trending_topics(10).await.unwrap();
    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0].search_count, 1);
    assert_eq!(trending[0].locations, vec!["denver"]);

    let local = store.trending_for_location("denver", 5).await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].topic, "lunar exploration");
}
