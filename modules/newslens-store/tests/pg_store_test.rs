//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use chrono::Utc;
use newslens_common::{
    Claim, ClaimType, ClaimVerification, NewDocument, Perspective, SentimentLabel, Verdict,
};
use newslens_store::{AnalysisStore, PgStore};
use uuid::Uuid;

async fn test_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let store = PgStore::connect(&url).await.ok()?;
    store.migrate().await.ok()?;

    sqlx::query(
        "TRUNCATE claim_verifications, claims, sentiment_records, bias_records, \
         documents, search_history, location_trends, feed_summaries CASCADE",
    )
    .execute(store.pool())
    .await
    .ok()?;

    Some(store)
}

fn new_doc(url: &str, topic: &str, title: &str) -> NewDocument {
    NewDocument {
        topic: topic.into(),
        title: title.into(),
        url: url.into(),
        source_name: "Example Wire".into(),
        description: "description".into(),
        published_at: Utc::now(),
        perspective: Perspective::Oppose,
        stance_label: format!("Critical of {topic}"),
        sentiment_label: SentimentLabel::Negative,
        sentiment_score: -0.4,
        summary: "summary".into(),
        key_points: vec!["one".into(), "two".into()],
        credibility_score: 72,
        bias_score: -30,
        image_url: Some("https://example.com/img.png".into()),
        author: Some("A. Reporter".into()),
        location: Some("global".into()),
    }
}

#[tokio::test]
async fn document_upsert_overwrites_on_same_url() {
    let Some(store) = test_store().await else {
        return;
    };

    let first = store
        .upsert_document(new_doc("https://example.com/one", "carbon tax", "v1"))
        .await
        .unwrap();

    let mut update = new_doc("https://example.com/one", "carbon tax", "v2");
    update.credibility_score = 150; // clamped to 100 at the boundary
    let second = store.upsert_document(update).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.title, "v2");
    assert_eq!(second.credibility_score, 100);
    assert!(second.updated_at >= first.updated_at);

    let docs = store.documents_by_topic("Carbon Tax").await.unwrap();
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn claims_deduplicate_on_document_and_text() {
    let Some(store) = test_store().await else {
        return;
    };

    let doc = store
        .upsert_document(new_doc("https://example.com/two", "carbon tax", "t"))
        .await
        .unwrap();

    let claim = Claim {
        id: Uuid::new_v4(),
        document_id: doc.id,
        topic: "carbon tax".into(),
        claim_text: "Emissions fell last year".into(),
        claim_type: ClaimType::Statistic,
        verifiability: 80,
        confidence: 85,
        created_at: Utc::now(),
    };
    let id1 = store.upsert_claim(claim.clone()).await.unwrap();

    let mut again = claim.clone();
    again.id = Uuid::new_v4();
    again.verifiability = 60;
    let id2 = store.upsert_claim(again).await.unwrap();

    assert_eq!(id1, id2);

    let claims = store.claims_for_documents(&[doc.id]).await.unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].verifiability, 60);
}

#[tokio::test]
async fn verification_is_one_to_one_with_claim() {
    let Some(store) = test_store().await else {
        return;
    };

    let doc = store
        .upsert_document(new_doc("https://example.com/three", "carbon tax", "t"))
        .await
        .unwrap();
    let claim_id = store
        .upsert_claim(Claim {
            id: Uuid::new_v4(),
            document_id: doc.id,
            topic: "carbon tax".into(),
            claim_text: "Revenue is recycled".into(),
            claim_type: ClaimType::Factual,
            verifiability: 75,
            confidence: 80,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    for verdict in [Verdict::Verified, Verdict::PartiallyVerified] {
        store
            .upsert_claim_verification(ClaimVerification {
                id: Uuid::new_v4(),
                claim_id,
                topic: "carbon tax".into(),
                accuracy_score: 75,
                verdict,
                evidence: vec![],
                reasoning: "initial automated assessment".into(),
                confidence: 80,
            })
            .await
            .unwrap();
    }

    let count: (i64,) =
        sqlx::query_as("SELECT count(*) FROM claim_verifications WHERE claim_id = $1")
            .bind(claim_id)
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn search_history_increments_case_insensitively() {
    let Some(store) = test_store().await else {
        return;
    };

    store.record_search("Carbon Tax", "global").await.unwrap();
    store.record_search("carbon tax", "denver").await.unwrap();
    store.record_search("CARBON TAX", "global").await.unwrap();

    let trending = store.trending_topics(10).await.unwrap();
    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0].search_count, 3);
    assert_eq!(trending[0].locations.len(), 2);
}

#[tokio::test]
async fn location_trend_window_prunes_old_topics() {
    let Some(store) = test_store().await else {
        return;
    };

    for i in 0..25 {
        store
            .record_location_trend("denver", &format!("topic-{i}"))
            .await
            .unwrap();
    }

    let topics = store.trending_for_location("denver", 100).await.unwrap();
    assert!(topics.len() <= 20);
}
