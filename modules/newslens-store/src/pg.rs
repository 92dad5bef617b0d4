//! Postgres-backed store. Raw SQL, `ON CONFLICT` upserts keyed on natural
//! identity. The database's atomic upsert is what serializes racing writers
//! on the same identity.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use newslens_common::{
    BiasRecord, Claim, ClaimType, ClaimVerification, CoverageTilt, Document, FeedSummary,
    LocationTopic, NewDocument, Perspective, SearchHistory, SentimentLabel, SentimentRecord,
};

use crate::store::AnalysisStore;
use crate::{clamp_bias, clamp_document, clamp_sentiment, clamp_verification, CLAIM_READ_LIMIT,
    LOCATION_TREND_WINDOW};

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id                UUID         PRIMARY KEY,
        topic             TEXT         NOT NULL,
        title             TEXT         NOT NULL,
        url               TEXT         NOT NULL UNIQUE,
        source_name       TEXT         NOT NULL,
        description       TEXT         NOT NULL,
        published_at      TIMESTAMPTZ  NOT NULL,
        perspective       TEXT         NOT NULL,
        stance_label      TEXT         NOT NULL,
        sentiment_label   TEXT         NOT NULL,
        sentiment_score   REAL         NOT NULL,
        summary           TEXT         NOT NULL,
        key_points        JSONB        NOT NULL DEFAULT '[]',
        credibility_score INT          NOT NULL,
        bias_score        INT          NOT NULL,
        image_url         TEXT,
        author            TEXT,
        location          TEXT,
        updated_at        TIMESTAMPTZ  NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS documents_topic_idx ON documents (lower(topic), updated_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS sentiment_records (
        id                UUID   PRIMARY KEY,
        document_id       UUID   NOT NULL UNIQUE REFERENCES documents(id),
        topic             TEXT   NOT NULL,
        overall_sentiment TEXT   NOT NULL,
        sentiment_score   REAL   NOT NULL,
        confidence        INT    NOT NULL,
        entities          JSONB  NOT NULL DEFAULT '[]',
        emotional_tones   JSONB  NOT NULL DEFAULT '[]',
        key_topics        JSONB  NOT NULL DEFAULT '[]'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bias_records (
        id            UUID   PRIMARY KEY,
        document_id   UUID   NOT NULL UNIQUE REFERENCES documents(id),
        topic         TEXT   NOT NULL,
        bias_score    INT    NOT NULL,
        coverage_tilt TEXT   NOT NULL,
        loaded_terms  JSONB  NOT NULL DEFAULT '[]',
        reasoning     TEXT   NOT NULL,
        confidence    INT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS claims (
        id            UUID         PRIMARY KEY,
        document_id   UUID         NOT NULL REFERENCES documents(id),
        topic         TEXT         NOT NULL,
        claim_text    TEXT         NOT NULL,
        claim_type    TEXT         NOT NULL,
        verifiability INT          NOT NULL,
        confidence    INT          NOT NULL,
        created_at    TIMESTAMPTZ  NOT NULL DEFAULT now(),
        UNIQUE (document_id, claim_text)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS claim_verifications (
        id             UUID   PRIMARY KEY,
        claim_id       UUID   NOT NULL UNIQUE REFERENCES claims(id),
        topic          TEXT   NOT NULL,
        accuracy_score INT    NOT NULL,
        verdict        TEXT   NOT NULL,
        evidence       JSONB  NOT NULL DEFAULT '[]',
        reasoning      TEXT   NOT NULL,
        confidence     INT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS search_history (
        topic            TEXT         NOT NULL,
        search_count     BIGINT       NOT NULL DEFAULT 0,
        last_searched_at TIMESTAMPTZ  NOT NULL DEFAULT now(),
        locations        TEXT[]       NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS search_history_topic_key ON search_history (lower(topic))",
    r#"
    CREATE TABLE IF NOT EXISTS location_trends (
        location  TEXT         NOT NULL,
        topic     TEXT         NOT NULL,
        count     BIGINT       NOT NULL DEFAULT 0,
        last_seen TIMESTAMPTZ  NOT NULL DEFAULT now(),
        PRIMARY KEY (location, topic)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS feed_summaries (
        topic             TEXT         NOT NULL,
        headline          TEXT         NOT NULL,
        summary           TEXT         NOT NULL,
        perspective_count INT          NOT NULL,
        perspectives      JSONB        NOT NULL DEFAULT '[]',
        source_count      INT          NOT NULL,
        trending_score    INT          NOT NULL,
        location          TEXT         NOT NULL,
        image_url         TEXT,
        published_at      TIMESTAMPTZ
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS feed_summaries_topic_key ON feed_summaries (lower(topic))",
];

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        for stmt in DDL {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        info!("Store schema up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AnalysisStore for PgStore {
    async fn upsert_document(&self, mut doc: NewDocument) -> Result<Document> {
        clamp_document(&mut doc);

        let row = sqlx::query(
            r#"
            INSERT INTO documents (
                id, topic, title, url, source_name, description, published_at,
                perspective, stance_label, sentiment_label, sentiment_score,
                summary, key_points, credibility_score, bias_score,
                image_url, author, location, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, now())
            ON CONFLICT (url) DO UPDATE SET
                topic = EXCLUDED.topic,
                title = EXCLUDED.title,
                source_name = EXCLUDED.source_name,
                description = EXCLUDED.description,
                published_at = EXCLUDED.published_at,
                perspective = EXCLUDED.perspective,
                stance_label = EXCLUDED.stance_label,
                sentiment_label = EXCLUDED.sentiment_label,
                sentiment_score = EXCLUDED.sentiment_score,
                summary = EXCLUDED.summary,
                key_points = EXCLUDED.key_points,
                credibility_score = EXCLUDED.credibility_score,
                bias_score = EXCLUDED.bias_score,
                image_url = EXCLUDED.image_url,
                author = EXCLUDED.author,
                location = EXCLUDED.location,
                updated_at = now()
            RETURNING id, topic, title, url, source_name, description,
                      published_at, perspective, stance_label, sentiment_label,
                      sentiment_score, summary, key_points, credibility_score,
                      bias_score, image_url, author, location, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&doc.topic)
        .bind(&doc.title)
        .bind(&doc.url)
        .bind(&doc.source_name)
        .bind(&doc.description)
        .bind(doc.published_at)
        .bind(doc.perspective.to_string())
        .bind(&doc.stance_label)
        .bind(doc.sentiment_label.to_string())
        .bind(doc.sentiment_score)
        .bind(&doc.summary)
        .bind(serde_json::to_value(&doc.key_points)?)
        .bind(doc.credibility_score)
        .bind(doc.bias_score)
        .bind(&doc.image_url)
        .bind(&doc.author)
        .bind(&doc.location)
        .fetch_one(&self.pool)
        .await?;

        document_from_row(&row)
    }

    async fn upsert_sentiment(&self, mut rec: SentimentRecord) -> Result<()> {
        clamp_sentiment(&mut rec);

        sqlx::query(
            r#"
            INSERT INTO sentiment_records (
                id, document_id, topic, overall_sentiment, sentiment_score,
                confidence, entities, emotional_tones, key_topics
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (document_id) DO UPDATE SET
                topic = EXCLUDED.topic,
                overall_sentiment = EXCLUDED.overall_sentiment,
                sentiment_score = EXCLUDED.sentiment_score,
                confidence = EXCLUDED.confidence,
                entities = EXCLUDED.entities,
                emotional_tones = EXCLUDED.emotional_tones,
                key_topics = EXCLUDED.key_topics
            "#,
        )
        .bind(rec.id)
        .bind(rec.document_id)
        .bind(&rec.topic)
        .bind(rec.overall_sentiment.to_string())
        .bind(rec.sentiment_score)
        .bind(rec.confidence)
        .bind(serde_json::to_value(&rec.entities)?)
        .bind(serde_json::to_value(&rec.emotional_tones)?)
        .bind(serde_json::to_value(&rec.key_topics)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_bias(&self, mut rec: BiasRecord) -> Result<()> {
        clamp_bias(&mut rec);

        sqlx::query(
            r#"
            INSERT INTO bias_records (
                id, document_id, topic, bias_score, coverage_tilt,
                loaded_terms, reasoning, confidence
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (document_id) DO UPDATE SET
                topic = EXCLUDED.topic,
                bias_score = EXCLUDED.bias_score,
                coverage_tilt = EXCLUDED.coverage_tilt,
                loaded_terms = EXCLUDED.loaded_terms,
                reasoning = EXCLUDED.reasoning,
                confidence = EXCLUDED.confidence
            "#,
        )
        .bind(rec.id)
        .bind(rec.document_id)
        .bind(&rec.topic)
        .bind(rec.bias_score)
        .bind(rec.coverage_tilt.to_string())
        .bind(serde_json::to_value(&rec.loaded_terms)?)
        .bind(&rec.reasoning)
        .bind(rec.confidence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_claim(&self, claim: Claim) -> Result<Uuid> {
        let clamped_verifiability = claim.verifiability.clamp(0, 100);
        let clamped_confidence = claim.confidence.clamp(0, 100);

        let row = sqlx::query(
            r#"
            INSERT INTO claims (
                id, document_id, topic, claim_text, claim_type,
                verifiability, confidence, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (document_id, claim_text) DO UPDATE SET
                topic = EXCLUDED.topic,
                claim_type = EXCLUDED.claim_type,
                verifiability = EXCLUDED.verifiability,
                confidence = EXCLUDED.confidence
            RETURNING id
            "#,
        )
        .bind(claim.id)
        .bind(claim.document_id)
        .bind(&claim.topic)
        .bind(&claim.claim_text)
        .bind(claim.claim_type.to_string())
        .bind(clamped_verifiability)
        .bind(clamped_confidence)
        .bind(claim.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn upsert_claim_verification(&self, mut rec: ClaimVerification) -> Result<()> {
        clamp_verification(&mut rec);

        sqlx::query(
            r#"
            INSERT INTO claim_verifications (
                id, claim_id, topic, accuracy_score, verdict,
                evidence, reasoning, confidence
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (claim_id) DO UPDATE SET
                topic = EXCLUDED.topic,
                accuracy_score = EXCLUDED.accuracy_score,
                verdict = EXCLUDED.verdict,
                evidence = EXCLUDED.evidence,
                reasoning = EXCLUDED.reasoning,
                confidence = EXCLUDED.confidence
            "#,
        )
        .bind(rec.id)
        .bind(rec.claim_id)
        .bind(&rec.topic)
        .bind(rec.accuracy_score)
        .bind(rec.verdict.to_string())
        .bind(serde_json::to_value(&rec.evidence)?)
        .bind(&rec.reasoning)
        .bind(rec.confidence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_search(&self, topic: &str, location: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO search_history (topic, search_count, last_searched_at, locations)
            VALUES ($1, 1, now(), ARRAY[$2])
            ON CONFLICT (lower(topic)) DO UPDATE SET
                search_count = search_history.search_count + 1,
                last_searched_at = now(),
                locations = CASE
                    WHEN $2 = ANY(search_history.locations)
                        THEN search_history.locations
                    ELSE array_append(search_history.locations, $2)
                END
            "#,
        )
        .bind(topic)
        .bind(location)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_location_trend(&self, location: &str, topic: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO location_trends (location, topic, count, last_seen)
            VALUES ($1, $2, 1, now())
            ON CONFLICT (location, topic) DO UPDATE SET
                count = location_trends.count + 1,
                last_seen = now()
            "#,
        )
        .bind(location)
        .bind(topic)
        .execute(&self.pool)
        .await?;

        // Keep only the most recently seen topics per location.
        sqlx::query(
            r#"
            DELETE FROM location_trends
            WHERE location = $1 AND topic NOT IN (
                SELECT topic FROM location_trends
                WHERE location = $1
                ORDER BY last_seen DESC
                LIMIT $2
            )
            "#,
        )
        .bind(location)
        .bind(LOCATION_TREND_WINDOW as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_feed_summary(&self, summary: FeedSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feed_summaries (
                topic, headline, summary, perspective_count, perspectives,
                source_count, trending_score, location, image_url, published_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (lower(topic)) DO UPDATE SET
                headline = EXCLUDED.headline,
                summary = EXCLUDED.summary,
                perspective_count = EXCLUDED.perspective_count,
                perspectives = EXCLUDED.perspectives,
                source_count = EXCLUDED.source_count,
                trending_score = EXCLUDED.trending_score,
                location = EXCLUDED.location,
                image_url = EXCLUDED.image_url,
                published_at = EXCLUDED.published_at
            "#,
        )
        .bind(&summary.topic)
        .bind(&summary.headline)
        .bind(&summary.summary)
        .bind(summary.perspective_count)
        .bind(serde_json::to_value(&summary.perspectives)?)
        .bind(summary.source_count)
        .bind(summary.trending_score)
        .bind(&summary.location)
        .bind(&summary.image_url)
        .bind(summary.published_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn documents_by_topic(&self, topic: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, topic, title, url, source_name, description,
                   published_at, perspective, stance_label, sentiment_label,
                   sentiment_score, summary, key_points, credibility_score,
                   bias_score, image_url, author, location, updated_at
            FROM documents
            WHERE lower(topic) = lower($1)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    async fn claims_for_documents(&self, ids: &[Uuid]) -> Result<Vec<Claim>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, topic, claim_text, claim_type,
                   verifiability, confidence, created_at
            FROM claims
            WHERE document_id = ANY($1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(ids.to_vec())
        .bind(CLAIM_READ_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(claim_from_row).collect()
    }

    async fn sentiment_for_documents(&self, ids: &[Uuid]) -> Result<Vec<SentimentRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, topic, overall_sentiment, sentiment_score,
                   confidence, entities, emotional_tones, key_topics
            FROM sentiment_records
            WHERE document_id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(sentiment_from_row).collect()
    }

    async fn bias_for_documents(&self, ids: &[Uuid]) -> Result<Vec<BiasRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, topic, bias_score, coverage_tilt,
                   loaded_terms, reasoning, confidence
            FROM bias_records
            WHERE document_id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bias_from_row).collect()
    }

    async fn trending_topics(&self, limit: usize) -> Result<Vec<SearchHistory>> {
        let rows = sqlx::query(
            r#"
            SELECT topic, search_count, last_searched_at, locations
            FROM search_history
            ORDER BY search_count DESC, last_searched_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SearchHistory {
                    topic: row.try_get("topic")?,
                    search_count: row.try_get("search_count")?,
                    last_searched_at: row.try_get("last_searched_at")?,
                    locations: row.try_get("locations")?,
                })
            })
            .collect()
    }

    async fn trending_for_location(
        &self,
        location: &str,
        limit: usize,
    ) -> Result<Vec<LocationTopic>> {
        let rows = sqlx::query(
            r#"
            SELECT location, topic, count, last_seen
            FROM location_trends
            WHERE location = $1
            ORDER BY count DESC, last_seen DESC
            LIMIT $2
            "#,
        )
        .bind(location)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LocationTopic {
                    location: row.try_get("location")?,
                    topic: row.try_get("topic")?,
                    count: row.try_get("count")?,
                    last_seen: row.try_get("last_seen")?,
                })
            })
            .collect()
    }
}

// --- Row mapping ---

fn document_from_row(row: &PgRow) -> Result<Document> {
    let perspective: String = row.try_get("perspective")?;
    let sentiment_label: String = row.try_get("sentiment_label")?;
    let key_points: serde_json::Value = row.try_get("key_points")?;

    Ok(Document {
        id: row.try_get("id")?,
        topic: row.try_get("topic")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        source_name: row.try_get("source_name")?,
        description: row.try_get("description")?,
        published_at: row.try_get::<DateTime<Utc>, _>("published_at")?,
        perspective: Perspective::parse(&perspective)
            .ok_or_else(|| anyhow!("unknown perspective label: {perspective}"))?,
        stance_label: row.try_get("stance_label")?,
        sentiment_label: SentimentLabel::parse(&sentiment_label)
            .ok_or_else(|| anyhow!("unknown sentiment label: {sentiment_label}"))?,
        sentiment_score: row.try_get("sentiment_score")?,
        summary: row.try_get("summary")?,
        key_points: serde_json::from_value(key_points)?,
        credibility_score: row.try_get("credibility_score")?,
        bias_score: row.try_get("bias_score")?,
        image_url: row.try_get("image_url")?,
        author: row.try_get("author")?,
        location: row.try_get("location")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn sentiment_from_row(row: &PgRow) -> Result<SentimentRecord> {
    let overall: String = row.try_get("overall_sentiment")?;
    let entities: serde_json::Value = row.try_get("entities")?;
    let emotional_tones: serde_json::Value = row.try_get("emotional_tones")?;
    let key_topics: serde_json::Value = row.try_get("key_topics")?;

    Ok(SentimentRecord {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        topic: row.try_get("topic")?,
        overall_sentiment: SentimentLabel::parse(&overall)
            .ok_or_else(|| anyhow!("unknown sentiment label: {overall}"))?,
        sentiment_score: row.try_get("sentiment_score")?,
        confidence: row.try_get("confidence")?,
        entities: serde_json::from_value(entities)?,
        emotional_tones: serde_json::from_value(emotional_tones)?,
        key_topics: serde_json::from_value(key_topics)?,
    })
}

fn bias_from_row(row: &PgRow) -> Result<BiasRecord> {
    let tilt: String = row.try_get("coverage_tilt")?;
    let loaded_terms: serde_json::Value = row.try_get("loaded_terms")?;

    Ok(BiasRecord {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        topic: row.try_get("topic")?,
        bias_score: row.try_get("bias_score")?,
        coverage_tilt: CoverageTilt::parse(&tilt)
            .ok_or_else(|| anyhow!("unknown coverage tilt: {tilt}"))?,
        loaded_terms: serde_json::from_value(loaded_terms)?,
        reasoning: row.try_get("reasoning")?,
        confidence: row.try_get("confidence")?,
    })
}

fn claim_from_row(row: &PgRow) -> Result<Claim> {
    let claim_type: String = row.try_get("claim_type")?;

    Ok(Claim {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        topic: row.try_get("topic")?,
        claim_text: row.try_get("claim_text")?,
        claim_type: ClaimType::parse(&claim_type)
            .ok_or_else(|| anyhow!("unknown claim type: {claim_type}"))?,
        verifiability: row.try_get("verifiability")?,
        confidence: row.try_get("confidence")?,
        created_at: row.try_get("created_at")?,
    })
}
