//! The Analysis Repository: a normalized store for analyzed documents and
//! their derived records.
//!
//! One trait, two implementations: [`PgStore`] (Postgres, the production
//! path) and [`MemoryStore`] (tests and offline runs — no database, no
//! Docker).

pub mod memory;
pub mod pg;
pub mod store;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use store::AnalysisStore;

use newslens_common::{BiasRecord, ClaimVerification, NewDocument, SentimentRecord};

/// Longest key-points list a document may carry.
pub const MAX_KEY_POINTS: usize = 8;

/// How many claim rows a topic read-back returns at most.
pub const CLAIM_READ_LIMIT: usize = 100;

/// Topics retained per location in the trending window.
pub const LOCATION_TREND_WINDOW: usize = 20;

// Range clamping lives at the persistence boundary: whatever the oracle (or
// a buggy caller) produced, no out-of-range value reaches a row.

pub(crate) fn clamp_document(doc: &mut NewDocument) {
    doc.sentiment_score = doc.sentiment_score.clamp(-1.0, 1.0);
    doc.credibility_score = doc.credibility_score.clamp(0, 100);
    doc.bias_score = doc.bias_score.clamp(-100, 100);
    doc.key_points.truncate(MAX_KEY_POINTS);
}

pub(crate) fn clamp_sentiment(rec: &mut SentimentRecord) {
    rec.sentiment_score = rec.sentiment_score.clamp(-1.0, 1.0);
    rec.confidence = rec.confidence.clamp(0, 100);
}

pub(crate) fn clamp_bias(rec: &mut BiasRecord) {
    rec.bias_score = rec.bias_score.clamp(-100, 100);
    rec.confidence = rec.confidence.clamp(0, 100);
}

pub(crate) fn clamp_verification(rec: &mut ClaimVerification) {
    rec.accuracy_score = rec.accuracy_score.clamp(0, 100);
    rec.confidence = rec.confidence.clamp(0, 100);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newslens_common::{CoverageTilt, Perspective, SentimentLabel, Verdict};
    use uuid::Uuid;

    fn sample_new_document() -> NewDocument {
        NewDocument {
            topic: "solar power".into(),
            title: "Solar surge".into(),
            url: "https://example.com/solar".into(),
            source_name: "Example Wire".into(),
            description: "desc".into(),
            published_at: Utc::now(),
            perspective: Perspective::Support,
            stance_label: "Advocates for solar power".into(),
            sentiment_label: SentimentLabel::Positive,
            sentiment_score: 4.2,
            summary: "sum".into(),
            key_points: (0..12).map(|i| format!("point {i}")).collect(),
            credibility_score: 180,
            bias_score: -400,
            image_url: None,
            author: None,
            location: None,
        }
    }

    #[test]
    fn document_scores_clamp_to_documented_ranges() {
        let mut doc = sample_new_document();
        clamp_document(&mut doc);
        assert_eq!(doc.sentiment_score, 1.0);
        assert_eq!(doc.credibility_score, 100);
        assert_eq!(doc.bias_score, -100);
        assert_eq!(doc.key_points.len(), MAX_KEY_POINTS);
    }

    #[test]
    fn verification_scores_clamp() {
        let mut rec = ClaimVerification {
            id: Uuid::new_v4(),
            claim_id: Uuid::new_v4(),
            topic: "solar power".into(),
            accuracy_score: -5,
            verdict: Verdict::Unverified,
            evidence: vec![],
            reasoning: "r".into(),
            confidence: 300,
        };
        clamp_verification(&mut rec);
        assert_eq!(rec.accuracy_score, 0);
        assert_eq!(rec.confidence, 100);
    }

    #[test]
    fn bias_record_clamps_both_ends() {
        let mut rec = BiasRecord {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            topic: "solar power".into(),
            bias_score: 999,
            coverage_tilt: CoverageTilt::Center,
            loaded_terms: vec![],
            reasoning: "r".into(),
            confidence: -1,
        };
        clamp_bias(&mut rec);
        assert_eq!(rec.bias_score, 100);
        assert_eq!(rec.confidence, 0);
    }
}
