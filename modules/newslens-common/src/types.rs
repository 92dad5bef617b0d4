use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Which side of a topic's argumentative divide a document falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    Support,
    Oppose,
    Neutral,
}

impl std::fmt::Display for Perspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Perspective::Support => write!(f, "support"),
            Perspective::Oppose => write!(f, "oppose"),
            Perspective::Neutral => write!(f, "neutral"),
        }
    }
}

impl Perspective {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "support" => Some(Perspective::Support),
            "oppose" => Some(Perspective::Oppose),
            "neutral" => Some(Perspective::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
            SentimentLabel::Mixed => write!(f, "mixed"),
        }
    }
}

impl SentimentLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            "mixed" => Some(SentimentLabel::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Factual,
    Opinion,
    Prediction,
    Statistic,
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimType::Factual => write!(f, "factual"),
            ClaimType::Opinion => write!(f, "opinion"),
            ClaimType::Prediction => write!(f, "prediction"),
            ClaimType::Statistic => write!(f, "statistic"),
        }
    }
}

impl ClaimType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "factual" => Some(ClaimType::Factual),
            "opinion" => Some(ClaimType::Opinion),
            "prediction" => Some(ClaimType::Prediction),
            "statistic" => Some(ClaimType::Statistic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    PartiallyVerified,
    Unverified,
    Misleading,
    False,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Verified => write!(f, "verified"),
            Verdict::PartiallyVerified => write!(f, "partially_verified"),
            Verdict::Unverified => write!(f, "unverified"),
            Verdict::Misleading => write!(f, "misleading"),
            Verdict::False => write!(f, "false"),
        }
    }
}

impl Verdict {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verified" => Some(Verdict::Verified),
            "partially_verified" => Some(Verdict::PartiallyVerified),
            "unverified" => Some(Verdict::Unverified),
            "misleading" => Some(Verdict::Misleading),
            "false" => Some(Verdict::False),
            _ => None,
        }
    }

    /// Initial automated verdict, derived purely from a claim's verifiability.
    /// Misleading/False require an evidence-backed pass and are never produced here.
    pub fn from_verifiability(verifiability: i32) -> Self {
        if verifiability > 70 {
            Verdict::Verified
        } else if verifiability > 40 {
            Verdict::PartiallyVerified
        } else {
            Verdict::Unverified
        }
    }
}

/// Rhetorical lean of a document's coverage. Independent of [`Perspective`]:
/// a supportive article can still read heavily tilted, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoverageTilt {
    HeavilyLeft,
    Left,
    CenterLeft,
    Center,
    CenterRight,
    Right,
    HeavilyRight,
}

impl std::fmt::Display for CoverageTilt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverageTilt::HeavilyLeft => write!(f, "heavily_left"),
            CoverageTilt::Left => write!(f, "left"),
            CoverageTilt::CenterLeft => write!(f, "center_left"),
            CoverageTilt::Center => write!(f, "center"),
            CoverageTilt::CenterRight => write!(f, "center_right"),
            CoverageTilt::Right => write!(f, "right"),
            CoverageTilt::HeavilyRight => write!(f, "heavily_right"),
        }
    }
}

impl CoverageTilt {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "heavily_left" => Some(CoverageTilt::HeavilyLeft),
            "left" => Some(CoverageTilt::Left),
            "center_left" => Some(CoverageTilt::CenterLeft),
            "center" => Some(CoverageTilt::Center),
            "center_right" => Some(CoverageTilt::CenterRight),
            "right" => Some(CoverageTilt::Right),
            "heavily_right" => Some(CoverageTilt::HeavilyRight),
            _ => None,
        }
    }

    /// Bucket a bias score (−100..100) into the 7-point ordinal scale.
    pub fn from_bias_score(score: i32) -> Self {
        match score {
            s if s <= -60 => CoverageTilt::HeavilyLeft,
            s if s <= -30 => CoverageTilt::Left,
            s if s <= -10 => CoverageTilt::CenterLeft,
            s if s <= 10 => CoverageTilt::Center,
            s if s <= 30 => CoverageTilt::CenterRight,
            s if s <= 60 => CoverageTilt::Right,
            _ => CoverageTilt::HeavilyRight,
        }
    }
}

/// Where a classification result came from: the oracle, or the local
/// deterministic fallback. Carried on results so callers can tell degraded
/// output from the real thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Oracle,
    Heuristic,
}

// --- Raw (pre-classification) documents ---

/// A candidate document as returned by the source adapter, before any
/// classification has happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub author: Option<String>,
}

// --- Classification results ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntitySentiment {
    pub name: String,
    pub entity_type: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadedTerm {
    pub term: String,
    pub context: String,
    pub bias_type: String,
    pub frequency: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub coverage_tilt: CoverageTilt,
    pub loaded_terms: Vec<LoadedTerm>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub text: String,
    pub claim_type: ClaimType,
    pub verifiability: i32,
    pub confidence: i32,
}

/// One fully structured classification judgment for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub perspective: Perspective,
    pub stance_label: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f32,
    pub summary: String,
    pub key_points: Vec<String>,
    pub credibility_score: i32,
    pub bias_score: i32,
    pub entities: Vec<EntitySentiment>,
    pub emotional_tones: Vec<String>,
    pub claims: Vec<ExtractedClaim>,
    pub bias_analysis: BiasAnalysis,
    pub provenance: Provenance,
}

// --- Persisted entities ---

/// Input for a document upsert. Identity is the URL; `id` and `updated_at`
/// are owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub topic: String,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub perspective: Perspective,
    pub stance_label: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f32,
    pub summary: String,
    pub key_points: Vec<String>,
    pub credibility_score: i32,
    pub bias_score: i32,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub location: Option<String>,
}

/// The analyzed news item as persisted. Never deleted; re-classification
/// overwrites in place keyed on URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub topic: String,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub perspective: Perspective,
    pub stance_label: String,
    pub sentiment_label: SentimentLabel,
    pub sentiment_score: f32,
    pub summary: String,
    pub key_points: Vec<String>,
    pub credibility_score: i32,
    pub bias_score: i32,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One-to-one with a Document, overwritten on every re-classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub id: Uuid,
    pub document_id: Uuid,
    pub topic: String,
    pub overall_sentiment: SentimentLabel,
    pub sentiment_score: f32,
    pub confidence: i32,
    pub entities: Vec<EntitySentiment>,
    pub emotional_tones: Vec<String>,
    pub key_topics: Vec<String>,
}

/// One-to-one with a Document, overwritten on every re-classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasRecord {
    pub id: Uuid,
    pub document_id: Uuid,
    pub topic: String,
    pub bias_score: i32,
    pub coverage_tilt: CoverageTilt,
    pub loaded_terms: Vec<LoadedTerm>,
    pub reasoning: String,
    pub confidence: i32,
}

/// Many-to-one with a Document. Identity is (document_id, claim_text) so a
/// re-classification with stable claim text does not duplicate rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub document_id: Uuid,
    pub topic: String,
    pub claim_text: String,
    pub claim_type: ClaimType,
    pub verifiability: i32,
    pub confidence: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    pub url: String,
    pub snippet: String,
    pub credibility: i32,
}

/// One-to-one with a Claim; derived right after the claim is upserted and
/// never exists without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub topic: String,
    pub accuracy_score: i32,
    pub verdict: Verdict,
    pub evidence: Vec<Evidence>,
    pub reasoning: String,
    pub confidence: i32,
}

// --- Trending side records ---

/// Per-topic search tally. Written by the pipeline on refresh, read only by
/// the trending feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistory {
    pub topic: String,
    pub search_count: i64,
    pub last_searched_at: DateTime<Utc>,
    pub locations: Vec<String>,
}

/// One topic's tally within a location's trending window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTopic {
    pub location: String,
    pub topic: String,
    pub count: i64,
    pub last_seen: DateTime<Utc>,
}

/// Feed headline card for a topic, derived from the topic's persisted
/// documents after a refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSummary {
    pub topic: String,
    pub headline: String,
    pub summary: String,
    pub perspective_count: i32,
    pub perspectives: Vec<String>,
    pub source_count: i32,
    pub trending_score: i32,
    pub location: String,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_thresholds() {
        assert_eq!(Verdict::from_verifiability(71), Verdict::Verified);
        assert_eq!(Verdict::from_verifiability(70), Verdict::PartiallyVerified);
        assert_eq!(Verdict::from_verifiability(41), Verdict::PartiallyVerified);
        assert_eq!(Verdict::from_verifiability(40), Verdict::Unverified);
        assert_eq!(Verdict::from_verifiability(0), Verdict::Unverified);
    }

    #[test]
    fn tilt_buckets_cover_the_whole_score_range() {
        assert_eq!(CoverageTilt::from_bias_score(-100), CoverageTilt::HeavilyLeft);
        assert_eq!(CoverageTilt::from_bias_score(-60), CoverageTilt::HeavilyLeft);
        assert_eq!(CoverageTilt::from_bias_score(-59), CoverageTilt::Left);
        assert_eq!(CoverageTilt::from_bias_score(-10), CoverageTilt::CenterLeft);
        assert_eq!(CoverageTilt::from_bias_score(0), CoverageTilt::Center);
        assert_eq!(CoverageTilt::from_bias_score(30), CoverageTilt::CenterRight);
        assert_eq!(CoverageTilt::from_bias_score(31), CoverageTilt::Right);
        assert_eq!(CoverageTilt::from_bias_score(61), CoverageTilt::HeavilyRight);
    }

    #[test]
    fn enum_round_trips_through_labels() {
        for p in [Perspective::Support, Perspective::Oppose, Perspective::Neutral] {
            assert_eq!(Perspective::parse(&p.to_string()), Some(p));
        }
        for v in [
            Verdict::Verified,
            Verdict::PartiallyVerified,
            Verdict::Unverified,
            Verdict::Misleading,
            Verdict::False,
        ] {
            assert_eq!(Verdict::parse(&v.to_string()), Some(v));
        }
        assert_eq!(Perspective::parse("unknown"), None);
    }
}
