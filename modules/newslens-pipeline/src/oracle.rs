//! Classification oracle client.
//!
//! One structured-extraction request per batch. The wire types are
//! deliberately loose (string-typed labels): the model's output is decoded
//! against the schema and then mapped into domain enums, and any entry that
//! fails that mapping falls back to the deterministic heuristic, so the
//! pipeline always gets one result per document.

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ai_client::Claude;
use newslens_common::{
    BiasAnalysis, ClaimType, ClassificationResult, CoverageTilt, EntitySentiment, ExtractedClaim,
    LoadedTerm, Perspective, Provenance, RawDocument, SentimentLabel,
};

use crate::heuristic::HeuristicClassifier;

const CLASSIFIER_MODEL: &str = "claude-haiku-4-5-20251001";

/// Upper bound on documents sent to the oracle in one request. Overflow is
/// silently dropped in provider relevance order — a precision/cost
/// trade-off, not an oversight.
pub const DEFAULT_BATCH_CAP: usize = 20;

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Classifies a batch of documents against a topic.
///
/// Infallible by contract: implementations return one result per retained
/// input document, in input order, degrading internally rather than
/// erroring. When the input exceeds the implementation's batch cap, only
/// the first `cap` documents get results.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, topic: &str, docs: &[RawDocument]) -> Vec<ClassificationResult>;
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    async fn classify(&self, topic: &str, docs: &[RawDocument]) -> Vec<ClassificationResult> {
        HeuristicClassifier::classify_batch(topic, docs)
    }
}

// --- Wire types: what the model is asked to produce ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireEntity {
    pub name: String,
    /// Entity kind: "person", "organization", "location", or "topic"
    pub entity_type: String,
    /// "positive", "negative", or "neutral"
    pub sentiment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireClaim {
    pub text: String,
    /// "factual", "opinion", "prediction", or "statistic"
    pub claim_type: String,
    /// How checkable the claim is, 0-100
    pub verifiability: i32,
    /// Extraction confidence, 0-100
    pub confidence: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireLoadedTerm {
    pub term: String,
    pub context: String,
    /// The direction the loaded language pushes: "positive", "negative", or a named frame
    pub bias_type: String,
    /// Occurrences in the document
    #[serde(default)]
    pub frequency: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireBiasAnalysis {
    /// One of: "heavily_left", "left", "center_left", "center",
    /// "center_right", "right", "heavily_right"
    pub coverage_tilt: String,
    #[serde(default)]
    pub loaded_terms: Vec<WireLoadedTerm>,
    pub reasoning: String,
}

/// One judgment per document, in input order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireClassification {
    /// "support", "oppose", or "neutral"
    pub perspective: String,
    /// Short free-text stance description
    pub stance: String,
    /// "positive", "negative", "neutral", or "mixed"
    pub sentiment: String,
    /// Overall sentiment, -1.0 to 1.0
    pub sentiment_score: f32,
    pub summary: String,
    pub key_points: Vec<String>,
    /// Source credibility, 0-100
    pub credibility_score: i32,
    /// Rhetorical bias, -100 (left) to 100 (right)
    pub bias_score: i32,
    #[serde(default)]
    pub entities: Vec<WireEntity>,
    #[serde(default)]
    pub emotional_tones: Vec<String>,
    #[serde(default)]
    pub claims: Vec<WireClaim>,
    pub bias_analysis: WireBiasAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationBatch {
    #[serde(default)]
    pub results: Vec<WireClassification>,
}

const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are a news perspective analyst.

You receive a topic and a numbered batch of news articles about it. For EVERY article, in the same order, produce one structured judgment:

- **perspective**: which side of the topic's natural argumentative divide the article lands on. "support" if it advocates, defends, or presents the topic favorably; "oppose" if it criticizes, warns, or presents it unfavorably; "neutral" for balanced or purely descriptive coverage.
- **stance**: one short sentence naming the article's position ("Advocates for stricter limits", "Critical of the rollout").
- **sentiment / sentiment_score**: overall emotional valence of the article's language toward the topic, score in -1.0..1.0. Use "mixed" when both strong positive and negative language appear.
- **summary**: 2-3 sentences, faithful to the article, no editorializing.
- **key_points**: up to 5 short bullet points.
- **credibility_score**: 0-100, from sourcing quality, attribution, and specificity. Wire services and named primary sources score high; anonymous aggregation scores low.
- **bias_score / bias_analysis**: rhetorical lean of the coverage, independent of perspective. -100 to 100. coverage_tilt buckets the same lean into seven ordinal labels. List loaded or emotionally charged terms with the sentence fragment they appear in.
- **entities**: named people, organizations, and places with the sentiment the article attaches to each.
- **claims**: concrete checkable assertions the article makes. Classify each as factual, opinion, prediction, or statistic, with verifiability 0-100 (could a fact-checker settle this?) and your extraction confidence 0-100.

Return exactly one result per article, in input order. Never skip an article."#;

fn build_user_prompt(topic: &str, docs: &[RawDocument]) -> String {
    let mut prompt = format!(
        "Topic: {topic}\n\nAnalyze each of the {} articles below.\n",
        docs.len()
    );
    for (i, doc) in docs.iter().enumerate() {
        prompt.push_str(&format!(
            "\n--- Article {} ---\nTitle: {}\nSource: {}\nPublished: {}\nURL: {}\n{}\n",
            i + 1,
            doc.title,
            doc.source_name,
            doc.published_at.to_rfc3339(),
            doc.url,
            doc.description,
        ));
    }
    prompt
}

// --- Oracle classifier ---

pub struct OracleClassifier {
    claude: Option<Claude>,
    timeout: Duration,
    batch_cap: usize,
}

impl OracleClassifier {
    /// An empty API key is a valid configuration: every batch then takes the
    /// heuristic path.
    pub fn new(anthropic_api_key: &str) -> Self {
        let claude = if anthropic_api_key.is_empty() {
            None
        } else {
            Some(Claude::new(anthropic_api_key, CLASSIFIER_MODEL))
        };
        Self {
            claude,
            timeout: DEFAULT_ORACLE_TIMEOUT,
            batch_cap: DEFAULT_BATCH_CAP,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_batch_cap(mut self, cap: usize) -> Self {
        self.batch_cap = cap.max(1);
        self
    }

    async fn classify_with_oracle(
        &self,
        claude: &Claude,
        topic: &str,
        batch: &[RawDocument],
    ) -> Vec<ClassificationResult> {
        let user_prompt = build_user_prompt(topic, batch);

        let outcome = tokio::time::timeout(
            self.timeout,
            claude.extract::<ClassificationBatch>(CLASSIFICATION_SYSTEM_PROMPT, &user_prompt),
        )
        .await;

        let wire_results = match outcome {
            Err(_) => {
                warn!(
                    topic,
                    timeout_secs = self.timeout.as_secs(),
                    "Oracle call timed out, falling back to heuristic classification"
                );
                return HeuristicClassifier::classify_batch(topic, batch);
            }
            Ok(Err(e)) => {
                warn!(topic, error = %e, "Oracle call failed, falling back to heuristic classification");
                return HeuristicClassifier::classify_batch(topic, batch);
            }
            Ok(Ok(batch_response)) => batch_response.results,
        };

        // Length-match: map each wire entry that validates, pad everything
        // else (missing tail, unparseable labels) with the heuristic.
        batch
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                match wire_results.get(index).and_then(|w| to_domain(w, doc)) {
                    Some(result) => result,
                    None => {
                        warn!(
                            url = doc.url.as_str(),
                            index, "Oracle entry missing or invalid, padding with heuristic"
                        );
                        HeuristicClassifier::classify_one(topic, doc, index)
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl Classifier for OracleClassifier {
    async fn classify(&self, topic: &str, docs: &[RawDocument]) -> Vec<ClassificationResult> {
        let batch = &docs[..docs.len().min(self.batch_cap)];
        if batch.len() < docs.len() {
            info!(
                capped = batch.len(),
                dropped = docs.len() - batch.len(),
                "Batch exceeds oracle cap, dropping lowest-relevance documents"
            );
        }
        if batch.is_empty() {
            return Vec::new();
        }

        match &self.claude {
            None => {
                warn!(topic, "Oracle not configured, using heuristic classification");
                HeuristicClassifier::classify_batch(topic, batch)
            }
            Some(claude) => self.classify_with_oracle(claude, topic, batch).await,
        }
    }
}

/// Map a wire entry into a domain result. `None` means the entry failed
/// validation and the caller should substitute the heuristic.
fn to_domain(wire: &WireClassification, doc: &RawDocument) -> Option<ClassificationResult> {
    let perspective = Perspective::parse(&wire.perspective)?;
    let sentiment_label = SentimentLabel::parse(&wire.sentiment)?;

    // Secondary labels degrade softly instead of sinking the whole entry.
    let coverage_tilt = CoverageTilt::parse(&wire.bias_analysis.coverage_tilt)
        .unwrap_or_else(|| CoverageTilt::from_bias_score(wire.bias_score));

    let claims = wire
        .claims
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| ExtractedClaim {
            text: c.text.clone(),
            claim_type: ClaimType::parse(&c.claim_type).unwrap_or(ClaimType::Opinion),
            verifiability: c.verifiability,
            confidence: c.confidence,
        })
        .collect();

    let entities = wire
        .entities
        .iter()
        .map(|e| EntitySentiment {
            name: e.name.clone(),
            entity_type: e.entity_type.clone(),
            sentiment: e.sentiment.clone(),
        })
        .collect();

    let loaded_terms = wire
        .bias_analysis
        .loaded_terms
        .iter()
        .map(|t| LoadedTerm {
            term: t.term.clone(),
            context: t.context.clone(),
            bias_type: t.bias_type.clone(),
            frequency: t.frequency.unwrap_or(1).max(1),
        })
        .collect();

    let summary = if wire.summary.trim().is_empty() {
        doc.description.clone()
    } else {
        wire.summary.clone()
    };

    Some(ClassificationResult {
        perspective,
        stance_label: wire.stance.clone(),
        sentiment_label,
        sentiment_score: wire.sentiment_score,
        summary,
        key_points: wire.key_points.clone(),
        credibility_score: wire.credibility_score,
        bias_score: wire.bias_score,
        entities,
        emotional_tones: wire.emotional_tones.clone(),
        claims,
        bias_analysis: BiasAnalysis {
            coverage_tilt,
            loaded_terms,
            reasoning: wire.bias_analysis.reasoning.clone(),
        },
        provenance: Provenance::Oracle,
    })
}
