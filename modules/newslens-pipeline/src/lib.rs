//! The topic analysis pipeline: fetch candidate documents for a topic,
//! classify each into an argumentative perspective, persist the analysis,
//! and re-assemble it into perspective-grouped responses.

pub mod aggregate;
pub mod analyzer;
pub mod heuristic;
pub mod oracle;
pub mod source;

pub use aggregate::{aggregate, Aggregate, Distribution, PerspectiveGroups};
pub use analyzer::{AnalysisRequest, AnalyzerConfig, TopicAnalysis, TopicAnalyzer};
pub use heuristic::HeuristicClassifier;
pub use oracle::{Classifier, OracleClassifier};
pub use source::{DocumentSource, NewsApiSource};
