use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Envelope returned by both the `everything` and `top-headlines` endpoints.
/// On `status: "error"` the articles list is absent and `code`/`message`
/// describe the rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlesResponse {
    pub status: String,
    pub code: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "totalResults", default)]
    pub total_results: i64,
    #[serde(default)]
    pub articles: Vec<ProviderArticle>,
}

/// A single article row as the provider returns it. Everything is optional:
/// the provider fills gaps with nulls or the literal string "[Removed]".
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderArticle {
    pub source: ProviderSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSource {
    pub id: Option<String>,
    pub name: Option<String>,
}
