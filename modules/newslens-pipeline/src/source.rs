//! Document source adapter.
//!
//! Fetches candidate documents for a topic from the news provider. Never
//! returns a transport error to the caller: any failure degrades to an
//! empty list, which the orchestrator treats as "no update possible,
//! retain prior data".

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use newsapi_client::{NewsApiClient, ProviderArticle};
use newslens_common::RawDocument;

/// How far back the primary query reaches.
const FRESH_WINDOW_DAYS: i64 = 7;

const EVERYTHING_PAGE_SIZE: u32 = 30;
const HEADLINES_PAGE_SIZE: u32 = 20;

/// The provider marks redacted fields with this literal.
const REMOVED_MARKER: &str = "[Removed]";

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch candidate documents for a topic, deduplicated by URL.
    /// Empty on any failure — this call does not error.
    async fn fetch(&self, topic: &str, location: Option<&str>) -> Vec<RawDocument>;
}

pub struct NewsApiSource {
    client: Option<NewsApiClient>,
}

impl NewsApiSource {
    /// An empty API key is a valid configuration: every fetch then returns
    /// an empty list.
    pub fn new(api_key: &str) -> Self {
        let client = if api_key.is_empty() {
            None
        } else {
            Some(NewsApiClient::new(api_key.to_string()))
        };
        Self { client }
    }
}

#[async_trait]
impl DocumentSource for NewsApiSource {
    async fn fetch(&self, topic: &str, _location: Option<&str>) -> Vec<RawDocument> {
        let Some(client) = &self.client else {
            warn!(topic, "News provider not configured, fetching nothing");
            return Vec::new();
        };

        // Primary strategy: full-archive search over the fresh window.
        let from = Utc::now() - Duration::days(FRESH_WINDOW_DAYS);
        let articles = match client.everything(topic, from, EVERYTHING_PAGE_SIZE).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(topic, error = %e, "Provider `everything` query failed");
                Vec::new()
            }
        };

        let mut docs = normalize(articles);

        // Broader fallback before giving up.
        if docs.is_empty() {
            info!(topic, "No results from `everything`, trying top headlines");
            match client.top_headlines(topic, HEADLINES_PAGE_SIZE).await {
                Ok(articles) => docs = normalize(articles),
                Err(e) => {
                    warn!(topic, error = %e, "Provider `top-headlines` query failed");
                }
            }
        }

        info!(topic, count = docs.len(), "Fetched candidate documents");
        docs
    }
}

/// Filter out unusable rows, map into RawDocument, dedup by URL preserving
/// provider relevance order.
fn normalize(articles: Vec<ProviderArticle>) -> Vec<RawDocument> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter_map(to_raw)
        .filter(|doc| seen.insert(doc.url.clone()))
        .collect()
}

fn to_raw(article: ProviderArticle) -> Option<RawDocument> {
    let title = article.title?;
    let url = article.url?;
    if title == REMOVED_MARKER || url.is_empty() {
        return None;
    }
    if article.description.as_deref() == Some(REMOVED_MARKER) {
        return None;
    }

    let description = article
        .description
        .or(article.content)
        .unwrap_or_default();

    Some(RawDocument {
        title,
        url,
        source_name: article
            .source
            .name
            .unwrap_or_else(|| "Unknown".to_string()),
        description,
        published_at: article.published_at.unwrap_or_else(Utc::now),
        image_url: article.url_to_image,
        author: article.author,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsapi_client::ProviderSource;

    fn provider_article(title: Option<&str>, url: Option<&str>) -> ProviderArticle {
        ProviderArticle {
            source: ProviderSource {
                id: None,
                name: Some("Example Wire".into()),
            },
            author: Some("A. Reporter".into()),
            title: title.map(Into::into),
            description: Some("description".into()),
            url: url.map(Into::into),
            url_to_image: None,
            published_at: Some(Utc::now()),
            content: Some("full content".into()),
        }
    }

    #[test]
    fn rows_without_title_or_url_are_dropped() {
        assert!(to_raw(provider_article(None, Some("https://example.com/a"))).is_none());
        assert!(to_raw(provider_article(Some("t"), None)).is_none());
        assert!(to_raw(provider_article(Some("[Removed]"), Some("https://example.com/a"))).is_none());
    }

    #[test]
    fn content_backfills_a_missing_description() {
        let mut article = provider_article(Some("t"), Some("https://example.com/a"));
        article.description = None;
        let doc = to_raw(article).unwrap();
        assert_eq!(doc.description, "full content");
    }

    #[test]
    fn normalize_dedups_by_url_keeping_first() {
        let a = provider_article(Some("first"), Some("https://example.com/a"));
        let b = provider_article(Some("dup"), Some("https://example.com/a"));
        let c = provider_article(Some("other"), Some("https://example.com/b"));
        let docs = normalize(vec![a, b, c]);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "first");
    }

    #[tokio::test]
    async fn unconfigured_source_fetches_nothing() {
        let source = NewsApiSource::new("");
        let docs = source.fetch("solar power", None).await;
        assert!(docs.is_empty());
    }
}
