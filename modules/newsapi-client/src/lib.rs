pub mod error;
pub mod types;

pub use error::{NewsApiError, Result};
pub use types::{ArticlesResponse, ProviderArticle, ProviderSource};

use std::time::Duration;

use chrono::{DateTime, Utc};

const BASE_URL: &str = "https://newsapi.org/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct NewsApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Query the `everything` endpoint: full-archive search, relevancy order.
    pub async fn everything(
        &self,
        query: &str,
        from: DateTime<Utc>,
        page_size: u32,
    ) -> Result<Vec<ProviderArticle>> {
        let url = format!("{}/everything", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("language", "en".to_string()),
            ("sortBy", "relevancy".to_string()),
            ("pageSize", page_size.to_string()),
            ("from", from.to_rfc3339()),
        ];
        let resp = self
            .client
            .get(&url)
            .query(&params)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        self.read_articles(resp).await
    }

    /// Query the `top-headlines` endpoint: a broader, curated result set.
    pub async fn top_headlines(&self, query: &str, page_size: u32) -> Result<Vec<ProviderArticle>> {
        let url = format!("{}/top-headlines", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("language", "en".to_string()),
            ("pageSize", page_size.to_string()),
        ];
        let resp = self
            .client
            .get(&url)
            .query(&params)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        self.read_articles(resp).await
    }

    async fn read_articles(&self, resp: reqwest::Response) -> Result<Vec<ProviderArticle>> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NewsApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let envelope: ArticlesResponse = resp.json().await?;
        if envelope.status != "ok" {
            return Err(NewsApiError::Provider {
                code: envelope.code.unwrap_or_else(|| "unknown".to_string()),
                message: envelope.message.unwrap_or_default(),
            });
        }

        tracing::debug!(
            total = envelope.total_results,
            returned = envelope.articles.len(),
            "NewsAPI response"
        );
        Ok(envelope.articles)
    }
}
