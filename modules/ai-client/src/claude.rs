//! Minimal Anthropic Messages client. One job: send a prompt with a forced
//! tool definition and deserialize the tool input as the caller's type.

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::StructuredOutput;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Wire types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    User,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: Role,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ToolDefinitionWire {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinitionWire>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[allow(dead_code)]
        id: String,
        #[allow(dead_code)]
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

impl ChatResponse {
    fn text(&self) -> Option<String> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            _ => None,
        })
    }

    fn tool_input(&self) -> Option<&serde_json::Value> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { input, .. } => Some(input),
            _ => None,
        })
    }
}

// --- Client ---

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!(model = %request.model, "Anthropic chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Anthropic API error ({}): {}", status, error_text));
        }

        Ok(response.json().await?)
    }

    /// Extract a `T` by forcing a tool call whose input schema is `T`'s.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let tool_name = "structured_response";
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 8192,
            messages: vec![WireMessage {
                role: Role::User,
                content: user_prompt.into(),
            }],
            system: Some(system_prompt.into()),
            temperature: Some(0.0),
            tools: Some(vec![ToolDefinitionWire {
                name: tool_name.to_string(),
                description: "Report the structured analysis of the input.".to_string(),
                input_schema: T::tool_schema(),
            }]),
            tool_choice: Some(serde_json::json!({
                "type": "tool",
                "name": tool_name,
            })),
        };

        let response = self.chat(&request).await?;

        match response.tool_input() {
            Some(input) => serde_json::from_value(input.clone())
                .map_err(|e| anyhow!("Failed to deserialize structured response: {}", e)),
            None => Err(anyhow!("No structured output in model response")),
        }
    }

    /// Plain text completion, for callers that want prose rather than a schema.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages: vec![WireMessage {
                role: Role::User,
                content: user.into(),
            }],
            system: Some(system.into()),
            temperature: Some(0.0),
            tools: None,
            tool_choice: None,
        };

        let response = self.chat(&request).await?;
        response.text().ok_or_else(|| anyhow!("No text in model response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_keeps_model_and_key() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001");
        assert_eq!(ai.model(), "claude-haiku-4-5-20251001");
        assert_eq!(ai.api_key, "sk-ant-test");
    }

    #[test]
    fn base_url_override() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001")
            .with_base_url("https://custom.api.example");
        assert_eq!(ai.base_url, "https://custom.api.example");
    }
}
