// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Anthropic Messages API gateway.
//!
//! Every outbound model call goes through [`LlmGateway`]. Provider failures
//! are logged in full here and surfaced to callers only as
//! [`AppError::AiRequestFailed`]. There is no timeout or retry at this layer;
//! callers race their own timers where they need one.

use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/jpeg";
/// Longest provider error body kept in logs.
const MAX_LOGGED_BODY: usize = 500;

/// Models the gateway knows prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaudeModel {
    Sonnet,
    Haiku,
    Opus,
}

impl ClaudeModel {
    /// Provider model identifier.
    pub fn api_id(&self) -> &'static str {
        match self {
            ClaudeModel::Sonnet => "claude-sonnet-4-20250514",
            ClaudeModel::Haiku => "claude-3-5-haiku-20241022",
            ClaudeModel::Opus => "claude-opus-4-20250514",
        }
    }

    /// USD per million (input, output) tokens.
    pub fn price_per_million(&self) -> (f64, f64) {
        match self {
            ClaudeModel::Sonnet => (3.0, 15.0),
            ClaudeModel::Haiku => (0.8, 4.0),
            ClaudeModel::Opus => (15.0, 75.0),
        }
    }
}

/// Rough token count: one token per four characters, rounded up.
///
/// Only for usage accounting; never truncate on this.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Estimated USD cost of a call from the static price table.
pub fn estimate_cost(input_tokens: u64, output_tokens: u64, model: ClaudeModel) -> f64 {
    let (input_rate, output_rate) = model.price_per_million();
    (input_tokens as f64 / 1_000_000.0) * input_rate
        + (output_tokens as f64 / 1_000_000.0) * output_rate
}

/// Outbound chat-completion calls.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Text-only prompt; returns the first text block of the reply.
    async fn send_message(
        &self,
        prompt: &str,
        model: ClaudeModel,
        max_tokens: u32,
    ) -> Result<String, AppError>;

    /// Prompt with images attached ahead of the text in a single user turn.
    /// Fails as a whole if any image cannot be fetched.
    async fn send_message_with_images(
        &self,
        prompt: &str,
        image_urls: &[String],
        model: ClaudeModel,
        max_tokens: u32,
    ) -> Result<String, AppError>;
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

/// Anthropic API client.
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    /// Create a new client against `base_url` (normally `https://api.anthropic.com`).
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Fetch an image and encode it as a base64 image block source.
    async fn fetch_image(&self, url: &str) -> Result<ImageSource, AppError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::error!(url, error = %e, "Image fetch failed");
            AppError::AiRequestFailed
        })?;

        if !response.status().is_success() {
            tracing::error!(url, status = %response.status(), "Image fetch returned error status");
            return Err(AppError::AiRequestFailed);
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_IMAGE_MEDIA_TYPE.to_string());

        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!(url, error = %e, "Image body read failed");
            AppError::AiRequestFailed
        })?;

        Ok(ImageSource {
            kind: "base64",
            media_type,
            data: STANDARD.encode(&bytes),
        })
    }

    /// POST a Messages request and pull out the first text block.
    async fn create_message(
        &self,
        content: Vec<ContentBlock<'_>>,
        model: ClaudeModel,
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let request = MessagesRequest {
            model: model.api_id(),
            max_tokens,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Anthropic request failed");
                AppError::AiRequestFailed
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_LOGGED_BODY).collect();
            tracing::error!(%status, body = %body, "Anthropic API returned error status");
            return Err(AppError::AiRequestFailed);
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Anthropic response JSON parse error");
            AppError::AiRequestFailed
        })?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| {
                tracing::error!("Anthropic response contained no text block");
                AppError::AiRequestFailed
            })
    }
}

#[async_trait]
impl LlmGateway for AnthropicClient {
    async fn send_message(
        &self,
        prompt: &str,
        model: ClaudeModel,
        max_tokens: u32,
    ) -> Result<String, AppError> {
        tracing::debug!(
            model = model.api_id(),
            max_tokens,
            prompt_tokens = estimate_tokens(prompt),
            "Sending text prompt"
        );
        self.create_message(vec![ContentBlock::Text { text: prompt }], model, max_tokens)
            .await
    }

    async fn send_message_with_images(
        &self,
        prompt: &str,
        image_urls: &[String],
        model: ClaudeModel,
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let mut content = Vec::with_capacity(image_urls.len() + 1);
        for url in image_urls {
            let source = self.fetch_image(url).await?;
            content.push(ContentBlock::Image { source });
        }
        content.push(ContentBlock::Text { text: prompt });

        tracing::debug!(
            model = model.api_id(),
            max_tokens,
            images = image_urls.len(),
            "Sending image prompt"
        );
        self.create_message(content, model, max_tokens).await
    }
}
