// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vision analysis of closet photos.

use crate::db::StyleStore;
use crate::error::{AppError, Result};
use crate::models::{AiTags, ClosetCategory, ClosetItem};
use crate::services::llm::{estimate_tokens, ClaudeModel, LlmGateway};
use crate::services::outfit_mapping::strip_code_fences;
use crate::services::prompts::build_closet_analysis_prompt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How long the caller waits for the vision model.
pub const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ANALYSIS_TOKENS: u32 = 1024;

/// Tags the model assigned to one photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosetAnalysis {
    /// `None` when the model named a category we do not store
    pub category: Option<ClosetCategory>,
    pub ai_tags: AiTags,
}

/// Outcome of an analysis request, with token estimates for the ledger.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub analysis: ClosetAnalysis,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Raw reply; every key is optional and strings may stand in for lists.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAnalysis {
    category: Option<String>,
    subcategory: Option<String>,
    color: OneOrMany,
    style: OneOrMany,
    pattern: Option<String>,
    occasion: OneOrMany,
    season: OneOrMany,
    key_features: OneOrMany,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    #[default]
    None,
    One(String),
    Many(Vec<Value>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(values) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        }
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
    }
}

/// Reject image URLs outside the allowed storage hosts.
pub fn validate_image_url(raw: &str, allowed_hosts: &[String]) -> Result<reqwest::Url> {
    let invalid = |message: &str| AppError::InvalidField {
        field: "imageUrl",
        message: message.to_string(),
    };

    let url = reqwest::Url::parse(raw).map_err(|_| invalid("must be a valid URL"))?;
    if url.scheme() != "https" {
        return Err(invalid("must use https"));
    }
    let host = url.host_str().ok_or_else(|| invalid("must include a host"))?;
    if !allowed_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host)) {
        tracing::warn!(host, "Rejected image URL host");
        return Err(invalid("host is not an allowed image source"));
    }
    Ok(url)
}

/// Parse the model's JSON object reply.
pub fn parse_analysis(text: &str) -> Result<ClosetAnalysis> {
    let cleaned = strip_code_fences(text);
    let raw: RawAnalysis = serde_json::from_str(&cleaned).map_err(|e| {
        let excerpt: String = cleaned.chars().take(300).collect();
        tracing::error!(error = %e, excerpt = %excerpt, "Closet analysis reply is not valid JSON");
        AppError::AiResponseParse(format!("invalid JSON: {}", e))
    })?;

    Ok(ClosetAnalysis {
        category: raw.category.as_deref().and_then(ClosetCategory::parse),
        ai_tags: AiTags {
            subcategory: raw.subcategory.filter(|s| !s.trim().is_empty()),
            colors: raw.color.into_vec(),
            style: raw.style.into_vec(),
            pattern: raw.pattern.filter(|s| !s.trim().is_empty()),
            occasions: raw.occasion.into_vec(),
            seasons: raw.season.into_vec(),
            key_features: raw.key_features.into_vec(),
        },
    })
}

/// Runs photo analysis against the injected model gateway.
pub struct ClosetAnalyzer {
    store: Arc<dyn StyleStore>,
    llm: Arc<dyn LlmGateway>,
    model: ClaudeModel,
    timeout: Duration,
}

impl ClosetAnalyzer {
    pub fn new(store: Arc<dyn StyleStore>, llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            store,
            llm,
            model: ClaudeModel::Sonnet,
            timeout: ANALYSIS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> ClaudeModel {
        self.model
    }

    /// Analyze one already-validated image URL.
    ///
    /// The provider call runs on its own task. On timeout the caller stops
    /// waiting but the call is left to finish in the background.
    pub async fn analyze(&self, image_url: &reqwest::Url) -> Result<AnalysisRun> {
        let prompt = build_closet_analysis_prompt();
        let input_tokens = estimate_tokens(&prompt);

        let llm = self.llm.clone();
        let model = self.model;
        let urls = vec![image_url.to_string()];
        let call = tokio::spawn(async move {
            llm.send_message_with_images(&prompt, &urls, model, MAX_ANALYSIS_TOKENS)
                .await
        });

        let reply = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "analysis task failed: {}",
                    join_error
                )))
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    url = %image_url,
                    "Closet analysis timed out; provider call left running"
                );
                return Err(AppError::AiTimeout);
            }
        };

        let output_tokens = estimate_tokens(&reply);
        let analysis = parse_analysis(&reply)?;
        tracing::debug!(category = ?analysis.category, "Closet image analyzed");

        Ok(AnalysisRun {
            analysis,
            input_tokens,
            output_tokens,
        })
    }

    /// Write analysis tags onto a closet item the user owns.
    pub async fn apply_to_item(
        &self,
        user_id: &str,
        item_id: &str,
        analysis: &ClosetAnalysis,
    ) -> Result<ClosetItem> {
        let mut item = self
            .store
            .get_closet_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Closet item {}", item_id)))?;

        if item.user_id != user_id {
            return Err(AppError::Forbidden(format!(
                "user {} does not own closet item {}",
                user_id, item_id
            )));
        }

        item.ai_tags = analysis.ai_tags.clone();
        self.store.upsert_closet_item(&item).await?;
        Ok(item)
    }
}
