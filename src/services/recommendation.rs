// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation generation service.
//!
//! Handles the core workflow:
//! 1. Load event, profile and closet concurrently
//! 2. Mark the event `generating-recommendations`
//! 3. Build the prompt from the closet the user is willing to rewear
//! 4. Call the model and parse its JSON reply
//! 5. Persist one recommendation per outfit
//! 6. Mark the event `recommendations-ready`
//!
//! Any failure after step 2 rolls the event back to `planning`.
//!
//! Two concurrent runs for the same event are not excluded: both can pass
//! step 2, and one run's rollback can overwrite the other's completion.

use crate::db::StyleStore;
use crate::error::{AppError, Result};
use crate::models::{ClosetItem, Event, EventStatus, UserProfile};
use crate::services::llm::{estimate_tokens, ClaudeModel, LlmGateway};
use crate::services::outfit_mapping::{coerce_recommendation, parse_outfit_list};
use crate::services::prompts::build_recommendation_prompt;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Output budget for a three-outfit reply.
pub const MAX_RECOMMENDATION_TOKENS: u32 = 8000;

/// Result of a successful generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub event_id: String,
    pub recommendation_ids: Vec<String>,
    /// Estimated from prompt length
    pub input_tokens: u64,
    /// Estimated from reply length
    pub output_tokens: u64,
}

/// Runs the generation pipeline against injected collaborators.
pub struct RecommendationGenerator {
    store: Arc<dyn StyleStore>,
    llm: Arc<dyn LlmGateway>,
    model: ClaudeModel,
}

impl RecommendationGenerator {
    pub fn new(store: Arc<dyn StyleStore>, llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            store,
            llm,
            model: ClaudeModel::Sonnet,
        }
    }

    pub fn model(&self) -> ClaudeModel {
        self.model
    }

    /// Generate and persist outfit recommendations for one event.
    pub async fn generate(&self, user_id: &str, event_id: &str) -> Result<GenerationReport> {
        tracing::info!(user_id, event_id, "Generating recommendations");

        // 1. Fetch inputs concurrently
        let (event, profile, closet_items) = tokio::try_join!(
            self.store.get_event(event_id),
            self.store.get_profile(user_id),
            self.store.list_closet_items(user_id),
        )?;

        let event = event
            .filter(|e| e.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;
        let profile =
            profile.ok_or_else(|| AppError::NotFound(format!("Profile {}", user_id)))?;

        // 2. Point of no return: failures from here on roll back
        self.store
            .set_event_status(event_id, EventStatus::GeneratingRecommendations, Utc::now())
            .await?;

        let closet_items: Vec<_> = closet_items
            .into_iter()
            .filter(|item| !item.user_tags.refuse_to_rewear)
            .collect();

        match self.run(user_id, &event, &profile, &closet_items).await {
            Ok(report) => {
                tracing::info!(
                    user_id,
                    event_id,
                    count = report.recommendation_ids.len(),
                    "Recommendations ready"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(user_id, event_id, error = %e, "Generation failed, rolling back");
                if let Err(rollback) = self
                    .store
                    .set_event_status(event_id, EventStatus::Planning, Utc::now())
                    .await
                {
                    tracing::error!(event_id, error = %rollback, "Status rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Everything after the status flip; runs under the rollback guard.
    async fn run(
        &self,
        user_id: &str,
        event: &Event,
        profile: &UserProfile,
        closet_items: &[ClosetItem],
    ) -> Result<GenerationReport> {
        // No product search provider is wired in yet.
        let prompt = build_recommendation_prompt(event, profile, closet_items, &[]);
        let input_tokens = estimate_tokens(&prompt);

        tracing::debug!(
            event_id = %event.id,
            closet_items = closet_items.len(),
            input_tokens,
            "Recommendation prompt built"
        );

        let reply = self
            .llm
            .send_message(&prompt, self.model, MAX_RECOMMENDATION_TOKENS)
            .await?;
        let output_tokens = estimate_tokens(&reply);

        let outfits = parse_outfit_list(&reply)?;
        if outfits.is_empty() {
            return Err(AppError::AiResponseParse(
                "reply contained no outfits".to_string(),
            ));
        }

        let now = Utc::now();
        let mut recommendation_ids = Vec::with_capacity(outfits.len());
        for (index, raw) in outfits.iter().enumerate() {
            let id = uuid::Uuid::now_v7().to_string();
            let recommendation = coerce_recommendation(raw, id, user_id, &event.id, index, now);
            self.store.insert_recommendation(&recommendation).await?;
            recommendation_ids.push(recommendation.id);
        }

        self.store
            .complete_event_recommendations(&event.id, &recommendation_ids, Utc::now())
            .await?;

        Ok(GenerationReport {
            event_id: event.id.clone(),
            recommendation_ids,
            input_tokens,
            output_tokens,
        })
    }

    /// Return an event stuck in any state back to `planning`.
    pub async fn reset_event_status(&self, user_id: &str, event_id: &str) -> Result<Event> {
        let mut event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;

        if event.user_id != user_id {
            return Err(AppError::Forbidden(format!(
                "user {} does not own event {}",
                user_id, event_id
            )));
        }

        let now = Utc::now();
        self.store
            .set_event_status(event_id, EventStatus::Planning, now)
            .await?;

        tracing::info!(
            user_id,
            event_id,
            previous = event.status.as_str(),
            "Event status reset"
        );

        event.status = EventStatus::Planning;
        event.updated_at = now;
        Ok(event)
    }
}
