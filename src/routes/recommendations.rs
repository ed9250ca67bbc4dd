// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation generation route.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::usage::{endpoints, generate_policy, operations};
use crate::services::{GenerationReport, RecommendationGenerator, UsageTracker};
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/recommendations/generate", post(generate))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 128))]
    pub event_id: String,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerationReport>> {
    body.validate()?;

    state
        .rate_limiter
        .enforce(&user.uid, endpoints::GENERATE_RECOMMENDATIONS, &generate_policy())
        .await?;
    state
        .usage
        .enforce_budget(&user.uid, state.config.monthly_cost_ceiling_usd)
        .await?;

    let generator = RecommendationGenerator::new(state.store.clone(), state.llm.clone());
    let result = generator.generate(&user.uid, &body.event_id).await;

    let record = match &result {
        Ok(report) => Some(UsageTracker::record(
            &user.uid,
            operations::RECOMMENDATION_GENERATION,
            generator.model(),
            report.input_tokens,
            report.output_tokens,
            None,
        )),
        Err(e) if e.is_ai_failure() => Some(UsageTracker::record(
            &user.uid,
            operations::RECOMMENDATION_GENERATION,
            generator.model(),
            0,
            0,
            Some(e.to_string()),
        )),
        Err(_) => None,
    };
    if let Some(record) = record {
        state.usage.track(record).await;
    }

    result.map(Json)
}
