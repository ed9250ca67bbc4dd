// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Closet photo analysis route.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::ClosetItem;
use crate::services::closet_analysis::{validate_image_url, ClosetAnalysis, ClosetAnalyzer};
use crate::services::usage::{analyze_policy, endpoints, operations};
use crate::services::UsageTracker;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/closet/analyze", post(analyze))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 2048))]
    pub image_url: String,
    /// Closet item to write the tags onto
    #[validate(length(min = 1, max = 128))]
    pub item_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: ClosetAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ClosetItem>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    body.validate()?;
    let image_url = validate_image_url(&body.image_url, &state.config.allowed_image_hosts)?;

    state
        .rate_limiter
        .enforce(&user.uid, endpoints::ANALYZE_CLOSET, &analyze_policy())
        .await?;
    state
        .usage
        .enforce_budget(&user.uid, state.config.monthly_cost_ceiling_usd)
        .await?;

    let analyzer = ClosetAnalyzer::new(state.store.clone(), state.llm.clone());
    let run = match analyzer.analyze(&image_url).await {
        Ok(run) => run,
        Err(e) => {
            if e.is_ai_failure() {
                state
                    .usage
                    .track(UsageTracker::record(
                        &user.uid,
                        operations::CLOSET_ANALYSIS,
                        analyzer.model(),
                        0,
                        0,
                        Some(e.to_string()),
                    ))
                    .await;
            }
            return Err(e);
        }
    };

    state
        .usage
        .track(UsageTracker::record(
            &user.uid,
            operations::CLOSET_ANALYSIS,
            analyzer.model(),
            run.input_tokens,
            run.output_tokens,
            None,
        ))
        .await;

    let item = match &body.item_id {
        Some(item_id) => Some(
            analyzer
                .apply_to_item(&user.uid, item_id, &run.analysis)
                .await?,
        ),
        None => None,
    };

    Ok(Json(AnalyzeResponse {
        analysis: run.analysis,
        item,
    }))
}
