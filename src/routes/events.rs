// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event status and outfit selection routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Event, EventStatus, ItemSource, Outfit, OutfitMode, SelectedOutfit};
use crate::services::shopping::extract_shopping_items;
use crate::services::RecommendationGenerator;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events/{event_id}/reset-status", post(reset_status))
        .route("/api/events/{event_id}/select-outfit", post(select_outfit))
}

/// Return a stuck event to `planning`.
async fn reset_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> Result<Json<Event>> {
    let generator = RecommendationGenerator::new(state.store.clone(), state.llm.clone());
    let event = generator.reset_event_status(&user.uid, &event_id).await?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelectOutfitRequest {
    #[validate(length(min = 1, max = 128))]
    pub recommendation_id: String,
    /// Option index per category; missing categories use the primary
    #[serde(default)]
    pub selections: BTreeMap<String, usize>,
    #[serde(default)]
    pub mode: Option<OutfitMode>,
}

/// Store the user's chosen options and mark the event `outfit-selected`.
async fn select_outfit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
    Json(body): Json<SelectOutfitRequest>,
) -> Result<Json<Event>> {
    body.validate()?;

    let (event, recommendation) = tokio::try_join!(
        state.store.get_event(&event_id),
        state.store.get_recommendation(&body.recommendation_id),
    )?;

    let mut event = event.ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;
    user.ensure_owns(&event.user_id, "event")?;

    let recommendation = recommendation
        .filter(|r| r.event_id == event.id && r.user_id == user.uid)
        .ok_or_else(|| AppError::InvalidField {
            field: "recommendationId",
            message: "not a recommendation for this event".to_string(),
        })?;

    validate_selections(&recommendation.outfit, &body.selections)?;

    let now = chrono::Utc::now();
    event.selected_outfit = Some(SelectedOutfit {
        recommendation_id: recommendation.id.clone(),
        selections: body.selections,
        mode: body.mode,
        total_price: 0.0,
        selected_at: now,
    });

    // Purchases only, priced from the shopping list projection.
    let items = extract_shopping_items(&recommendation, &event, now);
    let total_price: f64 = items
        .iter()
        .filter(|i| i.source == ItemSource::Purchase)
        .map(|i| i.price)
        .sum();
    if let Some(selected) = event.selected_outfit.as_mut() {
        selected.total_price = total_price;
    }

    event.status = EventStatus::OutfitSelected;
    event.updated_at = now;
    state.store.upsert_event(&event).await?;

    tracing::info!(
        user_id = %user.uid,
        event_id = %event.id,
        recommendation_id = %recommendation.id,
        total_price,
        "Outfit selected"
    );

    Ok(Json(event))
}

/// Every selection must name a category of the outfit and an option it has.
fn validate_selections(outfit: &Outfit, selections: &BTreeMap<String, usize>) -> Result<()> {
    for (category, &index) in selections {
        let exists = match outfit {
            Outfit::Alternatives(current) => current
                .items
                .iter()
                .any(|entry| entry.category == *category && entry.option(index).is_some()),
            // Fixed slots have no alternatives
            Outfit::Legacy(legacy) => {
                index == 0
                    && match category.as_str() {
                        "dress" => legacy.dress.is_some(),
                        "shoes" => legacy.shoes.is_some(),
                        "bag" => legacy.bag.is_some(),
                        "outerwear" => legacy.outerwear.is_some(),
                        "jewelry" => legacy.jewelry.is_some(),
                        _ => false,
                    }
            }
        };
        if !exists {
            return Err(AppError::InvalidField {
                field: "selections",
                message: format!("no option {} for category '{}'", index, category),
            });
        }
    }
    Ok(())
}
