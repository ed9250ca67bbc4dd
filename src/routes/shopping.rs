// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopping list route.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Event, PurchaseStatus, ShoppingFilters, ShoppingItem, ShoppingStats, SortBy};
use crate::services::shopping::{apply_filters, calculate_stats, extract_shopping_items, sort_items};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Concurrent recommendation reads per request.
const FETCH_CONCURRENCY: usize = 8;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/shopping", get(get_shopping_list))
}

/// Query string; list values are comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingQuery {
    pub event_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub retailer: Option<String>,
    #[serde(default)]
    pub urgent_only: bool,
    #[serde(default)]
    pub closet_only: bool,
    #[serde(default)]
    pub purchase_only: bool,
    pub sort_by: Option<String>,
}

fn split_list(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ShoppingQuery {
    fn filters(&self) -> Result<ShoppingFilters> {
        let statuses = split_list(&self.status)
            .iter()
            .map(|s| s.parse::<PurchaseStatus>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|message| AppError::InvalidField {
                field: "status",
                message,
            })?;

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::InvalidField {
                    field: "minPrice",
                    message: "must not exceed maxPrice".to_string(),
                });
            }
        }

        Ok(ShoppingFilters {
            event_ids: split_list(&self.event_id),
            categories: split_list(&self.category),
            statuses,
            min_price: self.min_price,
            max_price: self.max_price,
            retailers: split_list(&self.retailer),
            urgent_only: self.urgent_only,
            closet_only: self.closet_only,
            purchase_only: self.purchase_only,
        })
    }

    fn sort_by(&self) -> Result<SortBy> {
        match self.sort_by.as_deref() {
            None | Some("") => Ok(SortBy::default()),
            Some(raw) => raw.parse().map_err(|message| AppError::InvalidField {
                field: "sortBy",
                message,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListResponse {
    pub items: Vec<ShoppingItem>,
    pub stats: ShoppingStats,
}

/// Recommendations whose items belong on the list: the selected one once
/// the user has chosen, otherwise every generated one.
fn listed_recommendation_ids(event: &Event) -> Vec<String> {
    match &event.selected_outfit {
        Some(selected) => vec![selected.recommendation_id.clone()],
        None => event.recommendation_ids.clone(),
    }
}

async fn get_shopping_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ShoppingQuery>,
) -> Result<Json<ShoppingListResponse>> {
    let filters = query.filters()?;
    let sort_by = query.sort_by()?;

    let events = state.store.list_events_for_user(&user.uid).await?;
    let wanted: Vec<(Event, String)> = events
        .into_iter()
        .filter(|e| filters.event_ids.is_empty() || filters.event_ids.contains(&e.id))
        .flat_map(|e| {
            listed_recommendation_ids(&e)
                .into_iter()
                .map(move |id| (e.clone(), id))
        })
        .collect();

    let store = state.store.clone();
    let now = chrono::Utc::now();
    let per_recommendation: Vec<Vec<ShoppingItem>> = stream::iter(wanted)
        .map(|(event, id)| {
            let store = store.clone();
            async move {
                let items = match store.get_recommendation(&id).await? {
                    Some(rec) if rec.user_id == event.user_id => {
                        extract_shopping_items(&rec, &event, now)
                    }
                    Some(_) | None => {
                        tracing::warn!(
                            event_id = %event.id,
                            recommendation_id = %id,
                            "Listed recommendation missing"
                        );
                        Vec::new()
                    }
                };
                Ok::<_, AppError>(items)
            }
        })
        .buffered(FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    let mut items = apply_filters(per_recommendation.concat(), &filters);
    sort_items(&mut items, sort_by);
    let stats = calculate_stats(&items);

    Ok(Json(ShoppingListResponse { items, stats }))
}
