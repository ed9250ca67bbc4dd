// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weather proxy route.

use crate::error::Result;
use crate::models::WeatherSnapshot;
use crate::services::Units;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/weather", get(get_weather))
}

#[derive(Debug, Deserialize, Validate)]
pub struct WeatherQuery {
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[serde(default)]
    pub units: Units,
}

async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherSnapshot>> {
    query.validate()?;

    let snapshot = state
        .weather
        .current(
            &query.city,
            query.state.as_deref(),
            query.country.as_deref(),
            query.units,
        )
        .await?;
    Ok(Json(snapshot))
}
