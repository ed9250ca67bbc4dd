// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", post(create_profile).get(get_profile))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
}

/// Create the caller's profile with default preferences.
///
/// Idempotent: an existing profile is returned unchanged with 200.
async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    body.validate()?;

    if let Some(existing) = state.store.get_profile(&user.uid).await? {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let profile = UserProfile::new_default(
        user.uid.clone(),
        user.email.clone(),
        body.display_name.map(|n| n.trim().to_string()),
        chrono::Utc::now(),
    );
    state.store.upsert_profile(&profile).await?;

    tracing::info!(user_id = %user.uid, "Profile created");
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    state
        .store
        .get_profile(&user.uid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", user.uid)))
}
