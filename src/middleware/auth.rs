// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Ownership check: strict equality with a document's `userId`.
    pub fn ensure_owns(&self, owner_id: &str, what: &str) -> Result<(), AppError> {
        if self.uid == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "user {} does not own {}",
                self.uid, what
            )))
        }
    }
}

/// Middleware that requires a valid `Authorization: Bearer` token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?
        .to_string();

    let identity = state.token_verifier.verify(&token).await?;

    request.extensions_mut().insert(AuthUser {
        uid: identity.uid,
        email: identity.email,
    });

    Ok(next.run(request).await)
}
