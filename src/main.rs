// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stylist API Server
//!
//! Generates AI outfit recommendations for a user's upcoming events from
//! their style profile and closet.

use anyhow::Context;
use stylist_api::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, StyleStore},
    services::{AnthropicClient, FirebaseTokenVerifier, LlmGateway},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Stylist API");

    let store: Arc<dyn StyleStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .context("Failed to connect to Firestore")?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let llm: Arc<dyn LlmGateway> = Arc::new(AnthropicClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_base_url.clone(),
    ));

    let token_verifier = Arc::new(
        FirebaseTokenVerifier::from_config(&config)
            .context("Failed to initialize token verifier")?,
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, llm, token_verifier));

    // Build router
    let app = stylist_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stylist_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
