// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stylist API: AI outfit recommendations for planned events
//!
//! This crate provides the backend for a personal stylist: it turns a
//! user's style profile, closet, and event into AI-generated outfits, and
//! projects those outfits into a shopping list.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::StyleStore;
use services::{FirebaseTokenVerifier, LlmGateway, RateLimiter, UsageTracker, WeatherClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn StyleStore>,
    pub llm: Arc<dyn LlmGateway>,
    pub weather: WeatherClient,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
    pub rate_limiter: RateLimiter,
    pub usage: UsageTracker,
}

impl AppState {
    /// Wire up state from its injected collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn StyleStore>,
        llm: Arc<dyn LlmGateway>,
        token_verifier: Arc<FirebaseTokenVerifier>,
    ) -> Self {
        let weather = WeatherClient::new(
            config.weather_api_key.clone(),
            config.weather_base_url.clone(),
        );
        Self {
            rate_limiter: RateLimiter::new(store.clone()),
            usage: UsageTracker::new(store.clone()),
            config,
            store,
            llm,
            weather,
            token_verifier,
        }
    }
}
