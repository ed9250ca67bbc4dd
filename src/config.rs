// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (the Anthropic and OpenWeatherMap keys) are injected as
//! environment variables by the deployment and read once at startup.

use std::env;

/// Hosts that closet photos may be fetched from for AI analysis.
pub const DEFAULT_ALLOWED_IMAGE_HOSTS: &[&str] =
    &["firebasestorage.googleapis.com", "storage.googleapis.com"];

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store; state is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP / Firebase project ID (also the expected ID token audience)
    pub gcp_project_id: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Document store selection
    pub store_backend: StoreBackend,
    /// Anthropic API base URL (overridable for tests)
    pub anthropic_base_url: String,
    /// OpenWeatherMap API base URL (overridable for tests)
    pub weather_base_url: String,
    /// Hosts closet photo URLs must belong to
    pub allowed_image_hosts: Vec<String>,
    /// Monthly AI spend ceiling per user, in USD
    pub monthly_cost_ceiling_usd: f64,

    // --- Secrets ---
    /// Anthropic API key
    pub anthropic_api_key: String,
    /// OpenWeatherMap API key
    pub weather_api_key: String,
    /// Shared HS256 secret for locally minted ID tokens (development only)
    pub auth_dev_secret: Option<Vec<u8>>,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            anthropic_base_url: "http://localhost:9".to_string(),
            weather_base_url: "http://localhost:9".to_string(),
            allowed_image_hosts: DEFAULT_ALLOWED_IMAGE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            monthly_cost_ceiling_usd: 10.0,
            anthropic_api_key: "test_anthropic_key".to_string(),
            weather_api_key: "test_weather_key".to_string(),
            auth_dev_secret: Some(b"test_auth_secret_32_bytes_minimum".to_vec()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let allowed_image_hosts = match env::var("ALLOWED_IMAGE_HOSTS") {
            Ok(raw) => raw
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            Err(_) => DEFAULT_ALLOWED_IMAGE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        };

        let monthly_cost_ceiling_usd = match env::var("MONTHLY_COST_CEILING_USD") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or(ConfigError::Invalid("MONTHLY_COST_CEILING_USD"))?,
            Err(_) => 10.0,
        };

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            weather_base_url: env::var("WEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            allowed_image_hosts,
            monthly_cost_ceiling_usd,

            anthropic_api_key: env::var("ANTHROPIC_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ANTHROPIC_API_KEY"))?,
            weather_api_key: env::var("OPENWEATHER_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OPENWEATHER_API_KEY"))?,
            auth_dev_secret: env::var("AUTH_DEV_SECRET")
                .ok()
                .filter(|v| !v.is_empty())
                .map(String::into_bytes),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
