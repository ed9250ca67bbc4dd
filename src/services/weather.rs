// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OpenWeatherMap current-conditions client.

use crate::error::AppError;
use crate::models::WeatherSnapshot;
use serde::Deserialize;

/// Unit system accepted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }
}

// ─── Provider response ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainReadings,
    #[serde(default)]
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

impl From<CurrentWeatherResponse> for WeatherSnapshot {
    fn from(r: CurrentWeatherResponse) -> Self {
        let condition = r.weather.into_iter().next();
        let (conditions, icon) = condition
            .map(|c| (c.description, c.icon))
            .unwrap_or_default();
        WeatherSnapshot {
            temperature: r.main.temp,
            conditions,
            humidity: r.main.humidity,
            feels_like: r.main.feels_like,
            wind_speed: r.wind.speed,
            icon,
        }
    }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Weather API client.
#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    /// Create a client against `base_url` (normally `https://api.openweathermap.org`).
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Current conditions for a free-text location.
    pub async fn current(
        &self,
        city: &str,
        state: Option<&str>,
        country: Option<&str>,
        units: Units,
    ) -> Result<WeatherSnapshot, AppError> {
        let query = location_query(city, state, country);

        let response = self
            .http
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("units", units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            // The request URL carries the API key
            .map_err(|e| {
                AppError::Upstream(format!("Weather request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(location = %query, "Weather location not found");
            return Err(AppError::NotFound("Location not found".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Weather API returned error status");
            return Err(AppError::Upstream(format!("Weather API returned {}", status)));
        }

        let parsed: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| {
                AppError::Upstream(format!("Invalid weather response: {}", e.without_url()))
            })?;

        Ok(parsed.into())
    }
}

/// "city,state,country" with empty parts dropped.
fn location_query(city: &str, state: Option<&str>, country: Option<&str>) -> String {
    [Some(city), state, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
