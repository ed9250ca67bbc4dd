// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event model: a planned occasion the user needs an outfit for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of an event.
///
/// `GeneratingRecommendations` is only held while a generation run is in
/// flight; failed runs roll back to `Planning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    #[default]
    Planning,
    GeneratingRecommendations,
    RecommendationsReady,
    OutfitSelected,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Planning => "planning",
            EventStatus::GeneratingRecommendations => "generating-recommendations",
            EventStatus::RecommendationsReady => "recommendations-ready",
            EventStatus::OutfitSelected => "outfit-selected",
            EventStatus::Completed => "completed",
        }
    }
}

/// Event stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// e.g. "wedding", "gala", "interview"
    pub event_type: String,
    #[serde(default)]
    pub dress_code: Option<String>,
    #[serde(default)]
    pub location: EventLocation,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    /// Latest date purchased items must arrive by
    #[serde(default)]
    pub shipping_deadline: Option<DateTime<Utc>>,
    /// e.g. "low", "moderate", "high" (dancing, walking)
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub recommendation_ids: Vec<String>,
    #[serde(default)]
    pub recommendations_generated: bool,
    #[serde(default)]
    pub selected_outfit: Option<SelectedOutfit>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventLocation {
    pub city: String,
    pub state: Option<String>,
    pub country: Option<String>,
    pub venue: Option<String>,
    /// "indoor", "outdoor" or "mixed"
    pub setting: Option<String>,
}

/// Weather at the event location, as returned by the weather proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub conditions: String,
    pub humidity: f64,
    pub feels_like: f64,
    pub wind_speed: f64,
    pub icon: String,
}

/// Whether the user is wearing a dress or separates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutfitMode {
    Dress,
    Separates,
}

impl OutfitMode {
    /// Whether a category belongs to the other mode and must be skipped.
    pub fn excludes(&self, category: &str) -> bool {
        match self {
            OutfitMode::Separates => category == "dress",
            OutfitMode::Dress => category == "tops" || category == "bottoms",
        }
    }
}

/// The user's finalized outfit choice for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOutfit {
    pub recommendation_id: String,
    /// Index into `[primary, ...alternatives]` per category; 0 is primary
    #[serde(default)]
    pub selections: BTreeMap<String, usize>,
    #[serde(default)]
    pub mode: Option<OutfitMode>,
    #[serde(default)]
    pub total_price: f64,
    pub selected_at: DateTime<Utc>,
}

impl SelectedOutfit {
    /// Chosen index for a category, defaulting to the primary pick.
    pub fn index_for(&self, category: &str) -> usize {
        self.selections.get(category).copied().unwrap_or(0)
    }
}
