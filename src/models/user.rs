// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User profile stored in Firestore (document ID = uid).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub style_profile: StyleProfile,
    #[serde(default)]
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh profile with every nested preference empty, as created at signup.
    pub fn new_default(
        uid: impl Into<String>,
        email: Option<String>,
        display_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name,
            style_profile: StyleProfile::default(),
            onboarding_complete: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Style preferences collected during onboarding and settings edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleProfile {
    pub measurements: BodyMeasurements,
    /// e.g. "fitted", "relaxed"
    pub fit_preference: Option<String>,
    pub comfort_limits: ComfortLimits,
    pub loved_brands: Vec<String>,
    pub hated_brands: Vec<String>,
    /// Items or styles the user never wants suggested again
    pub never_again: Vec<String>,
    pub style_words: Vec<String>,
    /// Budget per category ("dress", "shoes", ...), ordered for stable prompts
    pub price_ranges: BTreeMap<String, PriceRange>,
    pub flattery: FlatteryPreferences,
    pub color_preferences: ColorPreferences,
    /// e.g. "runs-cold", "runs-hot"
    pub temperature_sensitivity: Option<String>,
    pub shopping_preferences: ShoppingPreferences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BodyMeasurements {
    pub height: Option<String>,
    pub bust: Option<String>,
    pub waist: Option<String>,
    pub hips: Option<String>,
    pub dress_size: Option<String>,
    pub shoe_size: Option<String>,
    pub body_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComfortLimits {
    /// Maximum heel height in inches
    pub max_heel_height: Option<f64>,
    pub avoid_strapless: bool,
    pub avoid_backless: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlatteryPreferences {
    /// Body parts the user likes to highlight
    pub show_off: Vec<String>,
    /// Body parts the user prefers to downplay
    pub minimize: Vec<String>,
    pub preferred_necklines: Vec<String>,
    pub avoided_necklines: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorPreferences {
    pub favorites: Vec<String>,
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShoppingPreferences {
    pub preferred_retailers: Vec<String>,
    pub sustainable_only: bool,
    pub secondhand_ok: bool,
}
