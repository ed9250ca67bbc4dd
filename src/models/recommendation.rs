// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI-generated outfit recommendations.
//!
//! Two outfit shapes coexist in storage: the legacy fixed-slot shape and the
//! current per-category "primary + alternatives" shape. [`Outfit`] models
//! them as a union discriminated by a non-empty `items` array.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Confidence assigned when the model does not report one.
pub const DEFAULT_CONFIDENCE_SCORE: u32 = 75;

/// Where an outfit item comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// Already in the user's closet
    Closet,
    /// Needs to be bought
    #[default]
    Purchase,
}

/// A single garment or accessory within an outfit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitItem {
    #[serde(default)]
    pub source: ItemSource,
    #[serde(default)]
    pub closet_item_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub retailer: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: f64,
}

/// One category of the current outfit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub category: String,
    pub primary: OutfitItem,
    #[serde(default)]
    pub alternatives: Vec<OutfitItem>,
}

impl CategoryEntry {
    /// Option at `index` within `[primary, ...alternatives]`.
    pub fn option(&self, index: usize) -> Option<&OutfitItem> {
        match index {
            0 => Some(&self.primary),
            n => self.alternatives.get(n - 1),
        }
    }
}

/// Current outfit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativesOutfit {
    pub items: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JewelrySet {
    #[serde(default)]
    pub items: Vec<OutfitItem>,
}

/// Legacy outfit shape with fixed slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyOutfit {
    pub dress: Option<OutfitItem>,
    pub shoes: Option<OutfitItem>,
    pub bag: Option<OutfitItem>,
    pub jewelry: Option<JewelrySet>,
    pub outerwear: Option<OutfitItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outfit {
    Alternatives(AlternativesOutfit),
    Legacy(LegacyOutfit),
}

impl<'de> Deserialize<'de> for Outfit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;

        // An empty `items` array says nothing about the shape; legacy slots win.
        let has_entries = value
            .get("items")
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty());
        if has_entries {
            if let Ok(current) = AlternativesOutfit::deserialize(&value) {
                return Ok(Outfit::Alternatives(current));
            }
        }

        LegacyOutfit::deserialize(&value)
            .map(Outfit::Legacy)
            .map_err(de::Error::custom)
    }
}

/// Why the model picked this outfit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reasoning {
    pub summary: String,
    pub style_notes: Vec<String>,
    pub flattery_notes: Vec<String>,
    pub weather_considerations: String,
}

/// Recommendation stored in Firestore; tied to one event and one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    #[serde(default)]
    pub name: String,
    pub outfit: Outfit,
    #[serde(default)]
    pub reasoning: Reasoning,
    #[serde(default = "default_confidence")]
    pub confidence_score: u32,
    #[serde(default)]
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

fn default_confidence() -> u32 {
    DEFAULT_CONFIDENCE_SCORE
}
