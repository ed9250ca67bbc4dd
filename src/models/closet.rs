// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Closet (wardrobe) item model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closet categories accepted for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosetCategory {
    Dress,
    Shoes,
    Bag,
    Outerwear,
    Jewelry,
}

impl ClosetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosetCategory::Dress => "dress",
            ClosetCategory::Shoes => "shoes",
            ClosetCategory::Bag => "bag",
            ClosetCategory::Outerwear => "outerwear",
            ClosetCategory::Jewelry => "jewelry",
        }
    }

    /// Parse a free-form category name (as returned by the vision model).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dress" | "dresses" | "gown" => Some(ClosetCategory::Dress),
            "shoes" | "shoe" | "heels" | "boots" | "sandals" => Some(ClosetCategory::Shoes),
            "bag" | "bags" | "handbag" | "purse" | "clutch" => Some(ClosetCategory::Bag),
            "outerwear" | "jacket" | "coat" | "blazer" | "wrap" => Some(ClosetCategory::Outerwear),
            "jewelry" | "jewellery" | "necklace" | "earrings" | "bracelet" => {
                Some(ClosetCategory::Jewelry)
            }
            _ => None,
        }
    }
}

/// Wardrobe item stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosetItem {
    pub id: String,
    pub user_id: String,
    pub category: ClosetCategory,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_urls: ClosetImageUrls,
    #[serde(default)]
    pub ai_tags: AiTags,
    #[serde(default)]
    pub user_tags: UserTags,
    #[serde(default)]
    pub worn_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Stored variants of the uploaded photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosetImageUrls {
    pub original: String,
    /// At most 600x600
    pub thumbnail: Option<String>,
    /// At most 1024x1024, used for AI analysis
    pub processed: Option<String>,
}

/// Tags derived by the vision model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiTags {
    pub subcategory: Option<String>,
    pub colors: Vec<String>,
    pub style: Vec<String>,
    pub pattern: Option<String>,
    pub occasions: Vec<String>,
    pub seasons: Vec<String>,
    pub key_features: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserTags {
    pub refuse_to_rewear: bool,
    pub prefer_to_rewear: bool,
    pub favorite: bool,
}
