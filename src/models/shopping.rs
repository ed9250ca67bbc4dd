// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopping list projections of outfit items (derived, never persisted).

use super::recommendation::ItemSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Purchase progress for a shopping item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PurchaseStatus {
    #[default]
    Unpurchased,
    InCart,
    Purchased,
    Skipped,
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpurchased" => Ok(PurchaseStatus::Unpurchased),
            "in-cart" => Ok(PurchaseStatus::InCart),
            "purchased" => Ok(PurchaseStatus::Purchased),
            "skipped" => Ok(PurchaseStatus::Skipped),
            other => Err(format!("unknown purchase status: {other}")),
        }
    }
}

/// One outfit item in the context of its event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    /// `{recommendationId}-{category}-{itemIndex}`
    pub id: String,
    pub event_id: String,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub recommendation_id: String,
    pub category: String,
    /// Index into `[primary, ...alternatives]`; 0 for legacy slots
    pub item_index: usize,
    pub name: String,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub retailer: Option<String>,
    pub price: f64,
    pub source: ItemSource,
    pub closet_item_id: Option<String>,
    pub days_until_event: i64,
    pub is_urgent: bool,
    pub purchase_status: PurchaseStatus,
}

/// Independent filter dimensions, AND-combined. Empty lists do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShoppingFilters {
    pub event_ids: Vec<String>,
    pub categories: Vec<String>,
    pub statuses: Vec<PurchaseStatus>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub retailers: Vec<String>,
    pub urgent_only: bool,
    pub closet_only: bool,
    pub purchase_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    EventDateAsc,
    EventDateDesc,
    PriceAsc,
    PriceDesc,
    Category,
    Retailer,
    Status,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event-date-asc" => Ok(SortBy::EventDateAsc),
            "event-date-desc" => Ok(SortBy::EventDateDesc),
            "price-asc" => Ok(SortBy::PriceAsc),
            "price-desc" => Ok(SortBy::PriceDesc),
            "category" => Ok(SortBy::Category),
            "retailer" => Ok(SortBy::Retailer),
            "status" => Ok(SortBy::Status),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Aggregates over a shopping list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingStats {
    pub total_items: usize,
    pub by_status: BTreeMap<PurchaseStatus, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_retailer: BTreeMap<String, usize>,
    pub by_event: BTreeMap<String, usize>,
    /// Sum of prices over items not skipped
    pub total_estimated_cost: f64,
    pub urgent_count: usize,
    pub event_count: usize,
}
