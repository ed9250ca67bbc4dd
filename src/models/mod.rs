// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod closet;
pub mod event;
pub mod recommendation;
pub mod shopping;
pub mod usage;
pub mod user;

pub use closet::{AiTags, ClosetCategory, ClosetItem};
pub use event::{Event, EventStatus, OutfitMode, SelectedOutfit, WeatherSnapshot};
pub use recommendation::{
    AlternativesOutfit, CategoryEntry, ItemSource, LegacyOutfit, Outfit, OutfitItem,
    Recommendation, Reasoning,
};
pub use shopping::{PurchaseStatus, ShoppingFilters, ShoppingItem, ShoppingStats, SortBy};
pub use usage::{MonthlyUsage, RateLimitDecision, RateLimitPolicy, RateLimitRecord, UsageRecord};
pub use user::{StyleProfile, UserProfile};
