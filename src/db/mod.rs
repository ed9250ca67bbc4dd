// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`StyleStore`] is the document-store seam. [`FirestoreDb`] backs it in
//! production; [`MemoryStore`] keeps everything in-process for local runs
//! and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{
    ClosetItem, Event, EventStatus, MonthlyUsage, RateLimitDecision, RateLimitPolicy,
    Recommendation, UsageRecord, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const EVENTS: &str = "events";
    pub const CLOSET_ITEMS: &str = "closet_items";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const RATE_LIMITS: &str = "rate_limits";
    /// Immutable per-call usage records
    pub const API_USAGE: &str = "api_usage";
    /// Per-user monthly usage summaries
    pub const MONTHLY_USAGE: &str = "monthly_usage";
}

/// Document ID for a rate-limit counter.
pub fn rate_limit_doc_id(user_id: &str, endpoint: &str) -> String {
    format!("{}_{}", user_id, urlencoding::encode(endpoint))
}

/// Document ID for a monthly usage summary.
pub fn monthly_usage_doc_id(user_id: &str, month: &str) -> String {
    format!("{}_{}", user_id, month)
}

/// Typed document operations used by the services.
///
/// Plain reads and writes are last-writer-wins. Only the rate-limit counter
/// and the usage ledger use transactional read-modify-write.
#[async_trait]
pub trait StyleStore: Send + Sync {
    // ─── Profiles ────────────────────────────────────────────────
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    // ─── Events ──────────────────────────────────────────────────
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError>;
    async fn upsert_event(&self, event: &Event) -> Result<(), AppError>;
    /// Events owned by a user, soonest first.
    async fn list_events_for_user(&self, user_id: &str) -> Result<Vec<Event>, AppError>;
    async fn set_event_status(
        &self,
        event_id: &str,
        status: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;
    /// Store generated ids and mark the event `recommendations-ready`.
    async fn complete_event_recommendations(
        &self,
        event_id: &str,
        recommendation_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;

    // ─── Closet ──────────────────────────────────────────────────
    async fn get_closet_item(&self, item_id: &str) -> Result<Option<ClosetItem>, AppError>;
    async fn upsert_closet_item(&self, item: &ClosetItem) -> Result<(), AppError>;
    /// Closet items owned by a user, newest first.
    async fn list_closet_items(&self, user_id: &str) -> Result<Vec<ClosetItem>, AppError>;

    // ─── Recommendations ─────────────────────────────────────────
    async fn get_recommendation(&self, id: &str) -> Result<Option<Recommendation>, AppError>;
    async fn insert_recommendation(&self, recommendation: &Recommendation)
        -> Result<(), AppError>;

    // ─── Rate limits & usage ─────────────────────────────────────
    /// Atomically count one request against `(user_id, endpoint)`.
    async fn hit_rate_limit(
        &self,
        user_id: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AppError>;
    /// Write an immutable usage record and fold it into the monthly summary
    /// in one atomic operation.
    async fn record_usage(&self, record: &UsageRecord) -> Result<(), AppError>;
    async fn get_monthly_usage(
        &self,
        user_id: &str,
        month: &str,
    ) -> Result<Option<MonthlyUsage>, AppError>;
}
