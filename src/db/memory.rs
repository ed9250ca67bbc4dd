// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used for local development (`STORE_BACKEND=memory`) and tests. Each
//! collection is a `DashMap`; per-key `entry` locking gives the rate-limit
//! counter and usage summary the same atomicity a Firestore transaction does.

use crate::db::{monthly_usage_doc_id, rate_limit_doc_id, StyleStore};
use crate::error::AppError;
use crate::models::{
    ClosetItem, Event, EventStatus, MonthlyUsage, RateLimitDecision, RateLimitPolicy,
    RateLimitRecord, Recommendation, UsageRecord, UserProfile,
};
use crate::time_utils::month_key;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, UserProfile>,
    events: DashMap<String, Event>,
    closet_items: DashMap<String, ClosetItem>,
    recommendations: DashMap<String, Recommendation>,
    rate_limits: DashMap<String, RateLimitRecord>,
    api_usage: DashMap<String, UsageRecord>,
    monthly_usage: DashMap<String, MonthlyUsage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recommendations.
    pub fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }

    /// Number of immutable usage records.
    pub fn usage_record_count(&self) -> usize {
        self.api_usage.len()
    }

    fn modify_event<F>(&self, event_id: &str, modify: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Event),
    {
        let mut event = self
            .events
            .get_mut(event_id)
            .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;
        modify(&mut event);
        Ok(())
    }
}

#[async_trait]
impl StyleStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.get(uid).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.users.insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.events.get(event_id).map(|e| e.clone()))
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), AppError> {
        self.events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn list_events_for_user(&self, user_id: &str) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.date_time);
        Ok(events)
    }

    async fn set_event_status(
        &self,
        event_id: &str,
        status: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.modify_event(event_id, |event| {
            event.status = status;
            event.updated_at = now;
        })
    }

    async fn complete_event_recommendations(
        &self,
        event_id: &str,
        recommendation_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.modify_event(event_id, |event| {
            event.recommendation_ids = recommendation_ids.to_vec();
            event.recommendations_generated = true;
            event.status = EventStatus::RecommendationsReady;
            event.updated_at = now;
        })
    }

    async fn get_closet_item(&self, item_id: &str) -> Result<Option<ClosetItem>, AppError> {
        Ok(self.closet_items.get(item_id).map(|i| i.clone()))
    }

    async fn upsert_closet_item(&self, item: &ClosetItem) -> Result<(), AppError> {
        self.closet_items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn list_closet_items(&self, user_id: &str) -> Result<Vec<ClosetItem>, AppError> {
        let mut items: Vec<ClosetItem> = self
            .closet_items
            .iter()
            .filter(|i| i.user_id == user_id)
            .map(|i| i.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn get_recommendation(&self, id: &str) -> Result<Option<Recommendation>, AppError> {
        Ok(self.recommendations.get(id).map(|r| r.clone()))
    }

    async fn insert_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> Result<(), AppError> {
        self.recommendations
            .insert(recommendation.id.clone(), recommendation.clone());
        Ok(())
    }

    async fn hit_rate_limit(
        &self,
        user_id: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AppError> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let entry = self.rate_limits.entry(rate_limit_doc_id(user_id, endpoint));
        let decision = match entry {
            Entry::Occupied(mut occupied) => {
                let (decision, next) =
                    RateLimitRecord::evaluate(Some(occupied.get()), policy, now);
                if let Some(next) = next {
                    occupied.insert(next);
                }
                decision
            }
            Entry::Vacant(vacant) => {
                let (decision, next) = RateLimitRecord::evaluate(None, policy, now);
                if let Some(next) = next {
                    vacant.insert(next);
                }
                decision
            }
        };
        Ok(decision)
    }

    async fn record_usage(&self, record: &UsageRecord) -> Result<(), AppError> {
        let month = month_key(record.created_at);
        self.monthly_usage
            .entry(monthly_usage_doc_id(&record.user_id, &month))
            .or_insert_with(|| MonthlyUsage::new(record.user_id.clone(), month))
            .apply(record);
        self.api_usage.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_monthly_usage(
        &self,
        user_id: &str,
        month: &str,
    ) -> Result<Option<MonthlyUsage>, AppError> {
        Ok(self
            .monthly_usage
            .get(&monthly_usage_doc_id(user_id, month))
            .map(|u| u.clone()))
    }
}
