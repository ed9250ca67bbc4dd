// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user rate limiting and AI cost accounting.

use crate::db::StyleStore;
use crate::error::AppError;
use crate::models::{MonthlyUsage, RateLimitDecision, RateLimitPolicy, UsageRecord};
use crate::services::llm::{estimate_cost, ClaudeModel};
use crate::time_utils::month_key;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Endpoint keys for rate-limit counters.
pub mod endpoints {
    pub const GENERATE_RECOMMENDATIONS: &str = "generate-recommendations";
    pub const ANALYZE_CLOSET: &str = "analyze-closet";
}

/// Operation names in the usage ledger.
pub mod operations {
    pub const RECOMMENDATION_GENERATION: &str = "recommendation-generation";
    pub const CLOSET_ANALYSIS: &str = "closet-analysis";
}

/// Ten generation runs per hour.
pub fn generate_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        max_requests: 10,
        window: Duration::hours(1),
    }
}

/// Thirty photo analyses per hour.
pub fn analyze_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        max_requests: 30,
        window: Duration::hours(1),
    }
}

/// Fixed-window limiter backed by the store's transactional counter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn StyleStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn StyleStore>) -> Self {
        Self { store }
    }

    /// Count one request; denial becomes [`AppError::RateLimited`].
    pub async fn enforce(
        &self,
        user_id: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, AppError> {
        let decision = self.check(user_id, endpoint, policy).await;
        if decision.allowed {
            return Ok(decision);
        }

        tracing::warn!(
            user_id,
            endpoint,
            current = decision.current,
            limit = decision.limit,
            retry_after_secs = decision.retry_after_secs,
            "Rate limit exceeded"
        );
        Err(AppError::RateLimited {
            reset_at: decision.reset_at,
            retry_after_secs: decision.retry_after_secs,
            current: decision.current,
            limit: decision.limit,
        })
    }

    pub async fn check(
        &self,
        user_id: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
    ) -> RateLimitDecision {
        self.check_at(user_id, endpoint, policy, Utc::now()).await
    }

    /// Check at a given instant. Store failures allow the request.
    pub async fn check_at(
        &self,
        user_id: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        match self.store.hit_rate_limit(user_id, endpoint, policy, now).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(
                    user_id,
                    endpoint,
                    error = %e,
                    "Rate limit check failed, allowing request"
                );
                RateLimitDecision::fail_open(policy, now)
            }
        }
    }
}

/// Result of comparing this month's spend with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCheck {
    pub current_usd: f64,
    pub limit_usd: f64,
    pub exceeded: bool,
}

/// Writes the usage ledger and answers budget questions.
#[derive(Clone)]
pub struct UsageTracker {
    store: Arc<dyn StyleStore>,
}

impl UsageTracker {
    pub fn new(store: Arc<dyn StyleStore>) -> Self {
        Self { store }
    }

    /// Build a ledger record for one model call.
    pub fn record(
        user_id: &str,
        operation: &str,
        model: ClaudeModel,
        input_tokens: u64,
        output_tokens: u64,
        error: Option<String>,
    ) -> UsageRecord {
        UsageRecord {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            operation: operation.to_string(),
            model: model.api_id().to_string(),
            input_tokens,
            output_tokens,
            cost_usd: estimate_cost(input_tokens, output_tokens, model),
            success: error.is_none(),
            error,
            created_at: Utc::now(),
        }
    }

    /// Persist a usage record. Failures are logged, never returned.
    pub async fn track(&self, record: UsageRecord) {
        if let Err(e) = self.store.record_usage(&record).await {
            tracing::error!(
                user_id = %record.user_id,
                operation = %record.operation,
                error = %e,
                "Failed to record usage"
            );
        }
    }

    /// This month's accumulated usage, if any.
    pub async fn monthly_usage(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MonthlyUsage>, AppError> {
        self.store.get_monthly_usage(user_id, &month_key(now)).await
    }

    pub async fn check_cost_threshold(
        &self,
        user_id: &str,
        limit_usd: f64,
    ) -> Result<CostCheck, AppError> {
        let current_usd = self
            .monthly_usage(user_id, Utc::now())
            .await?
            .map(|u| u.total_cost_usd)
            .unwrap_or(0.0);

        Ok(CostCheck {
            current_usd,
            limit_usd,
            exceeded: current_usd >= limit_usd,
        })
    }

    /// Fail with [`AppError::CostLimitExceeded`] once the ceiling is reached.
    pub async fn enforce_budget(&self, user_id: &str, limit_usd: f64) -> Result<(), AppError> {
        let check = self.check_cost_threshold(user_id, limit_usd).await?;
        if check.exceeded {
            tracing::warn!(
                user_id,
                current_usd = check.current_usd,
                limit_usd,
                "Monthly AI budget exhausted"
            );
            return Err(AppError::CostLimitExceeded {
                current_usd: check.current_usd,
                limit_usd: check.limit_usd,
            });
        }
        Ok(())
    }
}
