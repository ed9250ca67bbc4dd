// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate-limit counters and AI usage ledgers.
//!
//! Both are updated with transactional read-modify-write in the store; the
//! pure state transitions live here so every backend applies the same rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time_utils::seconds_until;

/// Fixed-window limit for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

/// Counter stored at `rate_limits/{userId}_{endpoint}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests counted in the current window, including this one if allowed
    pub current: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
    /// Seconds until the window resets (0 when allowed)
    pub retry_after_secs: i64,
}

impl RateLimitDecision {
    /// Decision used when the check itself could not be performed.
    pub fn fail_open(policy: &RateLimitPolicy, now: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            current: 0,
            limit: policy.max_requests,
            reset_at: now + policy.window,
            retry_after_secs: 0,
        }
    }
}

impl RateLimitRecord {
    /// Apply one request to the counter.
    ///
    /// Returns the decision and, when the request is allowed, the record to
    /// write back. A denied request leaves the stored record untouched.
    pub fn evaluate(
        current: Option<&RateLimitRecord>,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> (RateLimitDecision, Option<RateLimitRecord>) {
        match current {
            Some(record) if now < record.reset_at => {
                if record.count >= policy.max_requests {
                    let decision = RateLimitDecision {
                        allowed: false,
                        current: record.count,
                        limit: policy.max_requests,
                        reset_at: record.reset_at,
                        retry_after_secs: seconds_until(now, record.reset_at),
                    };
                    (decision, None)
                } else {
                    let next = RateLimitRecord {
                        count: record.count + 1,
                        reset_at: record.reset_at,
                    };
                    let decision = RateLimitDecision {
                        allowed: true,
                        current: next.count,
                        limit: policy.max_requests,
                        reset_at: next.reset_at,
                        retry_after_secs: 0,
                    };
                    (decision, Some(next))
                }
            }
            // Missing or expired window: start a new one with this request.
            _ => {
                let next = RateLimitRecord {
                    count: 1,
                    reset_at: now + policy.window,
                };
                let decision = RateLimitDecision {
                    allowed: true,
                    current: 1,
                    limit: policy.max_requests,
                    reset_at: next.reset_at,
                    retry_after_secs: 0,
                };
                (decision, Some(next))
            }
        }
    }
}

/// Immutable record of one tracked AI call (`api_usage` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: String,
    pub user_id: String,
    /// e.g. "recommendation-generation", "closet-analysis"
    pub operation: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationUsage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// Per-user, per-month summary (`monthly_usage/{userId}_{YYYY-MM}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    pub user_id: String,
    /// "YYYY-MM"
    pub month: String,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub successful_requests: u64,
    #[serde(default)]
    pub failed_requests: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default)]
    pub by_operation: BTreeMap<String, OperationUsage>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MonthlyUsage {
    pub fn new(user_id: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            month: month.into(),
            ..Default::default()
        }
    }

    /// Fold one usage record into the summary.
    pub fn apply(&mut self, record: &UsageRecord) {
        self.request_count += 1;
        if record.success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.total_cost_usd += record.cost_usd;

        let op = self
            .by_operation
            .entry(record.operation.clone())
            .or_default();
        op.requests += 1;
        op.input_tokens += record.input_tokens;
        op.output_tokens += record.output_tokens;
        op.cost_usd += record.cost_usd;

        self.updated_at = Some(record.created_at);
    }
}
