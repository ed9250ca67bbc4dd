// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (style profiles)
//! - Events, closet items, and recommendations
//! - Rate-limit counters and usage ledgers (transactional)

use crate::db::{collections, monthly_usage_doc_id, rate_limit_doc_id, StyleStore};
use crate::error::AppError;
use crate::models::{
    ClosetItem, Event, EventStatus, MonthlyUsage, RateLimitDecision, RateLimitPolicy,
    RateLimitRecord, Recommendation, UsageRecord, UserProfile,
};
use crate::time_utils::month_key;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use std::future::Future;
use std::time::Duration;

/// Attempts before a contended transaction is reported as failed.
const MAX_TRANSACTION_ATTEMPTS: u32 = 10;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator does not accept real credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch-modify-write an event, preserving fields we do not touch.
    async fn modify_event<F>(&self, event_id: &str, modify: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Event) + Send,
    {
        let mut event: Event = self
            .get_doc(collections::EVENTS, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;
        modify(&mut event);
        self.set_doc(collections::EVENTS, event_id, &event).await
    }

    /// Begin a transaction and a client whose reads run inside it.
    ///
    /// Reads made through the returned client are registered with the
    /// transaction, so a concurrent commit to the same document aborts ours.
    async fn begin_read_write(
        &self,
    ) -> Result<(firestore::FirestoreDb, firestore::FirestoreTransaction<'_>), AppError> {
        let client = self.get_client()?;
        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let tx_client = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );
        Ok((tx_client, transaction))
    }

    /// Run one transaction attempt until it commits.
    ///
    /// An attempt returns `Ok(None)` when it lost a race with another
    /// writer; it is then retried with a short backoff.
    async fn with_retries<T, F, Fut>(&self, what: &str, mut attempt: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, AppError>>,
    {
        for n in 1..=MAX_TRANSACTION_ATTEMPTS {
            if let Some(value) = attempt().await? {
                return Ok(value);
            }
            tracing::debug!(what, attempt = n, "Transaction contended, retrying");
            tokio::time::sleep(Duration::from_millis(25 * u64::from(n))).await;
        }
        Err(AppError::Database(format!(
            "{} transaction still contended after {} attempts",
            what, MAX_TRANSACTION_ATTEMPTS
        )))
    }

    async fn try_hit_rate_limit(
        &self,
        doc_id: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitDecision>, AppError> {
        let (tx_client, mut transaction) = self.begin_read_write().await?;

        let current: Option<RateLimitRecord> = match tx_client
            .fluent()
            .select()
            .by_id_in(collections::RATE_LIMITS)
            .obj()
            .one(doc_id)
            .await
        {
            Ok(current) => current,
            Err(e) if is_contention(&e) => {
                let _ = transaction.rollback().await;
                return Ok(None);
            }
            Err(e) => {
                return Err(AppError::Database(format!(
                    "Failed to read rate limit in transaction: {}",
                    e
                )))
            }
        };

        let (decision, next) = RateLimitRecord::evaluate(current.as_ref(), policy, now);

        let Some(next) = next else {
            let _ = transaction.rollback().await;
            return Ok(Some(decision));
        };

        tx_client
            .fluent()
            .update()
            .in_col(collections::RATE_LIMITS)
            .document_id(doc_id)
            .object(&next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add rate limit to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(Some(decision)),
            Err(e) if is_contention(&e) => Ok(None),
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }

    async fn try_record_usage(&self, record: &UsageRecord) -> Result<Option<()>, AppError> {
        let month = month_key(record.created_at);
        let summary_id = monthly_usage_doc_id(&record.user_id, &month);
        let (tx_client, mut transaction) = self.begin_read_write().await?;

        // 1. Read the current summary inside the transaction
        let current: Option<MonthlyUsage> = match tx_client
            .fluent()
            .select()
            .by_id_in(collections::MONTHLY_USAGE)
            .obj()
            .one(&summary_id)
            .await
        {
            Ok(current) => current,
            Err(e) if is_contention(&e) => {
                let _ = transaction.rollback().await;
                return Ok(None);
            }
            Err(e) => {
                return Err(AppError::Database(format!(
                    "Failed to read usage in transaction: {}",
                    e
                )))
            }
        };

        let mut summary =
            current.unwrap_or_else(|| MonthlyUsage::new(record.user_id.clone(), month));
        summary.apply(record);

        // 2. Immutable usage record
        tx_client
            .fluent()
            .update()
            .in_col(collections::API_USAGE)
            .document_id(&record.id)
            .object(record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add usage record to transaction: {}", e))
            })?;

        // 3. Updated summary
        tx_client
            .fluent()
            .update()
            .in_col(collections::MONTHLY_USAGE)
            .document_id(&summary_id)
            .object(&summary)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add usage summary to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(Some(())),
            Err(e) if is_contention(&e) => Ok(None),
            Err(e) => Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            ))),
        }
    }
}

/// Whether a failed transaction step lost a race and may be retried.
fn is_contention(e: &FirestoreError) -> bool {
    match e {
        FirestoreError::DatabaseError(db_err) => db_err.retry_possible,
        FirestoreError::DataConflictError(_) => true,
        _ => false,
    }
}

#[async_trait]
impl StyleStore for FirestoreDb {
    // ─── Profile Operations ──────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_doc(collections::USERS, uid).await
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &profile.uid, profile).await
    }

    // ─── Event Operations ────────────────────────────────────────

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        self.get_doc(collections::EVENTS, event_id).await
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), AppError> {
        self.set_doc(collections::EVENTS, &event.id, event).await
    }

    async fn list_events_for_user(&self, user_id: &str) -> Result<Vec<Event>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EVENTS)
            .filter(move |q| q.for_all([q.field("userId").eq(user_id.clone())]))
            .order_by([("dateTime", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
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
        .await
    }

    async fn complete_event_recommendations(
        &self,
        event_id: &str,
        recommendation_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let ids = recommendation_ids.to_vec();
        self.modify_event(event_id, move |event| {
            event.recommendation_ids = ids;
            event.recommendations_generated = true;
            event.status = EventStatus::RecommendationsReady;
            event.updated_at = now;
        })
        .await
    }

    // ─── Closet Operations ───────────────────────────────────────

    async fn get_closet_item(&self, item_id: &str) -> Result<Option<ClosetItem>, AppError> {
        self.get_doc(collections::CLOSET_ITEMS, item_id).await
    }

    async fn upsert_closet_item(&self, item: &ClosetItem) -> Result<(), AppError> {
        self.set_doc(collections::CLOSET_ITEMS, &item.id, item).await
    }

    async fn list_closet_items(&self, user_id: &str) -> Result<Vec<ClosetItem>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CLOSET_ITEMS)
            .filter(move |q| q.for_all([q.field("userId").eq(user_id.clone())]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Recommendation Operations ───────────────────────────────

    async fn get_recommendation(&self, id: &str) -> Result<Option<Recommendation>, AppError> {
        self.get_doc(collections::RECOMMENDATIONS, id).await
    }

    async fn insert_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> Result<(), AppError> {
        self.set_doc(
            collections::RECOMMENDATIONS,
            &recommendation.id,
            recommendation,
        )
        .await
    }

    // ─── Rate Limits & Usage ─────────────────────────────────────

    /// Count a request inside a transaction so concurrent requests from the
    /// same user cannot both observe the same count.
    async fn hit_rate_limit(
        &self,
        user_id: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AppError> {
        let doc_id = rate_limit_doc_id(user_id, endpoint);
        self.with_retries("rate limit", || {
            self.try_hit_rate_limit(&doc_id, policy, now)
        })
        .await
    }

    async fn record_usage(&self, record: &UsageRecord) -> Result<(), AppError> {
        self.with_retries("usage", || self.try_record_usage(record))
            .await?;

        tracing::debug!(
            user_id = %record.user_id,
            operation = %record.operation,
            cost_usd = record.cost_usd,
            "Usage recorded"
        );

        Ok(())
    }

    async fn get_monthly_usage(
        &self,
        user_id: &str,
        month: &str,
    ) -> Result<Option<MonthlyUsage>, AppError> {
        self.get_doc(
            collections::MONTHLY_USAGE,
            &monthly_usage_doc_id(user_id, month),
        )
        .await
    }
}
