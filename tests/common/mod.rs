// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use stylist_api::config::Config;
use stylist_api::db::{FirestoreDb, MemoryStore, StyleStore};
use stylist_api::error::AppError;
use stylist_api::models::closet::{ClosetImageUrls, UserTags};
use stylist_api::models::event::EventLocation;
use stylist_api::models::{AiTags, ClosetCategory, ClosetItem, Event, EventStatus, UserProfile};
use stylist_api::routes::create_router;
use stylist_api::services::firebase_auth::FirebaseClaims;
use stylist_api::services::{ClaudeModel, FirebaseTokenVerifier, LlmGateway};
use stylist_api::AppState;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake model gateway ──────────────────────────────────────────────────────

/// Scripted reply for one model call.
#[allow(dead_code)]
pub enum FakeReply {
    Text(String),
    Fail,
    /// Reply after sleeping, for timeout tests
    Slow(std::time::Duration, String),
}

/// In-process [`LlmGateway`] that replays scripted replies in order and
/// records what it was sent.
#[derive(Default)]
pub struct FakeLlm {
    replies: Mutex<VecDeque<FakeReply>>,
    prompts: Mutex<Vec<String>>,
    image_urls: Mutex<Vec<Vec<String>>>,
    /// Event status observed at call time, when watching an event
    watch: Mutex<Option<(Arc<MemoryStore>, String)>>,
    observed_status: Mutex<Vec<EventStatus>>,
}

#[allow(dead_code)]
impl FakeLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: FakeReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(FakeReply::Text(text.into()));
    }

    pub fn watch_event(&self, store: Arc<MemoryStore>, event_id: &str) {
        *self.watch.lock().unwrap() = Some((store, event_id.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn image_urls(&self) -> Vec<Vec<String>> {
        self.image_urls.lock().unwrap().clone()
    }

    pub fn observed_status(&self) -> Vec<EventStatus> {
        self.observed_status.lock().unwrap().clone()
    }

    async fn reply(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let watch = self.watch.lock().unwrap().clone();
        if let Some((store, event_id)) = watch {
            if let Some(event) = store.get_event(&event_id).await? {
                self.observed_status.lock().unwrap().push(event.status);
            }
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(FakeReply::Text(text)) => Ok(text),
            Some(FakeReply::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(FakeReply::Fail) | None => Err(AppError::AiRequestFailed),
        }
    }
}

#[async_trait]
impl LlmGateway for FakeLlm {
    async fn send_message(
        &self,
        prompt: &str,
        _model: ClaudeModel,
        _max_tokens: u32,
    ) -> Result<String, AppError> {
        self.reply(prompt).await
    }

    async fn send_message_with_images(
        &self,
        prompt: &str,
        image_urls: &[String],
        _model: ClaudeModel,
        _max_tokens: u32,
    ) -> Result<String, AppError> {
        self.image_urls.lock().unwrap().push(image_urls.to_vec());
        self.reply(prompt).await
    }
}

// ─── Test app ────────────────────────────────────────────────────────────────

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<FakeLlm>,
    pub config: Config,
}

/// Create a test app on the in-memory store and a scripted model.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let llm = Arc::new(FakeLlm::new());
    let secret = config
        .auth_dev_secret
        .clone()
        .expect("test config has a dev secret");
    let verifier = Arc::new(
        FirebaseTokenVerifier::new_with_shared_secret(&config.gcp_project_id, &secret).unwrap(),
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        store.clone(),
        llm.clone(),
        verifier,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        llm,
        config,
    }
}

/// Mint an HS256 ID token the test verifier accepts.
#[allow(dead_code)]
pub fn create_test_jwt(config: &Config, uid: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = FirebaseClaims {
        sub: uid.to_string(),
        aud: config.gcp_project_id.clone(),
        iss: format!("https://securetoken.google.com/{}", config.gcp_project_id),
        exp: (now + 3600) as usize,
        iat: Some(now as usize),
        email: Some(format!("{uid}@example.com")),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.auth_dev_secret.as_deref().unwrap()),
    )
    .unwrap()
}

#[allow(dead_code)]
impl TestApp {
    pub fn token(&self, uid: &str) -> String {
        create_test_jwt(&self.config, uid)
    }

    /// Send a request as `uid` (or anonymously) and decode the JSON body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        uid: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(uid) = uid {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(uid)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

#[allow(dead_code)]
pub fn sample_profile(uid: &str) -> UserProfile {
    let mut profile = UserProfile::new_default(uid, None, Some("Test User".to_string()), Utc::now());
    profile.style_profile.style_words = vec!["classic".to_string(), "minimal".to_string()];
    profile.style_profile.loved_brands = vec!["Reformation".to_string()];
    profile
}

#[allow(dead_code)]
pub fn sample_event(uid: &str, id: &str, starts_in: Duration) -> Event {
    let now = Utc::now();
    Event {
        id: id.to_string(),
        user_id: uid.to_string(),
        name: "Garden wedding".to_string(),
        event_type: "wedding".to_string(),
        dress_code: Some("cocktail".to_string()),
        location: EventLocation {
            city: "Napa".to_string(),
            state: Some("CA".to_string()),
            country: Some("US".to_string()),
            venue: None,
            setting: Some("outdoor".to_string()),
        },
        date_time: now + starts_in,
        weather: None,
        shipping_deadline: None,
        activity_level: None,
        notes: None,
        status: EventStatus::Planning,
        recommendation_ids: vec![],
        recommendations_generated: false,
        selected_outfit: None,
        created_at: now,
        updated_at: now,
    }
}

#[allow(dead_code)]
pub fn sample_closet_item(
    uid: &str,
    id: &str,
    name: &str,
    category: ClosetCategory,
    refuse_to_rewear: bool,
    created_at: DateTime<Utc>,
) -> ClosetItem {
    ClosetItem {
        id: id.to_string(),
        user_id: uid.to_string(),
        category,
        name: Some(name.to_string()),
        image_urls: ClosetImageUrls {
            original: format!("https://firebasestorage.googleapis.com/{id}.jpg"),
            thumbnail: None,
            processed: None,
        },
        ai_tags: AiTags {
            colors: vec!["black".to_string()],
            ..Default::default()
        },
        user_tags: UserTags {
            refuse_to_rewear,
            ..Default::default()
        },
        worn_count: 0,
        created_at,
    }
}

/// A three-outfit reply in the per-category shape.
#[allow(dead_code)]
pub fn three_outfit_reply() -> String {
    let outfit = |name: &str, price: f64| {
        serde_json::json!({
            "name": name,
            "items": [
                {
                    "category": "dress",
                    "primary": { "source": "purchase", "name": format!("{name} dress"),
                                 "retailer": "Nordstrom", "price": price },
                    "alternatives": [{ "source": "purchase", "name": "Alt dress",
                                       "retailer": "Revolve", "price": 90 }]
                },
                {
                    "category": "shoes",
                    "primary": { "source": "closet", "closetItemId": "c1", "name": "Black pumps" }
                }
            ],
            "reasoning": { "summary": "Works for a garden party", "styleNotes": ["Keep it light"] },
            "confidenceScore": 88,
            "totalPrice": price
        })
    };
    format!(
        "```json\n{}\n```",
        serde_json::json!([outfit("Sunlit", 150.0), outfit("Dusk", 220.0), outfit("Classic", 180.0)])
    )
}
