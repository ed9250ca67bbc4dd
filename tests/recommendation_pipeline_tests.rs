// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recommendation generation pipeline tests.
//!
//! Run against the in-memory store with a scripted model, so every step of
//! the status machine can be observed.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use stylist_api::db::StyleStore;
use stylist_api::error::AppError;
use stylist_api::models::{ClosetCategory, EventStatus, ItemSource, Outfit};
use stylist_api::services::RecommendationGenerator;

mod common;
use common::{
    create_test_app, sample_closet_item, sample_event, sample_profile, three_outfit_reply,
    FakeReply,
};

async fn seed(app: &common::TestApp) {
    app.store.upsert_profile(&sample_profile("u1")).await.unwrap();
    app.store
        .upsert_event(&sample_event("u1", "e1", Duration::days(14)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_generate_success_persists_recommendations() {
    let app = create_test_app();
    seed(&app).await;
    app.llm.watch_event(app.store.clone(), "e1");
    app.llm.push_text(three_outfit_reply());

    let (status, body) = app
        .send(
            "POST",
            "/api/recommendations/generate",
            Some("u1"),
            Some(json!({ "eventId": "e1" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    let ids: Vec<String> = serde_json::from_value(body["recommendationIds"].clone()).unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(app.store.recommendation_count(), 3);

    // The model was called while the event was marked as generating
    assert_eq!(
        app.llm.observed_status(),
        vec![EventStatus::GeneratingRecommendations]
    );

    let event = app.store.get_event("e1").await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::RecommendationsReady);
    assert!(event.recommendations_generated);
    assert_eq!(event.recommendation_ids, ids);

    let rec = app.store.get_recommendation(&ids[1]).await.unwrap().unwrap();
    assert_eq!(rec.user_id, "u1");
    assert_eq!(rec.event_id, "e1");
    assert_eq!(rec.name, "Dusk");
    assert_eq!(rec.confidence_score, 88);
    assert_eq!(rec.total_price, 220.0);
    let Outfit::Alternatives(outfit) = &rec.outfit else {
        panic!("expected per-category outfit");
    };
    assert_eq!(outfit.items.len(), 2);
    assert_eq!(outfit.items[0].alternatives.len(), 1);
    assert_eq!(outfit.items[1].primary.source, ItemSource::Closet);

    // Successful call lands in the usage ledger
    assert_eq!(app.store.usage_record_count(), 1);
}

#[tokio::test]
async fn test_unparseable_reply_rolls_back_to_planning() {
    let app = create_test_app();
    seed(&app).await;
    app.llm.push_text("not json");

    let (status, body) = app
        .send(
            "POST",
            "/api/recommendations/generate",
            Some("u1"),
            Some(json!({ "eventId": "e1" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "ai_response_invalid");

    let event = app.store.get_event("e1").await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Planning);
    assert!(!event.recommendations_generated);
    assert_eq!(app.store.recommendation_count(), 0);

    // Failed model calls are still tracked
    assert_eq!(app.store.usage_record_count(), 1);
}

#[tokio::test]
async fn test_provider_failure_rolls_back() {
    let app = create_test_app();
    seed(&app).await;
    app.llm.push(FakeReply::Fail);

    let (status, body) = app
        .send(
            "POST",
            "/api/recommendations/generate",
            Some("u1"),
            Some(json!({ "eventId": "e1" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "ai_request_failed");
    let event = app.store.get_event("e1").await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Planning);
}

#[tokio::test]
async fn test_wrapped_reply_is_accepted() {
    let app = create_test_app();
    seed(&app).await;
    app.llm.push_text(
        json!({ "recommendations": [{ "dress": { "name": "Gown", "price": "$300" } }] })
            .to_string(),
    );

    let generator = RecommendationGenerator::new(app.store.clone(), app.llm.clone());
    let report = generator.generate("u1", "e1").await.unwrap();
    assert_eq!(report.recommendation_ids.len(), 1);

    let rec = app
        .store
        .get_recommendation(&report.recommendation_ids[0])
        .await
        .unwrap()
        .unwrap();
    let Outfit::Legacy(legacy) = rec.outfit else {
        panic!("expected legacy outfit");
    };
    assert_eq!(legacy.dress.unwrap().price, 300.0);
    assert_eq!(rec.confidence_score, 75);
    // The reply reported no total
    assert_eq!(rec.total_price, 0.0);
}

#[tokio::test]
async fn test_refuse_to_rewear_items_are_left_out_of_prompt() {
    let app = create_test_app();
    seed(&app).await;
    let now = Utc::now();
    app.store
        .upsert_closet_item(&sample_closet_item(
            "u1",
            "c1",
            "Velvet heels",
            ClosetCategory::Shoes,
            false,
            now,
        ))
        .await
        .unwrap();
    app.store
        .upsert_closet_item(&sample_closet_item(
            "u1",
            "c2",
            "Sequin clutch",
            ClosetCategory::Bag,
            true,
            now,
        ))
        .await
        .unwrap();
    app.llm.push_text(three_outfit_reply());

    let generator = RecommendationGenerator::new(app.store.clone(), app.llm.clone());
    generator.generate("u1", "e1").await.unwrap();

    let prompts = app.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Velvet heels"));
    assert!(!prompts[0].contains("Sequin clutch"));
}

#[tokio::test]
async fn test_other_users_event_is_not_found() {
    let app = create_test_app();
    seed(&app).await;
    app.store.upsert_profile(&sample_profile("u2")).await.unwrap();

    let generator = RecommendationGenerator::new(app.store.clone(), app.llm.clone());
    let result = generator.generate("u2", "e1").await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    // No status change and no model call for a rejected request
    let event = app.store.get_event("e1").await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Planning);
    assert!(app.llm.prompts().is_empty());
}

#[tokio::test]
async fn test_missing_profile_is_not_found() {
    let app = create_test_app();
    app.store
        .upsert_event(&sample_event("u1", "e1", Duration::days(3)))
        .await
        .unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/recommendations/generate",
            Some("u1"),
            Some(json!({ "eventId": "e1" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    // Not an AI call, so nothing is tracked
    assert_eq!(app.store.usage_record_count(), 0);
}

#[tokio::test]
async fn test_reset_status_after_stuck_generation() {
    let app = create_test_app();
    let mut event = sample_event("u1", "e1", Duration::days(3));
    event.status = EventStatus::GeneratingRecommendations;
    app.store.upsert_event(&event).await.unwrap();

    let generator = RecommendationGenerator::new(app.store.clone(), app.llm.clone());
    let reset = generator.reset_event_status("u1", "e1").await.unwrap();
    assert_eq!(reset.status, EventStatus::Planning);

    let stored = app.store.get_event("e1").await.unwrap().unwrap();
    assert_eq!(stored.status, EventStatus::Planning);
}
