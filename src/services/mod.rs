// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod closet_analysis;
pub mod firebase_auth;
pub mod llm;
pub mod outfit_mapping;
pub mod prompts;
pub mod recommendation;
pub mod shopping;
pub mod usage;
pub mod weather;

pub use closet_analysis::{ClosetAnalysis, ClosetAnalyzer};
pub use firebase_auth::{FirebaseTokenVerifier, VerifiedIdentity};
pub use llm::{AnthropicClient, ClaudeModel, LlmGateway};
pub use recommendation::{GenerationReport, RecommendationGenerator};
pub use usage::{CostCheck, RateLimiter, UsageTracker};
pub use weather::{Units, WeatherClient};
