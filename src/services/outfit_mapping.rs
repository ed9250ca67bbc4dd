// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coercion of model output into typed recommendations.
//!
//! The model's JSON is not schema-checked. Each slot has one function here
//! that takes the raw value and returns a fully defaulted typed value, so the
//! fallback policy lives in one place:
//! - strings: first non-empty of the listed field names, else empty / `None`
//! - numbers: first numeric (or "$12.50"-style string) field, else `0`
//! - confidence: clamped to 0..=100, else 75

use crate::error::AppError;
use crate::models::recommendation::{
    AlternativesOutfit, CategoryEntry, ItemSource, JewelrySet, LegacyOutfit, Outfit, OutfitItem,
    Reasoning, Recommendation, DEFAULT_CONFIDENCE_SCORE,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Longest raw response excerpt included in parse-failure logs.
const MAX_EXCERPT_CHARS: usize = 300;

// ─── Response parsing ────────────────────────────────────────────────────────

/// Remove markdown code fences and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse the model reply into a list of raw outfit objects.
///
/// Accepts a bare array or an object with a `recommendations` array.
pub fn parse_outfit_list(text: &str) -> Result<Vec<Value>, AppError> {
    let cleaned = strip_code_fences(text);
    let parsed: Value = serde_json::from_str(&cleaned).map_err(|e| {
        let excerpt: String = cleaned.chars().take(MAX_EXCERPT_CHARS).collect();
        tracing::error!(error = %e, excerpt = %excerpt, "Model reply is not valid JSON");
        AppError::AiResponseParse(format!("invalid JSON: {}", e))
    })?;

    match parsed {
        Value::Array(outfits) => Ok(outfits),
        Value::Object(mut obj) => match obj.remove("recommendations") {
            Some(Value::Array(outfits)) => Ok(outfits),
            _ => Err(AppError::AiResponseParse(
                "object reply without a recommendations array".to_string(),
            )),
        },
        _ => Err(AppError::AiResponseParse(
            "reply is neither an array nor an object".to_string(),
        )),
    }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
}

fn num_field(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_price(s),
            _ => None,
        })
        .filter(|n| n.is_finite())
}

/// Parse "$1,299.00" / "129.99 USD" style strings.
fn parse_price(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

fn str_list(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find_map(|v| match v {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
            _ => None,
        })
        .unwrap_or_default()
}

// ─── Slot coercions ──────────────────────────────────────────────────────────

/// Coerce one outfit item.
pub fn coerce_outfit_item(value: &Value) -> OutfitItem {
    let closet_item_id = str_field(value, &["closetItemId", "closet_item_id", "itemId"]);
    let source = match str_field(value, &["source", "type"])
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("closet") | Some("owned") | Some("wardrobe") => ItemSource::Closet,
        Some(_) => ItemSource::Purchase,
        None if closet_item_id.is_some() => ItemSource::Closet,
        None => ItemSource::Purchase,
    };

    OutfitItem {
        source,
        closet_item_id,
        name: str_field(value, &["name", "title", "productName", "description"])
            .unwrap_or_default(),
        brand: str_field(value, &["brand", "designer"]),
        color: str_field(value, &["color", "colour"]),
        retailer: str_field(value, &["retailer", "store", "shop"]),
        product_url: str_field(value, &["productUrl", "url", "link", "purchaseUrl"]),
        image_url: str_field(value, &["imageUrl", "image", "thumbnail"]),
        price: num_field(value, &["price", "estimatedPrice", "cost"]).unwrap_or(0.0),
    }
}

/// Coerce one per-category entry. Entries without a category or primary
/// item are dropped.
pub fn coerce_category_entry(value: &Value) -> Option<CategoryEntry> {
    let category = str_field(value, &["category", "type", "slot"])?.to_ascii_lowercase();
    let primary = value
        .get("primary")
        .or_else(|| value.get("recommended"))
        .or_else(|| value.get("item"))
        .filter(|v| v.is_object())?;

    let alternatives = value
        .get("alternatives")
        .or_else(|| value.get("options"))
        .and_then(Value::as_array)
        .map(|alts| alts.iter().filter(|v| v.is_object()).map(coerce_outfit_item).collect())
        .unwrap_or_default();

    Some(CategoryEntry {
        category,
        primary: coerce_outfit_item(primary),
        alternatives,
    })
}

/// Coerce the fixed-slot legacy outfit.
pub fn coerce_legacy_outfit(value: &Value) -> LegacyOutfit {
    let slot = |key: &str| {
        value
            .get(key)
            .filter(|v| v.is_object())
            .map(coerce_outfit_item)
    };

    let jewelry = value.get("jewelry").map(|j| {
        let items = match j {
            Value::Array(items) => items.as_slice(),
            other => other
                .get("items")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        };
        JewelrySet {
            items: items
                .iter()
                .filter(|v| v.is_object())
                .map(coerce_outfit_item)
                .collect(),
        }
    });

    LegacyOutfit {
        dress: slot("dress"),
        shoes: slot("shoes"),
        bag: slot("bag"),
        jewelry,
        outerwear: slot("outerwear"),
    }
}

/// Coerce the outfit, choosing the current shape when `items` yields at
/// least one usable category entry.
pub fn coerce_outfit(value: &Value) -> Outfit {
    let source = value.get("outfit").filter(|v| v.is_object()).unwrap_or(value);
    let entries: Vec<CategoryEntry> = source
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_category_entry).collect())
        .unwrap_or_default();

    if entries.is_empty() {
        Outfit::Legacy(coerce_legacy_outfit(source))
    } else {
        Outfit::Alternatives(AlternativesOutfit { items: entries })
    }
}

/// Coerce the reasoning block; a bare string becomes the summary.
pub fn coerce_reasoning(value: &Value) -> Reasoning {
    match value.get("reasoning") {
        Some(Value::String(summary)) => Reasoning {
            summary: summary.trim().to_string(),
            ..Default::default()
        },
        Some(r @ Value::Object(_)) => Reasoning {
            summary: str_field(r, &["summary", "overall", "explanation"]).unwrap_or_default(),
            style_notes: str_list(r, &["styleNotes", "style", "stylingTips"]),
            flattery_notes: str_list(r, &["flatteryNotes", "bodyFlattery", "flattery"]),
            weather_considerations: str_field(r, &["weatherConsiderations", "weather"])
                .unwrap_or_default(),
        },
        _ => Reasoning {
            summary: str_field(value, &["explanation", "description"]).unwrap_or_default(),
            ..Default::default()
        },
    }
}

/// Coerce the confidence score into 0..=100.
pub fn coerce_confidence(value: &Value) -> u32 {
    num_field(value, &["confidenceScore", "confidence", "score"])
        .map(|n| n.round().clamp(0.0, 100.0) as u32)
        .unwrap_or(DEFAULT_CONFIDENCE_SCORE)
}

/// Map one raw outfit object into a persisted recommendation.
pub fn coerce_recommendation(
    value: &Value,
    id: String,
    user_id: &str,
    event_id: &str,
    index: usize,
    now: DateTime<Utc>,
) -> Recommendation {
    let outfit = coerce_outfit(value);
    let total_price = num_field(value, &["totalPrice", "total", "estimatedTotal"]).unwrap_or(0.0);

    Recommendation {
        id,
        user_id: user_id.to_string(),
        event_id: event_id.to_string(),
        name: str_field(value, &["name", "title", "outfitName"])
            .unwrap_or_else(|| format!("Outfit {}", index + 1)),
        outfit,
        reasoning: coerce_reasoning(value),
        confidence_score: coerce_confidence(value),
        total_price,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn strip_code_fences_handles_json_fence() {
        assert_eq!(strip_code_fences("```json\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  [2] "), "[2]");
    }

    #[test]
    fn parse_accepts_array_and_wrapper_object() {
        assert_eq!(parse_outfit_list("[{}, {}]").unwrap().len(), 2);
        assert_eq!(
            parse_outfit_list("```json\n{\"recommendations\": [{}]}\n```")
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn parse_rejects_invalid_json_and_wrong_shapes() {
        assert!(matches!(
            parse_outfit_list("not json"),
            Err(AppError::AiResponseParse(_))
        ));
        assert!(matches!(
            parse_outfit_list("{\"outfits\": []}"),
            Err(AppError::AiResponseParse(_))
        ));
        assert!(matches!(
            parse_outfit_list("42"),
            Err(AppError::AiResponseParse(_))
        ));
    }

    #[test]
    fn outfit_item_falls_back_through_field_names() {
        let item = coerce_outfit_item(&json!({
            "title": "Satin slip dress",
            "store": "Nordstrom",
            "link": "https://example.com/p/1",
            "estimatedPrice": "$1,249.50"
        }));
        assert_eq!(item.name, "Satin slip dress");
        assert_eq!(item.retailer.as_deref(), Some("Nordstrom"));
        assert_eq!(item.product_url.as_deref(), Some("https://example.com/p/1"));
        assert_eq!(item.price, 1249.5);
        assert_eq!(item.source, ItemSource::Purchase);
    }

    #[test]
    fn outfit_item_with_closet_id_is_closet_sourced() {
        let item = coerce_outfit_item(&json!({ "closetItemId": "c9", "name": "Heels" }));
        assert_eq!(item.source, ItemSource::Closet);
        assert_eq!(item.price, 0.0);
    }

    #[test]
    fn category_entry_requires_category_and_primary() {
        assert!(coerce_category_entry(&json!({ "primary": { "name": "x" } })).is_none());
        assert!(coerce_category_entry(&json!({ "category": "shoes" })).is_none());

        let entry = coerce_category_entry(&json!({
            "category": "Shoes",
            "primary": { "name": "Pumps" },
            "alternatives": [{ "name": "Flats" }, "garbage"]
        }))
        .unwrap();
        assert_eq!(entry.category, "shoes");
        assert_eq!(entry.alternatives.len(), 1);
    }

    #[test]
    fn legacy_outfit_accepts_jewelry_array_or_object() {
        let a = coerce_legacy_outfit(&json!({ "jewelry": [{ "name": "Studs" }] }));
        let b = coerce_legacy_outfit(&json!({ "jewelry": { "items": [{ "name": "Studs" }] } }));
        assert_eq!(a, b);
        assert_eq!(a.jewelry.unwrap().items[0].name, "Studs");
    }

    #[test]
    fn recommendation_defaults_when_fields_missing() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let rec = coerce_recommendation(&json!({}), "r1".into(), "u1", "e1", 1, now);
        assert_eq!(rec.name, "Outfit 2");
        assert_eq!(rec.confidence_score, 75);
        assert_eq!(rec.total_price, 0.0);
        assert_eq!(rec.reasoning, Reasoning::default());
        assert!(matches!(rec.outfit, Outfit::Legacy(_)));
    }

    #[test]
    fn recommendation_total_defaults_to_zero_when_missing() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let rec = coerce_recommendation(
            &json!({
                "confidence": 140,
                "items": [
                    { "category": "dress", "primary": { "price": 200, "source": "purchase" } },
                    { "category": "shoes", "primary": { "closetItemId": "c1" } },
                    { "category": "bag", "primary": { "price": 50.5 },
                      "alternatives": [{ "price": 999 }] }
                ]
            }),
            "r1".into(),
            "u1",
            "e1",
            0,
            now,
        );
        // No reported total; prices are not summed on the model's behalf
        assert_eq!(rec.total_price, 0.0);
        assert_eq!(rec.confidence_score, 100);
    }

    #[test]
    fn recommendation_keeps_reported_total() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let rec = coerce_recommendation(
            &json!({ "totalPrice": "$310.00", "items": [] }),
            "r1".into(),
            "u1",
            "e1",
            0,
            now,
        );
        assert_eq!(rec.total_price, 310.0);
    }

    #[test]
    fn empty_items_fall_back_to_legacy_slots() {
        let outfit = coerce_outfit(&json!({
            "items": [],
            "dress": { "source": "purchase", "name": "Sheath", "price": 95 }
        }));
        let Outfit::Legacy(legacy) = outfit else {
            panic!("expected legacy shape");
        };
        assert_eq!(legacy.dress.unwrap().price, 95.0);

        // Entries that all fail to coerce count as empty too
        let outfit = coerce_outfit(&json!({
            "items": [{ "primary": { "name": "No category" } }],
            "shoes": { "name": "Flats" }
        }));
        assert!(matches!(outfit, Outfit::Legacy(l) if l.shoes.is_some()));
    }
}
