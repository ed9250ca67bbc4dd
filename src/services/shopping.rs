// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopping list projection of recommendations.
//!
//! All functions here are pure: extraction turns one recommendation into
//! shopping items for its event, and the filter / sort / stats helpers
//! operate on the resulting list.

use crate::models::{
    Event, ItemSource, Outfit, OutfitItem, PurchaseStatus, Recommendation, SelectedOutfit,
    ShoppingFilters, ShoppingItem, ShoppingStats, SortBy,
};
use crate::time_utils::days_until;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Items for events within this many days are urgent.
pub const URGENT_WITHIN_DAYS: i64 = 7;

/// Retailer bucket for items without one.
const UNKNOWN_RETAILER: &str = "unknown";

/// Project one recommendation into shopping items.
///
/// For the per-category shape, a selection stored on the event for this
/// recommendation picks one option per category (respecting the
/// dress/separates mode); without a selection every primary is emitted.
/// Legacy outfits emit every present slot and each jewelry piece.
pub fn extract_shopping_items(
    recommendation: &Recommendation,
    event: &Event,
    now: DateTime<Utc>,
) -> Vec<ShoppingItem> {
    let days = days_until(now, event.date_time);
    let emit = |category: &str, index: usize, item: &OutfitItem| {
        to_shopping_item(recommendation, event, category, index, item, days)
    };

    match &recommendation.outfit {
        Outfit::Alternatives(current) => {
            let selection = event
                .selected_outfit
                .as_ref()
                .filter(|s| s.recommendation_id == recommendation.id);

            match selection {
                Some(selection) => current
                    .items
                    .iter()
                    .filter(|entry| !is_excluded(selection, &entry.category))
                    .filter_map(|entry| {
                        let index = selection.index_for(&entry.category);
                        let item = entry.option(index);
                        if item.is_none() {
                            tracing::warn!(
                                recommendation_id = %recommendation.id,
                                category = %entry.category,
                                index,
                                "Selected option index out of range"
                            );
                        }
                        item.map(|item| emit(&entry.category, index, item))
                    })
                    .collect(),
                None => current
                    .items
                    .iter()
                    .map(|entry| emit(&entry.category, 0, &entry.primary))
                    .collect(),
            }
        }
        Outfit::Legacy(legacy) => {
            let mut items = Vec::new();
            let slots = [
                ("dress", &legacy.dress),
                ("shoes", &legacy.shoes),
                ("bag", &legacy.bag),
            ];
            for (category, slot) in slots {
                if let Some(item) = slot {
                    items.push(emit(category, 0, item));
                }
            }
            if let Some(jewelry) = &legacy.jewelry {
                for (index, item) in jewelry.items.iter().enumerate() {
                    items.push(emit("jewelry", index, item));
                }
            }
            if let Some(item) = &legacy.outerwear {
                items.push(emit("outerwear", 0, item));
            }
            items
        }
    }
}

fn is_excluded(selection: &SelectedOutfit, category: &str) -> bool {
    selection.mode.is_some_and(|mode| mode.excludes(category))
}

fn to_shopping_item(
    recommendation: &Recommendation,
    event: &Event,
    category: &str,
    index: usize,
    item: &OutfitItem,
    days_until_event: i64,
) -> ShoppingItem {
    ShoppingItem {
        id: format!("{}-{}-{}", recommendation.id, category, index),
        event_id: event.id.clone(),
        event_name: event.name.clone(),
        event_date: event.date_time,
        recommendation_id: recommendation.id.clone(),
        category: category.to_string(),
        item_index: index,
        name: item.name.clone(),
        brand: item.brand.clone(),
        color: item.color.clone(),
        image_url: item.image_url.clone(),
        product_url: item.product_url.clone(),
        retailer: item.retailer.clone(),
        price: item.price,
        source: item.source,
        closet_item_id: item.closet_item_id.clone(),
        days_until_event,
        is_urgent: is_urgent(days_until_event),
        // No purchases ledger is consulted.
        purchase_status: PurchaseStatus::Unpurchased,
    }
}

/// `0 < days <= 7`; events already under way are not urgent.
pub fn is_urgent(days_until_event: i64) -> bool {
    days_until_event > 0 && days_until_event <= URGENT_WITHIN_DAYS
}

/// Keep items matching every active filter.
pub fn apply_filters(items: Vec<ShoppingItem>, filters: &ShoppingFilters) -> Vec<ShoppingItem> {
    items
        .into_iter()
        .filter(|item| matches_filters(item, filters))
        .collect()
}

fn matches_filters(item: &ShoppingItem, f: &ShoppingFilters) -> bool {
    fn member<T: PartialEq>(set: &[T], value: &T) -> bool {
        set.is_empty() || set.contains(value)
    }

    member(&f.event_ids, &item.event_id)
        && member(&f.categories, &item.category)
        && member(&f.statuses, &item.purchase_status)
        && f.min_price.map_or(true, |min| item.price >= min)
        && f.max_price.map_or(true, |max| item.price <= max)
        && (f.retailers.is_empty()
            || item
                .retailer
                .as_ref()
                .is_some_and(|r| f.retailers.contains(r)))
        && (!f.urgent_only || item.is_urgent)
        && (!f.closet_only || item.source == ItemSource::Closet)
        && (!f.purchase_only || item.source == ItemSource::Purchase)
}

/// Stable sort; equal keys keep their input order.
pub fn sort_items(items: &mut [ShoppingItem], sort_by: SortBy) {
    match sort_by {
        SortBy::EventDateAsc => items.sort_by(|a, b| a.event_date.cmp(&b.event_date)),
        SortBy::EventDateDesc => items.sort_by(|a, b| b.event_date.cmp(&a.event_date)),
        SortBy::PriceAsc => items.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortBy::PriceDesc => items.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortBy::Category => items.sort_by(|a, b| a.category.cmp(&b.category)),
        SortBy::Retailer => items.sort_by(|a, b| {
            let (ra, rb) = (a.retailer.as_deref(), b.retailer.as_deref());
            ra.unwrap_or("").cmp(rb.unwrap_or(""))
        }),
        SortBy::Status => items.sort_by(|a, b| a.purchase_status.cmp(&b.purchase_status)),
    }
}

/// Aggregate counts and cost in one pass.
pub fn calculate_stats(items: &[ShoppingItem]) -> ShoppingStats {
    let mut stats = ShoppingStats::default();
    let mut events = BTreeSet::new();

    for item in items {
        stats.total_items += 1;
        *stats.by_status.entry(item.purchase_status).or_default() += 1;
        *stats.by_category.entry(item.category.clone()).or_default() += 1;
        *stats
            .by_retailer
            .entry(
                item.retailer
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_RETAILER.to_string()),
            )
            .or_default() += 1;
        *stats.by_event.entry(item.event_id.clone()).or_default() += 1;

        if item.purchase_status != PurchaseStatus::Skipped {
            stats.total_estimated_cost += item.price;
        }
        if item.is_urgent {
            stats.urgent_count += 1;
        }
        events.insert(item.event_id.as_str());
    }

    stats.event_count = events.len();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventLocation, OutfitMode};
    use crate::models::recommendation::{JewelrySet, LegacyOutfit};
    use crate::models::{AlternativesOutfit, CategoryEntry, EventStatus, Reasoning};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn event_in(days: i64) -> Event {
        Event {
            id: "e1".to_string(),
            user_id: "u1".to_string(),
            name: "Gala".to_string(),
            event_type: "gala".to_string(),
            dress_code: None,
            location: EventLocation::default(),
            date_time: now() + Duration::days(days),
            weather: None,
            shipping_deadline: None,
            activity_level: None,
            notes: None,
            status: EventStatus::RecommendationsReady,
            recommendation_ids: vec!["r1".to_string()],
            recommendations_generated: true,
            selected_outfit: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn item(name: &str, price: f64) -> OutfitItem {
        OutfitItem {
            name: name.to_string(),
            price,
            retailer: Some("Nordstrom".to_string()),
            ..Default::default()
        }
    }

    fn entry(category: &str, options: &[&str]) -> CategoryEntry {
        CategoryEntry {
            category: category.to_string(),
            primary: item(options[0], 100.0),
            alternatives: options[1..].iter().map(|n| item(n, 50.0)).collect(),
        }
    }

    fn recommendation(outfit: Outfit) -> Recommendation {
        Recommendation {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            event_id: "e1".to_string(),
            name: "Look".to_string(),
            outfit,
            reasoning: Reasoning::default(),
            confidence_score: 75,
            total_price: 0.0,
            created_at: now(),
        }
    }

    fn alternatives() -> Recommendation {
        recommendation(Outfit::Alternatives(AlternativesOutfit {
            items: vec![
                entry("dress", &["Slip dress", "Wrap dress"]),
                entry("tops", &["Silk blouse"]),
                entry("bottoms", &["Wide trousers"]),
                entry("shoes", &["Pumps", "Sandals", "Mules"]),
            ],
        }))
    }

    #[test]
    fn without_selection_emits_every_primary() {
        let items = extract_shopping_items(&alternatives(), &event_in(10), now());
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Slip dress", "Silk blouse", "Wide trousers", "Pumps"]);
        assert!(items.iter().all(|i| i.item_index == 0));
        assert!(items
            .iter()
            .all(|i| i.purchase_status == PurchaseStatus::Unpurchased));
    }

    #[test]
    fn selection_picks_option_and_applies_dress_mode() {
        let mut event = event_in(10);
        event.selected_outfit = Some(SelectedOutfit {
            recommendation_id: "r1".to_string(),
            selections: BTreeMap::from([("dress".to_string(), 1), ("shoes".to_string(), 2)]),
            mode: Some(OutfitMode::Dress),
            total_price: 0.0,
            selected_at: now(),
        });

        let items = extract_shopping_items(&alternatives(), &event, now());
        let picked: Vec<_> = items
            .iter()
            .map(|i| (i.category.as_str(), i.name.as_str(), i.item_index))
            .collect();
        assert_eq!(picked, [("dress", "Wrap dress", 1), ("shoes", "Mules", 2)]);
        assert_eq!(items[1].id, "r1-shoes-2");
    }

    #[test]
    fn separates_mode_skips_dress() {
        let mut event = event_in(10);
        event.selected_outfit = Some(SelectedOutfit {
            recommendation_id: "r1".to_string(),
            selections: BTreeMap::new(),
            mode: Some(OutfitMode::Separates),
            total_price: 0.0,
            selected_at: now(),
        });

        let items = extract_shopping_items(&alternatives(), &event, now());
        assert!(items.iter().all(|i| i.category != "dress"));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn selection_for_other_recommendation_is_ignored() {
        let mut event = event_in(10);
        event.selected_outfit = Some(SelectedOutfit {
            recommendation_id: "other".to_string(),
            selections: BTreeMap::from([("shoes".to_string(), 1)]),
            mode: Some(OutfitMode::Dress),
            total_price: 0.0,
            selected_at: now(),
        });
        assert_eq!(
            extract_shopping_items(&alternatives(), &event, now()).len(),
            4
        );
    }

    #[test]
    fn legacy_emits_slots_and_each_jewelry_piece() {
        let rec = recommendation(Outfit::Legacy(LegacyOutfit {
            dress: Some(item("Gown", 300.0)),
            shoes: None,
            bag: Some(item("Clutch", 80.0)),
            jewelry: Some(JewelrySet {
                items: vec![item("Earrings", 40.0), item("Bracelet", 30.0)],
            }),
            outerwear: Some(item("Wrap", 60.0)),
        }));

        let items = extract_shopping_items(&rec, &event_in(3), now());
        let categories: Vec<_> = items.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(categories, ["dress", "bag", "jewelry", "jewelry", "outerwear"]);
        assert!(items.iter().all(|i| i.is_urgent && i.days_until_event == 3));
    }

    #[test]
    fn stored_outfit_with_empty_items_lists_legacy_slots() {
        let outfit: Outfit = serde_json::from_value(serde_json::json!({
            "items": [],
            "dress": { "source": "purchase", "name": "Sheath", "price": 95.0 }
        }))
        .unwrap();

        let items = extract_shopping_items(&recommendation(outfit), &event_in(10), now());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "r1-dress-0");
        assert_eq!(items[0].price, 95.0);
    }

    #[test]
    fn urgency_boundaries() {
        assert!(!is_urgent(0));
        assert!(is_urgent(1));
        assert!(is_urgent(7));
        assert!(!is_urgent(8));
        assert!(!is_urgent(-2));
    }

    #[test]
    fn partial_day_rounds_up() {
        let mut event = event_in(0);
        event.date_time = now() + Duration::hours(5);
        let items = extract_shopping_items(&alternatives(), &event, now());
        assert_eq!(items[0].days_until_event, 1);
        assert!(items[0].is_urgent);
    }

    fn list() -> Vec<ShoppingItem> {
        let mut items = extract_shopping_items(&alternatives(), &event_in(10), now());
        items[1].source = ItemSource::Closet;
        items[1].retailer = None;
        items[2].purchase_status = PurchaseStatus::Skipped;
        items[3].price = 20.0;
        items
    }

    #[test]
    fn filters_are_and_combined() {
        let filters = ShoppingFilters {
            purchase_only: true,
            max_price: Some(99.0),
            ..Default::default()
        };
        let kept = apply_filters(list(), &filters);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Pumps");
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let filters = ShoppingFilters {
            min_price: Some(100.0),
            max_price: Some(100.0),
            ..Default::default()
        };
        assert_eq!(apply_filters(list(), &filters).len(), 3);
    }

    #[test]
    fn retailer_filter_excludes_items_without_retailer() {
        let filters = ShoppingFilters {
            retailers: vec!["Nordstrom".to_string()],
            ..Default::default()
        };
        assert_eq!(apply_filters(list(), &filters).len(), 3);
    }

    #[test]
    fn empty_filters_keep_everything() {
        assert_eq!(apply_filters(list(), &ShoppingFilters::default()).len(), 4);
    }

    #[test]
    fn price_sort_is_stable() {
        let mut items = list();
        sort_items(&mut items, SortBy::PriceDesc);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Slip dress", "Silk blouse", "Wide trousers", "Pumps"]);

        sort_items(&mut items, SortBy::PriceAsc);
        assert_eq!(items[0].name, "Pumps");
        assert_eq!(items[1].name, "Slip dress");
    }

    #[test]
    fn status_sort_follows_lifecycle_order() {
        let mut items = list();
        sort_items(&mut items, SortBy::Status);
        assert_eq!(items[3].purchase_status, PurchaseStatus::Skipped);
    }

    #[test]
    fn stats_skip_skipped_items_in_cost() {
        let stats = calculate_stats(&list());
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.total_estimated_cost, 220.0);
        assert_eq!(stats.by_status[&PurchaseStatus::Skipped], 1);
        assert_eq!(stats.by_retailer["unknown"], 1);
        assert_eq!(stats.by_retailer["Nordstrom"], 3);
        assert_eq!(stats.urgent_count, 0);
        assert_eq!(stats.event_count, 1);
    }

    fn ids(items: &[ShoppingItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn filters_are_idempotent_and_commute() {
        let by_category = ShoppingFilters {
            categories: vec!["dress".to_string(), "shoes".to_string()],
            ..Default::default()
        };
        let by_price = ShoppingFilters {
            max_price: Some(50.0),
            ..Default::default()
        };
        let both = ShoppingFilters {
            categories: by_category.categories.clone(),
            max_price: by_price.max_price,
            ..Default::default()
        };

        for f in [&by_category, &by_price, &both] {
            let once = apply_filters(list(), f);
            assert_eq!(apply_filters(once.clone(), f), once);
        }

        let category_first = apply_filters(apply_filters(list(), &by_category), &by_price);
        let price_first = apply_filters(apply_filters(list(), &by_price), &by_category);
        assert_eq!(category_first, price_first);
        assert_eq!(category_first, apply_filters(list(), &both));
        assert_eq!(ids(&category_first), ["r1-shoes-0"]);
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        let mut expected = ids(&list()).into_iter().map(String::from).collect::<Vec<_>>();
        expected.sort();

        for sort_by in [
            SortBy::EventDateAsc,
            SortBy::EventDateDesc,
            SortBy::PriceAsc,
            SortBy::PriceDesc,
            SortBy::Category,
            SortBy::Retailer,
            SortBy::Status,
        ] {
            let mut once = list();
            sort_items(&mut once, sort_by);
            let mut twice = once.clone();
            sort_items(&mut twice, sort_by);
            assert_eq!(twice, once, "{sort_by:?}");

            let mut sorted_ids = ids(&once).into_iter().map(String::from).collect::<Vec<_>>();
            sorted_ids.sort();
            assert_eq!(sorted_ids, expected, "{sort_by:?}");
        }
    }

    #[test]
    fn skipping_an_item_removes_exactly_its_price() {
        let items = list();
        let before = calculate_stats(&items).total_estimated_cost;

        for (index, item) in items.iter().enumerate() {
            if item.purchase_status == PurchaseStatus::Skipped {
                continue;
            }
            let mut flipped = items.clone();
            flipped[index].purchase_status = PurchaseStatus::Skipped;
            let after = calculate_stats(&flipped).total_estimated_cost;
            assert!(
                (before - after - item.price).abs() < 1e-9,
                "{}: {before} -> {after}",
                item.name
            );
        }
    }

    #[test]
    fn stats_of_empty_list_are_zero() {
        assert_eq!(calculate_stats(&[]), ShoppingStats::default());
    }
}
