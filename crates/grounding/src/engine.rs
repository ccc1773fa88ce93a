/// Grounding pass: unverified mentions in, verified cards out.
///
/// Ordering contract of the returned list:
/// 1. restaurant cards (only for restaurant-seeking messages), discovery order
/// 2. dishes named literally in the text, by first occurrence
/// 3. dishes implied by a matched restaurant, by descending restaurant rating
///
/// The budget filter runs after matching and before capping.
use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::assemble::{dish_card, restaurant_card, CardDefaults};
use crate::budget::extract_budget;
use crate::extract::{EntityExtractor, ExtractorConfig};
use crate::intent::classify_listing;
use crate::matcher::{
    dish_in_text, match_restaurant, scan_restaurants, Haystack, RESTAURANT_TIERS,
};
use crate::model::{
    Budget, CatalogDish, CatalogRestaurant, CatalogSnapshot, ExtractedMention, GroundedReply,
    Price, RecommendationCard, RejectedCandidate,
};

#[derive(Debug, Clone)]
pub struct GroundingConfig {
    pub extractor: ExtractorConfig,
    pub defaults: CardDefaults,
    pub max_restaurant_cards: usize,
    pub max_dish_cards: usize,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            defaults: CardDefaults::default(),
            max_restaurant_cards: 3,
            max_dish_cards: 5,
        }
    }
}

/// Reusable grounding engine. Holds only compiled configuration; every call
/// is independent.
pub struct Grounder {
    extractor: EntityExtractor,
    config: GroundingConfig,
}

impl Grounder {
    pub fn new(config: GroundingConfig) -> Self {
        Self {
            extractor: EntityExtractor::new(config.extractor.clone()),
            config,
        }
    }

    pub fn config(&self) -> &GroundingConfig {
        &self.config
    }

    /// Grounds one turn. The budget is read from `user_message`.
    pub fn ground(
        &self,
        user_message: &str,
        assistant_text: &str,
        snapshot: &CatalogSnapshot,
    ) -> GroundedReply {
        self.ground_with_budget(
            user_message,
            assistant_text,
            snapshot,
            extract_budget(user_message),
        )
    }

    pub fn ground_with_budget(
        &self,
        user_message: &str,
        assistant_text: &str,
        snapshot: &CatalogSnapshot,
        budget: Option<Budget>,
    ) -> GroundedReply {
        if snapshot.is_empty() {
            debug!("empty catalog snapshot, skipping grounding");
            return GroundedReply::text_only(assistant_text);
        }

        let text = Haystack::new(assistant_text);
        let mentions = self.extractor.extract(assistant_text);
        let resolved = self.resolve(&mentions, &text, snapshot);

        let mut filter = BudgetFilter::new(budget);

        let restaurant_cards: Vec<RecommendationCard> =
            if classify_listing(user_message).wants_restaurants() {
                resolved
                    .restaurants
                    .iter()
                    .filter(|r| filter.admit(&r.id, &r.name, r.min_order, true))
                    .take(self.config.max_restaurant_cards)
                    .map(|r| restaurant_card(r, &self.config.defaults))
                    .collect()
            } else {
                Vec::new()
            };

        let dish_cards: Vec<RecommendationCard> =
            rank_dishes(&resolved, &text, snapshot)
                .into_iter()
                .filter(|(d, _)| filter.admit(&d.id, &d.name, d.price, false))
                .take(self.config.max_dish_cards)
                .map(|(d, r)| dish_card(d, r, &self.config.defaults))
                .collect();

        debug!(
            mentions = mentions.len(),
            restaurants = restaurant_cards.len(),
            dishes = dish_cards.len(),
            rejected = filter.rejected,
            "grounding complete"
        );

        let mut recommendations = restaurant_cards;
        recommendations.extend(dish_cards);

        GroundedReply {
            text: assistant_text.to_string(),
            recommendations,
            cheapest_rejected: filter.cheapest,
        }
    }

    fn resolve<'a>(
        &self,
        mentions: &[ExtractedMention],
        text: &Haystack,
        snapshot: &'a CatalogSnapshot,
    ) -> Resolved<'a> {
        let suffix = self.config.extractor.suffix.as_str();
        let mut resolved = Resolved::default();

        for mention in mentions {
            match mention {
                ExtractedMention::Inline { name } => {
                    let hay = Haystack::new(name);
                    if let Some(m) =
                        match_restaurant(&hay, &snapshot.restaurants, &RESTAURANT_TIERS, suffix)
                    {
                        debug!(mention = %name, restaurant = %m.restaurant.name, tier = ?m.tier, "inline mention grounded");
                        resolved.push_restaurant(m.restaurant);
                    }
                }
                ExtractedMention::Pair {
                    dish_name,
                    restaurant_name,
                } => {
                    let hay = Haystack::new(restaurant_name);
                    let restaurant =
                        match_restaurant(&hay, &snapshot.restaurants, &RESTAURANT_TIERS, suffix)
                            .map(|m| m.restaurant);
                    if let Some(r) = restaurant {
                        resolved.push_restaurant(r);
                    }
                    let field = Haystack::new(dish_name);
                    match resolve_pair_dish(&field, restaurant, snapshot) {
                        Some(dish) => {
                            debug!(dish = %dish.name, "pair dish grounded");
                            resolved.push_pair_dish(dish);
                        }
                        None => {
                            debug!(dish = %dish_name, "pair dish not on the named menu, dropped");
                            resolved.dropped_pair_fields.push(field);
                        }
                    }
                }
            }
        }

        for m in scan_restaurants(text, &snapshot.restaurants, suffix) {
            resolved.push_restaurant(m.restaurant);
        }
        resolved
    }
}

impl Default for Grounder {
    fn default() -> Self {
        Self::new(GroundingConfig::default())
    }
}

/// One-shot entry point for callers that do not keep a [`Grounder`].
pub fn ground_recommendations(
    user_message: &str,
    assistant_text: &str,
    snapshot: &CatalogSnapshot,
    config: &GroundingConfig,
) -> GroundedReply {
    Grounder::new(config.clone()).ground(user_message, assistant_text, snapshot)
}

#[derive(Default)]
struct Resolved<'a> {
    restaurants: Vec<&'a CatalogRestaurant>,
    restaurant_ids: HashSet<&'a str>,
    pair_dishes: Vec<&'a CatalogDish>,
    /// Dish fields of pairs that did not resolve. The literal scan must not
    /// ground these names at some other restaurant.
    dropped_pair_fields: Vec<Haystack>,
}

impl<'a> Resolved<'a> {
    fn push_restaurant(&mut self, restaurant: &'a CatalogRestaurant) {
        if self.restaurant_ids.insert(restaurant.id.as_str()) {
            self.restaurants.push(restaurant);
        }
    }

    fn push_pair_dish(&mut self, dish: &'a CatalogDish) {
        if !self.pair_dishes.iter().any(|d| d.id == dish.id) {
            self.pair_dishes.push(dish);
        }
    }
}

/// The catalog dish a pair block names. The dish name must appear verbatim in
/// the block's dish field. When the block's restaurant resolved, only that
/// restaurant's menu counts; the longest name wins, then catalog order.
fn resolve_pair_dish<'a>(
    dish_field: &Haystack,
    restaurant: Option<&CatalogRestaurant>,
    snapshot: &'a CatalogSnapshot,
) -> Option<&'a CatalogDish> {
    snapshot
        .dishes
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_available && restaurant.is_none_or(|r| r.id == d.restaurant_id))
        .filter(|(_, d)| dish_in_text(&d.name, dish_field).is_some())
        .min_by(|(ia, a), (ib, b)| b.name.len().cmp(&a.name.len()).then_with(|| ia.cmp(ib)))
        .map(|(_, d)| d)
}

/// Literal matches first, then restaurant-implied backfill. Dishes whose
/// restaurant is missing from the snapshot are never emitted.
fn rank_dishes<'a>(
    resolved: &Resolved<'a>,
    text: &Haystack,
    snapshot: &'a CatalogSnapshot,
) -> Vec<(&'a CatalogDish, &'a CatalogRestaurant)> {
    let mut chosen_ids: HashSet<&str> = HashSet::new();
    let mut chosen_names: HashSet<String> = HashSet::new();

    // Literal group: (offset, catalog index, dish).
    let mut literal: Vec<(usize, usize, &CatalogDish)> = Vec::new();
    for &dish in &resolved.pair_dishes {
        let offset = dish_in_text(&dish.name, text).unwrap_or(usize::MAX);
        let index = catalog_index(snapshot, dish);
        chosen_ids.insert(dish.id.as_str());
        chosen_names.insert(dish.name.to_lowercase());
        literal.push((offset, index, dish));
    }

    let mut scanned: Vec<(usize, usize, &CatalogDish)> = snapshot
        .dishes
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_available && !chosen_ids.contains(d.id.as_str()))
        .filter(|(_, d)| {
            !resolved
                .dropped_pair_fields
                .iter()
                .any(|field| dish_in_text(&d.name, field).is_some())
        })
        .filter_map(|(i, d)| dish_in_text(&d.name, text).map(|offset| (offset, i, d)))
        .collect();
    // Same-named dishes at several restaurants: one card, preferring a
    // restaurant the text matched.
    scanned.sort_by(|a, b| {
        let at_a = resolved.restaurant_ids.contains(a.2.restaurant_id.as_str());
        let at_b = resolved.restaurant_ids.contains(b.2.restaurant_id.as_str());
        at_b.cmp(&at_a).then_with(|| a.1.cmp(&b.1))
    });
    for entry in scanned {
        if chosen_names.insert(entry.2.name.to_lowercase()) {
            chosen_ids.insert(entry.2.id.as_str());
            literal.push(entry);
        }
    }
    literal.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut backers: Vec<&CatalogRestaurant> = resolved.restaurants.clone();
    backers.sort_by(|a, b| compare_rating_desc(a.rating, b.rating));
    let mut implied: Vec<&CatalogDish> = Vec::new();
    for restaurant in backers {
        for dish in snapshot.dishes_of(&restaurant.id) {
            if dish.is_available && chosen_ids.insert(dish.id.as_str()) {
                implied.push(dish);
            }
        }
    }

    literal
        .into_iter()
        .map(|(_, _, d)| d)
        .chain(implied)
        .filter_map(|d| snapshot.restaurant(&d.restaurant_id).map(|r| (d, r)))
        .collect()
}

fn catalog_index(snapshot: &CatalogSnapshot, dish: &CatalogDish) -> usize {
    snapshot
        .dishes
        .iter()
        .position(|d| d.id == dish.id)
        .unwrap_or(usize::MAX)
}

fn compare_rating_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
    let a = a.unwrap_or(0.0);
    let b = b.unwrap_or(0.0);
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Admits candidates within budget, remembering the cheapest one it dropped.
struct BudgetFilter {
    budget: Option<Budget>,
    cheapest: Option<RejectedCandidate>,
    rejected: usize,
}

impl BudgetFilter {
    fn new(budget: Option<Budget>) -> Self {
        Self {
            budget,
            cheapest: None,
            rejected: 0,
        }
    }

    fn admit(&mut self, id: &str, name: &str, price: Price, is_restaurant: bool) -> bool {
        let Some(budget) = self.budget else {
            return true;
        };
        if budget.allows(price) {
            return true;
        }
        self.rejected += 1;
        debug!(candidate = %name, %price, ceiling = %budget.ceiling(), "over budget, dropped");
        if self.cheapest.as_ref().is_none_or(|c| price < c.price) {
            self.cheapest = Some(RejectedCandidate {
                id: id.to_string(),
                name: name.to_string(),
                price,
                is_restaurant,
            });
        }
        false
    }
}
