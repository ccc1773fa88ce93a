/// Tiered catalog-name matchers.
///
/// Restaurants: exact containment, then possessive-normalized containment,
/// then significant-token overlap. First tier that hits wins.
/// Dishes: exact word-bounded containment only.
use schemars::JsonSchema;
use serde::Serialize;

use crate::extract::find_word;
use crate::model::CatalogRestaurant;

const GENERIC_TOKENS: &[&str] = &["the", "and", "for", "cafe", "restaurant"];
const MIN_TOKEN_LEN: usize = 3;

/// Text to search in, with the normalized forms each tier needs.
#[derive(Debug, Clone)]
pub struct Haystack {
    lower: String,
    apostrophe_free: String,
    possessive_free: String,
}

impl Haystack {
    pub fn new(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            apostrophe_free: strip_apostrophes(&lower),
            possessive_free: drop_possessive(&lower),
            lower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Possessive,
    Token,
}

pub const RESTAURANT_TIERS: [MatchTier; 3] =
    [MatchTier::Exact, MatchTier::Possessive, MatchTier::Token];

/// Tiers used when scanning the whole assistant text rather than a mention.
pub const VERBATIM_TIERS: [MatchTier; 2] = [MatchTier::Exact, MatchTier::Possessive];

impl MatchTier {
    pub fn matches(self, catalog_name: &str, haystack: &Haystack, suffix: &str) -> bool {
        match self {
            MatchTier::Exact => exact_containment(catalog_name, haystack),
            MatchTier::Possessive => possessive_containment(catalog_name, haystack),
            MatchTier::Token => token_overlap(catalog_name, haystack, suffix),
        }
    }
}

pub fn exact_containment(catalog_name: &str, haystack: &Haystack) -> bool {
    let name = catalog_name.trim().to_lowercase();
    !name.is_empty() && haystack.lower.contains(&name)
}

pub fn possessive_containment(catalog_name: &str, haystack: &Haystack) -> bool {
    let lower = catalog_name.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    let apostrophe_free = strip_apostrophes(&lower);
    let possessive_free = drop_possessive(&lower);
    (!apostrophe_free.is_empty() && haystack.apostrophe_free.contains(&apostrophe_free))
        || (!possessive_free.is_empty() && haystack.possessive_free.contains(&possessive_free))
}

pub fn token_overlap(catalog_name: &str, haystack: &Haystack, suffix: &str) -> bool {
    significant_tokens(catalog_name, suffix)
        .iter()
        .any(|token| find_word(&haystack.apostrophe_free, token).is_some())
}

/// Distinctive words of a catalog name, lowercased and apostrophe-free.
pub fn significant_tokens(catalog_name: &str, suffix: &str) -> Vec<String> {
    let suffix = suffix.to_lowercase();
    catalog_name
        .split_whitespace()
        .map(|w| strip_apostrophes(&w.to_lowercase()))
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|w| w.chars().count() >= MIN_TOKEN_LEN)
        .filter(|w| !GENERIC_TOKENS.contains(&w.as_str()) && *w != suffix)
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct RestaurantMatch<'a> {
    pub restaurant: &'a CatalogRestaurant,
    pub tier: MatchTier,
}

/// Tries each tier across the whole catalog before moving to the next one,
/// so an exact hit on one restaurant beats a token hit on an earlier one.
pub fn match_restaurant<'a>(
    haystack: &Haystack,
    restaurants: &'a [CatalogRestaurant],
    tiers: &[MatchTier],
    suffix: &str,
) -> Option<RestaurantMatch<'a>> {
    tiers.iter().find_map(|&tier| {
        restaurants
            .iter()
            .find(|r| tier.matches(&r.name, haystack, suffix))
            .map(|restaurant| RestaurantMatch { restaurant, tier })
    })
}

/// Every restaurant whose name the text carries, exact or possessive-normalized.
pub fn scan_restaurants<'a>(
    haystack: &Haystack,
    restaurants: &'a [CatalogRestaurant],
    suffix: &str,
) -> Vec<RestaurantMatch<'a>> {
    restaurants
        .iter()
        .filter_map(|restaurant| {
            VERBATIM_TIERS
                .iter()
                .find(|tier| tier.matches(&restaurant.name, haystack, suffix))
                .map(|&tier| RestaurantMatch { restaurant, tier })
        })
        .collect()
}

/// Offset of the first exact, case-insensitive, whole-word occurrence.
pub fn dish_in_text(dish_name: &str, haystack: &Haystack) -> Option<usize> {
    let name = dish_name.trim().to_lowercase();
    find_word(&haystack.lower, &name)
}

fn unify_apostrophes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '`' | '\u{00B4}' | '\u{02BC}' => '\'',
            other => other,
        })
        .collect()
}

fn strip_apostrophes(s: &str) -> String {
    unify_apostrophes(s).replace('\'', "")
}

fn drop_possessive(s: &str) -> String {
    unify_apostrophes(s).replace("'s", "").replace('\'', "")
}
