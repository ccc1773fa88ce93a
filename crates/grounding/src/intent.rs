use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What level of recommendation the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListingIntent {
    Restaurants,
    Items,
}

impl ListingIntent {
    pub fn wants_restaurants(self) -> bool {
        matches!(self, ListingIntent::Restaurants)
    }
}

static RESTAURANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:restaurants?|places?|spots?|eatery|eateries|where\s+(?:to|can\s+i|should\s+(?:i|we)|could\s+(?:i|we))\s+eat)\b",
    )
    .expect("valid regex")
});

// Mentioning any of these means item-level interest, even next to "place".
static FOOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:dish(?:es)?|food|meals?|snacks?|breakfast|brunch|lunch|dinner|desserts?|sweets?|drinks?|coffee|karak|tea|juices?|smoothies?|burgers?|pizzas?|pasta|noodles?|rice|chicken|beef|lamb|fish|seafood|shrimp|steak|shawarma|falafel|hummus|biryani|machboos|kebabs?|grills?|sushi|ramen|salads?|soups?|sandwich(?:es)?|wraps?|fries|wings|tacos?|curry|cuisine|italian|indian|arabic|arabian|lebanese|turkish|chinese|japanese|thai|korean|mexican|american|persian|filipino|vegan|vegetarian|halal|gluten[\s-]free|spicy)\b",
    )
    .expect("valid regex")
});

pub fn has_restaurant_phrasing(message: &str) -> bool {
    RESTAURANT_RE.is_match(message)
}

pub fn has_food_keyword(message: &str) -> bool {
    FOOD_RE.is_match(message)
}

/// Restaurant cards are shown only for pure restaurant-seeking messages.
/// A food, meal, or cuisine keyword anywhere in the message wins over
/// restaurant phrasing.
pub fn classify_listing(message: &str) -> ListingIntent {
    if has_restaurant_phrasing(message) && !has_food_keyword(message) {
        ListingIntent::Restaurants
    } else {
        ListingIntent::Items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restaurant_seeking_variants() {
        for message in [
            "show me restaurants",
            "Any good places nearby?",
            "where to eat tonight",
            "Where can I eat in Seef",
            "where should we eat",
            "recommend a nice spot",
        ] {
            assert_eq!(
                classify_listing(message),
                ListingIntent::Restaurants,
                "{message}"
            );
        }
    }

    #[test]
    fn test_food_keyword_overrides_restaurant_phrasing() {
        assert_eq!(classify_listing("show me restaurants"), ListingIntent::Restaurants);
        assert_eq!(
            classify_listing("show me restaurants with burgers"),
            ListingIntent::Items
        );
        assert_eq!(
            classify_listing("best Italian place for pasta"),
            ListingIntent::Items
        );
        assert_eq!(classify_listing("a place for dinner"), ListingIntent::Items);
    }

    #[test]
    fn test_plain_food_request_is_items() {
        assert_eq!(classify_listing("I want something spicy"), ListingIntent::Items);
        assert_eq!(classify_listing("hello"), ListingIntent::Items);
    }

    #[test]
    fn test_word_boundaries() {
        // "diner" is not "dinner", "placement" is not "place"
        assert!(!has_food_keyword("a retro diner"));
        assert!(!has_restaurant_phrasing("placement test"));
        assert!(ListingIntent::Restaurants.wants_restaurants());
        assert!(!ListingIntent::Items.wants_restaurants());
    }
}
