use std::collections::BTreeSet;

use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Currency amount in Bahraini dinar. Three-decimal minor units, kept exact.
pub type Price = Decimal;

pub fn format_price(price: Price) -> String {
    format!("BD {:.3}", price)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRestaurant {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuisine_tags: BTreeSet<String>,
    pub rating: Option<f32>,
    pub prep_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_order: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delivery_fee: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ambiance_tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dietary_tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature_tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signature_dishes: Vec<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDish {
    pub id: String,
    pub name: String,
    pub price: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
    pub restaurant_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spice_level: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dietary_tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meal_types: BTreeSet<String>,
    pub calories: Option<u32>,
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

// Backend rows carry explicit nulls for unset columns.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Bounded catalog view used for one grounding pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub restaurants: Vec<CatalogRestaurant>,
    #[serde(default)]
    pub dishes: Vec<CatalogDish>,
    #[serde(default)]
    pub recent_orders: Option<Vec<String>>,
}

impl CatalogSnapshot {
    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty() && self.dishes.is_empty()
    }

    pub fn restaurant(&self, id: &str) -> Option<&CatalogRestaurant> {
        self.restaurants.iter().find(|r| r.id == id)
    }

    pub fn dishes_of<'a>(&'a self, restaurant_id: &'a str) -> impl Iterator<Item = &'a CatalogDish> {
        self.dishes
            .iter()
            .filter(move |d| d.restaurant_id == restaurant_id)
    }
}

/// A name-like reference found in assistant text, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedMention {
    Inline { name: String },
    Pair { dish_name: String, restaurant_name: String },
}

/// Per-turn currency ceiling. Never carried across turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Budget(pub Price);

impl Budget {
    pub fn ceiling(&self) -> Price {
        self.0
    }

    pub fn allows(&self, price: Price) -> bool {
        price <= self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCard {
    pub id: String,
    pub name: String,
    pub restaurant_name: String,
    pub restaurant_id: String,
    pub price: Price,
    pub image: String,
    pub rating: f32,
    pub eta: String,
    pub is_restaurant: bool,
}

/// Cheapest candidate dropped by the budget filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectedCandidate {
    pub id: String,
    pub name: String,
    pub price: Price,
    pub is_restaurant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroundedReply {
    pub text: String,
    pub recommendations: Vec<RecommendationCard>,
    pub cheapest_rejected: Option<RejectedCandidate>,
}

impl GroundedReply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recommendations: Vec::new(),
            cheapest_rejected: None,
        }
    }

    pub fn restaurant_cards(&self) -> impl Iterator<Item = &RecommendationCard> {
        self.recommendations.iter().filter(|c| c.is_restaurant)
    }

    pub fn dish_cards(&self) -> impl Iterator<Item = &RecommendationCard> {
        self.recommendations.iter().filter(|c| !c.is_restaurant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_formats_with_three_decimals() {
        assert_eq!(format_price(Decimal::new(15, 1)), "BD 1.500");
        assert_eq!(format_price(Decimal::new(2750, 3)), "BD 2.750");
    }

    #[test]
    fn budget_ceiling_is_inclusive() {
        let budget = Budget(Decimal::new(2, 0));
        assert!(budget.allows(Decimal::new(2000, 3)));
        assert!(!budget.allows(Decimal::new(2001, 3)));
    }

    #[test]
    fn dish_row_defaults_missing_fields() {
        let dish: CatalogDish = serde_json::from_str(
            r#"{"id":"d1","name":"Karak","price":"0.300","restaurant_id":"r1"}"#,
        )
        .expect("dish should deserialize");
        assert!(dish.is_available);
        assert_eq!(dish.spice_level, 0);
        assert_eq!(dish.price, Decimal::new(300, 3));
    }

    #[test]
    fn restaurant_row_tolerates_nulls() {
        let restaurant: CatalogRestaurant = serde_json::from_str(
            r#"{"id":"r1","name":"Karak House Bahrain","category":null,"cuisine_tags":null,"min_order":null,"rating":null}"#,
        )
        .expect("restaurant should deserialize");
        assert!(restaurant.category.is_empty());
        assert!(restaurant.cuisine_tags.is_empty());
        assert_eq!(restaurant.min_order, Decimal::ZERO);
        assert!(restaurant.is_active, "missing is_active means listed");
    }

    #[test]
    fn card_serializes_discriminator_in_camel_case() {
        let card = RecommendationCard {
            id: "r1".to_string(),
            name: "Nando's Bahrain".to_string(),
            restaurant_name: "Nando's Bahrain".to_string(),
            restaurant_id: "r1".to_string(),
            price: Decimal::new(5000, 3),
            image: "/placeholder.svg".to_string(),
            rating: 4.5,
            eta: "20-30 min".to_string(),
            is_restaurant: true,
        };
        let json = serde_json::to_value(&card).expect("card should serialize");
        assert_eq!(json["isRestaurant"], serde_json::Value::Bool(true));
        assert_eq!(json["restaurantName"], "Nando's Bahrain");
    }
}
