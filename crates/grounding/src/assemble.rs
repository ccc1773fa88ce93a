use crate::model::{CatalogDish, CatalogRestaurant, RecommendationCard};

/// Values substituted when a catalog record leaves a display field empty.
#[derive(Debug, Clone)]
pub struct CardDefaults {
    pub placeholder_image: String,
    pub rating: f32,
    pub eta: String,
}

impl Default for CardDefaults {
    fn default() -> Self {
        Self {
            placeholder_image: "/placeholder.svg".to_string(),
            rating: 4.5,
            eta: "20-30 min".to_string(),
        }
    }
}

pub fn restaurant_card(restaurant: &CatalogRestaurant, defaults: &CardDefaults) -> RecommendationCard {
    RecommendationCard {
        id: restaurant.id.clone(),
        name: restaurant.name.clone(),
        restaurant_name: restaurant.name.clone(),
        restaurant_id: restaurant.id.clone(),
        price: restaurant.min_order,
        image: first_image([restaurant.logo_url.as_deref(), restaurant.banner_url.as_deref()])
            .unwrap_or_else(|| defaults.placeholder_image.clone()),
        rating: rating_or_default(restaurant, defaults),
        eta: eta_or_default(restaurant, defaults),
        is_restaurant: true,
    }
}

pub fn dish_card(
    dish: &CatalogDish,
    restaurant: &CatalogRestaurant,
    defaults: &CardDefaults,
) -> RecommendationCard {
    RecommendationCard {
        id: dish.id.clone(),
        name: dish.name.clone(),
        restaurant_name: restaurant.name.clone(),
        restaurant_id: restaurant.id.clone(),
        price: dish.price,
        image: first_image([
            dish.image_url.as_deref(),
            restaurant.logo_url.as_deref(),
            restaurant.banner_url.as_deref(),
        ])
        .unwrap_or_else(|| defaults.placeholder_image.clone()),
        rating: rating_or_default(restaurant, defaults),
        eta: eta_or_default(restaurant, defaults),
        is_restaurant: false,
    }
}

fn first_image<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn rating_or_default(restaurant: &CatalogRestaurant, defaults: &CardDefaults) -> f32 {
    restaurant
        .rating
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(defaults.rating)
}

fn eta_or_default(restaurant: &CatalogRestaurant, defaults: &CardDefaults) -> String {
    restaurant
        .prep_time
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| defaults.eta.clone())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::testing::{dish, restaurant};

    #[test]
    fn restaurant_card_uses_min_order_and_defaults() {
        let mut r = restaurant("r1", "Nando's Bahrain", 4.2, "5.000");
        r.prep_time = None;
        let card = restaurant_card(&r, &CardDefaults::default());
        assert!(card.is_restaurant);
        assert_eq!(card.price, Decimal::new(5000, 3));
        assert_eq!(card.image, "/placeholder.svg");
        assert_eq!(card.eta, "20-30 min");
        assert_eq!(card.rating, 4.2);
    }

    #[test]
    fn dish_card_prefers_dish_image_then_logo() {
        let mut r = restaurant("r1", "Nando's Bahrain", 0.0, "5.000");
        r.logo_url = Some("logo.png".to_string());
        r.prep_time = Some("15 min".to_string());
        let mut d = dish("d1", "Peri-Peri Chicken", "3.500", "r1");

        let card = dish_card(&d, &r, &CardDefaults::default());
        assert!(!card.is_restaurant);
        assert_eq!(card.image, "logo.png");
        assert_eq!(card.restaurant_name, "Nando's Bahrain");
        assert_eq!(card.price, Decimal::new(3500, 3));
        assert_eq!(card.rating, 4.5);
        assert_eq!(card.eta, "15 min");

        d.image_url = Some("chicken.jpg".to_string());
        assert_eq!(dish_card(&d, &r, &CardDefaults::default()).image, "chicken.jpg");
    }

    #[test]
    fn blank_image_falls_through_to_placeholder() {
        let mut r = restaurant("r1", "Nando's Bahrain", 4.0, "1");
        r.logo_url = Some("  ".to_string());
        let defaults = CardDefaults {
            placeholder_image: "/img/none.png".to_string(),
            ..CardDefaults::default()
        };
        assert_eq!(restaurant_card(&r, &defaults).image, "/img/none.png");
    }
}
