use std::str::FromStr;

use rust_decimal::Decimal;

use crate::model::{CatalogDish, CatalogRestaurant, CatalogSnapshot};

pub fn price(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

pub fn restaurant(id: &str, name: &str, rating: f32, min_order: &str) -> CatalogRestaurant {
    CatalogRestaurant {
        id: id.to_string(),
        name: name.to_string(),
        category: "Casual Dining".to_string(),
        cuisine_tags: Default::default(),
        rating: Some(rating),
        prep_time: Some("25-35 min".to_string()),
        min_order: price(min_order),
        delivery_fee: price("0.500"),
        ambiance_tags: Default::default(),
        dietary_tags: Default::default(),
        feature_tags: Default::default(),
        signature_dishes: Vec::new(),
        logo_url: None,
        banner_url: None,
        is_active: true,
    }
}

pub fn dish(id: &str, name: &str, dish_price: &str, restaurant_id: &str) -> CatalogDish {
    CatalogDish {
        id: id.to_string(),
        name: name.to_string(),
        price: price(dish_price),
        category: "Mains".to_string(),
        is_available: true,
        restaurant_id: restaurant_id.to_string(),
        spice_level: 0,
        dietary_tags: Default::default(),
        meal_types: Default::default(),
        calories: None,
        image_url: None,
    }
}

pub fn snapshot(restaurants: Vec<CatalogRestaurant>, dishes: Vec<CatalogDish>) -> CatalogSnapshot {
    CatalogSnapshot {
        restaurants,
        dishes,
        recent_orders: None,
    }
}
