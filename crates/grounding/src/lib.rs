pub mod assemble;
pub mod budget;
pub mod engine;
pub mod extract;
pub mod intent;
pub mod matcher;
pub mod model;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{ground_recommendations, Grounder, GroundingConfig};
pub use model::{
    Budget, CatalogDish, CatalogRestaurant, CatalogSnapshot, GroundedReply, RecommendationCard,
};
