//! Classifier-based recommendations from an exported model bundle.

pub mod features;
pub mod model;
pub mod recommender;

pub use features::MlInput;
pub use recommender::{MlRecommendation, MlRecommender};
