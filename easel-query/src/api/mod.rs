//! HTTP API handlers for easel-query

pub mod episodes;
pub mod health;
pub mod vocabulary;

pub use episodes::get_episodes;
pub use health::health_routes;
pub use vocabulary::{get_materials, get_tags};
