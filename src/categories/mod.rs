pub mod repo;
mod seed;

pub use seed::{seed_categories, DEFAULT_CATEGORIES};
