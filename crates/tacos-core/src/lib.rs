pub mod config;
pub mod error;
pub mod item;
pub mod mapping;
pub mod order;
pub mod recipe_id;
pub mod session;

// Re-export common error type
pub use error::{Result, TacosError};
