//! Cart item domain module.
//!
//! - `model`: sizes, requested items (`ItemSpec`) and decoded line items
//! - `catalog`: stock snapshot used to resolve ingredient names to codes

mod catalog;
mod model;

pub use catalog::{Catalog, IngredientCategory, StockEntry};
pub use model::{ItemSpec, MeatSelection, ParsedIngredient, ParsedLineItem, TacoOrder, TacoSize};
