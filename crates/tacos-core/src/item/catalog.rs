//! Stock catalog as published by the remote system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stock entry, keyed by its code in the owning category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub name: String,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Stock snapshot for every product category.
///
/// Field names follow the remote payload (`viandes`, `boissons`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "viandes")]
    pub meats: BTreeMap<String, StockEntry>,
    #[serde(default)]
    pub sauces: BTreeMap<String, StockEntry>,
    #[serde(default)]
    pub garnitures: BTreeMap<String, StockEntry>,
    #[serde(default)]
    pub desserts: BTreeMap<String, StockEntry>,
    #[serde(default, rename = "boissons")]
    pub drinks: BTreeMap<String, StockEntry>,
    #[serde(default)]
    pub extras: BTreeMap<String, StockEntry>,
}

/// Ingredient categories that appear inside a cart item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngredientCategory {
    Meat,
    Sauce,
    Garniture,
}

impl Catalog {
    /// Stock codes of an ingredient category, in stable order.
    pub fn codes(&self, category: IngredientCategory) -> impl Iterator<Item = &str> {
        let entries = match category {
            IngredientCategory::Meat => &self.meats,
            IngredientCategory::Sauce => &self.sauces,
            IngredientCategory::Garniture => &self.garnitures,
        };
        entries.keys().map(String::as_str)
    }

    /// Whether `code` is listed and currently in stock.
    pub fn is_available(&self, category: IngredientCategory, code: &str) -> bool {
        let entries = match category {
            IngredientCategory::Meat => &self.meats,
            IngredientCategory::Sauce => &self.sauces,
            IngredientCategory::Garniture => &self.garnitures,
        };
        entries.get(code).is_some_and(|entry| entry.in_stock)
    }
}
