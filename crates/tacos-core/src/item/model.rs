//! Cart item models: sizes, requested items and decoded line items.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Size codes understood by the remote system.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
pub enum TacoSize {
    #[serde(rename = "tacos_L")]
    #[strum(serialize = "tacos_L")]
    L,
    #[serde(rename = "tacos_BOWL")]
    #[strum(serialize = "tacos_BOWL")]
    Bowl,
    #[serde(rename = "tacos_L_mixte")]
    #[strum(serialize = "tacos_L_mixte")]
    LMixte,
    #[serde(rename = "tacos_XL")]
    #[strum(serialize = "tacos_XL")]
    Xl,
    #[serde(rename = "tacos_XXL")]
    #[strum(serialize = "tacos_XXL")]
    Xxl,
    #[serde(rename = "tacos_GIGA")]
    #[strum(serialize = "tacos_GIGA")]
    Giga,
}

impl TacoSize {
    /// The literal size code sent to (and hashed for) the remote system.
    pub fn code(&self) -> &'static str {
        (*self).into()
    }

    /// Maximum number of distinct meats the remote form accepts for this size.
    pub fn max_meats(&self) -> usize {
        match self {
            TacoSize::L => 1,
            TacoSize::Bowl => 2,
            TacoSize::LMixte | TacoSize::Xl => 3,
            TacoSize::Xxl => 4,
            TacoSize::Giga => 5,
        }
    }

    /// Maximum number of sauces, identical for every size.
    pub fn max_sauces(&self) -> usize {
        3
    }
}

/// A meat chosen for an item, with its portion count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeatSelection {
    pub code: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// A fully specified item built from stock codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacoOrder {
    pub size: TacoSize,
    #[serde(default)]
    pub meats: Vec<MeatSelection>,
    #[serde(default)]
    pub sauces: Vec<String>,
    #[serde(default)]
    pub garnitures: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// An item the application wants in the remote cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemSpec {
    /// Regular item with an explicit recipe
    Regular(TacoOrder),
    /// Chef's choice: no ingredients, therefore no recipe identity
    Mystery {
        size: TacoSize,
        #[serde(default)]
        note: Option<String>,
    },
}

impl ItemSpec {
    pub fn size(&self) -> TacoSize {
        match self {
            ItemSpec::Regular(order) => order.size,
            ItemSpec::Mystery { size, .. } => *size,
        }
    }

    pub fn is_mystery(&self) -> bool {
        matches!(self, ItemSpec::Mystery { .. })
    }
}

/// An ingredient extracted from a remote cart block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    /// Stock code when resolved against a catalog, otherwise the name slug
    pub code: String,
    /// Display name as rendered by the remote system
    pub name: String,
    pub quantity: u32,
}

/// Structured form of one cart block returned by the remote system.
///
/// Absent fields mean the remote system omitted them or they could not be
/// parsed; they decode to empty/zero values rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLineItem {
    /// Remote slot index taken from the block's DOM id, when present
    pub slot: Option<usize>,
    pub size: Option<TacoSize>,
    #[serde(default)]
    pub meats: Vec<ParsedIngredient>,
    #[serde(default)]
    pub sauces: Vec<ParsedIngredient>,
    #[serde(default)]
    pub garnitures: Vec<ParsedIngredient>,
    #[serde(default)]
    pub note: Option<String>,
    pub quantity: u32,
    pub price: f64,
}

impl ParsedLineItem {
    pub fn has_ingredients(&self) -> bool {
        !(self.meats.is_empty() && self.sauces.is_empty() && self.garnitures.is_empty())
    }
}
