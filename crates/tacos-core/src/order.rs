//! Order-level models: side items, quantity changes, submission and summary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Delivery mode of a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
pub enum OrderType {
    #[serde(rename = "livraison")]
    #[strum(serialize = "livraison")]
    Delivery,
    #[serde(rename = "emporter")]
    #[strum(serialize = "emporter")]
    Takeaway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
    Especes,
    Carte,
    Twint,
}

/// Customer details sent with the final submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderForm {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub order_type: OrderType,
    /// Requested delivery or pickup slot, as the remote form expects it (`HH:MM`)
    pub requested_for: String,
    pub transaction_id: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// What the remote system answers after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    /// Raw JSON body, kept for order tracking
    pub raw: serde_json::Value,
}

/// Non-taco cart categories, each with its own remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SideItemKind {
    Extra,
    Drink,
    Dessert,
}

impl SideItemKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            SideItemKind::Extra => "/ajax/ues.php",
            SideItemKind::Drink => "/ajax/ubs.php",
            SideItemKind::Dessert => "/ajax/usd.php",
        }
    }
}

/// JSON payload of a side item. `free_sauces` only applies to extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideItemForm {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_sauces: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityChange {
    Increase,
    Decrease,
}

impl QuantityChange {
    /// Value of the remote `action` field.
    pub fn action(&self) -> &'static str {
        match self {
            QuantityChange::Increase => "increaseQuantity",
            QuantityChange::Decrease => "decreaseQuantity",
        }
    }
}

/// One `N x Label - P CHF` line of the order summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub quantity: u32,
    pub label: String,
    pub price: f64,
    /// Ingredient prose rendered under taco lines (`Viande: ...`); empty otherwise
    #[serde(default)]
    pub details: SummaryDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDetails {
    pub meats: String,
    pub garnitures: String,
    pub sauces: String,
}

/// Totals and per-category lines computed by the remote system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub cart_total: f64,
    pub delivery_fee: f64,
    pub amount_due: f64,
    pub tacos: Vec<SummaryLine>,
    pub extras: Vec<SummaryLine>,
    pub drinks: Vec<SummaryLine>,
    pub desserts: Vec<SummaryLine>,
}

impl OrderSummary {
    pub fn line_count(&self) -> usize {
        self.tacos.len() + self.extras.len() + self.drinks.len() + self.desserts.len()
    }
}
