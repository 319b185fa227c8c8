//! Content-addressable recipe identities.
//!
//! A recipe is the size plus the ingredient sets of an item. Quantity, price
//! and notes are not part of it, so two orders that differ only in those
//! fields share one identity. The identity is the SHA-256 of a canonical JSON
//! form, stored as lowercase hex and shared as base58.

use crate::error::{Result, TacosError};
use crate::item::{ItemSpec, ParsedLineItem, TacoOrder};
use serde::Serialize;
use sha2::{Digest, Sha256};

const DIGEST_LEN: usize = 32;

/// What an item is made of, independent of how many were ordered or by whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub size: String,
    pub meats: Vec<String>,
    pub sauces: Vec<String>,
    pub garnitures: Vec<String>,
}

/// Canonical form hashed for the identity. Field order is part of the format.
#[derive(Serialize)]
struct CanonicalRecipe<'a> {
    size: &'a str,
    meats: Vec<&'a str>,
    sauces: Vec<&'a str>,
    garnitures: Vec<&'a str>,
}

impl Recipe {
    pub fn new(
        size: impl Into<String>,
        meats: Vec<String>,
        sauces: Vec<String>,
        garnitures: Vec<String>,
    ) -> Self {
        Self {
            size: size.into(),
            meats,
            sauces,
            garnitures,
        }
    }

    /// Recipe of a requested item. Meat portion counts are not part of it.
    pub fn from_order(order: &TacoOrder) -> Self {
        Self {
            size: order.size.code().to_string(),
            meats: order.meats.iter().map(|m| m.code.clone()).collect(),
            sauces: order.sauces.clone(),
            garnitures: order.garnitures.clone(),
        }
    }

    /// Recipe of a decoded cart block; `None` when the size was not recognized.
    pub fn from_line_item(item: &ParsedLineItem) -> Option<Self> {
        let size = item.size?;
        Some(Self {
            size: size.code().to_string(),
            meats: item.meats.iter().map(|i| i.code.clone()).collect(),
            sauces: item.sauces.iter().map(|i| i.code.clone()).collect(),
            garnitures: item.garnitures.iter().map(|i| i.code.clone()).collect(),
        })
    }

    fn canonical(&self) -> CanonicalRecipe<'_> {
        fn sorted(ids: &[String]) -> Vec<&str> {
            let mut ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            ids.sort_unstable();
            ids
        }
        CanonicalRecipe {
            size: &self.size,
            meats: sorted(&self.meats),
            sauces: sorted(&self.sauces),
            garnitures: sorted(&self.garnitures),
        }
    }

    /// Bytes fed to the hash: compact JSON with sorted id lists.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Serializing a struct of strings and string vectors cannot fail.
        serde_json::to_vec(&self.canonical()).unwrap_or_default()
    }
}

/// Hex SHA-256 identity of a recipe.
pub fn hash(recipe: &Recipe) -> String {
    let mut hasher = Sha256::new();
    hasher.update(recipe.canonical_bytes());
    hex::encode(hasher.finalize())
}

/// Identity of a requested item. Mystery items have none.
pub fn item_identity(item: &ItemSpec) -> Option<String> {
    match item {
        ItemSpec::Regular(order) => Some(hash(&Recipe::from_order(order))),
        ItemSpec::Mystery { .. } => None,
    }
}

/// Identity of a decoded cart block, when its size is known.
pub fn line_item_identity(item: &ParsedLineItem) -> Option<String> {
    Recipe::from_line_item(item).map(|recipe| hash(&recipe))
}

/// Encodes a hex identity in base58 for display and sharing.
pub fn to_shareable_form(hex_digest: &str) -> Result<String> {
    let bytes = decode_hex(hex_digest)?;
    Ok(bs58::encode(bytes).into_string())
}

/// Decodes a base58 identity back to its hex form.
///
/// Fails with `InvalidIdentity` when the input is not base58 or does not
/// carry a SHA-256 digest.
pub fn from_shareable_form(shareable: &str) -> Result<String> {
    let trimmed = shareable.trim();
    if trimmed.is_empty() {
        return Err(TacosError::invalid_identity(shareable, "empty identity"));
    }
    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| TacosError::invalid_identity(shareable, e.to_string()))?;
    if bytes.len() != DIGEST_LEN {
        return Err(TacosError::invalid_identity(
            shareable,
            format!("expected {} bytes, got {}", DIGEST_LEN, bytes.len()),
        ));
    }
    Ok(hex::encode(bytes))
}

/// Accepts either form and returns the hex identity.
///
/// Records produced before the shareable form existed carry raw hex, so a
/// failed base58 decode falls back to validating the input as hex.
pub fn resolve_identity(input: &str) -> Result<String> {
    match from_shareable_form(input) {
        Ok(hex) => Ok(hex),
        Err(base58_err) => {
            let candidate = input.trim();
            if candidate.len() == DIGEST_LEN * 2 && decode_hex(candidate).is_ok() {
                Ok(candidate.to_ascii_lowercase())
            } else {
                Err(base58_err)
            }
        }
    }
}

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input.trim()).map_err(|e| TacosError::invalid_identity(input, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{MeatSelection, ParsedIngredient, TacoSize};

    fn order(meats: &[&str], sauces: &[&str], garnitures: &[&str]) -> TacoOrder {
        TacoOrder {
            size: TacoSize::Xl,
            meats: meats
                .iter()
                .map(|code| MeatSelection {
                    code: code.to_string(),
                    quantity: 1,
                })
                .collect(),
            sauces: sauces.iter().map(|s| s.to_string()).collect(),
            garnitures: garnitures.iter().map(|s| s.to_string()).collect(),
            note: None,
        }
    }

    #[test]
    fn test_canonical_form_is_compact_sorted_json() {
        let recipe = Recipe::from_order(&order(&["poulet", "cordon_bleu"], &["blanche"], &[]));
        let text = String::from_utf8(recipe.canonical_bytes()).unwrap();
        assert_eq!(
            text,
            r#"{"size":"tacos_XL","meats":["cordon_bleu","poulet"],"sauces":["blanche"],"garnitures":[]}"#
        );
    }

    #[test]
    fn test_hash_ignores_ingredient_order() {
        let a = order(&["poulet", "cordon_bleu"], &["blanche", "harissa"], &["frites"]);
        let b = order(&["cordon_bleu", "poulet"], &["harissa", "blanche"], &["frites"]);
        assert_eq!(hash(&Recipe::from_order(&a)), hash(&Recipe::from_order(&b)));
    }

    #[test]
    fn test_hash_ignores_quantity_and_note() {
        let plain = order(&["poulet"], &["blanche"], &["frites"]);
        let mut noted = plain.clone();
        noted.note = Some("sans oignons".into());
        noted.meats[0].quantity = 3;

        assert_eq!(hash(&Recipe::from_order(&plain)), hash(&Recipe::from_order(&noted)));
    }

    #[test]
    fn test_hash_distinguishes_membership_and_size() {
        let a = order(&["poulet"], &["blanche"], &[]);
        let b = order(&["poulet"], &["harissa"], &[]);
        let mut c = a.clone();
        c.size = TacoSize::L;

        let ha = hash(&Recipe::from_order(&a));
        assert_ne!(ha, hash(&Recipe::from_order(&b)));
        assert_ne!(ha, hash(&Recipe::from_order(&c)));
        assert_eq!(ha.len(), 64);
    }

    #[test]
    fn test_shareable_round_trip() {
        let hex = hash(&Recipe::from_order(&order(&["poulet"], &["blanche"], &["frites"])));
        let shareable = to_shareable_form(&hex).unwrap();

        assert!(!shareable.contains(['0', 'O', 'I', 'l']));
        assert_eq!(from_shareable_form(&shareable).unwrap(), hex);
    }

    #[test]
    fn test_malformed_shareable_is_invalid_identity() {
        let err = from_shareable_form("0OIl").unwrap_err();
        assert!(matches!(err, TacosError::InvalidIdentity { .. }));

        let short = bs58::encode([1u8, 2, 3]).into_string();
        assert!(matches!(
            from_shareable_form(&short),
            Err(TacosError::InvalidIdentity { .. })
        ));
    }

    #[test]
    fn test_malformed_hex_is_invalid_identity() {
        for input in ["abc", "zz", "0g"] {
            assert!(matches!(
                to_shareable_form(input),
                Err(TacosError::InvalidIdentity { .. })
            ));
        }
        assert_eq!(
            to_shareable_form("0001ff").unwrap(),
            bs58::encode([0u8, 1, 255]).into_string()
        );
    }

    #[test]
    fn test_resolve_accepts_legacy_hex() {
        let hex = hash(&Recipe::from_order(&order(&["poulet"], &[], &[])));
        let shareable = to_shareable_form(&hex).unwrap();

        assert_eq!(resolve_identity(&shareable).unwrap(), hex);
        assert_eq!(resolve_identity(&hex).unwrap(), hex);
        assert_eq!(resolve_identity(&hex.to_uppercase()).unwrap(), hex);
        assert!(resolve_identity("not-an-identity").is_err());
    }

    #[test]
    fn test_mystery_items_have_no_identity() {
        let mystery = ItemSpec::Mystery {
            size: TacoSize::Giga,
            note: None,
        };
        assert!(item_identity(&mystery).is_none());
        assert!(item_identity(&ItemSpec::Regular(order(&["poulet"], &[], &[]))).is_some());
    }

    #[test]
    fn test_decoded_item_matches_requested_identity() {
        let requested = order(&["poulet"], &["blanche"], &[]);
        let decoded = ParsedLineItem {
            slot: Some(0),
            size: Some(TacoSize::Xl),
            meats: vec![ParsedIngredient {
                code: "poulet".into(),
                name: "Poulet".into(),
                quantity: 2,
            }],
            sauces: vec![ParsedIngredient {
                code: "blanche".into(),
                name: "Blanche".into(),
                quantity: 1,
            }],
            garnitures: vec![],
            note: Some("bien cuit".into()),
            quantity: 4,
            price: 18.5,
        };

        assert_eq!(
            line_item_identity(&decoded),
            item_identity(&ItemSpec::Regular(requested))
        );
    }
}
