//! Display-name to stock-code resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use tacos_core::item::{Catalog, IngredientCategory};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static NON_CODE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid pattern"));
static REPEATED_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("valid pattern"));

/// Turns a rendered name into the shape of a stock code.
///
/// `"Viande hachée"` becomes `viande_hachee`, `"Sel & Poivre"` becomes
/// `sel_et_poivre`.
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .replace('&', "et");
    let spaced = folded.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = NON_CODE_CHARS.replace_all(&spaced, "");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&cleaned, "_");
    collapsed.trim_matches('_').to_string()
}

/// Resolves a rendered ingredient name to a stock code.
///
/// Tries an exact slug match, then a case-insensitive one, then a loose
/// containment match on slug parts longer than three characters. Falls back
/// to the slug itself when nothing matches or no catalog is available.
pub fn resolve_code(catalog: Option<&Catalog>, category: IngredientCategory, name: &str) -> String {
    let slug = slugify(name);
    let Some(catalog) = catalog else {
        return slug;
    };
    if slug.is_empty() {
        return slug;
    }

    if let Some(code) = catalog.codes(category).find(|code| *code == slug) {
        return code.to_string();
    }
    if let Some(code) = catalog
        .codes(category)
        .find(|code| code.to_lowercase() == slug)
    {
        return code.to_string();
    }

    for part in slug.split('_').filter(|part| part.len() > 3) {
        let loose = catalog.codes(category).find(|code| {
            let code = code.to_lowercase();
            code.contains(part) || part.contains(code.as_str())
        });
        if let Some(code) = loose {
            return code.to_string();
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacos_core::item::StockEntry;

    fn entry(name: &str) -> StockEntry {
        StockEntry {
            name: name.to_string(),
            in_stock: true,
            price: None,
        }
    }

    #[test]
    fn test_slugify_folds_accents_and_symbols() {
        assert_eq!(slugify("Viande hachée"), "viande_hachee");
        assert_eq!(slugify("  Sel & Poivre "), "sel_et_poivre");
        assert_eq!(slugify("Cordon-bleu"), "cordonbleu");
        assert_eq!(slugify("Sauce   Algérienne!"), "sauce_algerienne");
    }

    #[test]
    fn test_resolve_prefers_exact_then_case_then_loose() {
        let mut catalog = Catalog::default();
        catalog.meats.insert("viande_hachee".into(), entry("Viande hachée"));
        catalog.meats.insert("Poulet".into(), entry("Poulet"));
        catalog.meats.insert("merguez_maison".into(), entry("Merguez"));

        assert_eq!(
            resolve_code(Some(&catalog), IngredientCategory::Meat, "Viande Hachée"),
            "viande_hachee"
        );
        assert_eq!(
            resolve_code(Some(&catalog), IngredientCategory::Meat, "poulet"),
            "Poulet"
        );
        assert_eq!(
            resolve_code(Some(&catalog), IngredientCategory::Meat, "Merguez"),
            "merguez_maison"
        );
    }

    #[test]
    fn test_unknown_name_falls_back_to_slug() {
        let catalog = Catalog::default();
        assert_eq!(
            resolve_code(Some(&catalog), IngredientCategory::Sauce, "Samouraï"),
            "samourai"
        );
        assert_eq!(
            resolve_code(None, IngredientCategory::Sauce, "Blanche"),
            "blanche"
        );
    }
}
