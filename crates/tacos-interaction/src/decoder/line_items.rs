//! Cart block decoding.
//!
//! The cart endpoint renders one `div.card#tacos-<n>` per item. Size and
//! price are embedded in the title prose (`Tacos XL - 16 CHF.`) and the
//! ingredients in labeled paragraphs (`<strong>Viande:</strong> Poulet x2`).

use super::slug::resolve_code;
use super::text_of;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tacos_core::item::{Catalog, IngredientCategory, ParsedIngredient, ParsedLineItem, TacoSize};
use tracing::{debug, warn};

const MEAT_LABELS: &[&str] = &["Viande", "Viande(s)", "Meat"];
const SAUCE_LABELS: &[&str] = &["Sauce", "Sauces"];
const GARNITURE_LABELS: &[&str] = &["Garniture", "Garnitures", "Garnish"];
const NOTE_LABELS: &[&str] = &["Remarque", "Note"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid pattern")
}

static CARD: Lazy<Selector> = Lazy::new(|| selector(r#"div.card[id^="tacos-"]"#));
static BODY: Lazy<Selector> = Lazy::new(|| selector(".card-body"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector(".card-title, h6, h5"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static STRONG: Lazy<Selector> = Lazy::new(|| selector("strong"));
static QUANTITY_INPUT: Lazy<Selector> = Lazy::new(|| selector(".quantity-input[readonly]"));

static SIZE_L_MIXTE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)tacos\s+L\s+mixte"));
static SIZE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\btacos\s+(XXL|XL|L|GIGA|BOWL)\b"));
static PRICE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)-\s*([0-9]+(?:[.,][0-9]+)?)\s*(?:CHF|EUR|€|\$)\.?"));
static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| pattern(r"[,;]+"));
static MEAT_PART: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^(.+?)\s+x\s*(\d+)$"));
static NO_MEAT: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^sans([ _]?viande)?$"));
static SLOT_ID: Lazy<Regex> = Lazy::new(|| pattern(r"^tacos-(\d+)$"));

/// Decodes the first cart block found in `html`.
///
/// Returns `None` when there is no block or when the block is a rendering
/// placeholder (no size, no ingredients and a zero price).
pub fn decode_line_item(html: &str, catalog: Option<&Catalog>) -> Option<ParsedLineItem> {
    let fragment = Html::parse_fragment(html);
    let card = fragment.select(&CARD).next()?;
    decode_block(card, catalog)
}

/// Decodes every cart block in `html`, ordered by remote slot.
///
/// Placeholders are dropped, so the result may be shorter than the number of
/// blocks; callers rely on `slot` rather than on list position.
pub fn decode_line_items(html: &str, catalog: Option<&Catalog>) -> Vec<ParsedLineItem> {
    let document = Html::parse_document(html);

    let mut blocks: Vec<(usize, ElementRef<'_>)> = Vec::new();
    for card in document.select(&CARD) {
        match slot_of(card) {
            Some(slot) => blocks.push((slot, card)),
            None => warn!(
                "Skipping cart block with unexpected id {:?}",
                card.value().attr("id")
            ),
        }
    }
    blocks.sort_by_key(|(slot, _)| *slot);

    let total = blocks.len();
    let items: Vec<ParsedLineItem> = blocks
        .into_iter()
        .filter_map(|(slot, card)| {
            let item = decode_block(card, catalog);
            if item.is_none() {
                debug!("Cart block tacos-{} is a placeholder", slot);
            }
            item
        })
        .collect();

    debug!("Decoded {} line items from {} cart blocks", items.len(), total);
    items
}

fn slot_of(card: ElementRef<'_>) -> Option<usize> {
    let id = card.value().attr("id")?;
    SLOT_ID.captures(id)?.get(1)?.as_str().parse().ok()
}

fn decode_block(card: ElementRef<'_>, catalog: Option<&Catalog>) -> Option<ParsedLineItem> {
    let body = card.select(&BODY).next().unwrap_or(card);

    let title = body
        .select(&TITLE)
        .next()
        .map(text_of)
        .unwrap_or_default();
    let size = size_from_title(&title);
    let price = price_from_title(&title);

    let meats: Vec<ParsedIngredient> = labeled_list(body, MEAT_LABELS)
        .iter()
        .filter_map(|part| decode_meat(part, catalog))
        .collect();
    let sauces = decode_plain(body, SAUCE_LABELS, IngredientCategory::Sauce, catalog);
    let garnitures = decode_plain(body, GARNITURE_LABELS, IngredientCategory::Garniture, catalog);
    let note = labeled_paragraph(body, NOTE_LABELS).and_then(value_after_colon);

    let item = ParsedLineItem {
        slot: slot_of(card),
        size,
        meats,
        sauces,
        garnitures,
        note,
        quantity: quantity_of(card),
        price,
    };

    if item.size.is_none() && !item.has_ingredients() && item.price == 0.0 {
        return None;
    }
    Some(item)
}

fn size_from_title(title: &str) -> Option<TacoSize> {
    if SIZE_L_MIXTE.is_match(title) {
        return Some(TacoSize::LMixte);
    }
    let caps = SIZE.captures(title)?;
    match caps[1].to_uppercase().as_str() {
        "XXL" => Some(TacoSize::Xxl),
        "XL" => Some(TacoSize::Xl),
        "L" => Some(TacoSize::L),
        "GIGA" => Some(TacoSize::Giga),
        "BOWL" => Some(TacoSize::Bowl),
        _ => None,
    }
}

fn price_from_title(title: &str) -> f64 {
    PRICE
        .captures(title)
        .and_then(|caps| caps[1].replace(',', ".").parse().ok())
        .unwrap_or(0.0)
}

/// Quantity from the block's own readonly counter; defaults to 1.
fn quantity_of(card: ElementRef<'_>) -> u32 {
    card.select(&QUANTITY_INPUT)
        .next()
        .and_then(|input| input.value().attr("value"))
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|quantity| *quantity > 0)
        .unwrap_or(1)
}

/// First paragraph whose `<strong>` carries one of `labels`, else the first
/// paragraph whose text mentions one.
fn labeled_paragraph<'a>(scope: ElementRef<'a>, labels: &[&str]) -> Option<ElementRef<'a>> {
    let mentions = |text: &str| labels.iter().any(|label| text.contains(label));

    scope
        .select(&PARAGRAPH)
        .find(|p| p.select(&STRONG).any(|strong| mentions(&text_of(strong))))
        .or_else(|| scope.select(&PARAGRAPH).find(|p| mentions(&text_of(*p))))
}

fn value_after_colon(paragraph: ElementRef<'_>) -> Option<String> {
    let text = text_of(paragraph);
    let (_, after) = text.split_once(':')?;
    let after = after.trim();
    (!after.is_empty()).then(|| after.to_string())
}

fn labeled_list(scope: ElementRef<'_>, labels: &[&str]) -> Vec<String> {
    let Some(value) = labeled_paragraph(scope, labels).and_then(value_after_colon) else {
        return Vec::new();
    };
    LIST_SEPARATOR
        .split(&value)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_meat(part: &str, catalog: Option<&Catalog>) -> Option<ParsedIngredient> {
    let (name, quantity) = match MEAT_PART.captures(part) {
        Some(caps) => (
            caps[1].trim().to_string(),
            caps[2].parse::<u32>().unwrap_or(1).max(1),
        ),
        None => (part.trim().to_string(), 1),
    };
    if name.is_empty() || NO_MEAT.is_match(&name) {
        return None;
    }
    Some(ParsedIngredient {
        code: resolve_code(catalog, IngredientCategory::Meat, &name),
        name,
        quantity,
    })
}

fn decode_plain(
    scope: ElementRef<'_>,
    labels: &[&str],
    category: IngredientCategory,
    catalog: Option<&Catalog>,
) -> Vec<ParsedIngredient> {
    labeled_list(scope, labels)
        .into_iter()
        .filter(|name| !is_sans_entry(name))
        .map(|name| ParsedIngredient {
            code: resolve_code(catalog, category, &name),
            name,
            quantity: 1,
        })
        .collect()
}

fn is_sans_entry(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "sans" | "sans garniture" | "sans sauce"
    )
}
