//! Order summary (`/ajax/os.php`) decoding.

use super::text_of;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tacos_core::order::{OrderSummary, SummaryDetails, SummaryLine};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static CARD: Lazy<Selector> = Lazy::new(|| selector("div.card"));
static HEADER: Lazy<Selector> = Lazy::new(|| selector(".card-header"));
static TACO_LINE: Lazy<Selector> = Lazy::new(|| selector(".card-body p.fs-6"));
static SIDE_LINE: Lazy<Selector> = Lazy::new(|| selector(".card-body p.small"));
static PAYMENT_ROW: Lazy<Selector> = Lazy::new(|| selector(".d-flex.justify-content-between"));
static SMALL: Lazy<Selector> = Lazy::new(|| selector("p.small"));

static LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s+x\s+(.+?)\s+-\s+(\d+(?:\.\d+)?)CHF").expect("valid pattern")
});
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)CHF").expect("valid pattern"));

enum Section {
    Tacos,
    Extras,
    Drinks,
    Desserts,
    Payment,
}

fn section_of(header: &str) -> Option<Section> {
    if header.contains("Informations sur le paiement") {
        Some(Section::Payment)
    } else if header.contains("Tacos") {
        Some(Section::Tacos)
    } else if header.contains("Extras") {
        Some(Section::Extras)
    } else if header.contains("Boissons") {
        Some(Section::Drinks)
    } else if header.contains("Desserts") {
        Some(Section::Desserts)
    } else {
        None
    }
}

/// Decodes the remote order summary.
///
/// Returns `None` when the page has none of the expected sections, which is
/// what the remote renders for an empty or unknown cart.
pub fn decode_order_summary(html: &str) -> Option<OrderSummary> {
    let document = Html::parse_document(html);
    let mut summary = OrderSummary::default();
    let mut recognized = false;

    for card in document.select(&CARD) {
        let Some(header) = card.select(&HEADER).next().map(text_of) else {
            continue;
        };
        let Some(section) = section_of(&header) else {
            continue;
        };
        recognized = true;

        match section {
            Section::Tacos => summary.tacos.extend(card.select(&TACO_LINE).filter_map(taco_line)),
            Section::Extras => summary.extras.extend(side_lines(card)),
            Section::Drinks => summary.drinks.extend(side_lines(card)),
            Section::Desserts => summary.desserts.extend(side_lines(card)),
            Section::Payment => read_payment(card, &mut summary),
        }
    }

    recognized.then_some(summary)
}

fn parse_line(text: &str) -> Option<SummaryLine> {
    let caps = LINE.captures(text)?;
    Some(SummaryLine {
        quantity: caps[1].parse().ok()?,
        label: caps[2].trim().to_string(),
        price: caps[3].parse().ok()?,
        details: SummaryDetails::default(),
    })
}

fn side_lines(card: ElementRef<'_>) -> Vec<SummaryLine> {
    card.select(&SIDE_LINE)
        .filter_map(|p| parse_line(&text_of(p)))
        .collect()
}

/// A taco line plus the `p.small` detail rows that follow it, up to the next
/// taco line.
fn taco_line(line: ElementRef<'_>) -> Option<SummaryLine> {
    let mut parsed = parse_line(&text_of(line))?;

    let following = line
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !has_class(*el, "fs-6"))
        .filter(|el| el.value().name() == "p" && has_class(*el, "small"));

    for detail in following {
        let text = text_of(detail);
        if let Some(value) = value_after(&text, "Viande:") {
            parsed.details.meats = value;
        } else if let Some(value) = value_after(&text, "Garniture:") {
            parsed.details.garnitures = value;
        } else if let Some(value) = value_after(&text, "Sauce:") {
            parsed.details.sauces = value;
        }
    }

    Some(parsed)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn value_after(text: &str, label: &str) -> Option<String> {
    text.split_once(label)
        .map(|(_, value)| value.trim().to_string())
}

fn read_payment(card: ElementRef<'_>, summary: &mut OrderSummary) {
    for row in card.select(&PAYMENT_ROW) {
        let cells: Vec<String> = row.select(&SMALL).map(text_of).collect();
        let (Some(label), Some(value)) = (cells.first(), cells.last()) else {
            continue;
        };
        let Some(amount) = AMOUNT
            .captures(value)
            .and_then(|caps| caps[1].parse::<f64>().ok())
        else {
            continue;
        };

        if label.contains("Total du panier") {
            summary.cart_total = amount;
        } else if label.contains("Frais de livraison") {
            summary.delivery_fee = amount;
        } else if label.contains("Montant") {
            summary.amount_due = amount;
        }
    }
}
