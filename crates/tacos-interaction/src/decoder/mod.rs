//! HTML decoding of remote pages.
//!
//! - `line_items`: cart blocks rendered by the cart endpoint
//! - `summary`: totals and lines rendered by the order summary endpoint
//! - `token`: anti-forgery token embedded in the order page
//! - `slug`: display-name normalization and stock-code resolution

mod line_items;
mod slug;
mod summary;
mod token;

pub use line_items::{decode_line_item, decode_line_items};
pub use slug::{resolve_code, slugify};
pub use summary::decode_order_summary;
pub use token::extract_token;

use scraper::ElementRef;

/// Text content of an element with whitespace runs collapsed.
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
