use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static TOKEN_BY_ID: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#csrf_token").expect("valid selector"));
static TOKEN_BY_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name="csrf_token"]"#).expect("valid selector"));

/// Reads the anti-forgery token embedded in the order page.
///
/// Returns `None` when the page carries no non-empty token, which usually
/// means the remote session was not established.
pub fn extract_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    [&*TOKEN_BY_ID, &*TOKEN_BY_NAME]
        .into_iter()
        .flat_map(|selector| document.select(selector))
        .filter_map(|element| element.value().attr("value"))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
