//! `Set-Cookie` handling.
//!
//! Only the `name=value` pair matters: the adapter keeps its own jar per
//! session and never honours attributes such as `Path` or `Expires`.

use tacos_core::session::CookieMap;

/// Extracts the `name=value` pair of one `Set-Cookie` header.
///
/// Everything after the first `;` is an attribute and is ignored. The value
/// may itself contain `=` (base64 padding), so only the first `=` splits.
/// Headers with an empty name or value yield `None`.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

/// Collects every valid pair. Later headers win for duplicate names.
pub fn parse_set_cookies<'a, I>(headers: I) -> CookieMap
where
    I: IntoIterator<Item = &'a str>,
{
    headers.into_iter().filter_map(parse_set_cookie).collect()
}

/// Reads a request `Cookie` header (`a=1; b=2`) back into a jar.
pub fn parse_cookie_header(header: &str) -> CookieMap {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let (name, value) = (name.trim(), value.trim());
            (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}
