//! Parsing of the free-text listing attributes.
//!
//! Listing pages describe floor area, rooms, floor, and price as display
//! strings such as `"62,5 m²"`, `"55 + 12 m²"`, `"2 rum"`, `"vån 3"`, or
//! `"3 450 000 kr"`. Decimal commas and non-breaking spaces are normal.

/// Lowercases and replaces non-breaking spaces.
fn normalize(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_lowercase()
}

/// Parses a number that may use a decimal comma.
fn parse_number(token: &str) -> Option<f64> {
    token
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// First whitespace-separated token that is a number.
fn first_number(text: &str) -> Option<f64> {
    text.split_whitespace().find_map(parse_number)
}

/// Parses a living-area string into square meters.
///
/// A supplementary area after `+` is added to the main area. Plot sizes
/// (`"tomt"`) and per-area prices (`"kr/m²"`) are not living areas and
/// yield `None`.
#[must_use]
pub fn parse_area_sqm(text: &str) -> Option<f64> {
    let text = normalize(text);
    if text.is_empty() || text.contains("kr") || text.contains("tomt") {
        return None;
    }

    let text = text.replace("m²", " ").replace("m2", " ");

    let mut total = 0.0;
    for part in text.split('+') {
        total += first_number(part)?;
    }
    Some(total)
}

/// Parses a room-count string such as `"2,5 rum"`.
#[must_use]
pub fn parse_rooms(text: &str) -> Option<f64> {
    first_number(&normalize(text))
}

/// Parses a floor string such as `"vån 3"` or `"3"`.
#[must_use]
pub fn parse_floor(text: &str) -> Option<f64> {
    first_number(&normalize(text))
}

/// Parses a price string such as `"3 450 000 kr"`, ignoring grouping
/// spaces and the currency suffix.
#[must_use]
pub fn parse_price(text: &str) -> Option<i64> {
    let digits: String = normalize(text)
        .trim_end_matches("kr")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
