use std::sync::LazyLock;

use regex::Regex;

// A digit, then 3+ digits/whitespace (thousands groups), then a rouble marker.
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d\s]{3,})\s*(?:₽|руб\.?)").unwrap());

/// First currency-marked number in document order, in whole currency units.
///
/// Crossed-out or list prices are not told apart from the real one; whichever
/// comes first wins.
pub fn extract(text: &str) -> Option<i64> {
    let caps = PRICE_RE.captures(text)?;
    let digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}
