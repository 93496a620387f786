pub mod price;
pub mod title;

use scraper::Html;

/// Best-effort `(title, price)` pair. Both halves are independent guesses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: Option<String>,
    pub price: Option<i64>,
}

/// Two-pass extraction: markup → title heuristic, flattened text → price pattern.
///
/// Never fails; anything ambiguous comes back as `None`.
pub fn extract(markup: &str) -> ExtractionResult {
    let document = Html::parse_document(markup);
    let text = flatten_text(&document);
    ExtractionResult {
        title: title::extract(&document),
        price: price::extract(&text),
    }
}

/// Elements whose text never renders.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text nodes, trimmed, empties dropped, joined with single spaces.
pub fn flatten_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .ancestors()
                .filter_map(|a| a.value().as_element())
                .any(|el| HIDDEN_TAGS.contains(&el.name()));
            if hidden {
                None
            } else {
                Some(text.trim())
            }
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ──
