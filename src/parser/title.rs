use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

/// Display name, first hit wins: og:title → <title> → first non-empty <h1>.
pub fn extract(document: &Html) -> Option<String> {
    og_title(document)
        .or_else(|| document_title(document))
        .or_else(|| first_heading(document))
}

fn og_title(document: &Html) -> Option<String> {
    document
        .select(&OG_TITLE)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(normalize)
}

fn document_title(document: &Html) -> Option<String> {
    document.select(&TITLE).next().and_then(|el| normalize(&element_text(el)))
}

fn first_heading(document: &Html) -> Option<String> {
    document
        .select(&H1)
        .find_map(|el| normalize(&element_text(el)))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace runs; `None` when nothing is left.
fn normalize(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
