//! Issue page scraping.

use scraper::{ElementRef, Html, Selector};

/// What an issue page tells us.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct IssuePage {
    /// Number of the issue actually shown (the site falls back to another issue
    /// when the requested one does not exist).
    pub number: Option<u64>,
    /// Number of published issues, from the `N/TOTAL` counter.
    pub total: Option<u64>,
    /// `src` of the main image.
    pub image: Option<String>,
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

pub(crate) fn parse_issue_page(html: &str) -> IssuePage {
    let doc = Html::parse_document(html);
    let image = select_first(&doc, "#mainImage")
        .and_then(|el| el.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty());
    let (number, total) = select_first(&doc, ".issueNumber")
        .map(|el| parse_issue_counter(&el.text().collect::<String>()))
        .unwrap_or((None, None));
    IssuePage {
        number,
        total,
        image,
    }
}

/// Parse the `12/345` issue counter.
fn parse_issue_counter(text: &str) -> (Option<u64>, Option<u64>) {
    let mut parts = text.splitn(2, '/');
    let number = parts.next().and_then(|s| s.trim().parse().ok());
    let total = parts.next().and_then(|s| s.trim().parse().ok());
    (number, total)
}
