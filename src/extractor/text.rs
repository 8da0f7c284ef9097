//! Text helpers shared by every extraction tier

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

lazy_static! {
    /// Card number shape: 1-3 uppercase letters, 2+ digits, hyphen, 2+ digits (`E53-021`)
    pub static ref CARD_NUMBER: Regex =
        Regex::new(r"[A-Z]{1,3}\d{2,}-\d{2,}").expect("card number pattern is valid");
}

/// Compiles a hardcoded CSS selector; only called from `lazy_static!` blocks
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("BUG: hardcoded selector is statically valid")
}

/// Elements whose text never counts as visible
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

/// First card-number-shaped token in the text
pub fn card_number_in(text: &str) -> Option<&str> {
    CARD_NUMBER.find(text).map(|m| m.as_str())
}

/// Concatenation of the element's trimmed text nodes
pub fn squashed_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect::<Vec<_>>().concat()
}

/// The element's non-blank trimmed text nodes joined by single spaces
pub fn spaced_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// All visible text of the document, one trimmed text node per line
pub fn visible_text(document: &Html) -> String {
    let root = document.root_element();
    let mut lines = Vec::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| INVISIBLE.contains(&e.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    lines.join("\n")
}

/// First descendant of `element` matching `selector`
pub fn first<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

/// Next following sibling element with the given tag name
pub fn next_sibling_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == name)
}

/// Non-blank trimmed attribute value
pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
