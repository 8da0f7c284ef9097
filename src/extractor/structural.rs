//! Structural selection tier of the list-mode chain

use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::rules::{match_label, LIST_LABELS};
use super::text::{attr, card_number_in, first, next_sibling_named, selector, squashed_text};
use crate::model::{CardRecord, Field};
use crate::url::absolutize;

/// Fewer known containers than this and the page is scanned generically
pub const MIN_PLAUSIBLE_CONTAINERS: usize = 10;

const ID_ATTRIBUTES: &[&str] = &["data-id", "data-card_id", "data-cardid", "data-cid"];

lazy_static! {
    static ref CONTAINERS: Selector = selector(".card, .card-item, .list-item, .ant-card, li");
    static ref GENERIC: Selector = selector("div, li, article");
    static ref NUMBER: Selector =
        selector(".card-number, .number, .no, .card_no, p.number, span.number");
    static ref NAME: Selector = selector(".card-name, .name, h3, h4, .title");
    static ref LINK: Selector = selector("a[href]");
    static ref IMAGE: Selector = selector("img");
    static ref DL: Selector = selector("dl");
    static ref DT: Selector = selector("dt");
    static ref TEXT: Selector = selector(".text, .card-text, .desc, .description, p.text");
}

/// Card containers of the page, broadened to a generic scan when implausibly few
pub fn containers(document: &Html) -> Vec<ElementRef<'_>> {
    let known: Vec<_> = document.select(&CONTAINERS).collect();
    if known.len() >= MIN_PLAUSIBLE_CONTAINERS {
        return known;
    }

    document
        .select(&GENERIC)
        .filter(|element| element.text().any(|t| card_number_in(t).is_some()))
        .collect()
}

/// Extracts list-schema records from the page's card containers
///
/// Records without a number and a name are dropped; the remaining ones are
/// unique by `(number, name, detail_url)` within the page.
pub fn extract(document: &Html, base: &Url) -> Vec<CardRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for node in containers(document) {
        let record = record_from_container(node, base);
        if !record.is_valid() {
            continue;
        }
        let key = (
            record.card_number.clone(),
            record.name.clone(),
            record.detail_url.clone(),
        );
        if seen.insert(key) {
            records.push(record);
        }
    }

    records
}

fn record_from_container(node: ElementRef<'_>, base: &Url) -> CardRecord {
    let mut record = CardRecord::default();

    match first(node, &NUMBER) {
        Some(number) => record.set(Field::CardNumber, &squashed_text(number)),
        None => {
            if let Some(token) = node.text().find_map(card_number_in) {
                record.set(Field::CardNumber, token);
            }
        }
    }

    if let Some(name) = first(node, &NAME) {
        record.set(Field::Name, &squashed_text(name));
    }

    if let Some(href) = first(node, &LINK).and_then(|a| attr(a, "href")) {
        record.set(Field::DetailUrl, &absolutize(base, href));
    }

    if let Some(src) = first(node, &IMAGE).and_then(|img| attr(img, "src")) {
        record.set(Field::ImageUrl, &absolutize(base, src));
    }

    for dl in node.select(&DL) {
        for dt in dl.select(&DT) {
            let label = squashed_text(dt);
            let value = next_sibling_named(dt, "dd")
                .map(squashed_text)
                .unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            if let Some(field) = match_label(LIST_LABELS, &label) {
                record.set(field, &value);
            }
        }
    }

    if let Some(text) = first(node, &TEXT) {
        record.set(Field::Text, &squashed_text(text));
    }

    if let Some(id) = ID_ATTRIBUTES.iter().find_map(|name| attr(node, name)) {
        record.set(Field::CardId, id);
    }

    record
}
