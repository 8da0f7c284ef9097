//! Link discovery: detail queue items and package pages

use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

use super::text::{attr, card_number_in, first, selector, spaced_text, squashed_text};
use crate::model::DetailQueueItem;
use crate::url::absolutize;

lazy_static! {
    static ref LIST_ITEMS: Selector = selector("ul.ant-list-items li.ant-list-item");
    static ref CARD_ITEMS: Selector = selector(".card, .card-item, .list-item");
    static ref LINK: Selector = selector("a[href]");
    static ref NUMBER: Selector = selector(".number, .card-number, .no, span.number");
}

/// Ordered, de-duplicated queue of detail pages
///
/// Items are unique by `(url, number)`; the first occurrence keeps its place.
#[derive(Debug, Default)]
pub struct DetailQueue {
    items: Vec<DetailQueueItem>,
    seen: HashSet<(String, String)>,
}

impl DetailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an item; returns false if it was already queued
    pub fn push(&mut self, item: DetailQueueItem) -> bool {
        let key = (item.detail_url.clone(), item.card_number.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Scans one list page and queues its card links
    pub fn extend_from_page(&mut self, document: &Html, base: &Url) -> usize {
        let mut added = 0;
        for item in detail_items(document, base) {
            if self.push(item) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keeps at most `max` items
    pub fn truncate(&mut self, max: usize) {
        self.items.truncate(max);
    }

    pub fn into_items(self) -> Vec<DetailQueueItem> {
        self.items
    }
}

/// Per-card links of one list page, in document order
pub fn detail_items(document: &Html, base: &Url) -> Vec<DetailQueueItem> {
    let mut nodes: Vec<_> = document.select(&LIST_ITEMS).collect();
    if nodes.is_empty() {
        nodes = document.select(&CARD_ITEMS).collect();
    }

    nodes
        .into_iter()
        .filter_map(|node| {
            let link = first(node, &LINK)?;
            let href = attr(link, "href")?;

            let mut card_number = first(node, &NUMBER)
                .map(squashed_text)
                .unwrap_or_default();
            if card_number.is_empty() {
                card_number = card_number_in(&spaced_text(node))
                    .unwrap_or_default()
                    .to_string();
            }

            Some(DetailQueueItem {
                detail_url: absolutize(base, href),
                card_number,
                title: squashed_text(link),
            })
        })
        .collect()
}

/// Package page URLs linked from the package index, first occurrence order
pub fn package_links(document: &Html, base: &Url, prefix: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .select(&LINK)
        .filter_map(|a| attr(a, "href"))
        .filter(|href| href.starts_with(prefix))
        .map(|href| absolutize(base, href))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://zxcard.yimieji.com").unwrap()
    }

    #[test]
    fn test_ant_list_items() {
        let html = r#"<html><body><ul class="ant-list-items">
            <li class="ant-list-item"><a href="/Cards/1">雷兽</a><span class="number">E53-021</span></li>
            <li class="ant-list-item"><a href="/Cards/2">火龙</a> B01-002 R</li>
            <li class="ant-list-item">no link</li>
        </ul><div class="card"><a href="/Cards/99">ignored</a></div></body></html>"#;
        let items = detail_items(&Html::parse_document(html), &base());

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            DetailQueueItem {
                detail_url: "https://zxcard.yimieji.com/Cards/1".to_string(),
                card_number: "E53-021".to_string(),
                title: "雷兽".to_string(),
            }
        );
        assert_eq!(items[1].card_number, "B01-002");
    }

    #[test]
    fn test_card_fallback_and_queue_dedup() {
        let page = r#"<html><body>
            <div class="card"><a href="/Cards/E01-001">雷兽</a></div>
            <div class="card-item"><a href="/Cards/E01-001">雷兽</a></div>
            <div class="list-item"><a href="/Cards/E01-002">火龙</a><i class="no">E01-002</i></div>
        </body></html>"#;
        let document = Html::parse_document(page);

        let mut queue = DetailQueue::new();
        assert_eq!(queue.extend_from_page(&document, &base()), 2);
        assert_eq!(queue.extend_from_page(&document, &base()), 0);

        let items = queue.into_items();
        assert_eq!(items[0].detail_url, "https://zxcard.yimieji.com/Cards/E01-001");
        assert_eq!(items[0].card_number, "");
        assert_eq!(items[1].card_number, "E01-002");
    }

    #[test]
    fn test_package_links_preserve_order() {
        let html = r#"<html><body>
            <a href="/Package/B02">B02</a>
            <a href="/Cards/E01-001">card</a>
            <a href="/Package/B01">B01</a>
            <a href="/Package/B02">again</a>
        </body></html>"#;
        let links = package_links(&Html::parse_document(html), &base(), "/Package/");

        assert_eq!(
            links,
            vec![
                "https://zxcard.yimieji.com/Package/B02",
                "https://zxcard.yimieji.com/Package/B01",
            ]
        );
    }
}
