//! Record extraction from raw page markup
//!
//! This module handles turning one page's HTML into card records through an
//! ordered chain of heuristics:
//! - Structural selection of card containers, broadened to a generic scan
//! - Embedded client-state (`window.__NUXT__`) parsing
//! - Label/value heuristics for detail pages
//!
//! plus the full-schema parser for rendered card blocks and link discovery.

mod detail;
mod embedded;
mod full;
mod links;
mod rules;
mod structural;
mod text;

pub use embedded::{collect_objects, is_card_like, parse_state, walk_objects};
pub use full::{effect_text, CARD_BLOCK};
pub use links::{detail_items, package_links, DetailQueue};
pub use rules::{match_label, AliasRule, LabelRule};
pub use structural::MIN_PLAUSIBLE_CONTAINERS;
pub use text::{card_number_in, visible_text, CARD_NUMBER};

use scraper::Html;
use url::Url;

use crate::model::{CardRecord, DetailQueueItem};

/// Which tier of the list-mode chain produced a page's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTier {
    Structural,
    EmbeddedState,
    Nothing,
}

/// Extractor bound to one site
#[derive(Debug, Clone)]
pub struct Extractor {
    base: Url,
    card_link_prefix: String,
    package_link_prefix: String,
}

impl Extractor {
    pub fn new(
        base: Url,
        card_link_prefix: impl Into<String>,
        package_link_prefix: impl Into<String>,
    ) -> Self {
        Self {
            base,
            card_link_prefix: card_link_prefix.into(),
            package_link_prefix: package_link_prefix.into(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// List-mode chain: structural selection, then embedded state
    pub fn list_records(&self, html: &str) -> (Vec<CardRecord>, ListTier) {
        let document = Html::parse_document(html);
        let records = structural::extract(&document, &self.base);
        if !records.is_empty() {
            return (records, ListTier::Structural);
        }

        let records = embedded::extract(html);
        if !records.is_empty() {
            return (records, ListTier::EmbeddedState);
        }

        (Vec::new(), ListTier::Nothing)
    }

    /// Detail-mode chain; `None` when neither a number nor a name resolved
    pub fn detail_record(&self, html: &str, detail_url: &str) -> Option<CardRecord> {
        Some(detail::extract(html, detail_url, &self.base)).filter(CardRecord::is_valid)
    }

    /// Full-schema records from the rendered card blocks
    pub fn full_records(&self, html: &str) -> Vec<CardRecord> {
        full::extract(&Html::parse_document(html), &self.base)
    }

    /// Name + detail URL rows for pages whose card blocks did not parse
    pub fn minimal_records(&self, html: &str) -> Vec<CardRecord> {
        full::minimal(&Html::parse_document(html), &self.base, &self.card_link_prefix)
    }

    /// Selector for the heading links that minimal rows are built from
    ///
    /// Counted together with [`CARD_BLOCK`] while scrolling package pages.
    pub fn card_link_probe(&self) -> String {
        format!("h2 a[href^='{}']", self.card_link_prefix)
    }

    /// Per-card detail links of one list page
    pub fn detail_items(&self, html: &str) -> Vec<DetailQueueItem> {
        links::detail_items(&Html::parse_document(html), &self.base)
    }

    /// Queues the detail links of one list page, returning how many were new
    pub fn queue_details(&self, queue: &mut DetailQueue, html: &str) -> usize {
        queue.extend_from_page(&Html::parse_document(html), &self.base)
    }

    /// Package page URLs linked from the package index
    pub fn package_links(&self, html: &str) -> Vec<String> {
        links::package_links(
            &Html::parse_document(html),
            &self.base,
            &self.package_link_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(
            Url::parse("https://zxcard.yimieji.com").unwrap(),
            "/Cards/",
            "/Package/",
        )
    }

    #[test]
    fn test_chain_prefers_structural() {
        let html = r#"<html><body><ul>
            <li>E53-021 R 火山</li>
            <li>E53-022 SR 海</li>
            <li>E53-023 N 森</li>
        </ul><script>window.__NUXT__={"a":{"cno":"X01-001","cname":"other"}};</script></body></html>"#;

        let (records, tier) = extractor().list_records(html);
        assert_eq!(tier, ListTier::Structural);
        let numbers: Vec<_> = records.iter().map(|r| r.card_number.as_str()).collect();
        assert_eq!(numbers, vec!["E53-021", "E53-022", "E53-023"]);
    }

    #[test]
    fn test_chain_falls_through_to_embedded_state() {
        let html = r#"<html><body><div id="app"></div>
            <script>window.__NUXT__={"a":{"cno":"E53-021","cname":"雷兽"}};</script>
        </body></html>"#;

        let (records, tier) = extractor().list_records(html);
        assert_eq!(tier, ListTier::EmbeddedState);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].card_number, "E53-021");
        assert_eq!(records[0].name, "雷兽");
    }

    #[test]
    fn test_chain_nothing() {
        let (records, tier) = extractor().list_records("<html><body><p>空</p></body></html>");
        assert!(records.is_empty());
        assert_eq!(tier, ListTier::Nothing);
    }

    #[test]
    fn test_minimal_rows_follow_card_link_prefix() {
        let ex = Extractor::new(Url::parse("https://cards.test").unwrap(), "/card/", "/pack/");
        let html = r#"<html><body>
            <h2><a href="/card/E01-001">火龙</a></h2>
            <h2><a href="/Cards/E01-002">水龙</a></h2>
            <h2><a href="/pack/B01">B01</a></h2>
        </body></html>"#;

        let rows = ex.minimal_records(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cn_name, "火龙");
        assert_eq!(rows[0].detail_url, "https://cards.test/card/E01-001");
        assert_eq!(ex.card_link_probe(), "h2 a[href^='/card/']");
    }

    #[test]
    fn test_detail_record_validity() {
        let ex = extractor();
        assert!(ex.detail_record("<html><body>nothing</body></html>", "u").is_none());
        let record = ex
            .detail_record("<html><body><h1>雷兽</h1></body></html>", "u")
            .unwrap();
        assert_eq!(record.cn_name, "雷兽");
    }
}
