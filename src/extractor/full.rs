//! Full-schema list parser for the site's rendered card blocks
//!
//! Each card on a list or package page is an Ant Design row: the image sits
//! in the left column and the attributes in a `lg-20` right column:
//!
//! ```text
//! div.ant-row
//!   div.ant-col ... img
//!   div.ant-col.ant-col-24.ant-col-lg-20
//!     .meta.head.clearfix   .cardColor, "E53-021 SR", span[float: right] "- Z/X"
//!     h2 > a[href]           Chinese name + detail link
//!     h3                     Japanese name
//!     .meta .row-item        .symbolHead label / .value
//!     p.effect               ability text, <br> separated
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use super::rules::{match_label_exact, STAT_ROW_LABELS};
use super::text::{attr, first, selector, spaced_text, squashed_text};
use crate::model::{CardRecord, Field};
use crate::url::absolutize;

/// Card block selector; also the item count probe while scrolling package pages
pub const CARD_BLOCK: &str = "div.ant-col.ant-col-24.ant-col-lg-20";

lazy_static! {
    static ref BLOCKS: Selector = selector(CARD_BLOCK);
    static ref HEAD: Selector = selector(".meta.head.clearfix");
    static ref COLOR: Selector = selector(".cardColor");
    static ref TYPE_SPAN: Selector = selector("span[style*='float: right']");
    static ref CN_LINK: Selector = selector("h2 a");
    static ref CN_HEADING: Selector = selector("h2");
    static ref JP_HEADING: Selector = selector("h3");
    static ref STAT_ROWS: Selector = selector(".meta .row-item");
    static ref STAT_LABEL: Selector = selector(".symbolHead");
    static ref STAT_VALUE: Selector = selector(".value");
    static ref EFFECT: Selector = selector("p.effect");
    static ref IMAGE: Selector = selector("img");
    static ref MINIMAL_LINKS: Selector = selector("h2 a[href]");

    static ref HEAD_TOKENS: Regex =
        Regex::new(r"([A-Z]{1,3}\d{2,}-\d{2,})\s+([A-Z+]+)").expect("head pattern is valid");
    static ref TYPE_TAIL: Regex = Regex::new(r"-\s*(.+)$").expect("type pattern is valid");
}

/// Parses every card block of the page; blocks without number or names are dropped
pub fn extract(document: &Html, base: &Url) -> Vec<CardRecord> {
    document
        .select(&BLOCKS)
        .map(|block| record_from_block(block, base))
        .filter(CardRecord::is_valid)
        .collect()
}

fn record_from_block(block: ElementRef<'_>, base: &Url) -> CardRecord {
    let mut record = CardRecord::default();

    if let Some(head) = first(block, &HEAD) {
        if let Some(color) = first(head, &COLOR) {
            record.set(Field::Color, &squashed_text(color));
        }
        if let Some(caps) = HEAD_TOKENS.captures(&spaced_text(head)) {
            record.set(Field::CardNumber, &caps[1]);
            record.set(Field::Rarity, &caps[2]);
        }
        if let Some(span) = first(head, &TYPE_SPAN) {
            if let Some(caps) = TYPE_TAIL.captures(&spaced_text(span)) {
                record.set(Field::CardType, &caps[1]);
            }
        }
    }

    match first(block, &CN_LINK) {
        Some(link) => {
            record.set(Field::CnName, &squashed_text(link));
            if let Some(href) = attr(link, "href") {
                record.set(Field::DetailUrl, &absolutize(base, href));
            }
        }
        None => {
            if let Some(heading) = first(block, &CN_HEADING) {
                record.set(Field::CnName, &squashed_text(heading));
            }
        }
    }

    if let Some(jp) = first(block, &JP_HEADING) {
        record.set(Field::JpName, &squashed_text(jp));
    }

    for row in block.select(&STAT_ROWS) {
        let label = first(row, &STAT_LABEL).map(squashed_text).unwrap_or_default();
        let value = first(row, &STAT_VALUE).map(squashed_text).unwrap_or_default();
        if let Some(field) = match_label_exact(STAT_ROW_LABELS, &label) {
            record.set(field, &value);
        }
    }

    if let Some(effect) = first(block, &EFFECT) {
        record.set(Field::Text, &effect_text(effect));
    }

    if let Some(src) = enclosing_row(block)
        .and_then(|row| first(row, &IMAGE))
        .and_then(|img| attr(img, "src"))
    {
        record.set(Field::ImageUrl, &absolutize(base, src));
    }

    record
}

/// Ability text with one trimmed line per `<br>`-separated segment
pub fn effect_text(effect: ElementRef<'_>) -> String {
    let mut lines = vec![String::new()];

    for node in effect.descendants() {
        match node.value() {
            Node::Element(el) if el.name() == "br" => lines.push(String::new()),
            Node::Text(text) => {
                if let Some(current) = lines.last_mut() {
                    current.push_str(text);
                }
            }
            _ => {}
        }
    }

    lines
        .iter()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Nearest ancestor `div.ant-row`
fn enclosing_row(block: ElementRef<'_>) -> Option<ElementRef<'_>> {
    block.ancestors().filter_map(ElementRef::wrap).find(|el| {
        el.value().name() == "div" && el.value().classes().any(|c| c == "ant-row")
    })
}

/// Name + detail URL rows from the card links, used when no card block parses
///
/// Only heading links whose href starts with `card_link_prefix` count.
pub fn minimal(document: &Html, base: &Url, card_link_prefix: &str) -> Vec<CardRecord> {
    document
        .select(&MINIMAL_LINKS)
        .filter_map(|link| {
            let href = attr(link, "href")?;
            if !href.starts_with(card_link_prefix) {
                return None;
            }
            let mut record = CardRecord::default();
            record.set(Field::CnName, &squashed_text(link));
            record.set(Field::DetailUrl, &absolutize(base, href));
            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://zxcard.yimieji.com").unwrap()
    }

    const BLOCK: &str = r#"
        <div class="ant-row">
          <div class="ant-col ant-col-24 ant-col-lg-4"><img src="/img/E53-021.png"></div>
          <div class="ant-col ant-col-24 ant-col-lg-20">
            <div class="meta head clearfix">
              <span class="cardColor">红</span>
              <span>E53-021 SR</span>
              <span style="float: right">- Z/X</span>
            </div>
            <h2><a href="/Cards/E53-021">雷兽</a></h2>
            <h3>ライジュウ</h3>
            <div class="meta">
              <div class="row-item"><span class="symbolHead">费用</span><span class="value">3</span></div>
              <div class="row-item"><span class="symbolHead">力量</span><span class="value">5000</span></div>
              <div class="row-item"><span class="symbolHead">种族</span><span class="value">机械</span></div>
            </div>
            <p class="effect">【自】当这张卡登场时， 抽一张卡。<br>【常】 力量+1000<br> </p>
          </div>
        </div>"#;

    #[test]
    fn test_full_block() {
        let document = Html::parse_document(&format!("<html><body>{}</body></html>", BLOCK));
        let records = extract(&document, &base());

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.color, "红");
        assert_eq!(r.card_number, "E53-021");
        assert_eq!(r.rarity, "SR");
        assert_eq!(r.card_type, "Z/X");
        assert_eq!(r.cn_name, "雷兽");
        assert_eq!(r.jp_name, "ライジュウ");
        assert_eq!(r.cost, "3");
        assert_eq!(r.power, "5000");
        assert_eq!(r.race, "机械");
        assert_eq!(r.text, "【自】当这张卡登场时， 抽一张卡。\n【常】 力量+1000");
        assert_eq!(r.image_url, "https://zxcard.yimieji.com/img/E53-021.png");
        assert_eq!(r.detail_url, "https://zxcard.yimieji.com/Cards/E53-021");
    }

    #[test]
    fn test_empty_blocks_are_dropped() {
        let html = r#"<html><body>
            <div class="ant-col ant-col-24 ant-col-lg-20"><p class="effect">孤立的文本</p></div>
        </body></html>"#;
        let document = Html::parse_document(html);
        assert!(extract(&document, &base()).is_empty());
    }

    #[test]
    fn test_minimal_rows() {
        let html = r#"<html><body>
            <h2><a href="/Cards/B01-001">火龙</a></h2>
            <h2><a href="/Package/B01">卡包</a></h2>
            <h2><a href="/Cards/B01-002">水龙</a></h2>
        </body></html>"#;
        let document = Html::parse_document(html);

        assert!(extract(&document, &base()).is_empty());
        let rows = minimal(&document, &base(), "/Cards/");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cn_name, "火龙");
        assert_eq!(rows[0].card_number, "");
        assert_eq!(rows[1].detail_url, "https://zxcard.yimieji.com/Cards/B01-002");
    }
}
