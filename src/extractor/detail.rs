//! Detail-page mode: label/value heuristics with text-scan fallbacks

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::rules::{match_label, DETAIL_LABELS, TEXT_LABELS};
use super::text::{
    attr, card_number_in, first, next_sibling_named, selector, spaced_text, squashed_text,
    visible_text,
};
use crate::model::{CardRecord, Field};
use crate::url::absolutize;

lazy_static! {
    static ref CN_TITLE: Selector = selector(".title-cn, .cn");
    static ref JP_TITLE: Selector = selector(".title-jp, .jp");
    static ref LABELS: Selector = selector("dl dt, .ant-descriptions-item-label");
    static ref DESCRIPTION_CONTENT: Selector = selector(".ant-descriptions-item-content");
    static ref TEXT_BLOCKS: Selector =
        selector(".ability, .text, .desc, .card-text, .ability-text, .cardtext");
    static ref HEADINGS: Selector = selector(".title, h1, h2");
    static ref IMAGE: Selector = selector("img");

    static ref TEXT_LOOKUPS: Vec<(Field, Vec<Regex>)> = TEXT_LABELS
        .iter()
        .map(|rule| {
            // race may contain spaces and runs to the end of the line
            let tail = if rule.field == Field::Race {
                r"\s*[:：]?\s*(.+)"
            } else {
                r"\s*[:：]?\s*(\S+)"
            };
            let patterns: Vec<Regex> = rule
                .keywords
                .iter()
                .map(|k| {
                    Regex::new(&format!("{}{}", regex::escape(k), tail))
                        .expect("text label pattern is valid")
                })
                .collect();
            (rule.field, patterns)
        })
        .collect();
    static ref NOTE: Regex = Regex::new(r"(这张卡不能正规使用。|不能正规使用|注意|备注)[:：]?(.*)")
        .expect("note pattern is valid");
    static ref ABILITY: Regex = Regex::new(r"【[自起常]】[\s\S]+").expect("ability pattern is valid");
    static ref KANA: Regex =
        Regex::new(r"[\x{30A0}-\x{30FF}\x{3040}-\x{309F}]").expect("kana pattern is valid");
}

/// Parses one detail page into a full-schema record
///
/// The result may be invalid (no number and no names); callers decide whether
/// to keep it.
pub fn extract(html: &str, detail_url: &str, base: &Url) -> CardRecord {
    let document = Html::parse_document(html);
    let text_all = visible_text(&document);
    let root = document.root_element();

    let mut record = CardRecord::default();
    record.set(Field::DetailUrl, detail_url);

    if let Some(cn) = first(root, &CN_TITLE) {
        record.set(Field::CnName, &squashed_text(cn));
    }
    if let Some(jp) = first(root, &JP_TITLE) {
        record.set(Field::JpName, &squashed_text(jp));
    }

    for label_el in document.select(&LABELS) {
        let label = squashed_text(label_el);
        let value = label_value(label_el).map(spaced_text).unwrap_or_default();
        if value.is_empty() {
            continue;
        }
        if let Some(field) = match_label(DETAIL_LABELS, &label) {
            record.set(field, &value);
        }
    }

    if record.card_number.is_empty() {
        if let Some(number) = card_number_in(&text_all) {
            record.set(Field::CardNumber, number);
        }
    }

    for (field, patterns) in TEXT_LOOKUPS.iter() {
        if !record.get(*field).is_empty() {
            continue;
        }
        let found = patterns
            .iter()
            .find_map(|re| re.captures(&text_all))
            .and_then(|caps| caps.get(1));
        if let Some(m) = found {
            record.set(*field, m.as_str());
        }
    }

    if let Some(m) = NOTE.find(&text_all) {
        record.set(Field::Note, m.as_str());
    }

    record.set(Field::Text, &ability_text(&document, &text_all));

    if let Some(src) = document
        .select(&IMAGE)
        .next()
        .and_then(|img| attr(img, "src"))
    {
        record.set(Field::ImageUrl, &absolutize(base, src));
    }

    if record.cn_name.is_empty() || record.jp_name.is_empty() {
        split_names(&document, &mut record);
    }

    record
}

/// Value element paired with a label: the following `dd`, or the content cell
/// of the label's description item
fn label_value(label: ElementRef<'_>) -> Option<ElementRef<'_>> {
    next_sibling_named(label, "dd").or_else(|| {
        label
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|parent| first(parent, &DESCRIPTION_CONTENT))
    })
}

fn ability_text(document: &Html, text_all: &str) -> String {
    let blocks: Vec<String> = document
        .select(&TEXT_BLOCKS)
        .map(spaced_text)
        .filter(|t| !t.is_empty())
        .collect();
    if !blocks.is_empty() {
        return blocks.join("\n");
    }

    ABILITY
        .find(text_all)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Fills empty name slots from the heading cluster: headings with kana go to
/// the Japanese name, the rest to the Chinese name
fn split_names(document: &Html, record: &mut CardRecord) {
    for heading in document.select(&HEADINGS) {
        let text = spaced_text(heading);
        if text.is_empty() {
            continue;
        }
        let slot = if KANA.is_match(&text) {
            Field::JpName
        } else {
            Field::CnName
        };
        if record.get(slot).is_empty() {
            record.set(slot, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://zxcard.yimieji.com").unwrap()
    }

    #[test]
    fn test_labelled_detail_page() {
        let html = r#"<html><body>
            <img src="/img/E53-021.png">
            <h1 class="title">雷兽</h1>
            <h2 class="title">ライジュウ</h2>
            <div class="ant-descriptions-item">
                <span class="ant-descriptions-item-label">卡号</span>
                <span class="ant-descriptions-item-content">E53-021</span>
            </div>
            <div class="ant-descriptions-item">
                <span class="ant-descriptions-item-label">颜色</span>
                <span class="ant-descriptions-item-content">红</span>
            </div>
            <div class="ant-descriptions-item">
                <span class="ant-descriptions-item-label">收录</span>
                <span class="ant-descriptions-item-content">B01 起始</span>
            </div>
            <dl><dt>稀有度</dt><dd>SR</dd><dt>力量</dt><dd>5000</dd></dl>
            <div class="ability">【自】当这张卡登场时，抽一张卡。</div>
            <div class="ability">【常】攻击时 力量 +1000</div>
        </body></html>"#;

        let record = extract(html, "https://zxcard.yimieji.com/Cards/1", &base());

        assert_eq!(record.card_number, "E53-021");
        assert_eq!(record.color, "红");
        assert_eq!(record.series, "B01 起始");
        assert_eq!(record.rarity, "SR");
        assert_eq!(record.power, "5000");
        assert_eq!(record.cn_name, "雷兽");
        assert_eq!(record.jp_name, "ライジュウ");
        assert_eq!(
            record.text,
            "【自】当这张卡登场时，抽一张卡。\n【常】攻击时 力量 +1000"
        );
        assert_eq!(record.image_url, "https://zxcard.yimieji.com/img/E53-021.png");
        assert_eq!(record.detail_url, "https://zxcard.yimieji.com/Cards/1");
        assert!(record.is_valid());
    }

    #[test]
    fn test_text_scan_fallbacks() {
        let html = "<html><body>\
            <h1>火龙</h1>\
            <p>E01-005</p>\
            <p>费用：4</p>\
            <p>种族: 龙族 古代</p>\
            <p>这张卡不能正规使用。</p>\
            <p>【起】抽一张卡。</p>\
            </body></html>";

        let record = extract(html, "", &base());

        assert_eq!(record.card_number, "E01-005");
        assert_eq!(record.cost, "4");
        assert_eq!(record.race, "龙族 古代");
        assert_eq!(record.note, "这张卡不能正规使用。");
        assert_eq!(record.text, "【起】抽一张卡。");
        assert_eq!(record.cn_name, "火龙");
        assert_eq!(record.jp_name, "");
        assert_eq!(record.image_url, "");
    }

    #[test]
    fn test_explicit_titles_win_over_headings() {
        let html = "<html><body>\
            <div class=\"title-cn\">雷兽</div><div class=\"title-jp\">ライジュウ</div>\
            <h1>其他标题</h1>\
            </body></html>";

        let record = extract(html, "", &base());
        assert_eq!(record.cn_name, "雷兽");
        assert_eq!(record.jp_name, "ライジュウ");
    }

    #[test]
    fn test_empty_page_is_invalid() {
        let record = extract("<html><body><p>404</p></body></html>", "https://x/Cards/9", &base());
        assert!(!record.is_valid());
    }
}
