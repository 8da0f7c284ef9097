//! Static field-mapping tables
//!
//! Each table is an ordered list of `(candidates, target field)` rules. Rules
//! are evaluated top to bottom and the first candidate that yields a value wins,
//! so the order of entries is part of the behavior.

use crate::model::Field;

/// Key aliases for one field of an embedded-state object, in priority order
#[derive(Debug)]
pub struct AliasRule {
    pub field: Field,
    pub keys: &'static [&'static str],
}

/// Label keywords that route a label/value pair to one field
#[derive(Debug)]
pub struct LabelRule {
    pub field: Field,
    pub keywords: &'static [&'static str],
}

/// Embedded-state key aliases
pub const EMBEDDED_ALIASES: &[AliasRule] = &[
    AliasRule { field: Field::CardNumber, keys: &["cno", "cardNo", "编号"] },
    AliasRule { field: Field::Name, keys: &["cname", "name", "中文名", "title"] },
    AliasRule { field: Field::Rarity, keys: &["rarity", "稀有度"] },
    AliasRule { field: Field::CardType, keys: &["type", "类型"] },
    AliasRule { field: Field::Race, keys: &["race", "种族"] },
    AliasRule { field: Field::Cost, keys: &["cost", "费用"] },
    AliasRule { field: Field::Power, keys: &["power", "力量"] },
    AliasRule { field: Field::Life, keys: &["life", "生命"] },
    AliasRule { field: Field::Illustrator, keys: &["illust", "illustrator", "画师"] },
    AliasRule { field: Field::Text, keys: &["text", "能力"] },
    AliasRule { field: Field::ImageUrl, keys: &["image", "img", "image_url"] },
    AliasRule { field: Field::DetailUrl, keys: &["url", "link"] },
    AliasRule { field: Field::CardId, keys: &["id", "card_id"] },
];

/// Key fragments that mark an embedded-state object as card-like
pub const EMBEDDED_KEY_HINTS: &[&str] = &["cno", "cardNo", "编号", "name", "cname", "jname"];

/// Labels found in `<dl>` blocks of list-page cards
pub const LIST_LABELS: &[LabelRule] = &[
    LabelRule { field: Field::Rarity, keywords: &["稀有", "稀有度", "RARITY"] },
    LabelRule { field: Field::CardType, keywords: &["类型", "卡牌类型", "TYPE"] },
    LabelRule { field: Field::Race, keywords: &["种族", "RACE"] },
    LabelRule { field: Field::Cost, keywords: &["费用", "コスト", "COST"] },
    LabelRule { field: Field::Power, keywords: &["力量", "パワー", "POWER"] },
    LabelRule { field: Field::Life, keywords: &["生命", "ライフ", "LIFE"] },
    LabelRule { field: Field::Illustrator, keywords: &["画师", "插画", "イラスト", "ILLUSTRATOR"] },
];

/// Labels found in the description widgets of detail pages
pub const DETAIL_LABELS: &[LabelRule] = &[
    LabelRule { field: Field::CardNumber, keywords: &["编号", "NO", "卡号", "番号"] },
    LabelRule { field: Field::Color, keywords: &["颜色", "色", "Color"] },
    LabelRule { field: Field::Series, keywords: &["系列", "收录", "Series"] },
    LabelRule { field: Field::CardType, keywords: &["类型", "卡牌类型", "Type"] },
    LabelRule { field: Field::Rarity, keywords: &["稀有", "稀有度", "Rarity"] },
    LabelRule { field: Field::Race, keywords: &["种族", "Race"] },
    LabelRule { field: Field::Cost, keywords: &["费用", "コスト", "Cost"] },
    LabelRule { field: Field::Power, keywords: &["力量", "パワー", "Power"] },
    LabelRule { field: Field::Life, keywords: &["生命", "ライフ", "Life"] },
    LabelRule { field: Field::Illustrator, keywords: &["画师", "插画", "イラスト", "Illustrator"] },
];

/// Labels looked up directly in the page text when no label widgets exist.
/// Single-token fields stop at whitespace; race runs to the end of the line.
pub const TEXT_LABELS: &[LabelRule] = &[
    LabelRule { field: Field::Cost, keywords: &["费用", "コスト", "Cost"] },
    LabelRule { field: Field::Power, keywords: &["力量", "パワー", "Power"] },
    LabelRule { field: Field::Race, keywords: &["种族", "Race"] },
];

/// Labels of the stat rows inside full-schema list cards
pub const STAT_ROW_LABELS: &[LabelRule] = &[
    LabelRule { field: Field::Cost, keywords: &["费用"] },
    LabelRule { field: Field::Power, keywords: &["力量"] },
    LabelRule { field: Field::Race, keywords: &["种族"] },
];

/// First rule with a keyword contained in `label`
pub fn match_label(rules: &[LabelRule], label: &str) -> Option<Field> {
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| label.contains(k)))
        .map(|rule| rule.field)
}

/// Rule whose keywords include `label` exactly
pub fn match_label_exact(rules: &[LabelRule], label: &str) -> Option<Field> {
    rules
        .iter()
        .find(|rule| rule.keywords.contains(&label))
        .map(|rule| rule.field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_label_priority() {
        assert_eq!(match_label(LIST_LABELS, "稀有度"), Some(Field::Rarity));
        assert_eq!(match_label(LIST_LABELS, "卡牌类型"), Some(Field::CardType));
        assert_eq!(match_label(LIST_LABELS, "イラスト"), Some(Field::Illustrator));
        assert_eq!(match_label(LIST_LABELS, "备注"), None);
    }

    #[test]
    fn test_detail_labels() {
        assert_eq!(match_label(DETAIL_LABELS, "卡号"), Some(Field::CardNumber));
        assert_eq!(match_label(DETAIL_LABELS, "颜色"), Some(Field::Color));
        assert_eq!(match_label(DETAIL_LABELS, "收录系列"), Some(Field::Series));
        assert_eq!(match_label(DETAIL_LABELS, "パワー"), Some(Field::Power));
    }

    #[test]
    fn test_match_label_exact() {
        assert_eq!(match_label_exact(STAT_ROW_LABELS, "费用"), Some(Field::Cost));
        assert_eq!(match_label_exact(STAT_ROW_LABELS, "费用:"), None);
    }
}
