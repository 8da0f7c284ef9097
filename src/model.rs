//! Card record data model
//!
//! `CardRecord` is the normalized unit of output. Every attribute is a plain
//! string and absence is the empty string, so both CSV schemas keep a stable
//! column layout regardless of which heuristics produced the record.

use std::fmt;

use crate::dedup::RowView;

/// One normalized trading card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardRecord {
    pub card_id: String,
    pub card_number: String,
    pub name: String,
    pub cn_name: String,
    pub jp_name: String,
    pub rarity: String,
    pub card_type: String,
    pub race: String,
    pub cost: String,
    pub power: String,
    pub life: String,
    pub illustrator: String,
    pub color: String,
    pub series: String,
    pub note: String,
    pub text: String,
    pub image_url: String,
    pub detail_url: String,
}

/// Addressable record attribute, used by the static alias and label tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CardId,
    CardNumber,
    Name,
    CnName,
    JpName,
    Rarity,
    CardType,
    Race,
    Cost,
    Power,
    Life,
    Illustrator,
    Color,
    Series,
    Note,
    Text,
    ImageUrl,
    DetailUrl,
}

impl Field {
    /// Every field, in declaration order
    pub const ALL: [Field; 18] = [
        Field::CardId,
        Field::CardNumber,
        Field::Name,
        Field::CnName,
        Field::JpName,
        Field::Rarity,
        Field::CardType,
        Field::Race,
        Field::Cost,
        Field::Power,
        Field::Life,
        Field::Illustrator,
        Field::Color,
        Field::Series,
        Field::Note,
        Field::Text,
        Field::ImageUrl,
        Field::DetailUrl,
    ];
}

impl CardRecord {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::CardId => &self.card_id,
            Field::CardNumber => &self.card_number,
            Field::Name => &self.name,
            Field::CnName => &self.cn_name,
            Field::JpName => &self.jp_name,
            Field::Rarity => &self.rarity,
            Field::CardType => &self.card_type,
            Field::Race => &self.race,
            Field::Cost => &self.cost,
            Field::Power => &self.power,
            Field::Life => &self.life,
            Field::Illustrator => &self.illustrator,
            Field::Color => &self.color,
            Field::Series => &self.series,
            Field::Note => &self.note,
            Field::Text => &self.text,
            Field::ImageUrl => &self.image_url,
            Field::DetailUrl => &self.detail_url,
        }
    }

    pub fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::CardId => &mut self.card_id,
            Field::CardNumber => &mut self.card_number,
            Field::Name => &mut self.name,
            Field::CnName => &mut self.cn_name,
            Field::JpName => &mut self.jp_name,
            Field::Rarity => &mut self.rarity,
            Field::CardType => &mut self.card_type,
            Field::Race => &mut self.race,
            Field::Cost => &mut self.cost,
            Field::Power => &mut self.power,
            Field::Life => &mut self.life,
            Field::Illustrator => &mut self.illustrator,
            Field::Color => &mut self.color,
            Field::Series => &mut self.series,
            Field::Note => &mut self.note,
            Field::Text => &mut self.text,
            Field::ImageUrl => &mut self.image_url,
            Field::DetailUrl => &mut self.detail_url,
        }
    }

    /// Sets a field to the trimmed value; blank values leave the field untouched
    pub fn set(&mut self, field: Field, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            *self.slot_mut(field) = value.to_string();
        }
    }

    /// A record is only kept when it carries a card number or some name
    pub fn is_valid(&self) -> bool {
        !self.card_number.is_empty() || !self.primary_name().is_empty()
    }
}

/// Output column layout; the two schemas are never mixed in one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    List,
    Full,
}

const LIST_COLUMNS: &[(&str, Field)] = &[
    ("card_id", Field::CardId),
    ("card_number", Field::CardNumber),
    ("name", Field::Name),
    ("rarity", Field::Rarity),
    ("type", Field::CardType),
    ("race", Field::Race),
    ("cost", Field::Cost),
    ("power", Field::Power),
    ("life", Field::Life),
    ("illustrator", Field::Illustrator),
    ("text", Field::Text),
    ("image_url", Field::ImageUrl),
    ("detail_url", Field::DetailUrl),
];

const FULL_COLUMNS: &[(&str, Field)] = &[
    ("color", Field::Color),
    ("card_number", Field::CardNumber),
    ("series", Field::Series),
    ("rarity", Field::Rarity),
    ("type", Field::CardType),
    ("jp_name", Field::JpName),
    ("cn_name", Field::CnName),
    ("cost", Field::Cost),
    ("power", Field::Power),
    ("race", Field::Race),
    ("note", Field::Note),
    ("text_full", Field::Text),
    ("image_url", Field::ImageUrl),
    ("detail_url", Field::DetailUrl),
];

impl Schema {
    fn columns(&self) -> &'static [(&'static str, Field)] {
        match self {
            Self::List => LIST_COLUMNS,
            Self::Full => FULL_COLUMNS,
        }
    }

    /// Header row
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns().iter().map(|(name, _)| *name).collect()
    }

    /// Field stored in the named column of this schema
    pub fn field_for(&self, column: &str) -> Option<Field> {
        self.columns()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, field)| *field)
    }

    /// The record laid out in column order
    pub fn row<'a>(&self, record: &'a CardRecord) -> Vec<&'a str> {
        self.columns()
            .iter()
            .map(|(_, field)| record.get(*field))
            .collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// A per-card detail page waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailQueueItem {
    pub detail_url: String,
    pub card_number: String,
    pub title: String,
}
