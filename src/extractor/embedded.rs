//! Embedded client-state tier of the list-mode chain
//!
//! Server-rendered pages carry the framework's state as a JS object literal
//! assigned to `window.__NUXT__`. When the markup itself has no usable card
//! containers, that literal is sanitized into JSON, parsed, and walked for
//! card-like objects.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::rules::{AliasRule, EMBEDDED_ALIASES, EMBEDDED_KEY_HINTS};
use super::text::card_number_in;
use crate::model::CardRecord;

lazy_static! {
    static ref STATE_BLOCK: Regex = Regex::new(r"window\.__NUXT__\s*=\s*(\{[\s\S]*?\})\s*;")
        .expect("state block pattern is valid");
    static ref UNDEFINED: Regex = Regex::new(r"\bundefined\b").expect("undefined pattern is valid");
}

/// The embedded state as JSON text, with `undefined` literals replaced by `null`
pub fn state_json(html: &str) -> Option<String> {
    let literal = STATE_BLOCK.captures(html)?.get(1)?.as_str();
    Some(UNDEFINED.replace_all(literal, "null").into_owned())
}

/// Parses the embedded state; malformed state yields `None`
pub fn parse_state(html: &str) -> Option<Value> {
    let json = state_json(html)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Embedded state is not valid JSON: {}", e);
            None
        }
    }
}

/// Visits every object in the tree depth-first, parents before children
pub fn walk_objects<'a, F>(value: &'a Value, visit: &mut F)
where
    F: FnMut(&'a Map<String, Value>),
{
    match value {
        Value::Object(map) => {
            visit(map);
            for child in map.values() {
                walk_objects(child, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_objects(item, visit);
            }
        }
        _ => {}
    }
}

/// Objects of the tree that satisfy `predicate`, in depth-first order
pub fn collect_objects<'a, P>(value: &'a Value, predicate: P) -> Vec<&'a Map<String, Value>>
where
    P: Fn(&Map<String, Value>) -> bool,
{
    let mut found = Vec::new();
    walk_objects(value, &mut |map| {
        if predicate(map) {
            found.push(map);
        }
    });
    found
}

/// Scalar rendering of a JSON value; only strings and numbers carry card data
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether an object looks like a card: a hinted key, or a scalar value
/// containing a card number
pub fn is_card_like(map: &Map<String, Value>) -> bool {
    let hinted_key = map
        .keys()
        .any(|key| EMBEDDED_KEY_HINTS.iter().any(|hint| key.contains(hint)));

    hinted_key
        || map
            .values()
            .filter_map(scalar)
            .any(|v| card_number_in(&v).is_some())
}

/// First non-blank value among the rule's aliases
fn pick(map: &Map<String, Value>, rule: &AliasRule) -> Option<String> {
    rule.keys
        .iter()
        .filter_map(|key| map.get(*key))
        .filter_map(scalar)
        .find(|v| !v.is_empty())
}

/// Maps one card-like object onto a record through the alias table
pub fn record_from_object(map: &Map<String, Value>) -> CardRecord {
    let mut record = CardRecord::default();
    for rule in EMBEDDED_ALIASES {
        if let Some(value) = pick(map, rule) {
            record.set(rule.field, &value);
        }
    }
    record
}

/// Extracts list-schema records from the embedded state, unique by `(number, name)`
pub fn extract(html: &str) -> Vec<CardRecord> {
    let Some(state) = parse_state(html) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    collect_objects(&state, is_card_like)
        .into_iter()
        .map(record_from_object)
        .filter(|record| record.is_valid())
        .filter(|record| seen.insert((record.card_number.clone(), record.name.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_embedded_card() {
        let html = r#"<script>window.__NUXT__={"a":{"cno":"E53-021","cname":"雷兽"}};</script>"#;
        let records = extract(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].card_number, "E53-021");
        assert_eq!(records[0].name, "雷兽");
    }

    #[test]
    fn test_undefined_is_sanitized() {
        let html = r#"<script>window.__NUXT__ = {"list":[{"cno":"B01-001","name":"火龙","img":undefined,"cost":3}]};</script>"#;

        assert_eq!(
            state_json(html).unwrap(),
            r#"{"list":[{"cno":"B01-001","name":"火龙","img":null,"cost":3}]}"#
        );

        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_url, "");
        assert_eq!(records[0].cost, "3");
    }

    #[test]
    fn test_malformed_state_yields_nothing() {
        let html = "<script>window.__NUXT__ = {cards: [1, 2]};</script>";
        assert!(parse_state(html).is_none());
        assert!(extract(html).is_empty());
        assert!(extract("<html><body>no state</body></html>").is_empty());
    }

    #[test]
    fn test_alias_priority_and_duplicates() {
        let html = r#"<script>window.__NUXT__={"data":[
            {"cardNo":"E01-001","cname":"雷兽","name":"Raiju","rarity":"SR","url":"/Cards/E01-001"},
            {"cardNo":"E01-001","cname":"雷兽","rarity":"R"},
            {"label":"nothing here"}
        ]};</script>"#;
        let records = extract(html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "雷兽");
        assert_eq!(records[0].rarity, "SR");
        assert_eq!(records[0].detail_url, "/Cards/E01-001");
    }

    #[test]
    fn test_visitor_matches_values_and_nested_objects() {
        let state = json!({
            "page": {"title": "卡表"},
            "items": [{"code": "E53-021 SR", "meta": {"owner": 1}}]
        });
        let found = collect_objects(&state, is_card_like);

        assert_eq!(found.len(), 1);
        assert!(found[0].contains_key("code"));
    }
}
