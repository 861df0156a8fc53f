//! Reference extraction from JSON configs, formulas and id lists.

use super::Reference;
use crate::schema::TableKind;
use crate::snapshot::stringify;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Words never treated as bare parameter references.
const CONDITION_KEYWORDS: &[&str] = &[
    "null", "true", "false", "equals", "not", "and", "or", "if", "else", "return",
];

struct ReferencePatterns {
    dotted: Regex,
    brace_param: Regex,
    word: Regex,
}

impl ReferencePatterns {
    fn instance() -> &'static Self {
        static PATTERNS: OnceLock<ReferencePatterns> = OnceLock::new();
        PATTERNS.get_or_init(|| Self {
            dotted: Regex::new(r"\b([a-zA-Z0-9_]+)\.([a-zA-Z0-9_]+)\b")
                .expect("Invalid dotted reference pattern"),
            brace_param: Regex::new(r"\{([a-zA-Z0-9_]+)\}").expect("Invalid parameter pattern"),
            word: Regex::new(r"\b([a-zA-Z_][a-zA-Z0-9_]*)\b").expect("Invalid word pattern"),
        })
    }
}

/// Structured content of a JSON-shaped column.
///
/// Objects and arrays are used as-is, strings are parsed, and anything that
/// does not parse counts as absent.
pub(super) fn as_json(value: Option<&Value>) -> Option<Cow<'_, Value>> {
    match value? {
        v @ (Value::Object(_) | Value::Array(_)) => Some(Cow::Borrowed(v)),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|parsed| parsed.is_object() || parsed.is_array())
            .map(Cow::Owned),
        _ => None,
    }
}

/// References found anywhere inside a JSON-shaped column.
pub(super) fn json_references(value: Option<&Value>, out: &mut Vec<Reference>) {
    if let Some(data) = as_json(value) {
        walk_json(&data, out);
    }
}

fn walk_json(value: &Value, out: &mut Vec<Reference>) {
    match value {
        Value::Object(object) => {
            if let (Some(entity), Some(property)) = (object.get("entity"), object.get("property"))
            {
                out.push(Reference::Property {
                    entity: stringify(Some(entity)),
                    property: stringify(Some(property)),
                });
            }
            if let Some(expr @ Value::String(_)) = object.get("valueExpr") {
                formula_references(Some(expr), out);
            }
            if let Some(parameter) = object.get("parameter") {
                out.push(Reference::Parameter(stringify(Some(parameter))));
            }
            if let Some(dataset) = object.get("dataset") {
                out.push(Reference::Dataset(stringify(Some(dataset))));
            }
            for (key, kind) in [
                ("aggregation", TableKind::Aggregation),
                ("limitation", TableKind::Limitation),
                ("ordering", TableKind::Ordering),
            ] {
                if let Some(id) = object.get(key) {
                    out.push(Reference::Catalog(kind, stringify(Some(id))));
                }
            }
            if let Some(table) = object.get("table") {
                out.push(Reference::Table(stringify(Some(table))));
            }

            for nested in object.values() {
                walk_json(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_json(item, out);
            }
        }
        _ => {}
    }
}

/// References found in a formula-shaped column.
///
/// Dotted pairs become property candidates, `{name}` and bare words become
/// parameter candidates. Candidates that match no row are dropped when the
/// reference is followed.
pub(super) fn formula_references(value: Option<&Value>, out: &mut Vec<Reference>) {
    let Some(Value::String(formula)) = value else {
        return;
    };
    if formula.is_empty() {
        return;
    }
    let patterns = ReferencePatterns::instance();

    for caps in patterns.dotted.captures_iter(formula) {
        out.push(Reference::Property {
            entity: caps[1].to_string(),
            property: caps[2].to_string(),
        });
    }

    for caps in patterns.brace_param.captures_iter(formula) {
        out.push(Reference::Parameter(caps[1].to_string()));
    }

    let mut words: Vec<&str> = patterns
        .word
        .captures_iter(formula)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|word| !CONDITION_KEYWORDS.contains(word))
        .collect();
    words.sort_unstable();
    words.dedup();
    out.extend(
        words
            .into_iter()
            .map(|word| Reference::Parameter(word.to_string())),
    );
}

/// Normalises an id list column: a JSON array, a JSON array in a string, or
/// a `{a,b}` array literal. Empty items are dropped.
pub(super) fn id_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().map(|item| stringify(Some(item))).collect(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items.iter().map(|item| stringify(Some(item))).collect(),
            _ => parse_array_literal(s),
        },
        Some(scalar @ Value::Number(_)) => vec![stringify(Some(scalar))],
        _ => Vec::new(),
    };
    items.into_iter().filter(|item| !item.is_empty()).collect()
}

/// Splits a `{a, "b", 'c'}` array literal into its unquoted items.
pub(crate) fn parse_array_literal(literal: &str) -> Vec<String> {
    let trimmed = literal.trim();
    let Some(content) = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Vec::new();
    };

    content
        .split(',')
        .map(str::trim)
        .map(|part| {
            let quoted = part.len() >= 2
                && (part.starts_with('"') || part.starts_with('\''))
                && (part.ends_with('"') || part.ends_with('\''));
            if quoted {
                part.get(1..part.len().saturating_sub(1)).unwrap_or(part)
            } else {
                part
            }
        })
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
