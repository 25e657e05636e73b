//! Canonicalization of parsed model output
//!
//! [`normalize`] maps a loosely-shaped object (fields sometimes strings,
//! sometimes lists, sometimes missing) to a [`MetadataRecord`] where list
//! fields are sequences of clean strings and missing data is replaced by a
//! `No <field> information available` sentinel. Running it again on its own
//! output changes nothing.

use crate::types::MetadataRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Fields that always normalize to a sequence of strings
pub const ARRAY_FIELDS: &[&str] = &[
    "Authors",
    "Contributors",
    "Keywords",
    "Dependencies",
    "Funding",
    "DOI",
    "InstallationInstructions",
];

const LEGACY_INSTALLATION_KEY: &str = "Installation_Instructions";
const INSTALLATION_KEY: &str = "InstallationInstructions";

/// Phrases that mark a model-provided value as "nothing found"
const INVALID_PHRASES: &[&str] = &["no information", "not available", "not found"];

static SENTINEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^No .+ information available$").expect("valid sentinel regex"));

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\s").expect("valid numbered item regex"));

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s+").expect("valid leading number regex"));

static LINE_BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Normalize a parsed object into a metadata record
///
/// In order: `Installation_Instructions` is renamed to
/// `InstallationInstructions`, list fields are coerced to sequences, markup
/// is stripped from every string, an empty `DOI` sequence is dropped, and
/// any remaining invalid field is replaced by its sentinel. Key order is
/// preserved.
pub fn normalize(parsed: &Map<String, Value>) -> MetadataRecord {
    parsed
        .iter()
        .map(|(key, value)| {
            let key = if key == LEGACY_INSTALLATION_KEY {
                INSTALLATION_KEY.to_string()
            } else {
                key.clone()
            };
            (key, value)
        })
        .filter_map(|(key, value)| {
            let value = normalize_field(&key, value)?;
            Some((key, value))
        })
        .collect::<Map<String, Value>>()
        .into()
}

/// Normalize one top-level field; `None` removes it
fn normalize_field(key: &str, value: &Value) -> Option<Value> {
    let is_array_field = ARRAY_FIELDS.contains(&key);

    let value = if is_array_field {
        coerce_field(value)
    } else {
        value.clone()
    };

    let mut value = strip_value(value);
    if is_array_field {
        if let Value::Array(items) = &mut value {
            items.retain(|item| item.as_str().map_or(true, |s| !s.is_empty()));
        }
    }

    if key == "DOI" && matches!(&value, Value::Array(items) if items.is_empty()) {
        return None;
    }

    if is_invalid(&value) {
        return Some(Value::String(sentinel(key)));
    }
    Some(value)
}

fn coerce_field(value: &Value) -> Value {
    match value {
        Value::String(s) if is_sentinel(s) => value.clone(),
        _ => Value::Array(coerce_array(value).into_iter().map(Value::String).collect()),
    }
}

/// Coerce a value to an ordered sequence of trimmed, non-empty strings
///
/// Sequences keep their elements (strings trimmed, `null` dropped, other
/// values as compact JSON). Strings are split on the first separator kind
/// they contain: comma, then pipe, then newline (real or an escaped `\n`),
/// then a `<digits>. ` numbered-list marker. Anything else yields an empty
/// sequence.
pub fn coerce_array(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .filter(|item| !item.is_empty())
            .collect(),
        Value::String(s) => split_list(s),
        _ => Vec::new(),
    }
}

fn split_list(s: &str) -> Vec<String> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }

    let pieces: Vec<String> = if s.contains(',') {
        s.split(',').map(str::to_string).collect()
    } else if s.contains('|') {
        s.split('|').map(str::to_string).collect()
    } else if s.contains('\n') || s.contains("\\n") {
        s.replace("\\n", "\n")
            .lines()
            .map(|line| LEADING_NUMBER.replace(line.trim(), "").into_owned())
            .collect()
    } else if NUMBERED_ITEM.is_match(s) {
        NUMBERED_ITEM.split(s).map(str::to_string).collect()
    } else {
        vec![s.to_string()]
    };

    pieces
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Strip markup from every string in a value, recursively
fn strip_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_markup(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_value).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, strip_value(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Convert `<br>` to newlines, decode common entities, drop tags and trim
///
/// Repeats until the text stops changing, so doubly-escaped input ends up
/// the same as its decoded form.
pub fn strip_markup(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_markup_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_markup_once(text: &str) -> String {
    let mut out = LINE_BREAK_TAG.replace_all(text, "\n").into_owned();
    for (entity, replacement) in ENTITIES {
        out = out.replace(entity, replacement);
    }
    TAG.replace_all(&out, "").trim().to_string()
}

fn is_sentinel(text: &str) -> bool {
    SENTINEL.is_match(text)
}

fn is_invalid_text(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || is_sentinel(text) {
        return true;
    }
    let lower = text.to_lowercase();
    INVALID_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn is_invalid(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_invalid_text(s),
        Value::Array(items) => {
            items.is_empty()
                || items.iter().all(|item| match item {
                    Value::Null => true,
                    Value::String(s) => is_invalid_text(s),
                    _ => false,
                })
        }
        _ => false,
    }
}

/// Sentinel text for a field with no usable value
pub fn sentinel(field: &str) -> String {
    format!("No {} information available", humanize(field))
}

/// `InstallationInstructions` -> `installation instructions`; acronyms stay
fn humanize(field: &str) -> String {
    let is_acronym =
        field.chars().any(char::is_alphabetic) && !field.chars().any(char::is_lowercase);
    if is_acronym {
        return field.to_string();
    }

    let mut out = String::with_capacity(field.len() + 4);
    let mut prev: Option<char> = None;
    for c in field.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            prev = None;
            continue;
        }
        let boundary = prev.map_or(false, |p| p.is_lowercase() || p.is_ascii_digit());
        if c.is_uppercase() && boundary {
            out.push(' ');
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }
    out.trim_end().to_string()
}
