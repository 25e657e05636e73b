//! Recovery of a JSON object from a model reply
//!
//! Model replies are frequently almost-JSON: raw newlines inside strings,
//! invalid escapes, trailing or missing commas, an unquoted DOI, or prose
//! around the object. [`RepairPipeline`] runs an ordered list of
//! [`RepairStrategy`] tiers, each more permissive than the last, and stops
//! at the first one that yields an object:
//!
//! 1. [`DirectParse`] - structured replies as-is, or text that already parses
//! 2. [`CleanedParse`] - control-character and escape cleanup, structural
//!    comma fixes and DOI quoting, then a strict parse
//! 3. [`BracedSubstring`] - the same on the outermost `{...}` span
//! 4. [`RegexSalvage`] - key/value pairs picked out with regular expressions
//!
//! When every tier fails the outcome is [`ParseOutcome::Failure`] carrying
//! the original reply.

use crate::types::{MetadataRecord, ParseOutcome, RawModelReply};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message shown to users when no tier could parse the reply
pub const PARSE_FAILURE_MESSAGE: &str =
    "The model response could not be parsed into repository metadata. The raw response is shown below.";

/// `"DOI": <token>` where the value is not a string, array or object
static UNQUOTED_DOI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""DOI"\s*:\s*([^\s"\[{,}\]][^\s",}\]]*)"#).expect("valid DOI regex")
});

/// `"key": "string value"`
static STRING_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"\\]+)"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid string pair regex")
});

/// `"key": [list items]`
static LIST_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"\\]+)"\s*:\s*\[([^\]]*)\]"#).expect("valid list pair regex")
});

/// Why a single repair tier did not produce an object
#[derive(Debug, Error)]
pub enum RepairError {
    /// Reply is text, and not directly parseable
    #[error("reply is not a structured object")]
    NotStructured,

    /// Candidate text is still not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON, but not an object
    #[error("parsed value is not an object")]
    NotAnObject,

    /// No `{...}` span in the reply
    #[error("no braced span in reply")]
    NoBracedSpan,

    /// No key/value pairs could be salvaged
    #[error("no key/value pairs found")]
    NoMatches,
}

/// One tier of the repair pipeline
pub trait RepairStrategy: Send + Sync {
    /// Tier name (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Try to turn the reply into an object
    fn attempt(&self, reply: &RawModelReply) -> Result<Map<String, Value>, RepairError>;
}

/// Tier 1: use structured replies as-is and parse well-formed text
pub struct DirectParse;

impl RepairStrategy for DirectParse {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn attempt(&self, reply: &RawModelReply) -> Result<Map<String, Value>, RepairError> {
        match reply {
            RawModelReply::Structured(Value::Object(map)) => Ok(map.clone()),
            RawModelReply::Text(text) => {
                parse_object(text.trim()).map_err(|_| RepairError::NotStructured)
            }
            _ => Err(RepairError::NotStructured),
        }
    }
}

/// Tier 2: clean the whole reply, then parse strictly
pub struct CleanedParse;

impl RepairStrategy for CleanedParse {
    fn name(&self) -> &'static str {
        "cleaned"
    }

    fn attempt(&self, reply: &RawModelReply) -> Result<Map<String, Value>, RepairError> {
        parse_object(&prepare(&reply.raw_text()))
    }
}

/// Tier 3: clean and parse the span from the first `{` to the last `}`
pub struct BracedSubstring;

impl RepairStrategy for BracedSubstring {
    fn name(&self) -> &'static str {
        "braced"
    }

    fn attempt(&self, reply: &RawModelReply) -> Result<Map<String, Value>, RepairError> {
        let raw = reply.raw_text();
        let span = braced_span(&raw).ok_or(RepairError::NoBracedSpan)?;
        parse_object(&prepare(span))
    }
}

/// Tier 4: assemble an object from every key/value pair found
pub struct RegexSalvage;

impl RepairStrategy for RegexSalvage {
    fn name(&self) -> &'static str {
        "salvage"
    }

    fn attempt(&self, reply: &RawModelReply) -> Result<Map<String, Value>, RepairError> {
        let raw = reply.raw_text();
        let mut pairs: Vec<(usize, String, Value)> = Vec::new();

        for caps in STRING_PAIR.captures_iter(&raw) {
            let start = caps.get(0).map_or(0, |m| m.start());
            pairs.push((start, caps[1].to_string(), Value::String(unescape(&caps[2]))));
        }

        for caps in LIST_PAIR.captures_iter(&raw) {
            let start = caps.get(0).map_or(0, |m| m.start());
            let items = caps[2]
                .split(',')
                .map(|item| item.trim().trim_matches('"').trim_matches('\'').trim())
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect();
            pairs.push((start, caps[1].to_string(), Value::Array(items)));
        }

        if pairs.is_empty() {
            return Err(RepairError::NoMatches);
        }

        // Keep the reply's field order
        pairs.sort_by_key(|(start, _, _)| *start);
        Ok(pairs
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .collect())
    }
}

/// Ordered list of repair tiers
pub struct RepairPipeline {
    strategies: Vec<Box<dyn RepairStrategy>>,
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RepairPipeline {
    /// Create a pipeline with no tiers
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Create a pipeline with the four built-in tiers in order
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(DirectParse));
        pipeline.register(Box::new(CleanedParse));
        pipeline.register(Box::new(BracedSubstring));
        pipeline.register(Box::new(RegexSalvage));
        pipeline
    }

    /// Append a tier; tiers run in registration order
    pub fn register(&mut self, strategy: Box<dyn RepairStrategy>) {
        self.strategies.push(strategy);
    }

    /// Run the tiers until one succeeds
    pub fn repair(&self, reply: &RawModelReply) -> ParseOutcome {
        for strategy in &self.strategies {
            match strategy.attempt(reply) {
                Ok(fields) => {
                    info!(tier = strategy.name(), fields = fields.len(), "Parsed model reply");
                    return ParseOutcome::Success(MetadataRecord::new(fields));
                }
                Err(e) => {
                    debug!(tier = strategy.name(), error = %e, "Repair tier failed");
                }
            }
        }

        let raw = reply.raw_text();
        warn!(reply_len = raw.len(), "All repair tiers failed");
        ParseOutcome::Failure {
            message: PARSE_FAILURE_MESSAGE.to_string(),
            raw_response: display_raw(&raw),
        }
    }
}

/// Repair a reply with the default tiers
pub fn repair(reply: &RawModelReply) -> ParseOutcome {
    RepairPipeline::with_defaults().repair(reply)
}

/// Cleaning applied by tiers 2 and 3
fn prepare(raw: &str) -> String {
    let cleaned = clean_control_chars(raw);
    let collapsed = collapse_outside_strings(&cleaned);
    // Quoting first lets the comma pass see the DOI as a string literal
    fix_commas(&quote_doi(&collapsed))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, RepairError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(RepairError::NotAnObject),
    }
}

fn braced_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn is_control(c: char) -> bool {
    let cp = c as u32;
    cp < 0x20 || (0x7f..=0x9f).contains(&cp)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    AfterBackslash,
}

/// Strip control characters and rebuild string escapes
///
/// Outside strings a run of control characters becomes at most one space.
/// Inside strings each control character becomes a space and backticks
/// become `'`. Only the escapes `\n \r \t \" \\ \/` survive; `\'` becomes a
/// bare apostrophe and any other escape is replaced by its character.
fn clean_control_chars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut state = ScanState::Normal;

    for c in raw.chars() {
        state = match state {
            ScanState::Normal => {
                if c == '"' {
                    out.push(c);
                    ScanState::InString
                } else if is_control(c) {
                    if !out.ends_with(' ') {
                        out.push(' ');
                    }
                    ScanState::Normal
                } else {
                    out.push(c);
                    ScanState::Normal
                }
            }
            ScanState::InString => match c {
                '\\' => ScanState::AfterBackslash,
                '"' => {
                    out.push(c);
                    ScanState::Normal
                }
                '`' => {
                    out.push('\'');
                    ScanState::InString
                }
                c if is_control(c) => {
                    out.push(' ');
                    ScanState::InString
                }
                c => {
                    out.push(c);
                    ScanState::InString
                }
            },
            ScanState::AfterBackslash => {
                match c {
                    'n' | 'r' | 't' | '"' | '\\' | '/' => {
                        out.push('\\');
                        out.push(c);
                    }
                    '\'' | '`' => out.push('\''),
                    c if is_control(c) => out.push(' '),
                    c => out.push(c),
                }
                ScanState::InString
            }
        };
    }

    out
}

/// Collapse whitespace runs outside strings to one space, then trim
fn collapse_outside_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut pending_space = false;

    for c in s.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    out.trim().to_string()
}

/// Next character at or after `from` that `skip` does not reject
fn peek_past(chars: &[char], from: usize, skip: impl Fn(char) -> bool) -> Option<char> {
    chars.get(from..)?.iter().copied().find(|c| !skip(*c))
}

/// Drop trailing commas and insert missing ones, outside strings
///
/// A comma is removed when only whitespace or further commas separate it
/// from a closing `}` or `]`. A comma is inserted after a closing `}`/`]`
/// followed by anything but `,`, `}`, `]` or `:`, and between two adjacent
/// string literals.
fn fix_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                if peek_past(&chars, i + 1, char::is_whitespace) == Some('"') {
                    out.push(',');
                }
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = peek_past(&chars, i + 1, |n| n.is_whitespace() || n == ',');
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            '}' | ']' => {
                out.push(c);
                if let Some(next) = peek_past(&chars, i + 1, char::is_whitespace) {
                    if !matches!(next, ',' | '}' | ']' | ':') {
                        out.push(',');
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Wrap an unquoted `"DOI"` value in quotes
fn quote_doi(s: &str) -> String {
    UNQUOTED_DOI
        .replace_all(s, |caps: &Captures| {
            let value = &caps[1];
            if value == "null" {
                return caps[0].to_string();
            }
            format!("\"DOI\": \"{}\"", value.replace('\\', "\\\\"))
        })
        .into_owned()
}

/// Decode JSON string escapes, keeping the text as-is if they are invalid
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

/// Tidy line endings and common escapes for display
fn display_raw(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> RawModelReply {
        RawModelReply::Text(s.to_string())
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_pipeline_order() {
        let pipeline = RepairPipeline::with_defaults();
        let names: Vec<_> = pipeline.strategies.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["direct", "cleaned", "braced", "salvage"]);
    }

    #[test]
    fn test_direct_structured_reply() {
        let reply = RawModelReply::Structured(json!({"License": "MIT"}));
        assert_eq!(
            DirectParse.attempt(&reply).unwrap(),
            object(json!({"License": "MIT"}))
        );
    }

    #[test]
    fn test_direct_valid_text() {
        let reply = text(r#"  {"Keywords": ["a\u00e9"]}  "#);
        assert_eq!(
            DirectParse.attempt(&reply).unwrap(),
            object(json!({"Keywords": ["a\u{e9}"]}))
        );
    }

    #[test]
    fn test_direct_rejects_broken_text_and_non_objects() {
        assert!(matches!(
            DirectParse.attempt(&text(r#"{"a": 1,}"#)),
            Err(RepairError::NotStructured)
        ));
        assert!(matches!(
            DirectParse.attempt(&RawModelReply::Structured(json!([1, 2]))),
            Err(RepairError::NotStructured)
        ));
        assert!(matches!(
            DirectParse.attempt(&RawModelReply::Absent),
            Err(RepairError::NotStructured)
        ));
    }

    #[test]
    fn test_cleaned_trailing_comma() {
        let fields = CleanedParse.attempt(&text(r#"{"Authors": "A, B",}"#)).unwrap();
        assert_eq!(fields, object(json!({"Authors": "A, B"})));
    }

    #[test]
    fn test_cleaned_trailing_comma_in_array() {
        let fields = CleanedParse
            .attempt(&text("{\"Keywords\": [\"x\", \"y\", ],\n}"))
            .unwrap();
        assert_eq!(fields, object(json!({"Keywords": ["x", "y"]})));
    }

    #[test]
    fn test_cleaned_raw_newlines_in_strings() {
        let fields = CleanedParse
            .attempt(&text("{\n  \"InstallationInstructions\": \"pip install\tx\nthen run\"\n}"))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"InstallationInstructions": "pip install x then run"}))
        );
    }

    #[test]
    fn test_cleaned_escapes() {
        let fields = CleanedParse
            .attempt(&text(r#"{"a": "it\'s \`code\` \q \"ok\" line\nbreak"}"#))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"a": "it's 'code' q \"ok\" line\nbreak"}))
        );
    }

    #[test]
    fn test_cleaned_backticks_in_strings() {
        let fields = CleanedParse.attempt(&text(r#"{"cmd": "`make`"}"#)).unwrap();
        assert_eq!(fields, object(json!({"cmd": "'make'"})));
    }

    #[test]
    fn test_cleaned_missing_comma_after_close() {
        let fields = CleanedParse
            .attempt(&text("{\"Funding\": {\"agency\": \"NSF\"}\n\"Keywords\": [\"a\"]\n\"License\": \"MIT\"}"))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"Funding": {"agency": "NSF"}, "Keywords": ["a"], "License": "MIT"}))
        );
    }

    #[test]
    fn test_cleaned_missing_comma_between_strings() {
        let fields = CleanedParse
            .attempt(&text("{\"License\": \"MIT\"\n\"DOI\": \"10.1/x\"}"))
            .unwrap();
        assert_eq!(fields, object(json!({"License": "MIT", "DOI": "10.1/x"})));
    }

    #[test]
    fn test_cleaned_unquoted_doi() {
        let fields = CleanedParse
            .attempt(&text(r#"{"Authors": ["A"], "DOI": 10.1234/abc, "License": "MIT"}"#))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"Authors": ["A"], "DOI": "10.1234/abc", "License": "MIT"}))
        );
    }

    #[test]
    fn test_cleaned_unquoted_doi_last_field() {
        let fields = CleanedParse
            .attempt(&text("{\"DOI\": https://doi.org/10.5281/zenodo.1 }"))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"DOI": "https://doi.org/10.5281/zenodo.1"}))
        );
    }

    #[test]
    fn test_cleaned_unquoted_doi_without_following_comma() {
        let fields = CleanedParse
            .attempt(&text("{\n\"DOI\": 10.1234/abc\n\"License\": \"MIT\"\n}"))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"DOI": "10.1234/abc", "License": "MIT"}))
        );

        let fields = CleanedParse
            .attempt(&text("{\"DOI\": 10.1234/abc\n\"Authors\": \"Ada, Grace\"}"))
            .unwrap();
        assert_eq!(
            fields,
            object(json!({"DOI": "10.1234/abc", "Authors": "Ada, Grace"}))
        );
    }

    #[test]
    fn test_quote_doi_takes_single_token() {
        assert_eq!(
            quote_doi(r#"{"DOI": 10.1/x "License": "MIT"}"#),
            r#"{"DOI": "10.1/x" "License": "MIT"}"#
        );
        assert_eq!(quote_doi(r#"{"DOI": null}"#), r#"{"DOI": null}"#);
    }

    #[test]
    fn test_cleaned_leaves_null_and_quoted_doi() {
        let fields = CleanedParse.attempt(&text(r#"{"DOI": null}"#)).unwrap();
        assert_eq!(fields, object(json!({"DOI": null})));

        let fields = CleanedParse.attempt(&text(r#"{"DOI": ["10.1/a"]}"#)).unwrap();
        assert_eq!(fields, object(json!({"DOI": ["10.1/a"]})));
    }

    #[test]
    fn test_cleaned_fails_on_surrounding_prose() {
        let reply = text("Here you go:\n{\"License\": \"MIT\"}\nHope this helps!");
        assert!(CleanedParse.attempt(&reply).is_err());
    }

    #[test]
    fn test_braced_substring() {
        let reply = text("Here you go:\n```json\n{\"License\": \"MIT\",\n\"DOI\": 10.1/x}\n```\nHope this helps!");
        let fields = BracedSubstring.attempt(&reply).unwrap();
        assert_eq!(fields, object(json!({"License": "MIT", "DOI": "10.1/x"})));
    }

    #[test]
    fn test_braced_substring_without_braces() {
        assert!(matches!(
            BracedSubstring.attempt(&text("no json here")),
            Err(RepairError::NoBracedSpan)
        ));
        assert!(matches!(
            BracedSubstring.attempt(&text("} backwards {")),
            Err(RepairError::NoBracedSpan)
        ));
    }

    #[test]
    fn test_salvage_truncated_reply() {
        let reply = text(r#"{"Authors": ["Ada", 'Grace', ""], "License": "MIT", "Keywords": ["x", "y""#);
        let fields = RegexSalvage.attempt(&reply).unwrap();
        assert_eq!(
            fields,
            object(json!({"Authors": ["Ada", "Grace"], "License": "MIT"}))
        );
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, vec!["Authors", "License"]);
    }

    #[test]
    fn test_salvage_decodes_escapes() {
        let fields = RegexSalvage
            .attempt(&text(r#"garbage "Funding": "NSF \"grant\" 42" more garbage"#))
            .unwrap();
        assert_eq!(fields, object(json!({"Funding": "NSF \"grant\" 42"})));
    }

    #[test]
    fn test_salvage_without_matches() {
        assert!(matches!(
            RegexSalvage.attempt(&text("just some words")),
            Err(RepairError::NoMatches)
        ));
    }

    #[test]
    fn test_repair_prose_fails_with_raw_text() {
        let raw = "I could not find any metadata in this repository.\r\nSorry!";
        match repair(&text(raw)) {
            ParseOutcome::Failure {
                message,
                raw_response,
            } => {
                assert_eq!(message, PARSE_FAILURE_MESSAGE);
                assert_eq!(
                    raw_response,
                    "I could not find any metadata in this repository.\nSorry!"
                );
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_repair_absent_reply_fails() {
        assert_eq!(
            repair(&RawModelReply::Absent),
            ParseOutcome::Failure {
                message: PARSE_FAILURE_MESSAGE.to_string(),
                raw_response: String::new(),
            }
        );
    }

    #[test]
    fn test_repair_uses_first_successful_tier() {
        let reply = text(r#"{"Authors": "A, B",}"#);
        assert!(matches!(
            DirectParse.attempt(&reply),
            Err(RepairError::NotStructured)
        ));
        assert_eq!(
            CleanedParse.attempt(&reply).unwrap(),
            object(json!({"Authors": "A, B"}))
        );

        let outcome = repair(&reply);
        assert_eq!(
            outcome,
            ParseOutcome::Success(MetadataRecord::new(object(json!({"Authors": "A, B"}))))
        );
    }

    #[test]
    fn test_empty_pipeline_always_fails() {
        let outcome = RepairPipeline::new().repair(&text(r#"{"a": "b"}"#));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_clean_control_chars_outside_strings() {
        assert_eq!(clean_control_chars("{\r\n\t\"a\"\u{85}:1}"), "{ \"a\" :1}");
    }

    #[test]
    fn test_collapse_outside_strings() {
        assert_eq!(
            collapse_outside_strings("  {  \"a  b\"  :   1 }  "),
            "{ \"a  b\" : 1 }"
        );
    }

    #[test]
    fn test_fix_commas_ignores_strings() {
        assert_eq!(fix_commas(r#"{"a": "x,}", "b": "[1] y"}"#), r#"{"a": "x,}", "b": "[1] y"}"#);
        assert_eq!(fix_commas(r#"[1,,]"#), "[1]");
        assert_eq!(fix_commas(r#"[{"a":1} {"b":2}]"#), r#"[{"a":1}, {"b":2}]"#);
    }

    #[test]
    fn test_display_raw() {
        assert_eq!(display_raw("a\\nb\r\nc \\\"d\\\""), "a\nb\nc \"d\"");
    }
}
