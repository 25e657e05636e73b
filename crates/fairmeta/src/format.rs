//! Per-file content normalization
//!
//! Every fetched file is flattened to a single line before it becomes part
//! of the prompt. The treatment depends on the file name:
//!
//! 1. `*.json` - parsed and re-serialized compactly
//! 2. prose (`*.md`, `*.txt`, ..., or an extension-less README) - Unicode
//!    punctuation folded to ASCII, line breaks and tabs turned into spaces
//! 3. known dependency manifests - line breaks and tabs turned into spaces
//! 4. anything else - all whitespace runs collapsed

use crate::vocab;

/// Extensions treated as prose
const PROSE_EXTENSIONS: &[&str] = &[
    ".md",
    ".markdown",
    ".txt",
    ".rst",
    ".html",
    ".adoc",
    ".asciidoc",
];

/// Unicode punctuation folded to ASCII in prose files
const PROSE_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2026}', "..."),
    ('\u{00a0}', " "),
    ('\r', " "),
    ('\n', " "),
    ('\t', " "),
    ('\u{200b}', ""),
    ('\u{200c}', ""),
    ('\u{200d}', ""),
    ('\u{feff}', ""),
];

/// Normalize the raw text of one file according to its name
pub fn format_file_content(file_name: &str, content: &str) -> String {
    let name = file_name.to_lowercase();

    if name.ends_with(".json") {
        format_json(content)
    } else if is_prose_name(&name) {
        format_prose(content)
    } else if vocab::is_dependency_name(&name) {
        format_dependency(content)
    } else {
        content.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn is_prose_name(name: &str) -> bool {
    PROSE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        || (!name.contains('.') && vocab::is_readme_name(name))
}

/// Re-serialize JSON compactly, or fall back to line flattening
fn format_json(content: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => value.to_string(),
        Err(_) => format_dependency(content),
    }
}

/// Fold typographic punctuation and flatten prose
fn format_prose(content: &str) -> String {
    let mut folded = String::with_capacity(content.len());
    for c in content.chars() {
        match PROSE_REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => folded.push_str(to),
            None => folded.push(c),
        }
    }
    collapse_spaces(&folded)
}

/// Flatten line breaks and tabs
fn format_dependency(content: &str) -> String {
    let flattened: String = content
        .chars()
        .map(|c| match c {
            '\r' | '\n' | '\t' => ' ',
            other => other,
        })
        .collect();
    collapse_spaces(&flattened)
}

/// Collapse runs of spaces into one and trim
pub fn collapse_spaces(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;

    for c in s.chars() {
        if c == ' ' {
            if !last_was_space {
                result.push(' ');
            }
            last_was_space = true;
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result.trim().to_string()
}
