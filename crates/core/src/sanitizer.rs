//! Removal of per-unit directives that must appear only once in merged output

use std::collections::BTreeMap;

const LICENSE_TAG: &str = "SPDX-License-Identifier:";
const PRAGMA_KEYWORD: &str = "pragma";
const SOLIDITY_KEYWORD: &str = "solidity";
const IMPORT_KEYWORD: &str = "import";

/// Line category recognized by the sanitizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    License,
    VersionPragma,
    Import,
}

/// Classifies a single line. Returns `None` for lines that pass through
pub fn directive(line: &str) -> Option<Directive> {
    let trimmed = line.trim_start();

    let uncommented = trimmed
        .strip_prefix("//")
        .map(|rest| rest.trim_start_matches('/').trim_start())
        .unwrap_or(trimmed);
    if uncommented.starts_with(LICENSE_TAG) {
        return Some(Directive::License);
    }

    if is_version_pragma(trimmed) {
        return Some(Directive::VersionPragma);
    }

    if starts_with_keyword(trimmed, IMPORT_KEYWORD) {
        return Some(Directive::Import);
    }

    None
}

/// `pragma solidity` with any whitespace between the two keywords
fn is_version_pragma(text: &str) -> bool {
    match text.strip_prefix(PRAGMA_KEYWORD) {
        Some(rest) if rest.starts_with(char::is_whitespace) => {
            starts_with_keyword(rest.trim_start(), SOLIDITY_KEYWORD)
        }
        _ => false,
    }
}

/// Keyword match that rejects identifiers merely sharing the prefix (`imported`)
fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    match text.strip_prefix(keyword) {
        Some(rest) => !rest.starts_with(is_identifier_char),
        None => false,
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Drops license, version pragma and import lines from `raw_text`.
///
/// `placeholders` maps zero-based line indices to replacement text: an import
/// line listed there is replaced by its placeholder instead of being dropped.
/// Every other line, including its terminator, is kept unchanged.
pub fn sanitize(raw_text: &str, placeholders: &BTreeMap<usize, String>) -> String {
    let mut out = String::with_capacity(raw_text.len());

    for (index, line) in raw_text.split_inclusive('\n').enumerate() {
        let content = line.trim_end_matches(['\n', '\r']);
        match directive(content) {
            Some(Directive::Import) => {
                if let Some(placeholder) = placeholders.get(&index) {
                    out.push_str(placeholder);
                    out.push_str(&line[content.len()..]);
                }
            }
            Some(_) => {}
            None => out.push_str(line),
        }
    }

    out
}
