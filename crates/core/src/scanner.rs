//! Line-level extraction of import directives.
//!
//! Only the plain form `import "path";` (or single-quoted) on a line of its
//! own is recognized. Named, aliased, wildcard and multi-line imports are not
//! interpreted. The scan is purely textual: an import-shaped line inside a
//! block comment or a multi-line string is still reported as an import.

use crate::config::VendorMapping;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s*(?:"([^"\r\n]+)"|'([^'\r\n]+)')\s*;\s*(?://.*)?$"#)
        .expect("import pattern is valid")
});

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme pattern is valid")
});

/// How an import path is expected to be satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// Relative to the importing unit
    Local,
    /// Served from the vendored package mirror
    VendoredPackage,
    /// Namespaced or remote path that is never flattened
    ExternalUnavailable,
}

/// An import directive found in a unit's text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportReference {
    /// Path exactly as written between the quotes
    pub raw_path: String,
    pub kind: ImportKind,
    /// Zero-based line index of the directive in its unit
    pub line: usize,
}

/// Classification rules for import paths
#[derive(Debug, Clone, Default)]
pub struct ImportRules {
    vendors: Vec<VendorMapping>,
    external_markers: Vec<String>,
}

impl ImportRules {
    pub fn new(vendors: Vec<VendorMapping>, external_markers: Vec<String>) -> Self {
        Self {
            vendors,
            external_markers,
        }
    }

    /// Returns the vendor mapping with the longest prefix matching `raw_path`
    pub fn vendor_for(&self, raw_path: &str) -> Option<&VendorMapping> {
        self.vendors
            .iter()
            .filter(|v| raw_path.starts_with(v.prefix.as_str()))
            .max_by_key(|v| v.prefix.len())
    }

    /// Classifies an import path. Vendor prefixes take precedence over
    /// external markers
    pub fn classify(&self, raw_path: &str) -> ImportKind {
        if self.vendor_for(raw_path).is_some() {
            ImportKind::VendoredPackage
        } else if self.is_external(raw_path) {
            ImportKind::ExternalUnavailable
        } else {
            ImportKind::Local
        }
    }

    fn is_external(&self, raw_path: &str) -> bool {
        URL_SCHEME.is_match(raw_path)
            || self
                .external_markers
                .iter()
                .any(|m| raw_path.starts_with(m.as_str()))
    }
}

/// Extracts import directives in textual order
pub fn extract_imports(text: &str, rules: &ImportRules) -> Vec<ImportReference> {
    text.lines()
        .enumerate()
        .filter_map(|(line, content)| {
            let captures = IMPORT_LINE.captures(content)?;
            let raw_path = captures.get(1).or_else(|| captures.get(2))?.as_str();
            Some(ImportReference {
                raw_path: raw_path.to_string(),
                kind: rules.classify(raw_path),
                line,
            })
        })
        .collect()
}
