//! Resolution of import references to canonical source locations

use crate::{
    config::FlattenConfig,
    scanner::{ImportKind, ImportReference, ImportRules},
    source::{normalize_path, SourceStore},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Why an import could not be turned into an inclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedReason {
    /// Matched a vendor prefix but the mirror doesn't contain the file
    VendorMissing,
    /// Namespaced or remote import that is never flattened
    ByDesign,
    /// Local file doesn't exist
    FileMissing,
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VendorMissing => "vendor-missing",
            Self::ByDesign => "by-design",
            Self::FileMissing => "file-missing",
        }
    }
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one import reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    Resolved(PathBuf),
    Unresolved(UnresolvedReason),
}

/// Maps import references to canonical paths through a [`SourceStore`].
///
/// Nothing is cached: every call looks at the store again, so a mirror that
/// changes between runs is picked up.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    rules: ImportRules,
    vendor_root: PathBuf,
}

impl DependencyResolver {
    pub fn new(rules: ImportRules, vendor_root: PathBuf) -> Self {
        Self { rules, vendor_root }
    }

    /// Creates a resolver from the vendor table, markers and mirror root in `config`
    pub fn from_config(config: &FlattenConfig) -> Self {
        Self::new(
            ImportRules::new(config.vendors.clone(), config.external_markers.clone()),
            config.vendor_directory(),
        )
    }

    pub fn rules(&self) -> &ImportRules {
        &self.rules
    }

    /// Resolves `reference` as imported from a unit living in `context_dir`
    pub fn resolve(
        &self,
        reference: &ImportReference,
        context_dir: &Path,
        store: &dyn SourceStore,
    ) -> ResolvedPath {
        let raw = reference.raw_path.as_str();

        if let Some(mapping) = self.rules.vendor_for(raw) {
            let remainder = &raw[mapping.prefix.len()..];
            let base = if mapping.directory.is_absolute() {
                mapping.directory.clone()
            } else {
                self.vendor_root.join(&mapping.directory)
            };
            let candidate = normalize_path(&base.join(remainder));
            return match store.canonicalize(&candidate) {
                Some(path) => ResolvedPath::Resolved(path),
                None => ResolvedPath::Unresolved(UnresolvedReason::VendorMissing),
            };
        }

        if reference.kind == ImportKind::ExternalUnavailable
            || self.rules.classify(raw) == ImportKind::ExternalUnavailable
        {
            return ResolvedPath::Unresolved(UnresolvedReason::ByDesign);
        }

        let candidate = normalize_path(&context_dir.join(raw));
        match store.canonicalize(&candidate) {
            Some(path) => ResolvedPath::Resolved(path),
            None => ResolvedPath::Unresolved(UnresolvedReason::FileMissing),
        }
    }
}
