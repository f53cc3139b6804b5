//! Depth-first flattening of a unit and its transitive imports

use crate::{
    resolver::{DependencyResolver, ResolvedPath, UnresolvedReason},
    sanitizer,
    scanner::{self, ImportReference},
    source::{SourceStore, StoreError},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// A unit read from storage during one pass
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub canonical_path: PathBuf,
    pub raw_text: String,
    pub imports: Vec<ImportReference>,
}

/// One merged body in dependency order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedUnit {
    /// Canonical identity of the unit
    pub path: PathBuf,
    /// Path shown in provenance comments, relative to the display root when possible
    pub display_path: String,
    /// Sanitized text
    pub body: String,
}

/// An import that produced no inclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportWarning {
    /// Unit containing the import
    pub importer: PathBuf,
    pub reference: ImportReference,
    pub reason: UnresolvedReason,
}

impl ImportWarning {
    /// Comment placed where the import directive used to be
    pub fn placeholder(&self) -> String {
        format!(
            "// [unresolved import] \"{}\" ({})",
            self.reference.raw_path, self.reason
        )
    }
}

/// Output of a single flatten pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenResult {
    /// Sanitized bodies, dependencies before dependents
    pub units: Vec<FlattenedUnit>,
    pub warnings: Vec<ImportWarning>,
}

impl FlattenResult {
    /// Sanitized bodies in output order
    pub fn ordered_bodies(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.body.as_str())
    }

    /// Index of a unit in the output order
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.units.iter().position(|u| u.path == path)
    }
}

/// Fatal failure of a flatten pass
#[derive(Debug, thiserror::Error)]
pub enum FlattenError {
    #[error("Entry file not found: {}", .0.display())]
    EntryMissing(PathBuf),

    #[error("Failed to read source unit: {0}")]
    SourceRead(#[from] StoreError),
}

/// Flattens entry files against a store.
///
/// The flattener itself holds no per-pass state, so one instance can serve
/// many passes, including concurrent ones.
pub struct Flattener<'a> {
    resolver: &'a DependencyResolver,
    store: &'a dyn SourceStore,
    display_root: Option<PathBuf>,
}

impl<'a> Flattener<'a> {
    pub fn new(resolver: &'a DependencyResolver, store: &'a dyn SourceStore) -> Self {
        Self {
            resolver,
            store,
            display_root: None,
        }
    }

    /// Provenance paths are shown relative to `root` when units live below it
    pub fn with_display_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.display_root = Some(crate::source::normalize_path(&root.into()));
        self
    }

    /// Flattens `entry` and everything it transitively imports
    pub fn flatten(&self, entry: &Path) -> Result<FlattenResult, FlattenError> {
        let canonical = self
            .store
            .canonicalize(entry)
            .ok_or_else(|| FlattenError::EntryMissing(entry.to_path_buf()))?;

        let mut pass = Pass {
            flattener: self,
            visited: HashSet::new(),
            result: FlattenResult::default(),
        };
        pass.visit(canonical)?;

        debug!(
            "Flattened {} into {} units with {} warnings",
            entry.display(),
            pass.result.units.len(),
            pass.result.warnings.len()
        );
        Ok(pass.result)
    }

    /// Reads a unit and scans its imports
    pub fn load(&self, canonical_path: &Path) -> Result<SourceUnit, StoreError> {
        let raw_text = self.store.read(canonical_path)?;
        let imports = scanner::extract_imports(&raw_text, self.resolver.rules());
        Ok(SourceUnit {
            canonical_path: canonical_path.to_path_buf(),
            raw_text,
            imports,
        })
    }

    fn display_path(&self, path: &Path) -> String {
        self.display_root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// State of one flatten pass
struct Pass<'p, 'a> {
    flattener: &'p Flattener<'a>,
    visited: HashSet<PathBuf>,
    result: FlattenResult,
}

impl Pass<'_, '_> {
    fn visit(&mut self, path: PathBuf) -> Result<(), FlattenError> {
        // Marked before recursing so a cycle back to this unit is a no-op
        if !self.visited.insert(path.clone()) {
            return Ok(());
        }

        let flattener = self.flattener;
        let unit = flattener.load(&path)?;
        debug!("Visiting {} ({} imports)", path.display(), unit.imports.len());

        let context_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let mut placeholders = BTreeMap::new();

        for reference in &unit.imports {
            match flattener
                .resolver
                .resolve(reference, &context_dir, flattener.store)
            {
                ResolvedPath::Resolved(dependency) => self.visit(dependency)?,
                ResolvedPath::Unresolved(reason) => {
                    warn!(
                        "Unresolved import \"{}\" in {} ({})",
                        reference.raw_path,
                        path.display(),
                        reason
                    );
                    let warning = ImportWarning {
                        importer: path.clone(),
                        reference: reference.clone(),
                        reason,
                    };
                    placeholders.insert(reference.line, warning.placeholder());
                    self.result.warnings.push(warning);
                }
            }
        }

        let body = sanitizer::sanitize(&unit.raw_text, &placeholders);
        self.result.units.push(FlattenedUnit {
            display_path: flattener.display_path(&path),
            path,
            body,
        });

        Ok(())
    }
}
