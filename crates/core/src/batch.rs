//! Flattening many entry files with per-entry failure isolation

use crate::{
    assembler::{self, AssembledOutput, AssemblyOptions},
    config::FlattenConfig,
    flatten::{Flattener, ImportWarning},
    resolver::DependencyResolver,
    source::SourceStore,
    utils,
};
use eyre::{Context, Result};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};
use tracing::{error, info};
use walkdir::WalkDir;

/// Outcome of one entry file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failed,
}

/// Report line for one entry file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReport {
    pub entry: PathBuf,
    /// Contract name derived from the entry file, used for output file names
    pub name: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<ImportWarning>,
    /// Included units in output order
    pub units: Vec<String>,
    /// SHA256 of the flattened text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip)]
    pub output: Option<AssembledOutput>,
}

impl EntryReport {
    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Success
    }
}

/// Aggregated result of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub entries: Vec<EntryReport>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| !e.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| !e.is_success())
    }

    /// All warnings across all entries
    pub fn warnings(&self) -> impl Iterator<Item = &ImportWarning> {
        self.entries.iter().flat_map(|e| e.warnings.iter())
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }
}

/// Returns the configured entries, or every `.sol` file under the sources
/// directory when none are configured. Paths are absolute and sorted
pub fn discover_entries(config: &FlattenConfig) -> Result<Vec<PathBuf>> {
    if !config.entries.is_empty() {
        return Ok(config
            .entries
            .iter()
            .map(|e| config.project_path(e))
            .collect());
    }

    let sources_dir = config.sources_directory();
    if !sources_dir.is_dir() {
        return Err(eyre::eyre!(
            "Sources directory does not exist: {}",
            sources_dir.display()
        ));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(&sources_dir).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("Failed to walk {}", sources_dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "sol") {
            entries.push(path.to_path_buf());
        }
    }

    Ok(entries)
}

/// Discovers entries and flattens each of them
pub fn flatten_entries(config: &FlattenConfig, store: &dyn SourceStore) -> Result<BatchReport> {
    let entries = discover_entries(config)?;
    info!("Flattening {} entry files", entries.len());
    Ok(flatten_paths(&entries, config, store))
}

/// Flattens independent entries in parallel. A failing entry is recorded in
/// the report and never stops the others
pub fn flatten_paths(
    entries: &[PathBuf],
    config: &FlattenConfig,
    store: &dyn SourceStore,
) -> BatchReport {
    let resolver = DependencyResolver::from_config(config);
    let options = AssemblyOptions::from(config);
    let display_root = display_root(&config.project_root);
    let names = output_names(entries, config);

    let entries = entries
        .par_iter()
        .zip(names.par_iter())
        .map(|(entry, name)| match name {
            Ok(name) => {
                let flattener =
                    Flattener::new(&resolver, store).with_display_root(&display_root);
                flatten_one(&flattener, entry, name.clone(), &options)
            }
            Err(message) => {
                error!("Skipping {}: {}", entry.display(), message);
                failed(entry, utils::contract_name(entry), message.clone())
            }
        })
        .collect();

    BatchReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        entries,
    }
}

/// Output names per entry. The contract name is used when it is unique in
/// the batch; entries sharing a name are qualified by their directory below
/// the sources directory (`a/Token.sol` becomes `a_Token`). An entry whose
/// name is still taken gets an error instead
fn output_names(entries: &[PathBuf], config: &FlattenConfig) -> Vec<Result<String, String>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(utils::contract_name(entry)).or_default() += 1;
    }

    let sources_dir = config.sources_directory();
    let mut taken: HashMap<String, &Path> = HashMap::new();

    entries
        .iter()
        .map(|entry| {
            let plain = utils::contract_name(entry);
            let name = if counts[&plain] > 1 {
                let relative = entry
                    .strip_prefix(&sources_dir)
                    .or_else(|_| entry.strip_prefix(&config.project_root))
                    .unwrap_or(entry);
                qualified_name(relative)
            } else {
                plain
            };

            if let Some(other) = taken.get(&name) {
                return Err(format!(
                    "Output name {} is already used by {}",
                    name,
                    other.display()
                ));
            }
            taken.insert(name.clone(), entry.as_path());
            Ok(name)
        })
        .collect()
}

/// `a/b/Token.sol` -> `a_b_Token`
fn qualified_name(relative: &Path) -> String {
    relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn failed(entry: &Path, name: String, error: String) -> EntryReport {
    EntryReport {
        entry: entry.to_path_buf(),
        name,
        status: EntryStatus::Failed,
        error: Some(error),
        warnings: vec![],
        units: vec![],
        sha256: None,
        output: None,
    }
}

fn flatten_one(
    flattener: &Flattener<'_>,
    entry: &Path,
    name: String,
    options: &AssemblyOptions,
) -> EntryReport {
    match flattener.flatten(entry) {
        Ok(result) => {
            let output = assembler::assemble(&utils::file_name(entry), &result, options);
            info!(
                "Flattened {} ({} units, {} warnings)",
                name,
                result.units.len(),
                result.warnings.len()
            );
            EntryReport {
                entry: entry.to_path_buf(),
                name,
                status: EntryStatus::Success,
                error: None,
                units: result.units.iter().map(|u| u.display_path.clone()).collect(),
                warnings: result.warnings,
                sha256: Some(output.text_hash()),
                output: Some(output),
            }
        }
        Err(e) => {
            error!("Failed to flatten {}: {}", entry.display(), e);
            failed(entry, name, e.to_string())
        }
    }
}

fn display_root(project_root: &Path) -> PathBuf {
    std::fs::canonicalize(project_root).unwrap_or_else(|_| project_root.to_path_buf())
}
