//! Artifact writing utilities for saving flatten results to disk

use crate::{
    artifacts::manifest::ArtifactManifest, assembler::AssembledOutput, batch::BatchReport,
    config::FlattenConfig,
};
use eyre::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the batch report
pub const REPORT_FILE_NAME: &str = "flatten-report.json";

/// File name of the compiled artifact manifest
pub const ARTIFACTS_FILE_NAME: &str = "artifacts.json";

/// Options for saving outputs to disk
#[derive(Debug, Clone)]
pub struct ArtifactWriterOptions {
    /// Directory where all files are written
    pub output_dir: PathBuf,
    /// Whether to pretty-print JSON files
    pub pretty_json: bool,
}

impl Default for ArtifactWriterOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            pretty_json: true,
        }
    }
}

impl From<&FlattenConfig> for ArtifactWriterOptions {
    fn from(config: &FlattenConfig) -> Self {
        Self {
            output_dir: config.output_directory(),
            pretty_json: config.pretty_json,
        }
    }
}

/// Paths of the files written for one entry
#[derive(Debug, Clone)]
pub struct SavedOutputs {
    pub flattened_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Saves the flattened source and verification manifest of one entry
///
/// Creates:
/// ```ignore
/// out/
///   Token_flattened.sol
///   verification_Token.json
/// ```
pub fn save_outputs(
    name: &str,
    output: &AssembledOutput,
    options: &ArtifactWriterOptions,
) -> Result<SavedOutputs> {
    create_output_dir(&options.output_dir)?;

    let flattened_path = options.output_dir.join(format!("{name}_flattened.sol"));
    std::fs::write(&flattened_path, &output.flattened_text).with_context(|| {
        format!(
            "Failed to write flattened source: {}",
            flattened_path.display()
        )
    })?;
    info!("Saved flattened source to: {}", flattened_path.display());

    let manifest_path = options.output_dir.join(format!("verification_{name}.json"));
    write_json(&output.manifest, &manifest_path, options.pretty_json)?;
    info!("Saved verification manifest to: {}", manifest_path.display());

    Ok(SavedOutputs {
        flattened_path,
        manifest_path,
    })
}

/// Saves outputs of every successful entry plus the batch report.
/// Returns the report path
pub fn save_batch(report: &BatchReport, options: &ArtifactWriterOptions) -> Result<PathBuf> {
    for entry in report.entries.iter().filter(|e| e.is_success()) {
        if let Some(output) = &entry.output {
            save_outputs(&entry.name, output, options)?;
        }
    }
    save_report(report, options)
}

/// Saves the batch report as `flatten-report.json`
pub fn save_report(report: &BatchReport, options: &ArtifactWriterOptions) -> Result<PathBuf> {
    create_output_dir(&options.output_dir)?;
    let path = options.output_dir.join(REPORT_FILE_NAME);
    write_json(report, &path, options.pretty_json)?;
    info!("Saved report to: {}", path.display());
    Ok(path)
}

/// Saves compiled contract artifacts as `artifacts.json`
pub fn save_artifact_manifest(
    manifest: &ArtifactManifest,
    options: &ArtifactWriterOptions,
) -> Result<PathBuf> {
    create_output_dir(&options.output_dir)?;
    let path = options.output_dir.join(ARTIFACTS_FILE_NAME);
    write_json(manifest, &path, options.pretty_json)?;
    info!("Saved {} contract artifacts to: {}", manifest.len(), path.display());
    Ok(path)
}

fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
