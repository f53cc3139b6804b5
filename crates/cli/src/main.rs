//! CLI for the contract-flattener library
//!
//! Flattens Solidity contracts into verification payloads and optionally
//! compiles them into an ABI/bytecode artifact manifest.

use clap::{Args, Parser, Subcommand};
use contract_flattener::{
    compile, discover_entries, flatten_paths, save_artifact_manifest, save_batch,
    ArtifactWriterOptions, BatchReport, FlattenConfig, FsStore,
};
use eyre::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Solidity source flattener and verification payload generator
#[derive(Parser, Debug)]
#[command(name = "contract-flattener")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all logging except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Settings shared by all subcommands
#[derive(Args, Debug, Clone)]
struct ProjectSettings {
    /// Entry files; defaults to every .sol file under the sources directory
    entries: Vec<PathBuf>,

    /// Path to the project root
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Config file (defaults to flattener.toml in the project root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long = "out")]
    output_dir: Option<PathBuf>,

    /// Print a JSON summary to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Flatten entry files and write verification manifests
    Flatten {
        #[command(flatten)]
        project: ProjectSettings,

        /// Don't prefix merged bodies with `// File:` comments
        #[arg(long)]
        no_provenance: bool,
    },

    /// Compile entry files into artifacts.json
    Compile {
        #[command(flatten)]
        project: ProjectSettings,

        /// Compiler binary
        #[arg(long)]
        solc: Option<String>,
    },

    /// Compile, then flatten
    Build {
        #[command(flatten)]
        project: ProjectSettings,

        /// Compiler binary
        #[arg(long)]
        solc: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum Output {
    #[serde(rename = "success")]
    Success {
        #[serde(flatten)]
        data: SuccessData,
    },

    #[serde(rename = "error")]
    Error { error_type: String, message: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "command")]
enum SuccessData {
    #[serde(rename = "flatten")]
    Flatten(FlattenSummary),

    #[serde(rename = "compile")]
    Compile(CompileSummary),

    #[serde(rename = "build")]
    Build {
        compile: CompileSummary,
        flatten: FlattenSummary,
    },
}

#[derive(Debug, Serialize)]
struct FlattenSummary {
    entries: Vec<EntrySummary>,
    warnings: usize,
    failed: usize,
    report: String,
}

#[derive(Debug, Serialize)]
struct CompileSummary {
    contracts: Vec<String>,
    artifacts: String,
}

#[derive(Debug, Serialize)]
struct EntrySummary {
    name: String,
    status: String,
    units: usize,
    warnings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match execute(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output_error(e);
            std::process::exit(1);
        }
    }
}

/// Runs a command. Returns Ok(false) when any entry failed
fn execute(command: Commands) -> Result<bool> {
    match command {
        Commands::Flatten {
            project,
            no_provenance,
        } => {
            let flatten = run_flatten(&project, no_provenance)?;
            let ok = flatten.failed == 0;
            emit(&project, SuccessData::Flatten(flatten))?;
            Ok(ok)
        }
        Commands::Compile { project, solc } => {
            let compile = run_compile(&project, solc)?;
            emit(&project, SuccessData::Compile(compile))?;
            Ok(true)
        }
        Commands::Build { project, solc } => {
            let compile = run_compile(&project, solc)?;
            let flatten = run_flatten(&project, false)?;
            let ok = flatten.failed == 0;
            emit(&project, SuccessData::Build { compile, flatten })?;
            Ok(ok)
        }
    }
}

/// Prints the JSON summary when requested. Human-readable output is printed
/// by each step as it runs
fn emit(settings: &ProjectSettings, data: SuccessData) -> Result<()> {
    if settings.json {
        println!("{}", serde_json::to_string(&Output::Success { data })?);
    }
    Ok(())
}

/// Builds the effective config from the config file and CLI overrides
fn load_config(settings: &ProjectSettings) -> Result<FlattenConfig> {
    let mut config = match &settings.config {
        Some(path) => FlattenConfig::load(path)?,
        None => FlattenConfig::discover(&settings.project_root)?,
    };

    if !settings.entries.is_empty() {
        // Entries given on the command line are relative to the working directory
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        config.entries = settings.entries.iter().map(|e| cwd.join(e)).collect();
    }

    if let Some(output_dir) = &settings.output_dir {
        config.output_dir = output_dir.clone();
    }

    Ok(config)
}

fn run_flatten(settings: &ProjectSettings, no_provenance: bool) -> Result<FlattenSummary> {
    let mut config = load_config(settings)?;
    if no_provenance {
        config.provenance_comments = false;
    }

    let entries = discover_entries(&config)?;
    if entries.is_empty() {
        return Err(eyre::eyre!(
            "No entry files found in {}",
            config.sources_directory().display()
        ));
    }

    let report = flatten_paths(&entries, &config, &FsStore);
    let report_path = save_batch(&report, &ArtifactWriterOptions::from(&config))
        .context("Failed to save flatten outputs")?;

    if !settings.json {
        print_report(&report, &config);
    }

    Ok(FlattenSummary {
        entries: summarize(&report),
        warnings: report.warnings().count(),
        failed: report.failures().count(),
        report: report_path.display().to_string(),
    })
}

fn run_compile(settings: &ProjectSettings, solc: Option<String>) -> Result<CompileSummary> {
    let mut config = load_config(settings)?;
    if let Some(solc) = solc {
        config.compiler.solc = solc;
    }

    let entries = discover_entries(&config)?;
    let artifacts = compile(&config, &entries).context("Compilation failed")?;
    let path = save_artifact_manifest(&artifacts, &ArtifactWriterOptions::from(&config))?;

    if !settings.json {
        println!("✅ Compiled {} contracts", artifacts.len());
        println!("📄 {}", path.display());
    }

    Ok(CompileSummary {
        contracts: artifacts.keys().cloned().collect(),
        artifacts: path.display().to_string(),
    })
}

fn summarize(report: &BatchReport) -> Vec<EntrySummary> {
    report
        .entries
        .iter()
        .map(|e| EntrySummary {
            name: e.name.clone(),
            status: if e.is_success() { "success" } else { "failed" }.to_string(),
            units: e.units.len(),
            warnings: e.warnings.len(),
            sha256: e.sha256.clone(),
            error: e.error.clone(),
        })
        .collect()
}

fn print_report(report: &BatchReport, config: &FlattenConfig) {
    for entry in &report.entries {
        if entry.is_success() {
            println!(
                "✅ {} ({} units, {} warnings)",
                entry.name,
                entry.units.len(),
                entry.warnings.len()
            );
            for warning in &entry.warnings {
                println!(
                    "   ⚠️  unresolved import \"{}\" in {} ({})",
                    warning.reference.raw_path,
                    warning.importer.display(),
                    warning.reason
                );
            }
        } else {
            println!(
                "❌ {}: {}",
                entry.name,
                entry.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!(
        "📁 Output directory: {} ({} of {} entries flattened)",
        config.output_directory().display(),
        report.success_count(),
        report.entries.len()
    );
}

fn output_error(error: eyre::Report) {
    let message = format!("{error:#}");
    let error_type = if message.contains("Compilation failed") {
        "compilation_failed"
    } else if message.contains("config") {
        "invalid_config"
    } else if message.contains("No entry files") || message.contains("Sources directory") {
        "no_entries"
    } else {
        "unknown_error"
    };

    let output = Output::Error {
        error_type: error_type.to_string(),
        message,
    };

    match serde_json::to_string(&output) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{error:?}"),
    }
}
