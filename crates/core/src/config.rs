//! Configuration types for flattening and verification payload generation

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the configuration file looked up in the project root
pub const CONFIG_FILE_NAME: &str = "flattener.toml";

/// Main configuration for a flatten run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlattenConfig {
    /// Project root directory; relative paths below are resolved against it
    pub project_root: PathBuf,

    /// Entry source files. When empty, every `.sol` file under `sources_dir` is an entry
    pub entries: Vec<PathBuf>,

    /// Directory scanned for entries when `entries` is empty
    pub sources_dir: PathBuf,

    /// Output directory for all generated files
    /// If relative, it's relative to project_root
    pub output_dir: PathBuf,

    /// Root of the vendored package mirror
    /// If unset, vendor directories are relative to project_root
    pub vendor_root: Option<PathBuf>,

    /// Vendored package prefix table
    pub vendors: Vec<VendorMapping>,

    /// Import prefixes that are never flattened (namespaced packages without a mirror)
    pub external_markers: Vec<String>,

    /// Canonical header injected once at the top of every flattened file
    pub header: HeaderConfig,

    /// Whether to prefix every merged body with a `// File:` comment
    pub provenance_comments: bool,

    /// Settings block of the verification manifest
    pub manifest: ManifestConfig,

    /// Whether to pretty-print JSON outputs
    pub pretty_json: bool,

    /// Compiler invocation settings
    pub compiler: CompilerConfig,
}

/// One row of the vendored package table: imports starting with `prefix`
/// are looked up under `directory`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VendorMapping {
    pub prefix: String,
    pub directory: PathBuf,
}

impl VendorMapping {
    pub fn new(prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            directory: directory.into(),
        }
    }
}

/// License and version pragma written at the top of flattened output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeaderConfig {
    /// SPDX license identifier
    pub license: String,
    /// Version constraint placed after `pragma solidity`
    pub pragma: String,
}

/// Fixed compiler settings declared in the verification manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ManifestConfig {
    pub language: String,
    pub optimizer_enabled: bool,
    pub optimizer_runs: u32,
}

/// Settings for the optional `solc --standard-json` compile step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler binary name or path
    pub solc: String,
    /// Per-contract output selection passed to the compiler
    pub output_selection: Vec<String>,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            entries: vec![],
            sources_dir: PathBuf::from("contracts"),
            output_dir: PathBuf::from("out"),
            vendor_root: None,
            vendors: vec![VendorMapping::new(
                "@openzeppelin/",
                "node_modules/@openzeppelin/",
            )],
            external_markers: vec!["@".to_string()],
            header: HeaderConfig::default(),
            provenance_comments: true,
            manifest: ManifestConfig::default(),
            pretty_json: true,
            compiler: CompilerConfig::default(),
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            license: "MIT".to_string(),
            pragma: "^0.8.28".to_string(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            language: "Solidity".to_string(),
            optimizer_enabled: false,
            optimizer_runs: 200,
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            solc: "solc".to_string(),
            output_selection: vec!["abi".to_string(), "evm.bytecode".to_string()],
        }
    }
}

impl FlattenConfig {
    /// Loads configuration from a TOML file. `project_root` defaults to the
    /// file's directory when the file doesn't set it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        let has_root = table.contains_key("project_root");

        let mut config: Self = toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        if !has_root {
            if let Some(parent) = path.parent() {
                config.project_root = parent.to_path_buf();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads `flattener.toml` from the project root if present, otherwise defaults
    pub fn discover(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!("Loading config from {}", path.display());
            let mut config = Self::load(&path)?;
            if config.project_root.is_relative() {
                config.project_root = project_root.join(&config.project_root);
            }
            Ok(config)
        } else {
            Self::builder().project_root(project_root.to_path_buf()).build()
        }
    }

    /// Resolves a path against the project root
    pub fn project_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Returns the absolute output directory path
    pub fn output_directory(&self) -> PathBuf {
        self.project_path(&self.output_dir)
    }

    /// Returns the absolute vendor mirror root
    pub fn vendor_directory(&self) -> PathBuf {
        match &self.vendor_root {
            Some(root) => self.project_path(root),
            None => self.project_root.clone(),
        }
    }

    /// Returns the absolute directory scanned for entries
    pub fn sources_directory(&self) -> PathBuf {
        self.project_path(&self.sources_dir)
    }

    /// Import remappings in `prefix=directory` form for the compiler
    pub fn remappings(&self) -> Vec<String> {
        let vendor_root = self.vendor_directory();
        self.vendors
            .iter()
            .map(|v| {
                let dir = if v.directory.is_absolute() {
                    v.directory.clone()
                } else {
                    vendor_root.join(&v.directory)
                };
                let mut dir = dir.to_string_lossy().into_owned();
                if v.prefix.ends_with('/') && !dir.ends_with('/') {
                    dir.push('/');
                }
                format!("{}={}", v.prefix, dir)
            })
            .collect()
    }

    /// Validates the entire configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(empty) = self.vendors.iter().find(|v| v.prefix.is_empty()) {
            return Err(eyre::eyre!(
                "Vendor mapping for {} has an empty prefix",
                empty.directory.display()
            ));
        }

        if self.external_markers.iter().any(|m| m.is_empty()) {
            return Err(eyre::eyre!("External import markers must not be empty"));
        }

        if self.header.license.trim().is_empty() {
            return Err(eyre::eyre!("Header license must not be empty"));
        }

        if self.header.pragma.trim().is_empty() {
            return Err(eyre::eyre!("Header pragma must not be empty"));
        }

        Ok(())
    }

    /// Create a new builder for FlattenConfig
    pub fn builder() -> FlattenConfigBuilder {
        FlattenConfigBuilder::default()
    }
}

/// Builder for creating FlattenConfig with a fluent API
#[derive(Default)]
pub struct FlattenConfigBuilder {
    config: FlattenConfig,
}

impl FlattenConfigBuilder {
    /// Set the project root directory
    pub fn project_root(mut self, path: PathBuf) -> Self {
        self.config.project_root = path;
        self
    }

    /// Set the entry files
    pub fn entries(mut self, entries: Vec<PathBuf>) -> Self {
        self.config.entries = entries;
        self
    }

    /// Add a single entry file
    pub fn entry(mut self, entry: PathBuf) -> Self {
        self.config.entries.push(entry);
        self
    }

    /// Set the directory scanned for entries
    pub fn sources_dir(mut self, path: PathBuf) -> Self {
        self.config.sources_dir = path;
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.config.output_dir = path;
        self
    }

    /// Set the vendor mirror root
    pub fn vendor_root(mut self, path: PathBuf) -> Self {
        self.config.vendor_root = Some(path);
        self
    }

    /// Replace the vendored package table
    pub fn vendors(mut self, vendors: Vec<VendorMapping>) -> Self {
        self.config.vendors = vendors;
        self
    }

    /// Add a vendored package mapping
    pub fn vendor(mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        self.config.vendors.push(VendorMapping::new(prefix, directory));
        self
    }

    /// Replace the external import markers
    pub fn external_markers(mut self, markers: Vec<String>) -> Self {
        self.config.external_markers = markers;
        self
    }

    /// Set the header license and pragma
    pub fn header(mut self, license: impl Into<String>, pragma: impl Into<String>) -> Self {
        self.config.header = HeaderConfig {
            license: license.into(),
            pragma: pragma.into(),
        };
        self
    }

    /// Set whether to emit provenance comments
    pub fn provenance_comments(mut self, enabled: bool) -> Self {
        self.config.provenance_comments = enabled;
        self
    }

    /// Set whether to pretty-print JSON
    pub fn pretty_json(mut self, pretty: bool) -> Self {
        self.config.pretty_json = pretty;
        self
    }

    /// Configure the manifest settings block
    pub fn manifest(mut self, configure: impl FnOnce(&mut ManifestConfig)) -> Self {
        configure(&mut self.config.manifest);
        self
    }

    /// Configure the compiler invocation
    pub fn compiler(mut self, configure: impl FnOnce(&mut CompilerConfig)) -> Self {
        configure(&mut self.config.compiler);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<FlattenConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
