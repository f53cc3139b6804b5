//! Verification manifest and compiled artifact manifest structures
//!
//! CRITICAL: The JSON produced by these structures is consumed by external
//! verification services and deploy tooling and must not change shape.

use crate::config::ManifestConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Standard-JSON style document declaring one flattened source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationManifest {
    pub language: String,
    pub sources: BTreeMap<String, SourceContent>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub optimizer: Optimizer,
    pub output_selection: OutputSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Optimizer {
    pub enabled: bool,
    pub runs: u32,
}

/// `file -> contract -> outputs` selection
pub type OutputSelection = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Selection applying `outputs` to every contract in every file
pub fn select_all(outputs: Vec<String>) -> OutputSelection {
    BTreeMap::from([(
        "*".to_string(),
        BTreeMap::from([("*".to_string(), outputs)]),
    )])
}

impl VerificationManifest {
    /// Wraps `content` as the sole source file `file_name`
    pub fn single_source(
        file_name: impl Into<String>,
        content: impl Into<String>,
        config: &ManifestConfig,
    ) -> Self {
        Self {
            language: config.language.clone(),
            sources: BTreeMap::from([(
                file_name.into(),
                SourceContent {
                    content: content.into(),
                },
            )]),
            settings: Settings {
                optimizer: Optimizer {
                    enabled: config.optimizer_enabled,
                    runs: config.optimizer_runs,
                },
                output_selection: select_all(vec!["*".to_string()]),
            },
        }
    }
}

/// ABI and creation bytecode of one compiled contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub abi: Value,
    /// `0x`-prefixed hex
    pub bytecode: String,
}

/// Compiled contracts keyed by contract name
pub type ArtifactManifest = BTreeMap<String, ContractArtifact>;
