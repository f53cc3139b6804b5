//! Final text assembly and verification manifest rendering

use crate::{
    artifacts::manifest::VerificationManifest,
    config::{FlattenConfig, HeaderConfig, ManifestConfig},
    flatten::FlattenResult,
    utils,
};
use serde::{Deserialize, Serialize};

/// Options controlling assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub header: HeaderConfig,
    pub provenance_comments: bool,
    pub manifest: ManifestConfig,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            header: HeaderConfig::default(),
            provenance_comments: true,
            manifest: ManifestConfig::default(),
        }
    }
}

impl From<&FlattenConfig> for AssemblyOptions {
    fn from(config: &FlattenConfig) -> Self {
        Self {
            header: config.header.clone(),
            provenance_comments: config.provenance_comments,
            manifest: config.manifest.clone(),
        }
    }
}

/// Flattened source text together with its verification manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledOutput {
    /// Base file name the manifest declares, e.g. `Token.sol`
    pub source_name: String,
    pub flattened_text: String,
    pub manifest: VerificationManifest,
}

impl AssembledOutput {
    /// SHA256 of the flattened text
    pub fn text_hash(&self) -> String {
        utils::hash_bytes(self.flattened_text.as_bytes())
    }
}

/// Renders the single license line and version pragma line
pub fn header(config: &HeaderConfig) -> String {
    format!(
        "// SPDX-License-Identifier: {}\npragma solidity {};\n",
        config.license.trim(),
        config.pragma.trim()
    )
}

/// Joins the header and the ordered bodies into one compilation unit and
/// wraps it in a verification manifest declared under `entry_name`
pub fn assemble(
    entry_name: &str,
    result: &FlattenResult,
    options: &AssemblyOptions,
) -> AssembledOutput {
    let mut text = header(&options.header);

    for unit in &result.units {
        text.push('\n');
        if options.provenance_comments {
            text.push_str("// File: ");
            text.push_str(&unit.display_path);
            text.push('\n');
        }
        text.push_str(&unit.body);
        if !unit.body.is_empty() && !unit.body.ends_with('\n') {
            text.push('\n');
        }
    }

    let manifest = VerificationManifest::single_source(entry_name, text.clone(), &options.manifest);

    AssembledOutput {
        source_name: entry_name.to_string(),
        flattened_text: text,
        manifest,
    }
}
