//! `solc --standard-json` invocation producing the ABI/bytecode artifact manifest

use crate::{
    artifacts::manifest::{
        self, ArtifactManifest, ContractArtifact, OutputSelection, SourceContent,
    },
    config::FlattenConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

/// Errors from the compile step
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("Failed to read source {}: {source}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("Compiler exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("Invalid compiler JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compilation failed with {} error(s):\n{}", .0.len(), .0.join("\n"))]
    Diagnostics(Vec<String>),
}

/// Standard-JSON compiler input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardJsonInput {
    pub language: String,
    pub sources: BTreeMap<String, SourceContent>,
    pub settings: InputSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remappings: Vec<String>,
    pub output_selection: OutputSelection,
}

impl StandardJsonInput {
    /// Builds an input from `(source key, content)` pairs
    pub fn new(
        language: impl Into<String>,
        sources: impl IntoIterator<Item = (String, String)>,
        remappings: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            language: language.into(),
            sources: sources
                .into_iter()
                .map(|(key, content)| (key, SourceContent { content }))
                .collect(),
            settings: InputSettings {
                remappings,
                output_selection: manifest::select_all(outputs),
            },
        }
    }

    /// Reads every entry and keys it by its path relative to the project root
    pub fn from_entries(
        config: &FlattenConfig,
        entries: &[PathBuf],
    ) -> Result<Self, CompilerError> {
        let mut sources = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = config.project_path(entry);
            let content =
                std::fs::read_to_string(&path).map_err(|source| CompilerError::ReadSource {
                    path: path.clone(),
                    source,
                })?;
            sources.push((source_key(&config.project_root, &path), content));
        }

        Ok(Self::new(
            config.manifest.language.clone(),
            sources,
            config.remappings(),
            config.compiler.output_selection.clone(),
        ))
    }
}

/// Source key used inside the compiler input, `/`-separated and project relative
fn source_key(project_root: &Path, path: &Path) -> String {
    path.strip_prefix(project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[derive(Debug, Default, Deserialize)]
struct StandardJsonOutput {
    #[serde(default)]
    errors: Vec<Diagnostic>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, CompiledContract>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Diagnostic {
    severity: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    formatted_message: Option<String>,
}

impl Diagnostic {
    fn text(&self) -> &str {
        self.formatted_message.as_deref().unwrap_or(&self.message)
    }
}

#[derive(Debug, Deserialize)]
struct CompiledContract {
    #[serde(default)]
    abi: Value,
    #[serde(default)]
    evm: Option<Evm>,
}

#[derive(Debug, Deserialize)]
struct Evm {
    bytecode: Option<Bytecode>,
}

#[derive(Debug, Deserialize)]
struct Bytecode {
    object: String,
}

/// Compiles `entries` with the configured compiler and collects per-contract artifacts
pub fn compile(
    config: &FlattenConfig,
    entries: &[PathBuf],
) -> Result<ArtifactManifest, CompilerError> {
    let start = Instant::now();
    let input = StandardJsonInput::from_entries(config, entries)?;

    tracing::info!(
        "Compiling {} sources with {}",
        input.sources.len(),
        config.compiler.solc
    );

    let output = run_compiler(config, &serde_json::to_vec(&input)?)?;
    let artifacts = parse_output(&output)?;

    tracing::info!(
        "Compiled {} contracts in {:.2}s",
        artifacts.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(artifacts)
}

/// Runs the compiler with the standard-JSON input on stdin and returns stdout
fn run_compiler(config: &FlattenConfig, input: &[u8]) -> Result<Vec<u8>, CompilerError> {
    let binary = config.compiler.solc.clone();
    let spawn_error = |source: io::Error| CompilerError::Spawn {
        binary: binary.clone(),
        source,
    };

    let mut cmd = Command::new(&binary);
    cmd.current_dir(&config.project_root)
        .arg("--standard-json")
        .arg("--base-path")
        .arg(".")
        .arg("--allow-paths")
        .arg(config.vendor_directory())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!("Running compiler command: {:?}", cmd);

    let mut child = cmd.spawn().map_err(spawn_error)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).map_err(spawn_error)?;
    }
    let output = child.wait_with_output().map_err(spawn_error)?;

    if !output.status.success() {
        return Err(CompilerError::Exit {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}

/// Reduces compiler output to `{name: {abi, bytecode}}`. Diagnostics with
/// severity `error` fail the whole compile; others are logged
pub fn parse_output(output: &[u8]) -> Result<ArtifactManifest, CompilerError> {
    let output: StandardJsonOutput = serde_json::from_slice(output)?;

    let mut errors = Vec::new();
    for diagnostic in &output.errors {
        if diagnostic.severity == "error" {
            errors.push(diagnostic.text().trim_end().to_string());
        } else {
            tracing::warn!("{}", diagnostic.text().trim_end());
        }
    }
    if !errors.is_empty() {
        return Err(CompilerError::Diagnostics(errors));
    }

    let mut artifacts = ArtifactManifest::new();
    for (file, contracts) in output.contracts {
        for (name, contract) in contracts {
            let object = contract
                .evm
                .and_then(|evm| evm.bytecode)
                .map(|b| b.object)
                .unwrap_or_default();
            if artifacts.contains_key(&name) {
                tracing::warn!(
                    "Contract {} in {} shadows an earlier contract of the same name",
                    name,
                    file
                );
            }
            artifacts.insert(
                name,
                ContractArtifact {
                    abi: contract.abi,
                    bytecode: format!("0x{}", object.trim_start_matches("0x")),
                },
            );
        }
    }

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_input_from_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("contracts")).unwrap();
        fs::write(dir.path().join("contracts/Token.sol"), "contract Token {}").unwrap();

        let config = FlattenConfig::builder()
            .project_root(dir.path().to_path_buf())
            .build()
            .unwrap();
        let input =
            StandardJsonInput::from_entries(&config, &[PathBuf::from("contracts/Token.sol")])
                .unwrap();

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["language"], "Solidity");
        assert_eq!(json["sources"]["contracts/Token.sol"]["content"], "contract Token {}");
        assert_eq!(
            json["settings"]["outputSelection"]["*"]["*"],
            serde_json::json!(["abi", "evm.bytecode"])
        );
        assert_eq!(json["settings"]["remappings"].as_array().unwrap().len(), 1);
        assert!(json["settings"]["remappings"][0]
            .as_str()
            .unwrap()
            .starts_with("@openzeppelin/="));
    }

    #[test]
    fn test_input_missing_entry() {
        let config = FlattenConfig::builder()
            .project_root(PathBuf::from("/definitely/not/here"))
            .build()
            .unwrap();
        let err = StandardJsonInput::from_entries(&config, &[PathBuf::from("A.sol")]).unwrap_err();
        assert!(matches!(err, CompilerError::ReadSource { .. }));
    }

    #[test]
    fn test_parse_output_collects_artifacts() {
        let output = serde_json::json!({
            "errors": [
                { "severity": "warning", "message": "unused variable" }
            ],
            "contracts": {
                "contracts/Token.sol": {
                    "Token": {
                        "abi": [{ "type": "function", "name": "totalSupply" }],
                        "evm": { "bytecode": { "object": "6080604052" } }
                    },
                    "IToken": {
                        "abi": [],
                        "evm": { "bytecode": { "object": "" } }
                    }
                }
            }
        });

        let artifacts = parse_output(&serde_json::to_vec(&output).unwrap()).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts["Token"].bytecode, "0x6080604052");
        assert_eq!(artifacts["Token"].abi[0]["name"], "totalSupply");
        assert_eq!(artifacts["IToken"].bytecode, "0x");
    }

    #[test]
    fn test_parse_output_fails_on_errors() {
        let output = serde_json::json!({
            "errors": [
                { "severity": "error", "message": "x", "formattedMessage": "ParserError: Expected ';'\n" },
                { "severity": "warning", "message": "w" }
            ]
        });

        let err = parse_output(&serde_json::to_vec(&output).unwrap()).unwrap_err();
        match err {
            CompilerError::Diagnostics(errors) => {
                assert_eq!(errors, vec!["ParserError: Expected ';'".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_compiler_binary() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.sol"), "contract A {}").unwrap();
        let config = FlattenConfig::builder()
            .project_root(dir.path().to_path_buf())
            .compiler(|c| c.solc = "solc-binary-that-does-not-exist".to_string())
            .build()
            .unwrap();

        let err = compile(&config, &[PathBuf::from("A.sol")]).unwrap_err();
        assert!(matches!(err, CompilerError::Spawn { .. }));
    }
}
