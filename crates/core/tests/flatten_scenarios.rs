//! End-to-end flattening over on-disk source trees

use contract_flattener::{
    assemble, assembler, discover_entries, flatten_paths, sanitize, save_batch,
    ArtifactWriterOptions, AssemblyOptions, DependencyResolver, FlattenConfig, Flattener, FsStore,
    ImportKind, UnresolvedReason, VerificationManifest,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).unwrap()
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn config(&self) -> FlattenConfig {
        FlattenConfig::builder()
            .project_root(self.root())
            .provenance_comments(false)
            .build()
            .unwrap()
    }
}

fn flatten_with(config: &FlattenConfig, entry: &Path) -> contract_flattener::FlattenResult {
    let resolver = DependencyResolver::from_config(config);
    Flattener::new(&resolver, &FsStore)
        .with_display_root(&config.project_root)
        .flatten(entry)
        .unwrap()
}

const BASE: &str = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\ncontract Base {\n    uint256 internal value;\n}\n";
const ENTRY: &str = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\nimport \"./Base.sol\";\n\ncontract Entry is Base {}\n";

#[test]
fn entry_with_single_dependency() {
    let project = Project::new();
    project.write("contracts/Base.sol", BASE);
    let entry = project.write("contracts/Entry.sol", ENTRY);
    let config = project.config();

    let result = flatten_with(&config, &entry);
    let output = assemble("Entry.sol", &result, &AssemblyOptions::from(&config));

    let none = BTreeMap::new();
    let expected = format!(
        "{}\n{}\n{}",
        assembler::header(&config.header),
        sanitize(BASE, &none),
        sanitize(ENTRY, &none)
    );
    assert_eq!(output.flattened_text, expected);
    assert!(result.warnings.is_empty());
}

#[test]
fn shared_dependency_across_independent_entries() {
    let project = Project::new();
    project.write("contracts/Shared.sol", "library Shared {}\n");
    let e1 = project.write(
        "contracts/E1.sol",
        "import \"./Shared.sol\";\ncontract E1 {}\n",
    );
    let e2 = project.write(
        "contracts/nested/E2.sol",
        "import \"../Shared.sol\";\nimport \"../E1.sol\";\ncontract E2 {}\n",
    );
    let config = project.config();

    let report = flatten_paths(&[e1, e2], &config, &FsStore);

    assert!(!report.has_failures());
    assert_eq!(report.entries[0].units, vec!["contracts/Shared.sol", "contracts/E1.sol"]);
    assert_eq!(
        report.entries[1].units,
        vec!["contracts/Shared.sol", "contracts/E1.sol", "contracts/nested/E2.sol"]
    );
    for entry in &report.entries {
        let text = &entry.output.as_ref().unwrap().flattened_text;
        assert_eq!(text.matches("library Shared {}").count(), 1);
    }
}

#[test]
fn missing_vendored_file_leaves_placeholder() {
    let project = Project::new();
    let entry = project.write(
        "contracts/Token.sol",
        "pragma solidity ^0.8.20;\nimport \"@openzeppelin/contracts/token/ERC20/ERC20.sol\";\n\ncontract Token {}\n",
    );
    let config = project.config();

    let result = flatten_with(&config, &entry);

    assert_eq!(result.warnings.len(), 1);
    let warning = &result.warnings[0];
    assert_eq!(warning.reason, UnresolvedReason::VendorMissing);
    assert_eq!(warning.reference.kind, ImportKind::VendoredPackage);
    assert_eq!(
        result.units[0].body,
        "// [unresolved import] \"@openzeppelin/contracts/token/ERC20/ERC20.sol\" (vendor-missing)\n\ncontract Token {}\n"
    );

    let output = assemble("Token.sol", &result, &AssemblyOptions::from(&config));
    let json = serde_json::to_string(&output.manifest).unwrap();
    let manifest: VerificationManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(manifest.sources["Token.sol"].content, output.flattened_text);
}

#[test]
fn vendored_file_from_mirror_is_included() {
    let project = Project::new();
    project.write(
        "node_modules/@openzeppelin/contracts/access/Ownable.sol",
        "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\nimport \"../utils/Context.sol\";\nabstract contract Ownable is Context {}\n",
    );
    project.write(
        "node_modules/@openzeppelin/contracts/utils/Context.sol",
        "abstract contract Context {}\n",
    );
    let entry = project.write(
        "contracts/Vault.sol",
        "import \"@openzeppelin/contracts/access/Ownable.sol\";\ncontract Vault is Ownable {}\n",
    );
    let config = project.config();

    let result = flatten_with(&config, &entry);

    let order: Vec<_> = result.units.iter().map(|u| u.display_path.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "node_modules/@openzeppelin/contracts/utils/Context.sol",
            "node_modules/@openzeppelin/contracts/access/Ownable.sol",
            "contracts/Vault.sol"
        ]
    );
    assert!(result.warnings.is_empty());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let project = Project::new();
    project.write("contracts/A.sol", "import \"./B.sol\";\nimport \"./C.sol\";\ncontract A {}\n");
    project.write("contracts/B.sol", "import \"./C.sol\";\ncontract B {}\n");
    project.write("contracts/C.sol", "import \"./A.sol\";\ncontract C {}\n");
    let entry = project.root().join("contracts/A.sol");
    let config = project.config();
    let options = AssemblyOptions::from(&config);

    let first = assemble("A.sol", &flatten_with(&config, &entry), &options);
    let second = assemble("A.sol", &flatten_with(&config, &entry), &options);

    assert_eq!(first.flattened_text, second.flattened_text);
    assert_eq!(first.text_hash(), second.text_hash());
}

#[test]
fn layered_graph_keeps_every_edge_ordered() {
    // Unit i imports units 2i+1 and 2i+2 plus a shared leaf, forming a DAG
    // with many diamond-shaped re-entries
    let project = Project::new();
    let count = 15;
    let mut edges = Vec::new();
    for i in 0..count {
        let mut text = String::new();
        for child in [2 * i + 1, 2 * i + 2] {
            if child < count {
                text.push_str(&format!("import \"./U{child}.sol\";\n"));
                edges.push((i, child));
            }
        }
        if i != count - 1 {
            text.push_str(&format!("import \"./U{}.sol\";\n", count - 1));
            edges.push((i, count - 1));
        }
        text.push_str(&format!("contract U{i} {{}}\n"));
        project.write(&format!("contracts/U{i}.sol"), &text);
    }
    let config = project.config();
    let root = project.root();

    let result = flatten_with(&config, &root.join("contracts/U0.sol"));

    assert_eq!(result.units.len(), count);
    let mut seen = std::collections::HashSet::new();
    assert!(result.units.iter().all(|u| seen.insert(u.path.clone())));
    for (from, to) in edges {
        let a = result.position(&root.join(format!("contracts/U{from}.sol"))).unwrap();
        let b = result.position(&root.join(format!("contracts/U{to}.sol"))).unwrap();
        assert!(b < a, "U{to} must precede U{from}");
    }
}

#[test]
fn warning_count_matches_unresolved_references() {
    let project = Project::new();
    project.write(
        "contracts/Lib.sol",
        "import \"./Missing.sol\";\nimport \"@chainlink/contracts/src/Feed.sol\";\nlibrary Lib {}\n",
    );
    let entry = project.write(
        "contracts/Main.sol",
        "import \"./Lib.sol\";\nimport \"https://example.com/Remote.sol\";\nimport \"./Missing.sol\";\ncontract Main {}\n",
    );
    let config = project.config();

    let result = flatten_with(&config, &entry);

    let reasons: Vec<_> = result.warnings.iter().map(|w| w.reason).collect();
    assert_eq!(
        reasons,
        vec![
            UnresolvedReason::FileMissing,
            UnresolvedReason::ByDesign,
            UnresolvedReason::ByDesign,
            UnresolvedReason::FileMissing
        ]
    );
    assert_eq!(result.units.len(), 2);
}

#[test]
fn batch_outputs_are_written_and_failures_reported() {
    let project = Project::new();
    let good = project.write("contracts/Good.sol", "contract Good {}\n");
    let missing = project.root().join("contracts/Gone.sol");
    let config = project.config();

    let report = flatten_paths(&[good, missing], &config, &FsStore);
    let report_path = save_batch(&report, &ArtifactWriterOptions::from(&config)).unwrap();

    let out = config.output_directory();
    assert!(out.join("Good_flattened.sol").is_file());
    assert!(out.join("verification_Good.json").is_file());
    assert!(!out.join("Gone_flattened.sol").exists());

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(written["entries"][0]["status"], "success");
    assert_eq!(written["entries"][1]["status"], "failed");
    assert!(written["entries"][1]["error"].as_str().unwrap().contains("Gone.sol"));
}

#[test]
fn same_named_entries_in_different_directories_keep_both_outputs() {
    let project = Project::new();
    project.write("contracts/a/Token.sol", "contract TokenA {}\n");
    project.write("contracts/b/Token.sol", "contract TokenB {}\n");
    let config = project.config();

    let entries = discover_entries(&config).unwrap();
    let report = flatten_paths(&entries, &config, &FsStore);
    save_batch(&report, &ArtifactWriterOptions::from(&config)).unwrap();

    assert_eq!(report.success_count(), 2);
    let out = config.output_directory();
    let a = fs::read_to_string(out.join("a_Token_flattened.sol")).unwrap();
    let b = fs::read_to_string(out.join("b_Token_flattened.sol")).unwrap();
    assert!(a.contains("contract TokenA {}"));
    assert!(b.contains("contract TokenB {}"));
    assert!(out.join("verification_a_Token.json").is_file());
    assert!(out.join("verification_b_Token.json").is_file());
}
