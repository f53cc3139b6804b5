//! Flattening of multi-file Solidity source trees into single compilation
//! units, with verification manifests for source-verification services.
//!
//! A flatten pass starts at an entry file, follows its `import "…";`
//! directives depth-first and emits every reachable unit once, dependencies
//! first, under a single license line and version pragma.
pub mod artifacts;
pub mod assembler;
pub mod batch;
pub mod compiler;
pub mod config;
pub mod flatten;
pub mod resolver;
pub mod sanitizer;
pub mod scanner;
pub mod source;
mod utils;

pub use artifacts::{
    save_artifact_manifest, save_batch, save_outputs, save_report, ArtifactManifest,
    ArtifactWriterOptions, ContractArtifact, SavedOutputs, VerificationManifest,
};
pub use assembler::{assemble, AssembledOutput, AssemblyOptions};
pub use batch::{
    discover_entries, flatten_entries, flatten_paths, BatchReport, EntryReport, EntryStatus,
};
pub use compiler::{compile, CompilerError, StandardJsonInput};
pub use config::{FlattenConfig, FlattenConfigBuilder, HeaderConfig, ManifestConfig, VendorMapping};
pub use flatten::{FlattenError, FlattenResult, FlattenedUnit, Flattener, ImportWarning, SourceUnit};
pub use resolver::{DependencyResolver, ResolvedPath, UnresolvedReason};
pub use sanitizer::sanitize;
pub use scanner::{extract_imports, ImportKind, ImportReference, ImportRules};
pub use source::{FsStore, MemoryStore, SourceStore, StoreError};
pub use utils::{contract_name, file_name, hash_bytes};
