//! Output artifacts: manifest schemas and writers

pub mod manifest;
pub mod writer;

pub use manifest::{
    ArtifactManifest, ContractArtifact, Optimizer, Settings, SourceContent, VerificationManifest,
};
pub use writer::{
    save_artifact_manifest, save_batch, save_outputs, save_report, ArtifactWriterOptions,
    SavedOutputs,
};
