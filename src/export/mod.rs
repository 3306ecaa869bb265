//! Model export and serialization module
//!
//! Provides the persisted model bundle:
//! - Classifier in a native binary format (bincode)
//! - Encoders, scaler and feature spec as JSON
//! - A checksummed manifest written last, with atomic directory replacement

mod artifact;
mod store;

pub use artifact::{ArtifactMetadata, ModelArtifact, FORMAT_VERSION};
pub use store::{
    compute_sha256, ArtifactStore, Manifest, PartEntry, CLASSIFIER_FILE, ENCODERS_FILE, FEATURES_FILE,
    MANIFEST_FILE, REPORT_FILE, SCALER_FILE,
};
