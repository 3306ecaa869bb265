//! Directory-backed artifact store with atomic replacement
//!
//! A bundle is a directory of named parts. The manifest is written last and
//! records the SHA-256 of every other part; the finished staging directory is
//! then renamed over the target, so a reader sees either the previous bundle
//! or the new one.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::artifact::{ArtifactMetadata, ModelArtifact, FORMAT_VERSION};
use crate::dataset::FeatureSpec;
use crate::error::{ChurnError, Result};
use crate::evaluation::EvaluationReport;
use crate::preprocessing::{CategoryEncoders, CodecState, StandardScaler};
use crate::training::ChurnClassifier;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CLASSIFIER_FILE: &str = "classifier.bin";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURES_FILE: &str = "features.json";
pub const REPORT_FILE: &str = "metrics_report.json";

/// Checksum entry of one part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEntry {
    pub sha256: String,
    pub bytes: usize,
}

/// Bundle manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub metadata: ArtifactMetadata,
    pub parts: BTreeMap<String, PartEntry>,
}

/// Compute SHA-256 hash of data
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Saves and loads the model bundle at one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a bundle manifest is present
    pub fn exists(&self) -> bool {
        self.root.join(MANIFEST_FILE).is_file()
    }

    /// Write the bundle, replacing any previous one as a unit.
    ///
    /// On failure the staging directory is removed and the previous bundle,
    /// if any, is left in place.
    pub fn save(&self, artifact: &ModelArtifact, report: Option<&EvaluationReport>) -> Result<()> {
        self.save_with(artifact, report, |_| Ok(()))
    }

    /// `before_swap` runs on the finished staging directory, just before it
    /// replaces the target.
    fn save_with<F>(&self, artifact: &ModelArtifact, report: Option<&EvaluationReport>, before_swap: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let name = self
            .root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ChurnError::invalid_parameter("artifact_dir", self.root.display(), "must name a directory")
            })?
            .to_string();
        let parent = match self.root.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let prefix = format!(".{}.staging-", name);
        let staging = tempfile::Builder::new().prefix(&prefix).tempdir_in(&parent)?;
        let staging_path = staging.path().to_path_buf();

        let mut parts = BTreeMap::new();
        let codec = artifact.codec();
        write_part(&staging_path, CLASSIFIER_FILE, &bincode::serialize(artifact.classifier())?, &mut parts)?;
        write_part(&staging_path, ENCODERS_FILE, &serde_json::to_vec_pretty(codec.encoders())?, &mut parts)?;
        write_part(&staging_path, SCALER_FILE, &serde_json::to_vec_pretty(codec.scaler())?, &mut parts)?;
        write_part(&staging_path, FEATURES_FILE, &serde_json::to_vec_pretty(codec.spec())?, &mut parts)?;
        if let Some(report) = report {
            write_part(&staging_path, REPORT_FILE, &serde_json::to_vec_pretty(report)?, &mut parts)?;
        }

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            metadata: artifact.metadata().clone(),
            parts,
        };
        let mut unused = BTreeMap::new();
        write_part(&staging_path, MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?, &mut unused)?;
        sync_dir(&staging_path)?;
        before_swap(&staging_path)?;

        if self.root.exists() {
            let suffix = staging_path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(prefix.as_str()))
                .unwrap_or("old");
            let backup = parent.join(format!(".{}.previous-{}", name, suffix));
            fs::rename(&self.root, &backup)?;
            if let Err(e) = fs::rename(&staging_path, &self.root) {
                if let Err(restore) = fs::rename(&backup, &self.root) {
                    warn!(backup = %backup.display(), error = %restore, "Failed to restore previous bundle");
                }
                return Err(e.into());
            }
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!(backup = %backup.display(), error = %e, "Failed to remove previous bundle");
            }
        } else {
            fs::rename(&staging_path, &self.root)?;
        }
        // the staging path now names the bundle
        let _ = staging.keep();
        sync_dir(&parent)?;

        info!(
            path = %self.root.display(),
            parts = manifest.parts.len() + 1,
            with_report = report.is_some(),
            "Saved model artifact"
        );
        Ok(())
    }

    fn read_manifest(&self) -> Result<Manifest> {
        if !self.root.is_dir() {
            return Err(ChurnError::ArtifactNotFound(self.root.display().to_string()));
        }
        let path = self.root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(ChurnError::ArtifactNotFound(path.display().to_string()));
        }
        let bytes = fs::read(&path)?;
        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| ChurnError::corrupt(MANIFEST_FILE, e))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(ChurnError::corrupt(
                MANIFEST_FILE,
                format!(
                    "unsupported format version {} (expected {})",
                    manifest.format_version, FORMAT_VERSION
                ),
            ));
        }
        Ok(manifest)
    }

    /// Read one part and verify it against the manifest checksum
    fn read_part(&self, manifest: &Manifest, part: &str) -> Result<Vec<u8>> {
        let path = self.root.join(part);
        if !path.is_file() {
            return Err(ChurnError::ArtifactNotFound(path.display().to_string()));
        }
        let entry = manifest
            .parts
            .get(part)
            .ok_or_else(|| ChurnError::corrupt(part, "no checksum in manifest"))?;
        let bytes = fs::read(&path)?;
        let digest = compute_sha256(&bytes);
        if digest != entry.sha256 {
            return Err(ChurnError::corrupt(
                part,
                format!("checksum mismatch (expected {}, found {})", entry.sha256, digest),
            ));
        }
        debug!(part, bytes = bytes.len(), "Verified artifact part");
        Ok(bytes)
    }

    fn read_json<T: DeserializeOwned>(&self, manifest: &Manifest, part: &str) -> Result<T> {
        let bytes = self.read_part(manifest, part)?;
        serde_json::from_slice(&bytes).map_err(|e| ChurnError::corrupt(part, e))
    }

    /// Load and cross-check the bundle
    pub fn load(&self) -> Result<ModelArtifact> {
        let manifest = self.read_manifest()?;

        let classifier_bytes = self.read_part(&manifest, CLASSIFIER_FILE)?;
        let classifier: ChurnClassifier =
            bincode::deserialize(&classifier_bytes).map_err(|e| ChurnError::corrupt(CLASSIFIER_FILE, e))?;
        let encoders: CategoryEncoders = self.read_json(&manifest, ENCODERS_FILE)?;
        let scaler: StandardScaler = self.read_json(&manifest, SCALER_FILE)?;
        let spec: FeatureSpec = self.read_json(&manifest, FEATURES_FILE)?;

        let codec = CodecState::from_parts(spec, encoders, scaler)?;
        let artifact = ModelArtifact::from_parts(classifier, codec, manifest.metadata)?;

        info!(
            path = %self.root.display(),
            features = artifact.spec().len(),
            trees = artifact.classifier().n_trees(),
            "Loaded model artifact"
        );
        Ok(artifact)
    }

    /// Evaluation report stored with the bundle, if it was saved with one
    pub fn load_report(&self) -> Result<Option<EvaluationReport>> {
        let manifest = self.read_manifest()?;
        if !manifest.parts.contains_key(REPORT_FILE) {
            return Ok(None);
        }
        self.read_json(&manifest, REPORT_FILE).map(Some)
    }
}

fn write_part(dir: &Path, part: &str, bytes: &[u8], parts: &mut BTreeMap<String, PartEntry>) -> Result<()> {
    let mut file = File::create(dir.join(part))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    parts.insert(
        part.to_string(),
        PartEntry {
            sha256: compute_sha256(bytes),
            bytes: bytes.len(),
        },
    );
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_sha256() {
        assert_eq!(
            compute_sha256(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("absent"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(ChurnError::ArtifactNotFound(_))));
        assert!(matches!(store.load_report(), Err(ChurnError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_unknown_format_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bundle");
        fs::create_dir(&root).unwrap();
        let manifest = Manifest {
            format_version: FORMAT_VERSION + 1,
            created_at: Utc::now(),
            metadata: ArtifactMetadata::new("churn"),
            parts: BTreeMap::new(),
        };
        fs::write(root.join(MANIFEST_FILE), serde_json::to_vec(&manifest).unwrap()).unwrap();

        let err = ArtifactStore::new(&root).load().unwrap_err();
        assert!(matches!(err, ChurnError::ArtifactCorrupt { ref part, .. } if part == MANIFEST_FILE));
    }

    fn artifact(n_estimators: usize) -> ModelArtifact {
        use crate::dataset::{FeatureDef, FeatureKind, FieldValue};
        use crate::preprocessing::FeatureCodec;
        use crate::training::GradientBoostingConfig;
        use ndarray::Array1;

        let spec = FeatureSpec::new(vec![
            FeatureDef { name: "edad".into(), kind: FeatureKind::Numeric, standardize: true },
            FeatureDef { name: "sexo".into(), kind: FeatureKind::Categorical, standardize: false },
        ])
        .unwrap();
        let rows: Vec<Vec<FieldValue>> = (0..20)
            .map(|i| vec![(20.0 + i as f64).into(), if i % 3 == 0 { "M".into() } else { "F".into() }])
            .collect();
        let codec = FeatureCodec::new(spec.clone()).fit(&rows).unwrap();
        let x = codec.transform(&rows).unwrap();
        let y = Array1::from_iter((0..20).map(|i| if i >= 12 { 1.0 } else { 0.0 }));

        let mut clf = ChurnClassifier::new(GradientBoostingConfig::default().with_n_estimators(n_estimators));
        clf.fit(&x, &y, &spec.names()).unwrap();
        ModelArtifact::new(clf, codec, ArtifactMetadata::new("churn")).unwrap()
    }

    fn sibling_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "bundle")
            .collect()
    }

    #[test]
    fn test_failed_save_keeps_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("bundle"));
        let first = artifact(2);
        store.save(&first, None).unwrap();

        let err = store
            .save_with(&artifact(4), None, |staging| {
                assert!(staging.join(MANIFEST_FILE).is_file());
                Err(ChurnError::IoError(std::io::Error::other("disk full")))
            })
            .unwrap_err();
        assert!(matches!(err, ChurnError::IoError(_)));

        assert_eq!(store.load().unwrap(), first);
        assert!(sibling_entries(dir.path()).is_empty(), "{:?}", sibling_entries(dir.path()));
    }

    #[test]
    fn test_failed_swap_restores_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("bundle"));
        let first = artifact(2);
        store.save(&first, None).unwrap();

        // the second rename finds nothing to move
        let err = store
            .save_with(&artifact(4), None, |staging| Ok(fs::remove_dir_all(staging)?))
            .unwrap_err();
        assert!(matches!(err, ChurnError::IoError(_)));

        assert_eq!(store.load().unwrap(), first);
        assert!(sibling_entries(dir.path()).is_empty(), "{:?}", sibling_entries(dir.path()));
    }

    #[test]
    fn test_first_save_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("bundle"));

        let result = store.save_with(&artifact(2), None, |_| Err(ChurnError::TrainingError("stop".into())));
        assert!(result.is_err());
        assert!(!store.exists());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
