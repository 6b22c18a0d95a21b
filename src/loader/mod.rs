//! Manifest discovery and loading.
//!
//! A scan root is walked with `.gitignore` awareness; every `.yaml`/`.yml`
//! file is split into documents, and each document that looks like a
//! Kubernetes object becomes one `Manifest`. Documents that cannot be used
//! are reported as `SkippedUnit`s and never abort the batch.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::ScanSettings;
use crate::error::{Result, TaintError};
use crate::ir::manifest::validate_shape;
use crate::ir::Manifest;
use crate::resolver::normalize_bytes;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("{}: unreadable: {message}", file.display())]
    Unreadable { file: PathBuf, message: String },

    #[error("{} (document {doc_index}): malformed YAML: {message}", file.display())]
    Malformed {
        file: PathBuf,
        doc_index: usize,
        message: String,
    },

    #[error("{} (document {doc_index}): not a Kubernetes object: {message}", file.display())]
    Schema {
        file: PathBuf,
        doc_index: usize,
        message: String,
    },
}

/// A file or document left out of the analysis, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub file: PathBuf,
    pub doc_index: Option<usize>,
    pub reason: String,
}

impl From<LoadError> for SkippedUnit {
    fn from(err: LoadError) -> Self {
        let reason = err.to_string();
        match err {
            LoadError::Unreadable { file, .. } => Self {
                file,
                doc_index: None,
                reason,
            },
            LoadError::Malformed {
                file, doc_index, ..
            }
            | LoadError::Schema {
                file, doc_index, ..
            } => Self {
                file,
                doc_index: Some(doc_index),
                reason,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub exclude: Vec<glob::Pattern>,
    pub max_file_bytes: u64,
    pub max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        let settings = ScanSettings::default();
        Self {
            exclude: Vec::new(),
            max_file_bytes: settings.max_file_bytes,
            max_depth: settings.max_depth,
        }
    }
}

impl LoadOptions {
    pub fn from_settings(settings: &ScanSettings) -> Result<Self> {
        let exclude = settings
            .exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| TaintError::Config(format!("invalid exclude glob '{p}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            exclude,
            max_file_bytes: settings.max_file_bytes,
            max_depth: settings.max_depth,
        })
    }

    fn excluded(&self, root: &Path, path: &Path) -> bool {
        let rel = path.strip_prefix(root).unwrap_or(path);
        self.exclude.iter().any(|p| p.matches_path(rel))
    }
}

/// Every usable manifest under a root, plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub manifests: Vec<Manifest>,
    pub skipped: Vec<SkippedUnit>,
}

/// YAML files under `root`, sorted. A file root yields itself.
pub fn discover_manifests(root: &Path, options: &LoadOptions) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(TaintError::InvalidRoot(format!(
            "{} does not exist",
            root.display()
        )));
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .max_depth(Some(options.max_depth))
        .build();

    let mut files: Vec<PathBuf> = walker
        .flatten()
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_yaml(path) && !options.excluded(root, path))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every manifest under `root`. Files are read in parallel; output
/// order follows the sorted file list and document order within a file.
pub fn load_batch(root: &Path, options: &LoadOptions) -> Result<Batch> {
    let files = discover_manifests(root, options)?;
    tracing::debug!(root = %root.display(), files = files.len(), "discovered manifest files");

    let per_file: Vec<Vec<std::result::Result<Manifest, LoadError>>> = files
        .par_iter()
        .map(|file| load_file(file, options.max_file_bytes))
        .collect();

    let mut batch = Batch::default();
    for result in per_file.into_iter().flatten() {
        match result {
            Ok(manifest) => batch.manifests.push(manifest),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unit");
                batch.skipped.push(e.into());
            }
        }
    }
    Ok(batch)
}

/// Split one file into documents and convert each. Empty documents are
/// ignored; after a YAML syntax error the rest of the file is not
/// recoverable and is dropped.
pub fn load_file(path: &Path, max_bytes: u64) -> Vec<std::result::Result<Manifest, LoadError>> {
    let bytes = match read_limited(path, max_bytes) {
        Ok(bytes) => bytes,
        Err(message) => {
            return vec![Err(LoadError::Unreadable {
                file: path.to_path_buf(),
                message,
            })]
        }
    };
    let content_hash = hex::encode(Sha256::digest(&bytes));
    let content = normalize_bytes(&bytes);
    load_str(&content, path, &content_hash)
}

/// Convert already-read YAML text.
pub fn load_str(
    content: &str,
    path: &Path,
    content_hash: &str,
) -> Vec<std::result::Result<Manifest, LoadError>> {
    let mut out = Vec::new();
    for (doc_index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = match Value::deserialize(document) {
            Ok(value) => value,
            Err(e) => {
                out.push(Err(LoadError::Malformed {
                    file: path.to_path_buf(),
                    doc_index,
                    message: e.to_string(),
                }));
                break;
            }
        };
        if value.is_null() {
            continue;
        }
        match validate_shape(&value) {
            Ok(()) => out.push(Ok(Manifest::from_document(
                &value,
                path,
                doc_index,
                content_hash,
            ))),
            Err(message) => out.push(Err(LoadError::Schema {
                file: path.to_path_buf(),
                doc_index,
                message,
            })),
        }
    }
    out
}

fn read_limited(path: &Path, max_bytes: u64) -> std::result::Result<Vec<u8>, String> {
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if metadata.len() > max_bytes {
        return Err(format!(
            "{} bytes exceeds limit of {max_bytes}",
            metadata.len()
        ));
    }
    std::fs::read(path).map_err(|e| e.to_string())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MULTI: &str = r#"apiVersion: v1
kind: Secret
metadata:
  name: db
stringData:
  password: hunter2
---
just: a mapping
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  template:
    spec:
      containers:
        - name: api
          image: api:1
"#;

    #[test]
    fn splits_documents_and_rejects_non_objects() {
        let results = load_str(MULTI, Path::new("all.yaml"), "h");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().kind, "Secret");
        assert!(matches!(
            &results[1],
            Err(LoadError::Schema { doc_index: 1, .. })
        ));
        let deploy = results[2].as_ref().unwrap();
        assert_eq!(deploy.doc_index, 2);
        assert_eq!(deploy.unit_id(), "all.yaml#2/Deployment/api");
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let results = load_str("kind: [unclosed\n", Path::new("bad.yaml"), "h");
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn scalar_documents_are_schema_errors() {
        let results = load_str("hello\n", Path::new("s.yaml"), "h");
        assert!(matches!(&results[0], Err(LoadError::Schema { .. })));
    }

    #[test]
    fn discovery_filters_extensions_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("k8s")).unwrap();
        std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("k8s/app.yaml"), MULTI).unwrap();
        std::fs::write(dir.path().join("k8s/job.YML"), MULTI).unwrap();
        std::fs::write(dir.path().join("k8s/notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("vendor/dep.yaml"), MULTI).unwrap();

        let options = LoadOptions {
            exclude: vec![glob::Pattern::new("vendor/**").unwrap()],
            ..Default::default()
        };
        let files = discover_manifests(dir.path(), &options).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app.yaml", "job.YML"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = discover_manifests(Path::new("/nonexistent/kubetaint"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, TaintError::InvalidRoot(_)));
    }

    #[test]
    fn oversized_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.yaml"), MULTI).unwrap();
        std::fs::write(dir.path().join("ok.yaml"), "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: c\n").unwrap();
        let options = LoadOptions {
            max_file_bytes: 100,
            ..Default::default()
        };
        let batch = load_batch(dir.path(), &options).unwrap();
        assert_eq!(batch.manifests.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].doc_index, None);
        assert!(batch.skipped[0].reason.contains("exceeds limit"));
    }

    #[test]
    fn content_hash_is_sha256_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cm.yaml");
        std::fs::write(&path, "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: c\n").unwrap();
        let manifest = load_file(&path, 1024).remove(0).unwrap();
        assert_eq!(manifest.content_hash.len(), 64);
        assert!(manifest.content_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
