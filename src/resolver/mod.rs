//! Script resolution: turning a reference found in a manifest into text.
//!
//! The graph builder only sees the `ScriptResolver` trait. Failures are
//! values (`ResolveError`), which the builder turns into unresolved nodes.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::ir::ClusterIndex;

/// Default cap on script size, same as manifests.
pub const DEFAULT_MAX_SCRIPT_BYTES: u64 = 1_048_576;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptRef {
    /// A file path as written in the manifest or script (container path).
    Path(PathBuf),
    /// A key of a ConfigMap mounted into the container.
    ConfigMap { name: String, key: String },
    /// Script text embedded in the manifest (`sh -c '...'`).
    Inline { label: String, text: String },
}

impl ScriptRef {
    /// Stable label, used in node ids, origins and diagnostics.
    pub fn key(&self) -> String {
        match self {
            Self::Path(p) => format!("file:{}", p.display()),
            Self::ConfigMap { name, key } => format!("configmap:{name}/{key}"),
            Self::Inline { label, .. } => format!("inline:{label}"),
        }
    }
}

impl std::fmt::Display for ScriptRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("script not found: {0}")]
    NotFound(String),

    #[error("script unreadable: {0}")]
    Unreadable(String),
}

pub trait ScriptResolver: Send + Sync {
    fn resolve(&self, reference: &ScriptRef) -> Result<String, ResolveError>;
}

/// Resolves scripts from the scanned checkout and the batch's ConfigMaps.
///
/// Container paths are never read from the host as-is: an absolute path is
/// looked up under the scan root and next to the manifest, and any candidate
/// outside the scan root is rejected.
pub struct FsResolver<'a> {
    manifest_dir: PathBuf,
    scan_root: PathBuf,
    cluster: &'a ClusterIndex,
    max_bytes: u64,
}

impl<'a> FsResolver<'a> {
    pub fn new(manifest_dir: &Path, scan_root: &Path, cluster: &'a ClusterIndex) -> Self {
        Self {
            manifest_dir: manifest_dir.to_path_buf(),
            scan_root: scan_root.to_path_buf(),
            cluster,
            max_bytes: DEFAULT_MAX_SCRIPT_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        let relative: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        let mut out = vec![
            self.manifest_dir.join(&relative),
            self.scan_root.join(&relative),
        ];
        if let Some(name) = path.file_name() {
            out.push(self.manifest_dir.join(name));
        }
        out
    }

    fn within_root(&self, candidate: &Path) -> bool {
        match (candidate.canonicalize(), self.scan_root.canonicalize()) {
            (Ok(c), Ok(root)) => c.starts_with(root),
            _ => false,
        }
    }
}

impl ScriptResolver for FsResolver<'_> {
    fn resolve(&self, reference: &ScriptRef) -> Result<String, ResolveError> {
        match reference {
            ScriptRef::Inline { text, .. } => Ok(text.clone()),
            ScriptRef::ConfigMap { name, key } => self
                .cluster
                .config_map_entry(name, key)
                .map(normalize_text)
                .ok_or_else(|| ResolveError::NotFound(reference.key())),
            ScriptRef::Path(path) => {
                if path.to_string_lossy().contains('$') {
                    return Err(ResolveError::NotFound(reference.key()));
                }
                let found = self
                    .candidates(path)
                    .into_iter()
                    .find(|c| c.is_file() && self.within_root(c));
                match found {
                    Some(file) => read_script(&file, self.max_bytes),
                    None => Err(ResolveError::NotFound(reference.key())),
                }
            }
        }
    }
}

/// In-memory resolver keyed by `ScriptRef::key()`. Inline references always
/// resolve to their own text.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    scripts: HashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: ScriptRef, text: impl Into<String>) -> Self {
        self.insert(reference, text);
        self
    }

    pub fn insert(&mut self, reference: ScriptRef, text: impl Into<String>) {
        self.scripts.insert(reference.key(), text.into());
    }
}

impl ScriptResolver for MapResolver {
    fn resolve(&self, reference: &ScriptRef) -> Result<String, ResolveError> {
        if let ScriptRef::Inline { text, .. } = reference {
            return Ok(text.clone());
        }
        self.scripts
            .get(&reference.key())
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(reference.key()))
    }
}

/// Read a script file and normalize its encoding.
pub fn read_script(path: &Path, max_bytes: u64) -> Result<String, ResolveError> {
    let label = path.display().to_string();
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ResolveError::NotFound(label.clone()),
        _ => ResolveError::Unreadable(format!("{label}: {e}")),
    })?;
    if metadata.len() > max_bytes {
        return Err(ResolveError::Unreadable(format!(
            "{label}: {} bytes exceeds limit of {max_bytes}",
            metadata.len()
        )));
    }
    let bytes = std::fs::read(path).map_err(|e| ResolveError::Unreadable(format!("{label}: {e}")))?;
    Ok(normalize_bytes(&bytes))
}

/// Strip a UTF-8 BOM, replace invalid UTF-8, fold CRLF to LF.
pub fn normalize_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    normalize_text(&String::from_utf8_lossy(bytes))
}

fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
}
