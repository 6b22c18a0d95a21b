use std::collections::{BTreeMap, HashMap};

use super::manifest::{Manifest, ResourceBody};

/// Batch-wide lookup of ConfigMap data and Secret key names.
///
/// Lookups are by name only; namespaces are not tracked, so two objects with
/// the same name in different namespaces collapse to the first one seen.
#[derive(Debug, Clone, Default)]
pub struct ClusterIndex {
    config_maps: HashMap<String, BTreeMap<String, String>>,
    secrets: HashMap<String, Vec<String>>,
}

impl ClusterIndex {
    pub fn from_manifests<'a>(manifests: impl IntoIterator<Item = &'a Manifest>) -> Self {
        let mut index = Self::default();
        for manifest in manifests {
            match &manifest.body {
                ResourceBody::ConfigMap { data } => {
                    index
                        .config_maps
                        .entry(manifest.name.clone())
                        .or_insert_with(|| data.clone());
                }
                ResourceBody::Secret { keys } => {
                    index
                        .secrets
                        .entry(manifest.name.clone())
                        .or_insert_with(|| keys.clone());
                }
                _ => {}
            }
        }
        index
    }

    pub fn insert_config_map(&mut self, name: impl Into<String>, data: BTreeMap<String, String>) {
        self.config_maps.insert(name.into(), data);
    }

    pub fn insert_secret(&mut self, name: impl Into<String>, keys: Vec<String>) {
        self.secrets.insert(name.into(), keys);
    }

    pub fn config_map_entry(&self, name: &str, key: &str) -> Option<&str> {
        self.config_maps
            .get(name)
            .and_then(|data| data.get(key))
            .map(String::as_str)
    }

    pub fn has_config_map(&self, name: &str) -> bool {
        self.config_maps.contains_key(name)
    }

    /// Key names of a ConfigMap declared in the batch, if any.
    pub fn config_map_keys(&self, name: &str) -> Option<Vec<&str>> {
        self.config_maps
            .get(name)
            .map(|data| data.keys().map(String::as_str).collect())
    }

    /// Key names of a Secret declared in the batch, if any.
    pub fn secret_keys(&self, name: &str) -> Option<&[String]> {
        self.secrets.get(name).map(Vec::as_slice)
    }
}
