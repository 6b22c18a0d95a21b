use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// One Kubernetes document from a manifest file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub file: PathBuf,
    /// Zero-based position of the document inside a multi-document file.
    pub doc_index: usize,
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    /// SHA-256 of the file the document was read from.
    pub content_hash: String,
    pub body: ResourceBody,
    /// Fields that were present but could not be interpreted.
    pub issues: Vec<FieldIssue>,
}

/// The part of a document the analysis cares about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ResourceBody {
    Workload(PodSpec),
    ConfigMap { data: BTreeMap<String, String> },
    /// Only key names are kept; secret values never enter the IR.
    Secret { keys: Vec<String> },
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodSpec {
    /// Field path of the pod spec inside the document.
    pub field: String,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Container {
    pub name: String,
    pub field: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    pub env_from: Vec<EnvFrom>,
    pub volume_mounts: Vec<VolumeMount>,
}

impl Container {
    /// `command` followed by `args`, the argv the kubelet would run.
    pub fn argv(&self) -> Vec<&str> {
        self.command
            .iter()
            .chain(self.args.iter())
            .map(String::as_str)
            .collect()
    }

    /// Field path of the n-th argv element.
    pub fn argv_field(&self, index: usize) -> String {
        if index < self.command.len() {
            format!("{}.command[{}]", self.field, index)
        } else {
            format!("{}.args[{}]", self.field, index - self.command.len())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVar {
    pub name: String,
    pub source: EnvSource,
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EnvSource {
    Literal { value: String },
    SecretKey { secret: String, key: String },
    ConfigMapKey { config_map: String, key: String },
    /// `fieldRef` / `resourceFieldRef`: runtime metadata, never secret.
    Downward,
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvFrom {
    pub source: EnvFromSource,
    pub prefix: String,
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "name")]
pub enum EnvFromSource {
    Secret(String),
    ConfigMap(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum VolumeSource {
    Secret { secret: String, items: Vec<KeyToPath> },
    ConfigMap { name: String, items: Vec<KeyToPath> },
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyToPath {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub sub_path: Option<String>,
    pub field: String,
}

/// A field that was present but malformed. The field is skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Kinds whose pod template sits at `spec.template.spec`.
const TEMPLATED_KINDS: &[&str] = &[
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "ReplicaSet",
    "ReplicationController",
    "Job",
];

/// Check that a YAML document has the shape of a Kubernetes resource.
///
/// Returns the reason on failure.
pub fn validate_shape(doc: &Value) -> Result<(), String> {
    if !doc.is_mapping() {
        return Err("document is not a mapping".into());
    }
    if doc.get("apiVersion").and_then(Value::as_str).is_none() {
        return Err("missing or non-string 'apiVersion'".into());
    }
    if doc.get("kind").and_then(Value::as_str).is_none() {
        return Err("missing or non-string 'kind'".into());
    }
    match doc.get("metadata") {
        Some(meta) if meta.is_mapping() => {
            if meta.get("name").and_then(Value::as_str).is_none() {
                return Err("missing or non-string 'metadata.name'".into());
            }
        }
        _ => return Err("missing 'metadata' mapping".into()),
    }
    Ok(())
}

impl Manifest {
    /// Convert a shape-validated document. Never fails; malformed fields are
    /// recorded in `issues` and skipped.
    pub fn from_document(doc: &Value, file: &Path, doc_index: usize, content_hash: &str) -> Self {
        let mut issues = Vec::new();
        let metadata = doc.get("metadata");
        let kind = str_field(doc, "kind").unwrap_or_default();

        let body = match kind.as_str() {
            "Pod" => pod_body(doc.get("spec"), "spec", &mut issues),
            k if TEMPLATED_KINDS.contains(&k) => pod_body(
                doc.get("spec")
                    .and_then(|s| s.get("template"))
                    .and_then(|t| t.get("spec")),
                "spec.template.spec",
                &mut issues,
            ),
            "CronJob" => pod_body(
                doc.get("spec")
                    .and_then(|s| s.get("jobTemplate"))
                    .and_then(|j| j.get("spec"))
                    .and_then(|s| s.get("template"))
                    .and_then(|t| t.get("spec")),
                "spec.jobTemplate.spec.template.spec",
                &mut issues,
            ),
            "ConfigMap" => ResourceBody::ConfigMap {
                data: string_map(doc.get("data"), "data", &mut issues),
            },
            "Secret" => {
                let mut keys: Vec<String> = ["data", "stringData"]
                    .iter()
                    .filter_map(|k| doc.get(*k).and_then(Value::as_mapping))
                    .flat_map(|m| m.keys().filter_map(scalar_string))
                    .collect();
                keys.sort();
                keys.dedup();
                ResourceBody::Secret { keys }
            }
            _ => ResourceBody::Other,
        };

        Self {
            file: file.to_path_buf(),
            doc_index,
            api_version: str_field(doc, "apiVersion").unwrap_or_default(),
            kind,
            name: metadata
                .and_then(|m| str_field(m, "name"))
                .unwrap_or_default(),
            namespace: metadata.and_then(|m| str_field(m, "namespace")),
            content_hash: content_hash.to_string(),
            body,
            issues,
        }
    }

    /// Stable unit identifier: `file#index/Kind/name`.
    pub fn unit_id(&self) -> String {
        format!(
            "{}#{}/{}/{}",
            self.file.display(),
            self.doc_index,
            self.kind,
            self.name
        )
    }

    pub fn pod(&self) -> Option<&PodSpec> {
        match &self.body {
            ResourceBody::Workload(pod) => Some(pod),
            _ => None,
        }
    }
}

fn pod_body(spec: Option<&Value>, field: &str, issues: &mut Vec<FieldIssue>) -> ResourceBody {
    let Some(spec) = spec else {
        issues.push(FieldIssue {
            field: field.to_string(),
            message: "workload without a pod spec".into(),
        });
        return ResourceBody::Workload(PodSpec {
            field: field.to_string(),
            ..Default::default()
        });
    };

    let mut pod = PodSpec {
        field: field.to_string(),
        ..Default::default()
    };

    for list in ["initContainers", "containers"] {
        let list_field = format!("{field}.{list}");
        for (idx, item) in sequence(spec.get(list), &list_field, issues)
            .iter()
            .enumerate()
        {
            let item_field = format!("{list_field}[{idx}]");
            match parse_container(item, &item_field, issues) {
                Some(c) => pod.containers.push(c),
                None => issues.push(FieldIssue {
                    field: item_field,
                    message: "container without a name".into(),
                }),
            }
        }
    }

    let volumes_field = format!("{field}.volumes");
    for (idx, item) in sequence(spec.get("volumes"), &volumes_field, issues)
        .iter()
        .enumerate()
    {
        let item_field = format!("{volumes_field}[{idx}]");
        let Some(name) = str_field(item, "name") else {
            issues.push(FieldIssue {
                field: item_field,
                message: "volume without a name".into(),
            });
            continue;
        };
        let source = if let Some(secret) = item.get("secret") {
            match str_field(secret, "secretName") {
                Some(secret_name) => VolumeSource::Secret {
                    secret: secret_name,
                    items: key_paths(secret),
                },
                None => {
                    issues.push(FieldIssue {
                        field: format!("{item_field}.secret"),
                        message: "secret volume without 'secretName'".into(),
                    });
                    VolumeSource::Other
                }
            }
        } else if let Some(cm) = item.get("configMap") {
            match str_field(cm, "name") {
                Some(cm_name) => VolumeSource::ConfigMap {
                    name: cm_name,
                    items: key_paths(cm),
                },
                None => VolumeSource::Other,
            }
        } else {
            VolumeSource::Other
        };
        pod.volumes.push(Volume {
            name,
            source,
            field: item_field,
        });
    }

    ResourceBody::Workload(pod)
}

fn parse_container(item: &Value, field: &str, issues: &mut Vec<FieldIssue>) -> Option<Container> {
    let name = str_field(item, "name")?;
    let mut container = Container {
        name,
        field: field.to_string(),
        command: string_list(item.get("command"), &format!("{field}.command"), issues),
        args: string_list(item.get("args"), &format!("{field}.args"), issues),
        ..Default::default()
    };

    let env_field = format!("{field}.env");
    for (idx, entry) in sequence(item.get("env"), &env_field, issues)
        .iter()
        .enumerate()
    {
        let entry_field = format!("{env_field}[{idx}]");
        let Some(name) = str_field(entry, "name") else {
            issues.push(FieldIssue {
                field: entry_field,
                message: "env entry without a name".into(),
            });
            continue;
        };
        let source = env_source(entry, &entry_field, issues);
        container.env.push(EnvVar {
            name,
            source,
            field: entry_field,
        });
    }

    let env_from_field = format!("{field}.envFrom");
    for (idx, entry) in sequence(item.get("envFrom"), &env_from_field, issues)
        .iter()
        .enumerate()
    {
        let entry_field = format!("{env_from_field}[{idx}]");
        let prefix = str_field(entry, "prefix").unwrap_or_default();
        let source = if let Some(name) = entry.get("secretRef").and_then(|r| str_field(r, "name")) {
            EnvFromSource::Secret(name)
        } else if let Some(name) = entry
            .get("configMapRef")
            .and_then(|r| str_field(r, "name"))
        {
            EnvFromSource::ConfigMap(name)
        } else {
            issues.push(FieldIssue {
                field: entry_field,
                message: "envFrom entry without a named secretRef or configMapRef".into(),
            });
            continue;
        };
        container.env_from.push(EnvFrom {
            source,
            prefix,
            field: entry_field,
        });
    }

    let mounts_field = format!("{field}.volumeMounts");
    for (idx, entry) in sequence(item.get("volumeMounts"), &mounts_field, issues)
        .iter()
        .enumerate()
    {
        let entry_field = format!("{mounts_field}[{idx}]");
        match (str_field(entry, "name"), str_field(entry, "mountPath")) {
            (Some(name), Some(mount_path)) => container.volume_mounts.push(VolumeMount {
                name,
                mount_path,
                sub_path: str_field(entry, "subPath"),
                field: entry_field,
            }),
            _ => issues.push(FieldIssue {
                field: entry_field,
                message: "volumeMount needs both 'name' and 'mountPath'".into(),
            }),
        }
    }

    Some(container)
}

fn env_source(entry: &Value, field: &str, issues: &mut Vec<FieldIssue>) -> EnvSource {
    if let Some(value) = entry.get("value") {
        return match scalar_string(value) {
            Some(value) => EnvSource::Literal { value },
            None => {
                issues.push(FieldIssue {
                    field: format!("{field}.value"),
                    message: "env value is not a scalar".into(),
                });
                EnvSource::Empty
            }
        };
    }
    let Some(value_from) = entry.get("valueFrom") else {
        return EnvSource::Empty;
    };
    if let Some(r) = value_from.get("secretKeyRef") {
        return match (str_field(r, "name"), str_field(r, "key")) {
            (Some(secret), Some(key)) => EnvSource::SecretKey { secret, key },
            _ => {
                issues.push(FieldIssue {
                    field: format!("{field}.valueFrom.secretKeyRef"),
                    message: "secretKeyRef needs both 'name' and 'key'".into(),
                });
                EnvSource::Empty
            }
        };
    }
    if let Some(r) = value_from.get("configMapKeyRef") {
        if let (Some(config_map), Some(key)) = (str_field(r, "name"), str_field(r, "key")) {
            return EnvSource::ConfigMapKey { config_map, key };
        }
    }
    if value_from.get("fieldRef").is_some() || value_from.get("resourceFieldRef").is_some() {
        return EnvSource::Downward;
    }
    EnvSource::Empty
}

fn key_paths(source: &Value) -> Vec<KeyToPath> {
    source
        .get("items")
        .and_then(Value::as_sequence)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| {
                    Some(KeyToPath {
                        key: str_field(i, "key")?,
                        path: str_field(i, "path")?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn sequence<'a>(value: Option<&'a Value>, field: &str, issues: &mut Vec<FieldIssue>) -> &'a [Value] {
    match value {
        None | Some(Value::Null) => &[],
        Some(Value::Sequence(seq)) => seq.as_slice(),
        Some(_) => {
            issues.push(FieldIssue {
                field: field.to_string(),
                message: "expected a list".into(),
            });
            &[]
        }
    }
}

fn string_list(value: Option<&Value>, field: &str, issues: &mut Vec<FieldIssue>) -> Vec<String> {
    let mut out = Vec::new();
    for (idx, item) in sequence(value, field, issues).iter().enumerate() {
        match scalar_string(item) {
            Some(s) => out.push(s),
            None => issues.push(FieldIssue {
                field: format!("{field}[{idx}]"),
                message: "expected a scalar".into(),
            }),
        }
    }
    out
}

fn string_map(
    value: Option<&Value>,
    field: &str,
    issues: &mut Vec<FieldIssue>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Some(mapping) = value.and_then(Value::as_mapping) else {
        return out;
    };
    for (k, v) in mapping {
        match (scalar_string(k), scalar_string(v)) {
            (Some(k), Some(v)) => {
                out.insert(k, v);
            }
            _ => issues.push(FieldIssue {
                field: field.to_string(),
                message: "non-scalar entry in data".into(),
            }),
        }
    }
    out
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Kubernetes accepts quoted and unquoted scalars; both become strings here.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn rejects_documents_without_kind() {
        let d = doc("apiVersion: v1\nmetadata:\n  name: x\n");
        assert!(validate_shape(&d).unwrap_err().contains("kind"));
    }

    #[test]
    fn rejects_scalar_documents() {
        assert!(validate_shape(&doc("just a string")).is_err());
    }

    #[test]
    fn reads_deployment_containers_and_secret_sources() {
        let d = doc(r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  template:
    spec:
      containers:
        - name: app
          command: ["sh", "-c", "echo $DB_PASSWORD"]
          env:
            - name: DB_PASSWORD
              valueFrom:
                secretKeyRef:
                  name: db
                  key: password
            - name: MODE
              value: prod
          envFrom:
            - secretRef:
                name: api-tokens
              prefix: API_
          volumeMounts:
            - name: creds
              mountPath: /etc/creds
      volumes:
        - name: creds
          secret:
            secretName: cloud-creds
"#);
        let m = Manifest::from_document(&d, Path::new("deploy.yaml"), 0, "h");
        assert!(m.issues.is_empty(), "{:?}", m.issues);
        let pod = m.pod().unwrap();
        assert_eq!(pod.containers.len(), 1);
        let c = &pod.containers[0];
        assert_eq!(c.argv(), vec!["sh", "-c", "echo $DB_PASSWORD"]);
        assert_eq!(
            c.env[0].source,
            EnvSource::SecretKey {
                secret: "db".into(),
                key: "password".into()
            }
        );
        assert_eq!(c.env_from[0].source, EnvFromSource::Secret("api-tokens".into()));
        assert_eq!(c.env_from[0].prefix, "API_");
        assert_eq!(c.volume_mounts[0].mount_path, "/etc/creds");
        assert!(matches!(
            &pod.volumes[0].source,
            VolumeSource::Secret { secret, .. } if secret == "cloud-creds"
        ));
    }

    #[test]
    fn malformed_fields_are_recorded_not_fatal() {
        let d = doc(r#"
apiVersion: v1
kind: Pod
metadata:
  name: p
spec:
  containers:
    - name: c
      env: "not a list"
      command: [["nested"]]
"#);
        let m = Manifest::from_document(&d, Path::new("p.yaml"), 0, "h");
        assert_eq!(m.pod().unwrap().containers.len(), 1);
        assert_eq!(m.issues.len(), 2);
    }

    #[test]
    fn secret_documents_keep_only_key_names() {
        let d = doc(r#"
apiVersion: v1
kind: Secret
metadata:
  name: db
data:
  password: cGFzcw==
stringData:
  user: admin
"#);
        let m = Manifest::from_document(&d, Path::new("s.yaml"), 0, "h");
        assert_eq!(
            m.body,
            ResourceBody::Secret {
                keys: vec!["password".into(), "user".into()]
            }
        );
    }

    #[test]
    fn cronjob_pod_spec_is_found() {
        let d = doc(r#"
apiVersion: batch/v1
kind: CronJob
metadata:
  name: nightly
spec:
  jobTemplate:
    spec:
      template:
        spec:
          containers:
            - name: job
              args: ["run"]
"#);
        let m = Manifest::from_document(&d, Path::new("c.yaml"), 0, "h");
        let pod = m.pod().unwrap();
        assert_eq!(pod.field, "spec.jobTemplate.spec.template.spec");
        assert_eq!(pod.containers[0].args, vec!["run"]);
    }

    #[test]
    fn init_containers_come_first_and_keep_their_field_path() {
        let d = doc(r#"
apiVersion: v1
kind: Pod
metadata:
  name: p
spec:
  containers:
    - name: app
  initContainers:
    - name: migrate
"#);
        let m = Manifest::from_document(&d, Path::new("p.yaml"), 0, "h");
        let pod = m.pod().unwrap();
        let got: Vec<(&str, &str)> = pod
            .containers
            .iter()
            .map(|c| (c.name.as_str(), c.field.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("migrate", "spec.initContainers[0]"),
                ("app", "spec.containers[0]"),
            ]
        );
    }
}
