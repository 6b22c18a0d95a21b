//! Taint graph builder: one manifest document plus resolved scripts in,
//! one `TaintGraph` out.
//!
//! Every container gets its own scope of bindings (variable name to the node
//! currently holding that value). Secret sources bind names; consumers
//! (argv elements, script statements) link from the bindings they mention;
//! sink statements get a `flows_to` edge from their own consumer node.
//! Resolution failures and depth truncation become `Unresolved` nodes fed
//! by everything in scope. Building never fails.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::analysis::identifier::{is_username_field, IdentifierPolicy, Verdict};
use crate::config::Config;
use crate::error::Result;
use crate::graph::{Node, NodeId, NodeKind, Payload, Relation, TaintGraph, UnresolvedCause};
use crate::ir::{
    ClusterIndex, Container, EnvFromSource, EnvSource, KeyToPath, Manifest, Origin, Volume,
    VolumeSource,
};
use crate::parser::shell::{self, ShellParser};
use crate::parser::InvocationMode;
use crate::resolver::{ResolveError, ScriptRef, ScriptResolver};
use crate::rules::{Diagnostic, DiagnosticKind, SinkMatcher};

/// Variables the shell or kubelet provides; never attributed to envFrom.
const WELL_KNOWN_VARS: &[&str] = &[
    "HOME", "PATH", "PWD", "OLDPWD", "SHELL", "HOSTNAME", "USER", "UID", "EUID", "IFS",
    "RANDOM", "LINENO", "SECONDS", "PPID", "TERM", "LANG", "LC_ALL", "TMPDIR", "OPTARG",
    "OPTIND", "REPLY", "HOSTTYPE", "BASH_SOURCE", "BASH_VERSION", "FUNCNAME", "PS1", "PS4",
];

#[derive(Debug, Clone)]
pub struct BuilderOptions {
    pub max_reference_depth: usize,
    pub sinks: SinkMatcher,
    pub identifiers: IdentifierPolicy,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            max_reference_depth: 10,
            sinks: SinkMatcher::builtin(),
            identifiers: IdentifierPolicy::default(),
        }
    }
}

impl BuilderOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            max_reference_depth: config.analysis.max_reference_depth,
            sinks: config.sinks.matcher()?,
            identifiers: config.identifiers,
        })
    }
}

pub struct GraphBuilder<'a> {
    options: &'a BuilderOptions,
    cluster: Option<&'a ClusterIndex>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(options: &'a BuilderOptions) -> Self {
        Self {
            options,
            cluster: None,
        }
    }

    /// Use batch-wide ConfigMap/Secret knowledge.
    pub fn with_cluster(mut self, cluster: &'a ClusterIndex) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn build(&self, manifest: &Manifest, resolver: &dyn ScriptResolver) -> TaintGraph {
        let mut build = Build {
            graph: TaintGraph::new(manifest.unit_id()),
            options: self.options,
            cluster: self.cluster,
            resolver,
            manifest,
            stack: Vec::new(),
        };
        build.run();
        tracing::debug!(
            unit = %manifest.unit_id(),
            nodes = build.graph.node_count(),
            edges = build.graph.edge_count(),
            diagnostics = build.graph.diagnostics().len(),
            "taint graph built"
        );
        build.graph
    }
}

/// Build a graph with default options and no batch context.
pub fn build_graph(manifest: &Manifest, resolver: &dyn ScriptResolver) -> TaintGraph {
    GraphBuilder::new(&BuilderOptions::default()).build(manifest, resolver)
}

#[derive(Debug, Clone)]
struct Binding {
    node: NodeId,
    /// Bound directly to a `SecretDeclaration`.
    direct: bool,
    exported: bool,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    vars: HashMap<String, Binding>,
    /// Names known to hold non-secret values.
    clean: HashSet<String>,
    /// envFrom secrets with unknown keys: (prefix, declaration).
    fallback: Vec<(String, NodeId)>,
    /// Secret mount paths: (path, VolumeMountRef).
    mounts: Vec<(String, NodeId)>,
}

impl Scope {
    fn bind(&mut self, name: &str, binding: Binding) {
        self.clean.remove(name);
        self.vars.insert(name.to_string(), binding);
    }

    fn clear(&mut self, name: &str) {
        self.vars.remove(name);
        self.clean.insert(name.to_string());
    }

    /// Scope seen by a child process: exported variables only.
    fn exported(&self) -> Scope {
        Scope {
            vars: self
                .vars
                .iter()
                .filter(|(_, b)| b.exported)
                .map(|(k, b)| (k.clone(), b.clone()))
                .collect(),
            clean: self.clean.clone(),
            fallback: self.fallback.clone(),
            mounts: self.mounts.clone(),
        }
    }

    /// Every tainted node reachable from this scope, sorted by node id.
    fn tainted(&self) -> Vec<Binding> {
        let mut out: Vec<Binding> = self.vars.values().cloned().collect();
        out.extend(self.fallback.iter().map(|(_, decl)| Binding {
            node: decl.clone(),
            direct: true,
            exported: true,
        }));
        out.extend(self.mounts.iter().map(|(_, node)| Binding {
            node: node.clone(),
            direct: false,
            exported: true,
        }));
        out.sort_by(|a, b| a.node.cmp(&b.node));
        out.dedup_by(|a, b| a.node == b.node);
        out
    }
}

/// A ConfigMap volume mounted into a container; scripts under it resolve
/// through the ConfigMap.
#[derive(Debug, Clone)]
struct ConfigMount {
    mount_path: String,
    config_map: String,
    sub_path: Option<String>,
    items: Vec<KeyToPath>,
}

struct ContainerCtx {
    name: String,
    field: String,
    file: PathBuf,
    config_mounts: Vec<ConfigMount>,
}

impl ContainerCtx {
    fn id(&self, suffix: impl std::fmt::Display) -> String {
        format!("c:{}:{}", self.name, suffix)
    }

    fn origin(&self, field: &str) -> Option<Origin> {
        Some(Origin::manifest(&self.file, field))
    }

    /// Map a path seen in argv or a script to a script reference.
    fn script_ref(&self, target: &str, current: Option<&ScriptRef>) -> ScriptRef {
        let target = target.trim_matches(|c| c == '"' || c == '\'');
        for mount in &self.config_mounts {
            let base = mount.mount_path.trim_end_matches('/');
            if let Some(sub) = &mount.sub_path {
                if target == base {
                    return ScriptRef::ConfigMap {
                        name: mount.config_map.clone(),
                        key: sub.clone(),
                    };
                }
                continue;
            }
            if let Some(rest) = target
                .strip_prefix(base)
                .and_then(|r| r.strip_prefix('/'))
            {
                let key = mount
                    .items
                    .iter()
                    .find(|i| i.path == rest)
                    .map(|i| i.key.clone())
                    .unwrap_or_else(|| rest.to_string());
                return ScriptRef::ConfigMap {
                    name: mount.config_map.clone(),
                    key,
                };
            }
        }

        let path = Path::new(target);
        if path.is_relative() {
            match current {
                Some(ScriptRef::Path(parent)) => {
                    let dir = parent
                        .parent()
                        .filter(|d| !d.as_os_str().is_empty() && *d != Path::new("."));
                    if let Some(dir) = dir {
                        return ScriptRef::Path(dir.join(path.strip_prefix("./").unwrap_or(path)));
                    }
                }
                Some(ScriptRef::ConfigMap { name, .. }) => {
                    if let Some(file) = path.file_name() {
                        return ScriptRef::ConfigMap {
                            name: name.clone(),
                            key: file.to_string_lossy().into_owned(),
                        };
                    }
                }
                _ => {}
            }
        }
        ScriptRef::Path(path.to_path_buf())
    }
}

struct Build<'a> {
    graph: TaintGraph,
    options: &'a BuilderOptions,
    cluster: Option<&'a ClusterIndex>,
    resolver: &'a dyn ScriptResolver,
    manifest: &'a Manifest,
    /// Script keys currently being expanded.
    stack: Vec<String>,
}

impl Build<'_> {
    fn run(&mut self) {
        let manifest = self.manifest;
        self.node(
            "root".to_string(),
            NodeKind::ManifestRoot,
            Some(Origin::manifest(&manifest.file, "metadata")),
            Payload::text(format!("{}/{}", manifest.kind, manifest.name)),
        );

        for issue in &manifest.issues {
            self.diag(
                DiagnosticKind::MalformedField,
                issue.message.clone(),
                Some(Origin::manifest(&manifest.file, &issue.field)),
            );
        }

        let Some(pod) = manifest.pod() else {
            return;
        };
        for container in &pod.containers {
            self.container(container, &pod.volumes);
        }
    }

    fn container(&mut self, container: &Container, volumes: &[Volume]) {
        let volume_by_name: HashMap<&str, &Volume> =
            volumes.iter().map(|v| (v.name.as_str(), v)).collect();

        let config_mounts = container
            .volume_mounts
            .iter()
            .filter_map(|m| match volume_by_name.get(m.name.as_str()).map(|v| &v.source) {
                Some(VolumeSource::ConfigMap { name, items }) => Some(ConfigMount {
                    mount_path: m.mount_path.clone(),
                    config_map: name.clone(),
                    sub_path: m.sub_path.clone(),
                    items: items.clone(),
                }),
                _ => None,
            })
            .collect();

        let ctx = ContainerCtx {
            name: container.name.clone(),
            field: container.field.clone(),
            file: self.manifest.file.clone(),
            config_mounts,
        };
        let mut scope = Scope::default();

        // envFrom first: explicit env entries override it.
        for entry in &container.env_from {
            match &entry.source {
                EnvFromSource::Secret(secret) => {
                    let decl = self.declare(
                        ctx.id(format!("envFrom:{secret}")),
                        ctx.origin(&entry.field),
                        Payload::Secret {
                            secret: secret.clone(),
                            key: None,
                            exposed_as: format!("{}*", entry.prefix),
                        },
                    );
                    match self.cluster.and_then(|c| c.secret_keys(secret)) {
                        Some(keys) => {
                            for key in keys {
                                let name = format!("{}{}", entry.prefix, key);
                                if is_env_name(&name) {
                                    scope.bind(&name, direct(&decl));
                                }
                            }
                        }
                        None => {
                            self.diag(
                                DiagnosticKind::UnknownSecretKeys,
                                format!(
                                    "envFrom secret '{secret}' is not part of the scan; \
                                     unattributed variables with prefix '{}' are assumed to come from it",
                                    entry.prefix
                                ),
                                ctx.origin(&entry.field),
                            );
                            scope.fallback.push((entry.prefix.clone(), decl));
                        }
                    }
                }
                EnvFromSource::ConfigMap(name) => {
                    if let Some(data) = self
                        .cluster
                        .and_then(|c| c.config_map_keys(name))
                    {
                        for key in data {
                            scope.clear(&format!("{}{}", entry.prefix, key));
                        }
                    }
                }
            }
        }

        for env in &container.env {
            match &env.source {
                EnvSource::SecretKey { secret, key } => {
                    let decl = self.declare(
                        ctx.id(format!("env:{}", env.name)),
                        ctx.origin(&env.field),
                        Payload::Secret {
                            secret: secret.clone(),
                            key: Some(key.clone()),
                            exposed_as: env.name.clone(),
                        },
                    );
                    scope.bind(&env.name, direct(&decl));
                }
                EnvSource::Literal { value } => {
                    if is_username_field(&env.name) {
                        let verdict = self.options.identifiers.check(value);
                        if verdict != Verdict::Ok {
                            self.diag(
                                DiagnosticKind::InsecureIdentifier,
                                format!("env var '{}' holds a user name that is {verdict}", env.name),
                                ctx.origin(&env.field),
                            );
                        }
                    }
                    // Dependent variables: `value: "...$(SECRET_VAR)..."`.
                    let upstream: Vec<Binding> = shell::kubernetes_refs(value)
                        .iter()
                        .filter_map(|name| self.lookup(&mut scope, &ctx, name))
                        .collect();
                    if upstream.is_empty() {
                        scope.clear(&env.name);
                        continue;
                    }
                    let id = self.node(
                        ctx.id(format!("envref:{}", env.name)),
                        NodeKind::EnvVarRef,
                        ctx.origin(&env.field),
                        Payload::Name {
                            name: env.name.clone(),
                        },
                    );
                    for b in &upstream {
                        self.link(b, &id);
                    }
                    scope.bind(
                        &env.name,
                        Binding {
                            node: id,
                            direct: false,
                            exported: true,
                        },
                    );
                }
                EnvSource::ConfigMapKey { .. } | EnvSource::Downward | EnvSource::Empty => {
                    scope.clear(&env.name);
                }
            }
        }

        for mount in &container.volume_mounts {
            let Some(VolumeSource::Secret { secret, .. }) =
                volume_by_name.get(mount.name.as_str()).map(|v| &v.source)
            else {
                continue;
            };
            let decl = self.declare(
                ctx.id(format!("secret-volume:{}", mount.name)),
                ctx.origin(&mount.field),
                Payload::Secret {
                    secret: secret.clone(),
                    key: mount.sub_path.clone(),
                    exposed_as: mount.mount_path.clone(),
                },
            );
            let mount_ref = self.node(
                ctx.id(format!("mount:{}", mount.name)),
                NodeKind::VolumeMountRef,
                ctx.origin(&mount.field),
                Payload::Path {
                    path: mount.mount_path.clone(),
                },
            );
            self.edge(&decl, &mount_ref, Relation::InjectsInto);
            let path = mount.mount_path.trim_end_matches('/');
            if !path.is_empty() {
                scope.mounts.push((path.to_string(), mount_ref));
            }
        }

        self.argv(container, &ctx, &mut scope);
    }

    fn argv(&mut self, container: &Container, ctx: &ContainerCtx, scope: &mut Scope) {
        let argv = container.argv();
        let Some(&first) = argv.first() else {
            return;
        };
        let inline_at = inline_script_index(&argv);

        let mut args: Vec<NodeId> = Vec::new();
        for (i, arg) in argv.iter().enumerate() {
            if Some(i) == inline_at {
                continue;
            }
            let mut names = shell::kubernetes_refs(arg);
            for v in shell::scan_variables(arg, true) {
                if !names.contains(&v) {
                    names.push(v);
                }
            }
            let upstream = self.references(scope, ctx, &names, arg);
            if upstream.is_empty() {
                continue;
            }
            let field = container.argv_field(i);
            let id = self.node(
                ctx.id(format!("arg:{i}")),
                NodeKind::CommandArg,
                ctx.origin(&field),
                Payload::text(*arg),
            );
            for b in &upstream {
                self.link(b, &id);
            }
            args.push(id);
        }

        let command_line: Vec<&str> = argv
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != inline_at)
            .map(|(_, a)| *a)
            .collect();
        let command_line = command_line.join(" ");
        if !shell::is_shell(first) {
            if let Some(pattern) = self.options.sinks.find(&command_line).cloned() {
                let sink = self.node(
                    ctx.id("argv:sink"),
                    NodeKind::ExternalSink {
                        sink: pattern.kind,
                        pattern: pattern.name,
                    },
                    ctx.origin(&format!("{}.command", ctx.field)),
                    Payload::text(command_line.clone()),
                );
                for arg in &args {
                    self.edge(arg, &sink, Relation::FlowsTo);
                }
            }
        }

        // Scripts run by the container.
        if let Some(i) = inline_at {
            let reference = ScriptRef::Inline {
                label: ctx.name.clone(),
                text: argv[i].to_string(),
            };
            self.script(reference, scope, ctx, 0, true);
        } else if shell::is_shell(first) {
            if let Some(target) = argv.iter().skip(1).find(|a| !a.starts_with('-')) {
                let reference = ctx.script_ref(target, None);
                let mut child = scope.exported();
                self.script(reference, &mut child, ctx, 0, false);
            }
        } else {
            let targets: Vec<&str> = argv
                .iter()
                .copied()
                .filter(|a| shell::looks_like_script(a))
                .collect();
            for target in targets {
                let reference = ctx.script_ref(target, None);
                let mut child = scope.exported();
                self.script(reference, &mut child, ctx, 0, false);
            }
        }
    }

    /// Walk one script. `kubelet_refs` marks text the kubelet expands first
    /// (inline scripts from argv), so `$(NAME)` counts as a reference.
    /// A script already on the expansion stack is skipped with a
    /// `CyclicReference` diagnostic and leaves no node in the graph.
    fn script(
        &mut self,
        reference: ScriptRef,
        scope: &mut Scope,
        ctx: &ContainerCtx,
        depth: usize,
        kubelet_refs: bool,
    ) {
        let key = reference.key();
        if depth >= self.options.max_reference_depth {
            self.diag(
                DiagnosticKind::DepthExceeded,
                format!(
                    "stopped expanding '{key}' at reference depth {}",
                    self.options.max_reference_depth
                ),
                ctx.origin(&ctx.field),
            );
            self.dead_end(scope, ctx, &key, UnresolvedCause::DepthExceeded);
            return;
        }
        if self.stack.contains(&key) {
            self.diag(
                DiagnosticKind::CyclicReference,
                format!("'{key}' is already being expanded; not following it again"),
                ctx.origin(&ctx.field),
            );
            return;
        }

        let text = match self.resolver.resolve(&reference) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    unit = %self.graph.unit(),
                    container = %ctx.name,
                    reference = %key,
                    error = %e,
                    "script could not be resolved"
                );
                let cause = match e {
                    ResolveError::NotFound(_) => UnresolvedCause::NotFound,
                    ResolveError::Unreadable(_) => UnresolvedCause::Unreadable,
                };
                self.diag(
                    DiagnosticKind::UnresolvedScript,
                    e.to_string(),
                    ctx.origin(&ctx.field),
                );
                self.dead_end(scope, ctx, &key, cause);
                return;
            }
        };

        self.stack.push(key.clone());
        let parsed = ShellParser.parse(&text);
        for stmt in &parsed.statements {
            let mut names = stmt.variables.clone();
            if kubelet_refs {
                for v in shell::kubernetes_refs(&stmt.text) {
                    if !names.contains(&v) {
                        names.push(v);
                    }
                }
            }
            let mut haystack = stmt.text.clone();
            if let Some(body) = &stmt.body {
                haystack.push('\n');
                haystack.push_str(body);
            }
            let upstream = self.references(scope, ctx, &names, &haystack);
            let stmt_id = ctx.id(format!("{key}:{}.{}", stmt.line, stmt.index));
            let origin = Some(Origin::script(key.clone(), stmt.line));

            let consumer = if upstream.is_empty() {
                None
            } else {
                let id = self.node(
                    stmt_id.clone(),
                    NodeKind::ScriptStatement,
                    origin.clone(),
                    Payload::text(stmt.text.clone()),
                );
                for b in &upstream {
                    self.link(b, &id);
                }
                Some(id)
            };

            let matched = match &stmt.assignment {
                Some(_) => self.options.sinks.find_in_assignment(&stmt.text),
                None => self.options.sinks.find(&stmt.text),
            };
            if let Some(pattern) = matched.cloned() {
                let sink = self.node(
                    format!("{stmt_id}:sink"),
                    NodeKind::ExternalSink {
                        sink: pattern.kind,
                        pattern: pattern.name,
                    },
                    origin,
                    Payload::text(stmt.text.clone()),
                );
                if let Some(consumer) = &consumer {
                    self.edge(consumer, &sink, Relation::FlowsTo);
                }
            }

            if let Some(assignment) = &stmt.assignment {
                match &consumer {
                    Some(id) => {
                        let exported = assignment.exported
                            || scope
                                .vars
                                .get(&assignment.name)
                                .map_or(false, |b| b.exported);
                        scope.bind(
                            &assignment.name,
                            Binding {
                                node: id.clone(),
                                direct: false,
                                exported,
                            },
                        );
                    }
                    None => scope.clear(&assignment.name),
                }
            }

            if let Some(invocation) = &stmt.invocation {
                let child_ref = ctx.script_ref(&invocation.target, Some(&reference));
                match invocation.mode {
                    InvocationMode::Source => self.script(child_ref, scope, ctx, depth + 1, false),
                    InvocationMode::Execute => {
                        let mut child = scope.exported();
                        self.script(child_ref, &mut child, ctx, depth + 1, false);
                    }
                }
            }
        }
        self.stack.pop();
    }

    /// Bindings referenced by a consumer, by variable name or mount path.
    fn references(
        &mut self,
        scope: &mut Scope,
        ctx: &ContainerCtx,
        names: &[String],
        text: &str,
    ) -> Vec<Binding> {
        let mut out: Vec<Binding> = names
            .iter()
            .filter_map(|name| self.lookup(scope, ctx, name))
            .collect();
        for (path, node) in &scope.mounts {
            if text.contains(path.as_str()) {
                out.push(Binding {
                    node: node.clone(),
                    direct: false,
                    exported: true,
                });
            }
        }
        out
    }

    fn lookup(&mut self, scope: &mut Scope, ctx: &ContainerCtx, name: &str) -> Option<Binding> {
        if let Some(b) = scope.vars.get(name) {
            return Some(b.clone());
        }
        if scope.clean.contains(name)
            || WELL_KNOWN_VARS.contains(&name)
            || name.starts_with("KUBERNETES_")
        {
            return None;
        }
        let decls: Vec<NodeId> = scope
            .fallback
            .iter()
            .filter(|(prefix, _)| name.starts_with(prefix.as_str()))
            .map(|(_, decl)| decl.clone())
            .collect();
        if decls.is_empty() {
            return None;
        }
        let id = self.node(
            ctx.id(format!("envref:{name}")),
            NodeKind::EnvVarRef,
            ctx.origin(&ctx.field),
            Payload::Name {
                name: name.to_string(),
            },
        );
        for decl in &decls {
            self.edge(decl, &id, Relation::InjectsInto);
        }
        let binding = Binding {
            node: id,
            direct: false,
            exported: true,
        };
        scope.bind(name, binding.clone());
        Some(binding)
    }

    /// Placeholder for a script that was not expanded; everything in scope
    /// may flow into it.
    fn dead_end(&mut self, scope: &Scope, ctx: &ContainerCtx, key: &str, cause: UnresolvedCause) {
        let id = self.node(
            ctx.id(format!("unresolved:{key}")),
            NodeKind::Unresolved { cause },
            ctx.origin(&ctx.field),
            Payload::text(key),
        );
        for b in scope.tainted() {
            self.link(&b, &id);
        }
    }

    fn declare(&mut self, id: String, origin: Option<Origin>, payload: Payload) -> NodeId {
        let decl = self.node(id, NodeKind::SecretDeclaration, origin, payload);
        self.edge(&NodeId::from("root"), &decl, Relation::Declares);
        decl
    }

    fn node(
        &mut self,
        id: String,
        kind: NodeKind,
        origin: Option<Origin>,
        payload: Payload,
    ) -> NodeId {
        let id = NodeId::new(id);
        self.graph.add_node(Node {
            id: id.clone(),
            kind,
            origin,
            payload,
        });
        id
    }

    fn link(&mut self, from: &Binding, to: &NodeId) {
        let relation = if from.direct {
            Relation::InjectsInto
        } else {
            Relation::ReferencedBy
        };
        self.edge(&from.node, to, relation);
    }

    fn edge(&mut self, from: &NodeId, to: &NodeId, relation: Relation) {
        if from == to {
            return;
        }
        if let Err(e) = self.graph.add_edge(from, to, relation) {
            tracing::debug!(error = %e, "edge skipped");
        }
    }

    fn diag(&mut self, kind: DiagnosticKind, message: String, origin: Option<Origin>) {
        self.graph
            .push_diagnostic(Diagnostic::new(kind, message, origin));
    }
}

fn direct(decl: &NodeId) -> Binding {
    Binding {
        node: decl.clone(),
        direct: true,
        exported: true,
    }
}

/// Index of the inline script in `sh -c '...'`-style argv.
fn inline_script_index(argv: &[&str]) -> Option<usize> {
    let first = argv.first()?;
    if !shell::is_shell(first) {
        return None;
    }
    let flag = argv
        .iter()
        .skip(1)
        .take_while(|a| a.starts_with('-') && !a.starts_with("--"))
        .position(|a| a[1..].contains('c'))?;
    let index = flag + 2;
    (index < argv.len()).then_some(index)
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
