//! User-name / credential identifier heuristics.
//!
//! A pure, total check over one string: it never fails, whatever the input.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    TooShort,
    TooLong,
    Empty,
    InvalidChars,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::TooShort => write!(f, "too short"),
            Self::TooLong => write!(f, "too long"),
            Self::Empty => write!(f, "empty"),
            Self::InvalidChars => write!(f, "invalid characters"),
        }
    }
}

/// Length bounds for identifiers, configurable under `[identifiers]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_min_length() -> usize {
    6
}

fn default_max_length() -> usize {
    64
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
        }
    }
}

impl IdentifierPolicy {
    /// Checks run in a fixed order: empty, too long, invalid characters,
    /// too short. The first failing check is the verdict.
    pub fn check(&self, identifier: &str) -> Verdict {
        if identifier.is_empty() {
            return Verdict::Empty;
        }
        let len = identifier.chars().count();
        if len > self.max_length {
            return Verdict::TooLong;
        }
        if !identifier.chars().all(is_allowed) {
            return Verdict::InvalidChars;
        }
        if len < self.min_length {
            return Verdict::TooShort;
        }
        Verdict::Ok
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Check an identifier against the default policy.
pub fn check_identifier(identifier: &str) -> Verdict {
    IdentifierPolicy::default().check(identifier)
}

/// Env var names that carry a user name.
pub fn is_username_field(env_name: &str) -> bool {
    let upper = env_name.to_ascii_uppercase();
    upper == "USER"
        || upper == "USERNAME"
        || upper == "LOGIN"
        || ["_USER", "_USERNAME", "_LOGIN", "_USER_NAME"]
            .iter()
            .any(|suffix| upper.ends_with(suffix))
}
