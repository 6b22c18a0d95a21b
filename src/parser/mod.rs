pub mod shell;

use serde::{Deserialize, Serialize};

/// Result of reading one shell script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedScript {
    pub statements: Vec<Statement>,
}

/// One logical shell statement: a physical line (continuations joined)
/// split on `;`, `&&`, `||` and `&`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// 1-based line where the statement starts.
    pub line: usize,
    /// Position of the statement within its line.
    pub index: usize,
    pub text: String,
    /// Here-doc body attached to this statement, if any.
    pub body: Option<String>,
    /// Variables referenced by the statement (and an expanding here-doc).
    pub variables: Vec<String>,
    pub assignment: Option<Assignment>,
    pub invocation: Option<Invocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub exported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub target: String,
    pub mode: InvocationMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    /// `source f` / `. f`: runs in the caller's scope.
    Source,
    /// `sh f` / `./f.sh`: runs in a child process with exported variables.
    Execute,
}
