use once_cell::sync::Lazy;
use regex::Regex;

use super::{Assignment, Invocation, InvocationMode, ParsedScript, Statement};

/// Line-oriented shell reader. It does not build a full AST: it splits a
/// script into logical statements and extracts the parts the taint builder
/// needs (variable references, assignments, nested script invocations).
pub struct ShellParser;

static ASSIGNMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(export|local|readonly|declare|typeset)\s+(?:-[A-Za-z]+\s+)*)?([A-Za-z_][A-Za-z0-9_]*)=",
    )
    .unwrap()
});

static SOURCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:source|\.)\s+["']?([^\s;|&"']+)"#).unwrap());

static SHELL_EXEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:exec\s+)?(?:\S*/)?(?:ba|da|a|z|k)?sh\s+((?:-[A-Za-z]+\s+)*)["']?([^\s;|&"'-][^\s;|&"']*)"#)
        .unwrap()
});

static SCRIPT_EXEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:exec\s+)?["']?((?:\.{0,2}/)?[\w./${}-]*\.(?:sh|bash))\b"#).unwrap()
});

static HEREDOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<<-?\s*(["']?)([A-Za-z_][A-Za-z0-9_]*)(["']?)"#).unwrap());

static K8S_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(([A-Za-z_][A-Za-z0-9_]*)\)").unwrap());

/// Leading control keywords stripped before matching a statement.
const LEADING_KEYWORDS: &[&str] = &[
    "then", "do", "else", "elif", "if", "while", "until", "!", "{", "(", "time",
];

const SHELLS: &[&str] = &["sh", "bash", "ash", "dash", "zsh", "ksh"];

struct LogicalLine {
    line: usize,
    text: String,
    heredoc: Option<(String, bool)>,
}

impl ShellParser {
    pub fn parse(&self, content: &str) -> ParsedScript {
        let mut statements = Vec::new();
        for logical in logical_lines(content) {
            let mut heredoc = logical.heredoc;
            for (index, segment) in split_statements(&logical.text).into_iter().enumerate() {
                let text = strip_keywords(segment.trim());
                if text.is_empty() {
                    continue;
                }
                let mut variables = scan_variables(text, true);
                let mut body = None;
                if text.contains("<<") {
                    if let Some((doc, expands)) = heredoc.take() {
                        if expands {
                            for v in scan_variables(&doc, false) {
                                if !variables.contains(&v) {
                                    variables.push(v);
                                }
                            }
                        }
                        body = Some(doc);
                    }
                }
                statements.push(Statement {
                    line: logical.line,
                    index,
                    text: text.to_string(),
                    body,
                    variables,
                    assignment: parse_assignment(text),
                    invocation: parse_invocation(text),
                });
            }
        }
        ParsedScript { statements }
    }
}

/// Join continuation lines, fold here-doc bodies, drop comments and blanks.
fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut lines = content.lines().enumerate();
    let mut pending: Option<(usize, String)> = None;

    while let Some((idx, raw)) = lines.next() {
        let trimmed = raw.trim();
        if pending.is_none() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }

        let (start, mut text) = pending.take().unwrap_or((idx + 1, String::new()));
        if let Some(stripped) = trimmed.strip_suffix('\\') {
            text.push_str(stripped);
            text.push(' ');
            pending = Some((start, text));
            continue;
        }
        text.push_str(trimmed);

        let mut heredoc = None;
        if let Some(cap) = HEREDOC_RE
            .captures_iter(&text)
            .find(|c| c.get(0).map_or(false, |m| !text[..m.start()].ends_with('<')))
        {
            let quoted = !cap[1].is_empty() || !cap[3].is_empty();
            let delimiter = cap[2].to_string();
            let mut body = Vec::new();
            for (_, body_line) in lines.by_ref() {
                if body_line.trim() == delimiter {
                    break;
                }
                body.push(body_line.to_string());
            }
            heredoc = Some((body.join("\n"), !quoted));
        }

        out.push(LogicalLine {
            line: start,
            text,
            heredoc,
        });
    }

    if let Some((start, text)) = pending {
        out.push(LogicalLine {
            line: start,
            text,
            heredoc: None,
        });
    }
    out
}

/// Split on unquoted `;`, `&&`, `||` and background `&`. Pipes stay inside
/// one statement.
fn split_statements(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let (mut single, mut double) = (false, false);

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\\' if !single => {
                i += 2;
                continue;
            }
            b'\'' if !double => single = !single,
            b'"' if !single => double = !double,
            b';' if !single && !double => {
                out.push(&text[start..i]);
                // `;;` ends a case arm.
                if bytes.get(i + 1) == Some(&b';') {
                    i += 1;
                }
                start = i + 1;
            }
            b'&' | b'|' if !single && !double => {
                let doubled = bytes.get(i + 1) == Some(&b);
                let redirect = b == b'&'
                    && (i > 0 && matches!(bytes[i - 1], b'>' | b'<')
                        || bytes.get(i + 1) == Some(&b'>'));
                if doubled {
                    out.push(&text[start..i]);
                    i += 2;
                    start = i;
                    continue;
                }
                if b == b'&' && !redirect {
                    out.push(&text[start..i]);
                    start = i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn strip_keywords(mut text: &str) -> &str {
    loop {
        let before = text;
        for kw in LEADING_KEYWORDS {
            if let Some(rest) = text.strip_prefix(kw) {
                let symbolic = !kw.chars().all(char::is_alphabetic);
                if symbolic || rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    text = rest.trim_start();
                }
            }
        }
        if text == before {
            return text;
        }
    }
}

/// Shell variable references (`$NAME`, `${NAME}`, `${NAME:-x}`), in order of
/// first appearance. With `honor_quotes`, single-quoted text is skipped.
pub fn scan_variables(text: &str, honor_quotes: bool) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out: Vec<String> = Vec::new();
    let (mut single, mut double) = (false, false);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if honor_quotes {
            match c {
                '\\' if !single => {
                    i += 2;
                    continue;
                }
                '\'' if !double => {
                    single = !single;
                    i += 1;
                    continue;
                }
                '"' if !single => {
                    double = !double;
                    i += 1;
                    continue;
                }
                _ => {}
            }
        }
        if c == '$' && !single {
            let braced = chars.get(i + 1) == Some(&'{');
            let start = if braced { i + 2 } else { i + 1 };
            let mut end = start;
            while end < chars.len() && is_name_char(chars[end], end == start) {
                end += 1;
            }
            if end > start {
                let name: String = chars[start..end].iter().collect();
                if !out.contains(&name) {
                    out.push(name);
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out
}

/// Kubernetes `$(NAME)` references in container `command`/`args`.
/// `$$(NAME)` is an escape and is skipped.
pub fn kubernetes_refs(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cap in K8S_REF_RE.captures_iter(text) {
        let Some(whole) = cap.get(0) else { continue };
        if whole.start() > 0 && text.as_bytes()[whole.start() - 1] == b'$' {
            continue;
        }
        let name = cap[1].to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Separate command substitutions (`$(...)`, backticks) from the rest of a
/// statement. Returns the statement with each substitution replaced by a
/// space, and the substitution bodies in order. Single-quoted text is left
/// alone; an unterminated substitution runs to the end of the text.
pub fn split_substitutions(text: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = text.chars().collect();
    let mut outer = String::with_capacity(text.len());
    let mut inner = Vec::new();
    let (mut single, mut double) = (false, false);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if !single => {
                outer.extend(chars[i..(i + 2).min(chars.len())].iter());
                i += 2;
                continue;
            }
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            '$' if !single && chars.get(i + 1) == Some(&'(') => {
                let start = i + 2;
                let mut depth = 1;
                let mut end = start;
                while end < chars.len() {
                    match chars[end] {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    end += 1;
                }
                inner.push(chars[start..end].iter().collect());
                outer.push(' ');
                i = end + 1;
                continue;
            }
            '`' if !single => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '`')
                    .map_or(chars.len(), |p| start + p);
                inner.push(chars[start..end].iter().collect());
                outer.push(' ');
                i = end + 1;
                continue;
            }
            _ => {}
        }
        outer.push(c);
        i += 1;
    }
    (outer, inner)
}

fn is_name_char(c: char, first: bool) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (!first && c.is_ascii_digit())
}

fn parse_assignment(text: &str) -> Option<Assignment> {
    let cap = ASSIGNMENT_RE.captures(text)?;
    Some(Assignment {
        name: cap[2].to_string(),
        exported: cap.get(1).map_or(false, |m| m.as_str() == "export"),
    })
}

fn parse_invocation(text: &str) -> Option<Invocation> {
    if let Some(cap) = SOURCE_RE.captures(text) {
        return Some(Invocation {
            target: cap[1].to_string(),
            mode: InvocationMode::Source,
        });
    }
    if let Some(cap) = SHELL_EXEC_RE.captures(text) {
        // `sh -c '...'` runs inline text, not a file.
        if cap[1].contains('c') {
            return None;
        }
        return Some(Invocation {
            target: cap[2].to_string(),
            mode: InvocationMode::Execute,
        });
    }
    SCRIPT_EXEC_RE.captures(text).map(|cap| Invocation {
        target: cap[1].to_string(),
        mode: InvocationMode::Execute,
    })
}

/// Whether an argv element names a shell interpreter.
pub fn is_shell(arg: &str) -> bool {
    let base = arg.rsplit('/').next().unwrap_or(arg);
    SHELLS.contains(&base)
}

/// Whether an argv element looks like a script file.
pub fn looks_like_script(arg: &str) -> bool {
    !arg.starts_with('-')
        && !arg.contains(char::is_whitespace)
        && (arg.ends_with(".sh") || arg.ends_with(".bash"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> ParsedScript {
        ShellParser.parse(code)
    }

    #[test]
    fn finds_plain_and_braced_variables() {
        let vars = scan_variables(r#"echo "$USER:${DB_PASSWORD:-none}" $1"#, true);
        assert_eq!(vars, vec!["USER", "DB_PASSWORD"]);
    }

    #[test]
    fn single_quotes_suppress_expansion() {
        assert!(scan_variables("echo '$TOKEN'", true).is_empty());
        assert_eq!(scan_variables("echo \"'$TOKEN'\"", true), vec!["TOKEN"]);
        assert!(scan_variables(r"echo \$TOKEN", true).is_empty());
    }

    #[test]
    fn kubernetes_refs_skip_escapes() {
        assert_eq!(kubernetes_refs("--password=$(DB_PASS)"), vec!["DB_PASS"]);
        assert!(kubernetes_refs("$$(DB_PASS)").is_empty());
    }

    #[test]
    fn splits_compound_lines() {
        let parsed = parse("export A=$S; echo $A && curl -d $A https://x || true\n");
        let texts: Vec<&str> = parsed.statements.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["export A=$S", "echo $A", "curl -d $A https://x", "true"]
        );
        assert!(parsed.statements.iter().all(|s| s.line == 1));
        let assignment = parsed.statements[0].assignment.as_ref().unwrap();
        assert_eq!(assignment.name, "A");
        assert!(assignment.exported);
    }

    #[test]
    fn keeps_pipelines_and_redirects_together() {
        let parsed = parse("echo $A 2>&1 | tee /tmp/out\n");
        assert_eq!(parsed.statements.len(), 1);
    }

    #[test]
    fn joins_continuations_and_skips_comments() {
        let parsed = parse("#!/bin/sh\n# comment\ncurl \\\n  -d \"$TOKEN\" \\\n  https://x\n");
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].line, 3);
        assert_eq!(parsed.statements[0].variables, vec!["TOKEN"]);
    }

    #[test]
    fn heredoc_bodies_attach_to_opening_statement() {
        let parsed = parse("cat <<EOF\npassword=$DB_PASS\nEOF\necho done\n");
        assert_eq!(parsed.statements.len(), 2);
        assert_eq!(parsed.statements[0].variables, vec!["DB_PASS"]);
        assert_eq!(parsed.statements[1].text, "echo done");

        let quoted = parse("cat <<'EOF'\npassword=$DB_PASS\nEOF\n");
        assert!(quoted.statements[0].variables.is_empty());
    }

    #[test]
    fn detects_nested_invocations() {
        let parsed = parse("source ./lib.sh\n. common.sh\nbash -e deploy.sh arg\n./run.sh\n");
        let got: Vec<(&str, InvocationMode)> = parsed
            .statements
            .iter()
            .filter_map(|s| s.invocation.as_ref())
            .map(|i| (i.target.as_str(), i.mode))
            .collect();
        assert_eq!(
            got,
            vec![
                ("./lib.sh", InvocationMode::Source),
                ("common.sh", InvocationMode::Source),
                ("deploy.sh", InvocationMode::Execute),
                ("./run.sh", InvocationMode::Execute),
            ]
        );
    }

    #[test]
    fn strips_control_keywords() {
        let parsed = parse("if true; then echo $X; fi\n");
        assert!(parsed
            .statements
            .iter()
            .any(|s| s.text == "echo $X" && s.variables == vec!["X"]));
    }

    #[test]
    fn substitutions_are_split_out() {
        let (outer, inner) = split_substitutions("export T=$(cat /etc/t | tr -d '\\n') && echo `id`");
        assert_eq!(outer, "export T=  && echo  ");
        assert_eq!(inner, vec!["cat /etc/t | tr -d '\\n'", "id"]);

        let (outer, inner) = split_substitutions("A='$(cat x)' B=$(echo $(cat y))");
        assert_eq!(outer, "A='$(cat x)' B= ");
        assert_eq!(inner, vec!["echo $(cat y)"]);
    }

    #[test]
    fn recognizes_shells_and_scripts() {
        assert!(is_shell("/bin/sh"));
        assert!(is_shell("bash"));
        assert!(!is_shell("python"));
        assert!(looks_like_script("/scripts/entry.sh"));
        assert!(!looks_like_script("-c"));
    }
}
