//! Heuristic read/write extraction from opaque logic text.
//!
//! This is **not** a parser of the expression language and nothing here is
//! executed. It mines identifiers so formats that do not declare rule
//! dependencies explicitly can still be reduced to a canonical graph:
//!
//! 1. blank out the contents of quoted string literals,
//! 2. outputs = tokens followed by a single `=` (not `==`, `===`, `!=`, `!==`),
//! 3. collect every remaining word-like token outside a fixed reserved set,
//! 4. inputs = collected tokens minus outputs.
//!
//! Compound left-hand sides (`obj.field = ...`) are not special-cased: the
//! token right before `=` is the output and the rest are inputs. Downstream
//! normalizers rely on this exact behavior.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Keywords and built-ins that never name a parameter.
pub const RESERVED_WORDS: &[&str] = &[
    // control flow / declarations
    "if", "else", "elif", "then", "return", "let", "const", "var", "function", "fn", "new",
    "this", "typeof", "instanceof", "in", "of", "for", "while", "do", "break", "continue",
    "switch", "case", "default", "def", "lambda", "is",
    // literals
    "true", "false", "null", "undefined", "none", "nan", "infinity", "True", "False", "None",
    "NaN", "Infinity",
    // word operators
    "and", "or", "not",
    // built-ins
    "Math", "min", "max", "abs", "round", "floor", "ceil", "sqrt", "pow", "log", "exp",
    "Number", "String", "Boolean", "parseInt", "parseFloat", "isNaN", "Date", "console",
    "length", "includes", "toFixed",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicAnalysis {
    pub inputs: BTreeSet<String>,
    pub outputs: BTreeSet<String>,
}

fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`"#)
            .expect("string literal pattern is valid")
    })
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_$]+").expect("word pattern is valid"))
}

fn is_reserved(token: &str) -> bool {
    RESERVED_WORDS.contains(&token)
}

/// Replace every character inside a quoted literal with a space, keeping the
/// quotes and the overall byte layout.
pub fn blank_string_literals(logic: &str) -> String {
    string_literal_re()
        .replace_all(logic, |caps: &regex::Captures<'_>| {
            let lit = &caps[0];
            let mut chars = lit.chars();
            let open = chars.next().unwrap_or('"');
            let inner_len = lit.len().saturating_sub(2 * open.len_utf8());
            format!("{open}{}{open}", " ".repeat(inner_len))
        })
        .into_owned()
}

/// `true` when the text at `rest` starts (after optional whitespace) with a
/// single `=`.
fn starts_with_assignment(rest: &str) -> bool {
    let rest = rest.trim_start();
    let mut chars = rest.chars();
    matches!(chars.next(), Some('=')) && !matches!(chars.next(), Some('='))
}

/// Extract the identifiers a logic snippet reads and writes.
pub fn analyze_logic(logic: &str) -> LogicAnalysis {
    let text = blank_string_literals(logic);

    let mut outputs = BTreeSet::new();
    let mut collected = BTreeSet::new();

    for m in word_re().find_iter(&text) {
        let token = m.as_str();
        if token.starts_with(|c: char| c.is_ascii_digit()) || is_reserved(token) {
            continue;
        }
        if starts_with_assignment(&text[m.end()..]) {
            outputs.insert(token.to_string());
        } else {
            collected.insert(token.to_string());
        }
    }

    let inputs = collected.difference(&outputs).cloned().collect();
    LogicAnalysis { inputs, outputs }
}
