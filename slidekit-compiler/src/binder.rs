//! Variable binder: turns bound values into Tera `set` statements.
//!
//! Tera string literals have no escape sequences, so a literal is delimited
//! by whichever of `"`, `'` or `` ` `` does not occur in the text. Text that
//! contains all three is split into segments that each miss at least one
//! delimiter and joined with the `~` concatenation operator. Newlines are
//! legal inside literals and are kept as-is.
//!
//! [`parse_assignment`] reads a statement produced by [`assignment`] back
//! into the name and value it was built from.

use slidekit_core::{BoundValue, BoundVariables};

use crate::error::{CompileError, LiteralError};

const DELIMITERS: [char; 3] = ['"', '\'', '`'];

const RESERVED: &[&str] = &[
    "true", "false", "True", "False", "and", "or", "not", "in", "is",
];

const STATEMENT_OPEN: &str = "{%- set ";
const STATEMENT_CLOSE: &str = " -%}";

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// Whether `name` can be used as a Tera variable or macro identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&name)
}

/// Tera expression that evaluates to exactly `text`.
pub fn string_literal(text: &str) -> String {
    if let Some(delim) = free_delimiter(text) {
        return quoted(text, delim);
    }

    let mut segments = Vec::new();
    let mut start = 0;
    let mut seen = [false; 3];
    for (idx, ch) in text.char_indices() {
        let Some(k) = DELIMITERS.iter().position(|d| *d == ch) else {
            continue;
        };
        if !seen[k] && seen.iter().filter(|s| **s).count() == 2 {
            segments.push(&text[start..idx]);
            start = idx;
            seen = [false; 3];
        }
        seen[k] = true;
    }
    segments.push(&text[start..]);

    segments
        .into_iter()
        .map(|seg| quoted(seg, free_delimiter(seg).unwrap_or('"')))
        .collect::<Vec<_>>()
        .join(" ~ ")
}

/// Tera expression for a bound value.
///
/// Lists become a bracketed, comma-joined sequence of string literals.
pub fn value_literal(value: &BoundValue) -> String {
    match value {
        BoundValue::Flag(b) => b.to_string(),
        BoundValue::Number(n) => number_literal(n),
        BoundValue::Text(s) => string_literal(s),
        BoundValue::List(items) => {
            let items: Vec<String> = items.iter().map(|s| string_literal(s)).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// `{%- set <name> = <literal> -%}` for one variable.
pub fn assignment(name: &str, value: &BoundValue) -> Result<String, CompileError> {
    if !is_identifier(name) {
        return Err(CompileError::InvalidName {
            what: "variable",
            name: name.to_string(),
        });
    }
    Ok(format!(
        "{STATEMENT_OPEN}{name} = {}{STATEMENT_CLOSE}",
        value_literal(value)
    ))
}

/// One assignment statement per variable, each on its own line.
pub fn assignments(variables: &BoundVariables) -> Result<String, CompileError> {
    let mut out = String::new();
    for (name, value) in variables {
        out.push_str(&assignment(name, value)?);
        out.push('\n');
    }
    Ok(out)
}

fn free_delimiter(text: &str) -> Option<char> {
    DELIMITERS.into_iter().find(|d| !text.contains(*d))
}

fn quoted(text: &str, delim: char) -> String {
    format!("{delim}{text}{delim}")
}

fn number_literal(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    // Tera has no exponent syntax; f64 Display never emits one.
    let mut s = format!("{}", n.as_f64().unwrap_or_default());
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Read a statement emitted by [`assignment`] back into `(name, value)`.
pub fn parse_assignment(statement: &str) -> Result<(String, BoundValue), LiteralError> {
    let statement = statement.trim_end_matches('\n');
    let inner = statement
        .strip_prefix(STATEMENT_OPEN)
        .and_then(|s| s.strip_suffix(STATEMENT_CLOSE))
        .ok_or_else(|| LiteralError {
            offset: 0,
            message: "not a set statement".to_string(),
        })?;
    let (name, expr) = inner.split_once(" = ").ok_or_else(|| LiteralError {
        offset: 0,
        message: "missing ' = '".to_string(),
    })?;

    let mut cursor = Cursor { src: expr, pos: 0 };
    let value = cursor.value()?;
    cursor.skip_ws();
    if cursor.pos != expr.len() {
        return Err(cursor.error("trailing input"));
    }
    Ok((name.to_string(), value))
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn value(&mut self) -> Result<BoundValue, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.list().map(BoundValue::List),
            Some(c) if DELIMITERS.contains(&c) => self.string().map(BoundValue::Text),
            Some(_) => self.scalar(),
            None => Err(self.error("expected a value")),
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let mut out = String::new();
        loop {
            let delim = self
                .peek()
                .filter(|c| DELIMITERS.contains(c))
                .ok_or_else(|| self.error("expected a string literal"))?;
            let body_start = self.pos + delim.len_utf8();
            let len = self.src[body_start..]
                .find(delim)
                .ok_or_else(|| self.error("unterminated string literal"))?;
            out.push_str(&self.src[body_start..body_start + len]);
            self.pos = body_start + len + delim.len_utf8();

            let save = self.pos;
            self.skip_ws();
            if self.peek() == Some('~') {
                self.pos += 1;
                self.skip_ws();
            } else {
                self.pos = save;
                return Ok(out);
            }
        }
    }

    fn list(&mut self) -> Result<Vec<String>, LiteralError> {
        self.pos += 1; // '['
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            self.skip_ws();
            items.push(self.string()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn scalar(&mut self) -> Result<BoundValue, LiteralError> {
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(rest.len());
        let token = &rest[..len];
        let value = match token {
            "true" => BoundValue::Flag(true),
            "false" => BoundValue::Flag(false),
            _ => serde_json::from_str::<serde_json::Number>(token)
                .map(BoundValue::Number)
                .map_err(|_| self.error("expected true, false or a number"))?,
        };
        self.pos += len;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
