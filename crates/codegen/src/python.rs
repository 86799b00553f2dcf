//! Typed Python intermediate representation and its serializer.
//!
//! Backends build `PyExpr`/`PyStmt` trees and serialize each procedure
//! once, after every binding has been resolved.

use std::fmt::Write as _;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq)]
pub enum PyExpr {
    /// Emitted as-is: identifiers, numbers
    Raw(String),
    /// Inlined host code after `$name$` substitution; always parenthesized
    Code(String),
    /// Single-quoted string literal
    Str(String),
    /// `base[i]`
    Index(Box<PyExpr>, usize),
    /// `base[i:]`
    Slice(Box<PyExpr>, usize),
    Tuple(Vec<PyExpr>),
    List(Vec<PyExpr>),
    /// `a + b + ...`; adjacent tuples are merged when rendered
    Concat(Vec<PyExpr>),
    Call(String, Vec<PyExpr>),
    Compare(Box<PyExpr>, &'static str, Box<PyExpr>),
    And(Vec<PyExpr>),
    Or(Vec<PyExpr>),
}

impl PyExpr {
    pub fn raw(s: impl Into<String>) -> Self {
        PyExpr::Raw(s.into())
    }

    pub fn str(s: impl Into<String>) -> Self {
        PyExpr::Str(s.into())
    }

    pub fn index(base: PyExpr, i: usize) -> Self {
        PyExpr::Index(Box::new(base), i)
    }

    pub fn slice(base: PyExpr, i: usize) -> Self {
        PyExpr::Slice(Box::new(base), i)
    }

    pub fn call(name: &str, args: Vec<PyExpr>) -> Self {
        PyExpr::Call(name.to_owned(), args)
    }

    pub fn compare(left: PyExpr, op: &'static str, right: PyExpr) -> Self {
        PyExpr::Compare(Box::new(left), op, Box::new(right))
    }

    /// Conjunction of `items`; a single item is returned unwrapped.
    pub fn all(mut items: Vec<PyExpr>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            PyExpr::And(items)
        }
    }

    pub fn any(mut items: Vec<PyExpr>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            PyExpr::Or(items)
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        match self {
            PyExpr::Raw(s) => out.push_str(s),
            PyExpr::Code(s) => {
                out.push('(');
                out.push_str(s);
                out.push(')');
            }
            PyExpr::Str(s) => {
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
            }
            PyExpr::Index(base, i) => {
                base.write(out);
                let _ = write!(out, "[{}]", i);
            }
            PyExpr::Slice(base, i) => {
                base.write(out);
                let _ = write!(out, "[{}:]", i);
            }
            PyExpr::Tuple(items) => {
                out.push('(');
                write_items(out, items);
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            PyExpr::List(items) => {
                out.push('[');
                write_items(out, items);
                out.push(']');
            }
            PyExpr::Concat(parts) => {
                let parts = merge_tuples(parts);
                if parts.is_empty() {
                    out.push_str("()");
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" + ");
                    }
                    part.write(out);
                }
            }
            PyExpr::Call(name, args) => {
                out.push_str(name);
                out.push('(');
                write_items(out, args);
                out.push(')');
            }
            PyExpr::Compare(l, op, r) => {
                l.write(out);
                let _ = write!(out, " {} ", op);
                r.write(out);
            }
            PyExpr::And(items) => write_joined(out, items, " and ", |e| {
                matches!(e, PyExpr::Or(_))
            }),
            PyExpr::Or(items) => write_joined(out, items, " or ", |e| {
                matches!(e, PyExpr::And(_) | PyExpr::Or(_))
            }),
        }
    }
}

fn write_items(out: &mut String, items: &[PyExpr]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write(out);
    }
}

fn write_joined(out: &mut String, items: &[PyExpr], sep: &str, needs_parens: fn(&PyExpr) -> bool) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        if needs_parens(item) {
            out.push('(');
            item.write(out);
            out.push(')');
        } else {
            item.write(out);
        }
    }
}

fn merge_tuples(parts: &[PyExpr]) -> Vec<PyExpr> {
    let mut merged: Vec<PyExpr> = Vec::new();
    for part in parts {
        if let PyExpr::Tuple(items) = part {
            if items.is_empty() {
                continue;
            }
            if let Some(PyExpr::Tuple(acc)) = merged.last_mut() {
                acc.extend(items.iter().cloned());
                continue;
            }
        }
        merged.push(part.clone());
    }
    merged
}

#[derive(Debug, Clone, PartialEq)]
pub enum PyStmt {
    Assign(String, PyExpr),
    If(PyExpr, Vec<PyStmt>),
    Return(PyExpr),
    Expr(PyExpr),
    Def {
        name: String,
        params: Vec<String>,
        body: Vec<PyStmt>,
    },
}

/// Serialize statements at the given indentation depth.
pub fn render_block(stmts: &[PyStmt], depth: usize) -> String {
    let mut out = String::new();
    for stmt in stmts {
        write_stmt(&mut out, stmt, depth);
    }
    out
}

fn write_stmt(out: &mut String, stmt: &PyStmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    match stmt {
        PyStmt::Assign(name, value) => {
            let _ = writeln!(out, "{}{} = {}", pad, name, value.render());
        }
        PyStmt::If(cond, body) => {
            let _ = writeln!(out, "{}if {}:", pad, cond.render());
            write_body(out, body, depth + 1);
        }
        PyStmt::Return(value) => {
            let _ = writeln!(out, "{}return {}", pad, value.render());
        }
        PyStmt::Expr(value) => {
            let _ = writeln!(out, "{}{}", pad, value.render());
        }
        PyStmt::Def { name, params, body } => {
            let _ = writeln!(out, "{}def {}({}):", pad, name, params.join(", "));
            write_body(out, body, depth + 1);
        }
    }
}

fn write_body(out: &mut String, body: &[PyStmt], depth: usize) {
    if body.is_empty() {
        let _ = writeln!(out, "{}pass", INDENT.repeat(depth));
    }
    for stmt in body {
        write_stmt(out, stmt, depth);
    }
}

// ──────────────────────────────────────────────
// Identifiers
// ──────────────────────────────────────────────

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Names the generated modules define or receive themselves.
const RESERVED: &[&str] = &[
    "state",
    "flatten",
    "lookup_state",
    "lookup_type",
    "pyhop",
    "causes",
    "g",
    "states",
    "actions",
    "arguments",
    "set",
    "len",
    "tuple",
    "zip",
    "isinstance",
];

/// Deterministic Python identifier for a source name: `-` and spaces become
/// `_`; keywords, reserved names and the builtins generated code calls get a
/// trailing `_`.
pub fn sanitize(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect();
    if PYTHON_KEYWORDS.contains(&ident.as_str()) || RESERVED.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Make `ident` distinct from everything in `taken` by appending `_`.
pub fn unique(mut ident: String, taken: &[String]) -> String {
    while taken.contains(&ident) {
        ident.push('_');
    }
    ident
}

// ──────────────────────────────────────────────
// Inlined code
// ──────────────────────────────────────────────

/// Replace every `$name$` in `code` with `resolve(name)`. On failure
/// returns every name that did not resolve, in order of appearance.
pub fn substitute_refs<F>(code: &str, mut resolve: F) -> Result<String, Vec<String>>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(code.len());
    let mut missing = Vec::new();
    let mut rest = code;
    while let Some(start) = rest.find('$') {
        let after = &rest[start + 1..];
        let Some(len) = after.find('$') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &after[..len];
        match resolve(name) {
            Some(expr) => out.push_str(&expr),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_owned());
                }
            }
        }
        rest = &after[len + 1..];
    }
    out.push_str(rest);
    if missing.is_empty() {
        Ok(out)
    } else {
        Err(missing)
    }
}

/// Names referenced as `$name$` inside inlined code.
pub fn code_refs(code: &str) -> Vec<String> {
    let mut names = Vec::new();
    let _ = substitute_refs(code, |name| {
        names.push(name.to_owned());
        Some(String::new())
    });
    names
}
