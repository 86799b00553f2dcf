//! Shared AST types for the causal-mapping compiler.
//!
//! Produced once by the parser and read, never mutated, by both backends.

use std::fmt;

// ──────────────────────────────────────────────
// Program structure
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub rules: Vec<Rule>,
}

/// One `[if (<guard>) :] intention := action, ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// 1-based position in source order; used in diagnostics.
    pub index: usize,
    pub line: u32,
    pub guard: Option<Guard>,
    pub causation: Causation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Causation {
    pub intention: Act,
    pub actions: Vec<Act>,
}

/// A named call with positional argument placeholders. Used both for the
/// intention and for each action.
#[derive(Debug, Clone, PartialEq)]
pub struct Act {
    pub name: String,
    pub args: Vec<Expr>,
    pub line: u32,
}

impl Rule {
    pub fn intention(&self) -> &Act {
        &self.causation.intention
    }

    pub fn actions(&self) -> &[Act] {
        &self.causation.actions
    }
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Placeholder variable
    Var(String),
    /// Quoted literal `'text'`
    Literal(String),
    /// `ALL(type)`: every object of that type in the current world state
    All(String),
    /// `TYPE(var)`: the type of the object bound to `var`
    Type(String),
    /// `STATE(args...)`: world-state accessor
    State(Vec<Expr>),
    /// Integer literal, sign included
    Int(String),
    /// Decimal literal, sign included, always with a leading digit
    Decimal(String),
    /// Bracketed list `[a, b, ...]`
    List(Vec<Expr>),
    /// Verbatim inlined host code
    Code(String),
    /// `CONT<k>` continuation marker
    Cont(u32),
}

impl Expr {
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(v) => f.write_str(v),
            Expr::Literal(s) => write!(f, "'{}'", s),
            Expr::All(t) => write!(f, "ALL({})", t),
            Expr::Type(v) => write!(f, "TYPE({})", v),
            Expr::State(args) => write!(f, "STATE({})", join(args)),
            Expr::Int(n) | Expr::Decimal(n) => f.write_str(n),
            Expr::List(items) => write!(f, "[{}]", join(items)),
            Expr::Code(c) => write!(f, "PYTHON{{# {} #}}", c),
            Expr::Cont(k) => write!(f, "CONT{}", k),
        }
    }
}

impl fmt::Display for Act {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, join(&self.args))
    }
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ──────────────────────────────────────────────
// Guards
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    /// Python spelling of the operator.
    pub fn as_python(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// A single guard term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardUnit {
    Compare { left: Expr, op: CmpOp, right: Expr },
    /// Raw code used as a condition as-is
    Code(String),
}

impl fmt::Display for GuardUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardUnit::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            GuardUnit::Code(c) => write!(f, "PYTHON{{# {} #}}", c),
        }
    }
}

/// Guard tree as written. The grammar is right-recursive, so a chain
/// `a && b || c` arrives as `And(a, Or(b, c))`; `Group` marks explicit
/// parentheses. See [`crate::normalize`] for the precedence-correct view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Unit(GuardUnit),
    Group(Box<Guard>),
    And(Box<Guard>, Box<Guard>),
    Or(Box<Guard>, Box<Guard>),
}
