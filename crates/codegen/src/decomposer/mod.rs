//! Decomposition backend: one procedure per intention name.
//!
//! Runs in two passes over the rules. The first fixes every intention's
//! formal parameter shape and names; the second turns each (rule, guard
//! disjunct) pair into a guarded reduction whose placeholders are already
//! resolved against that final shape.

mod reduction;

use std::collections::BTreeMap;
use std::fmt;

use causal_core::{CompileError, Program, Rule};

use crate::python::{render_block, sanitize, unique, PyExpr, PyStmt};
use crate::tail::find_tail;
use reduction::Env;

pub use reduction::Reduction;

// ──────────────────────────────────────────────
// Parameter shapes
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Exactly `n` positional parameters.
    Fixed(usize),
    /// `n` positional parameters followed by one variadic capture.
    Variadic(usize),
}

impl Shape {
    /// Shape an intention's argument list asks for.
    pub fn of(rule: &Rule) -> Result<Shape, CompileError> {
        let args = &rule.intention().args;
        Ok(match find_tail(rule, args)? {
            Some(tail) => Shape::Variadic(tail.start()),
            None => Shape::Fixed(args.len()),
        })
    }

    /// Combine two shapes for the same intention, if they are compatible.
    pub fn reconcile(self, other: Shape) -> Option<Shape> {
        match (self, other) {
            (Shape::Fixed(a), Shape::Fixed(b)) => (a == b).then_some(Shape::Fixed(a)),
            (Shape::Fixed(f), Shape::Variadic(s)) | (Shape::Variadic(s), Shape::Fixed(f)) => {
                (s <= f).then_some(Shape::Variadic(s))
            }
            (Shape::Variadic(a), Shape::Variadic(b)) => Some(Shape::Variadic(a.min(b))),
        }
    }

    pub fn fixed(self) -> usize {
        match self {
            Shape::Fixed(n) | Shape::Variadic(n) => n,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Fixed(n) => write!(f, "{} fixed parameters", n),
            Shape::Variadic(n) => write!(f, "{} fixed parameters and a variadic tail", n),
        }
    }
}

// ──────────────────────────────────────────────
// Method table
// ──────────────────────────────────────────────

/// Resolved procedure signature of one intention.
#[derive(Debug, Clone)]
pub struct Signature {
    pub shape: Shape,
    /// Python names of the positional formals.
    pub formals: Vec<String>,
    /// Python name of the variadic formal, when the shape has one.
    pub rest: Option<String>,
}

impl Signature {
    /// Expression for intention argument `i` under this signature.
    pub fn position(&self, i: usize) -> PyExpr {
        match (&self.rest, i.checked_sub(self.formals.len())) {
            (Some(rest), Some(offset)) => PyExpr::index(PyExpr::raw(rest), offset),
            _ => PyExpr::raw(&self.formals[i]),
        }
    }

    fn params(&self) -> Vec<String> {
        let mut params = vec!["state".to_owned()];
        params.extend(self.formals.iter().cloned());
        if let Some(rest) = &self.rest {
            params.push(format!("*{}", rest));
        }
        params
    }

    /// Every argument value the intention was called with.
    fn argument_values(&self) -> PyExpr {
        let mut values: Vec<PyExpr> = self.formals.iter().map(PyExpr::raw).collect();
        if let Some(rest) = &self.rest {
            values.push(PyExpr::raw(rest));
        }
        PyExpr::call("flatten", vec![PyExpr::List(values)])
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    /// Intention name as written in the source.
    pub name: String,
    /// Python procedure name.
    pub ident: String,
    pub signature: Signature,
    pub reductions: Vec<Reduction>,
}

/// Methods in order of each intention's first appearance.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    pub methods: Vec<Method>,
}

impl MethodTable {
    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// All procedures and their planner registrations, serialized.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&render_block(&method.emit(), 0));
        }
        out
    }
}

pub fn compile_decomposer(program: &Program) -> Result<MethodTable, CompileError> {
    let mut table = MethodTable {
        methods: signatures(program)?,
    };
    let index: BTreeMap<String, usize> = table
        .methods
        .iter()
        .enumerate()
        .map(|(i, m)| (m.name.clone(), i))
        .collect();

    for rule in &program.rules {
        let slot = index[&rule.intention().name];
        let method = &mut table.methods[slot];
        let env = Env::for_rule(rule, &method.signature)?;
        let disjuncts = match &rule.guard {
            Some(guard) => guard.disjuncts(),
            None => vec![Vec::new()],
        };
        for units in &disjuncts {
            let mut alt = env.clone();
            alt.apply_guard(units)?;
            method.reductions.push(alt.finish()?);
        }
        tracing::debug!(
            rule = rule.index,
            intention = %method.name,
            reductions = disjuncts.len(),
            "decomposer reductions"
        );
    }

    for method in &table.methods {
        tracing::debug!(
            intention = %method.name,
            ident = %method.ident,
            shape = %method.signature.shape,
            reductions = method.reductions.len(),
            "method synthesized"
        );
    }
    tracing::info!(methods = table.methods.len(), "decomposer compiled");
    Ok(table)
}

/// First pass: reconcile shapes and pick formal names.
fn signatures(program: &Program) -> Result<Vec<Method>, CompileError> {
    let mut order: Vec<&str> = Vec::new();
    let mut shapes: BTreeMap<&str, Shape> = BTreeMap::new();
    for rule in &program.rules {
        let name = rule.intention().name.as_str();
        let shape = Shape::of(rule)?;
        match shapes.get(name) {
            None => {
                order.push(name);
                shapes.insert(name, shape);
            }
            Some(&prev) => {
                let merged = prev
                    .reconcile(shape)
                    .ok_or_else(|| CompileError::ShapeConflict {
                        rule: rule.index,
                        intention: name.to_owned(),
                        expected: prev.to_string(),
                        found: shape.to_string(),
                    })?;
                shapes.insert(name, merged);
            }
        }
    }

    let mut idents: Vec<String> = Vec::new();
    let mut methods = Vec::with_capacity(order.len());
    for name in order {
        let shape = shapes[name];
        let rules: Vec<&Rule> = program
            .rules
            .iter()
            .filter(|r| r.intention().name == name)
            .collect();
        let placeholder_at = |i: usize| {
            rules
                .iter()
                .find_map(|r| r.intention().args.get(i).and_then(|a| a.as_var()))
        };

        let mut formals: Vec<String> = vec!["state".to_owned()];
        for i in 0..shape.fixed() {
            let base = placeholder_at(i)
                .map(sanitize)
                .unwrap_or_else(|| format!("__arg{}", i));
            formals.push(unique(base, &formals));
        }
        let rest = match shape {
            Shape::Fixed(_) => None,
            Shape::Variadic(s) => {
                let base = placeholder_at(s)
                    .map(sanitize)
                    .unwrap_or_else(|| "__rest".to_owned());
                Some(unique(base, &formals))
            }
        };
        formals.remove(0);

        let ident = unique(sanitize(name), &idents);
        idents.push(ident.clone());
        methods.push(Method {
            name: name.to_owned(),
            ident,
            signature: Signature {
                shape,
                formals,
                rest,
            },
            reductions: Vec::new(),
        });
    }
    Ok(methods)
}

// ──────────────────────────────────────────────
// Emission
// ──────────────────────────────────────────────

impl Method {
    fn emit(&self) -> Vec<PyStmt> {
        let sig = &self.signature;
        let mut body = Vec::new();
        if let Some(rest) = &sig.rest {
            body.push(PyStmt::Assign(
                rest.clone(),
                PyExpr::call("flatten", vec![PyExpr::raw(rest)]),
            ));
        }
        let check_feasibility = self.reductions.len() > 1;
        for reduction in &self.reductions {
            body.extend(reduction.preamble.iter().cloned());
            let mut inner = vec![PyStmt::Assign("__ret_val".into(), reduction.actions.clone())];
            if check_feasibility {
                inner.push(PyStmt::Assign(
                    "__all_args".into(),
                    PyExpr::raw("flatten([__action[1:] for __action in __ret_val])"),
                ));
                inner.push(PyStmt::Assign(
                    "__all_intention_args".into(),
                    sig.argument_values(),
                ));
                inner.push(PyStmt::If(
                    PyExpr::raw("set(__all_intention_args).issubset(set(__all_args))"),
                    vec![PyStmt::Return(PyExpr::raw("__ret_val"))],
                ));
            } else {
                inner.push(PyStmt::Return(PyExpr::raw("__ret_val")));
            }
            if reduction.conditions.is_empty() {
                body.extend(inner);
            } else {
                body.push(PyStmt::If(PyExpr::all(reduction.conditions.clone()), inner));
            }
        }
        body.push(PyStmt::Return(PyExpr::raw("False")));

        vec![
            PyStmt::Def {
                name: self.ident.clone(),
                params: sig.params(),
                body,
            },
            PyStmt::Expr(PyExpr::call(
                "pyhop.declare_methods",
                vec![PyExpr::str(&self.name), PyExpr::raw(&self.ident)],
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> Result<MethodTable, CompileError> {
        compile_decomposer(&causal_core::parse_source(src)?)
    }

    #[test]
    fn shapes_reconcile() {
        use Shape::*;
        assert_eq!(Fixed(3).reconcile(Fixed(3)), Some(Fixed(3)));
        assert_eq!(Fixed(3).reconcile(Fixed(4)), None);
        assert_eq!(Fixed(6).reconcile(Variadic(5)), Some(Variadic(5)));
        assert_eq!(Variadic(5).reconcile(Fixed(6)), Some(Variadic(5)));
        assert_eq!(Variadic(5).reconcile(Fixed(4)), None);
        assert_eq!(Variadic(2).reconcile(Variadic(4)), Some(Variadic(2)));
    }

    #[test]
    fn single_reduction_returns_directly() {
        let t = table("RULES { move-to(o, d) := grasp(o), release(o, d) }").unwrap();
        assert_eq!(
            t.render(),
            "def move_to(state, o, d):\n\
             \x20   __ret_val = [('grasp', o), ('release', o, d)]\n\
             \x20   return __ret_val\n\
             \x20   return False\n\
             pyhop.declare_methods('move-to', move_to)\n"
        );
    }

    #[test]
    fn fixed_and_variadic_rules_share_one_signature() {
        let t = table(
            "RULES { a(x, y) := b(x, y); a(x, y, CONT1) := b(x), a(x, y, CONT1) }",
        )
        .unwrap();
        let m = t.get("a").unwrap();
        assert_eq!(m.signature.shape, Shape::Variadic(1));
        assert_eq!(m.signature.formals, vec!["x".to_owned()]);
        assert_eq!(m.signature.rest.as_deref(), Some("y"));
        assert_eq!(m.reductions.len(), 2);
    }

    #[test]
    fn incompatible_shapes_conflict() {
        let err = table("RULES { a(x) := b(x); a(x, y) := b(x), c(y) }").unwrap_err();
        match err {
            CompileError::ShapeConflict { rule, intention, .. } => {
                assert_eq!(rule, 2);
                assert_eq!(intention, "a");
            }
            other => panic!("expected shape conflict, got {:?}", other),
        }
    }

    #[test]
    fn procedure_names_are_sanitized_and_distinct() {
        let t = table("RULES { go-to(x) := b(x); go_to(x) := c(x) }").unwrap();
        let idents: Vec<_> = t.methods.iter().map(|m| m.ident.as_str()).collect();
        assert_eq!(idents, vec!["go_to", "go_to_"]);
    }
}
