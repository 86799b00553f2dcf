//! One reduction: a rule's action list under one guard disjunct.
//!
//! `Env` maps every placeholder of the rule to a Python expression over the
//! procedure's formals, `ALL(type)` lists and literals. Intention positions
//! are bound first; guard units then either bind a still-free placeholder to
//! the other side (an equivalence) or, when both sides already resolve,
//! become a runtime check.

use std::collections::BTreeMap;

use causal_core::{CmpOp, CompileError, Expr, GuardUnit, Rule};

use super::{Shape, Signature};
use crate::error::{binding, malformed_cont, unsupported};
use crate::python::{code_refs, sanitize, substitute_refs, unique, PyExpr, PyStmt};
use crate::tail::find_tail;

/// A finished reduction, ready to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// Source rule index.
    pub rule: usize,
    /// Assignments that precede the guard (`ALL(type)` lists).
    pub preamble: Vec<PyStmt>,
    /// Conjunction guarding the return; empty means unconditional.
    pub conditions: Vec<PyExpr>,
    /// List of action tuples.
    pub actions: PyExpr,
}

#[derive(Debug, Clone)]
pub(super) struct Env<'a> {
    rule: &'a Rule,
    bindings: BTreeMap<String, PyExpr>,
    /// (Python name, object type), in first-use order.
    all_lists: Vec<(String, String)>,
    conditions: Vec<PyExpr>,
}

impl<'a> Env<'a> {
    /// Bind the intention's placeholders to the signature's positions.
    /// Arity checks come first so later element accesses are in range.
    pub(super) fn for_rule(rule: &'a Rule, sig: &Signature) -> Result<Self, CompileError> {
        let mut env = Env {
            rule,
            bindings: BTreeMap::new(),
            all_lists: Vec::new(),
            conditions: Vec::new(),
        };

        let args = &rule.intention().args;
        let explicit = args.iter().filter(|a| !matches!(a, Expr::Cont(_))).count();
        if let (Shape::Variadic(s), Some(rest)) = (sig.shape, &sig.rest) {
            let len = PyExpr::call("len", vec![PyExpr::raw(rest)]);
            match Shape::of(rule)? {
                Shape::Fixed(n) => env.conditions.push(PyExpr::compare(
                    len,
                    "==",
                    PyExpr::raw((n - s).to_string()),
                )),
                Shape::Variadic(_) if explicit > s => env.conditions.push(PyExpr::compare(
                    len,
                    ">=",
                    PyExpr::raw((explicit - s).to_string()),
                )),
                Shape::Variadic(_) => {}
            }
        }

        let mut values = Vec::new();
        for (i, arg) in args.iter().enumerate().take(explicit) {
            let here = sig.position(i);
            match arg {
                Expr::Var(v) => match env.bindings.get(v) {
                    Some(prev) => env
                        .conditions
                        .push(PyExpr::compare(prev.clone(), "==", here)),
                    None => {
                        env.bindings.insert(v.clone(), here);
                    }
                },
                other => values.push((here, other)),
            }
        }
        for (here, value) in values {
            match env.value(value)? {
                Some(v) => env.conditions.push(PyExpr::compare(here, "==", v)),
                None => {
                    return Err(binding(
                        rule,
                        env.unresolved(value),
                        "intention argument refers to placeholders it does not bind",
                    ))
                }
            }
        }
        Ok(env)
    }

    // -- Guards -------------------------------------------------

    /// Apply one disjunct. Units that cannot resolve yet are retried after
    /// the others; a pass without progress is a binding error.
    pub(super) fn apply_guard(&mut self, units: &[GuardUnit]) -> Result<(), CompileError> {
        let mut pending: Vec<&GuardUnit> = units.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for unit in pending {
                if !self.apply_unit(unit)? {
                    deferred.push(unit);
                }
            }
            if deferred.len() == before {
                let stuck = deferred[0];
                return Err(binding(
                    self.rule,
                    self.unit_unresolved(stuck),
                    format!(
                        "'{}' has no side bound to a formal parameter, literal or earlier equivalence",
                        stuck
                    ),
                ));
            }
            pending = deferred;
        }
        Ok(())
    }

    /// Returns `false` when the unit has to wait for other bindings.
    fn apply_unit(&mut self, unit: &GuardUnit) -> Result<bool, CompileError> {
        let (left, op, right) = match unit {
            GuardUnit::Code(code) => {
                return Ok(match self.code(code) {
                    Some(c) => {
                        self.conditions.push(c);
                        true
                    }
                    None => false,
                })
            }
            GuardUnit::Compare { left, op, right } => (left, *op, right),
        };

        match (left, right) {
            (Expr::All(_), Expr::All(_)) => self.check_sets(left, op, right),
            (Expr::All(ty), other) | (other, Expr::All(ty)) => match op {
                CmpOp::Eq => self.bind_all(ty, other),
                CmpOp::Ne => self.check_sets(left, op, right),
                _ => Err(unsupported(self.rule, op, "ALL(type) comparison")),
            },
            (Expr::Type(_), _) | (_, Expr::Type(_)) if !matches!(op, CmpOp::Eq | CmpOp::Ne) => {
                Err(unsupported(self.rule, op, "TYPE(var) comparison"))
            }
            (Expr::List(_), _) | (_, Expr::List(_)) if !matches!(op, CmpOp::Eq | CmpOp::Ne) => {
                Err(unsupported(self.rule, op, "list comparison"))
            }
            _ => {
                let l = self.value(left)?;
                let r = self.value(right)?;
                match (l, r, op) {
                    (Some(l), Some(r), _) => {
                        self.conditions.push(PyExpr::compare(l, op.as_python(), r));
                        Ok(true)
                    }
                    (None, Some(r), CmpOp::Eq) if left.as_var().is_some() => {
                        self.bind(left, r);
                        Ok(true)
                    }
                    (Some(l), None, CmpOp::Eq) if right.as_var().is_some() => {
                        self.bind(right, l);
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    fn bind(&mut self, placeholder: &Expr, value: PyExpr) {
        if let Expr::Var(v) = placeholder {
            self.bindings.insert(v.clone(), value);
        }
    }

    fn check_sets(&mut self, left: &Expr, op: CmpOp, right: &Expr) -> Result<bool, CompileError> {
        let (Some(l), Some(r)) = (self.value(left)?, self.value(right)?) else {
            return Ok(false);
        };
        let as_set = |e: PyExpr, src: &Expr| match src {
            Expr::All(_) | Expr::List(_) => PyExpr::call("set", vec![e]),
            _ => PyExpr::call("set", vec![PyExpr::Tuple(vec![e])]),
        };
        self.conditions.push(PyExpr::compare(
            as_set(l, left),
            op.as_python(),
            as_set(r, right),
        ));
        Ok(true)
    }

    /// `ALL(type) = [a, b, CONTk]`: each listed placeholder is the object at
    /// that index of the type's list; bound placeholders become checks.
    fn bind_all(&mut self, ty: &str, other: &Expr) -> Result<bool, CompileError> {
        let items: Vec<Expr> = match other {
            Expr::List(items) => items.clone(),
            single => vec![single.clone()],
        };
        let tail = find_tail(self.rule, &items)?;
        let explicit: Vec<&Expr> = items.iter().filter(|e| !matches!(e, Expr::Cont(_))).collect();

        let mut fixed = Vec::new();
        for (j, item) in explicit.iter().enumerate() {
            if item.as_var().is_none() {
                match self.value(item)? {
                    Some(v) => fixed.push((j, v)),
                    None => return Ok(false),
                }
            }
        }

        let list = self.all_list(ty);
        let len = PyExpr::call("len", vec![list.clone()]);
        let count = PyExpr::raw(explicit.len().to_string());
        self.conditions.push(match tail {
            Some(_) => PyExpr::compare(len, ">=", count),
            None => PyExpr::compare(len, "==", count),
        });
        for (j, item) in explicit.iter().enumerate() {
            if let Expr::Var(v) = item {
                let element = PyExpr::index(list.clone(), j);
                match self.bindings.get(v) {
                    Some(bound) => self
                        .conditions
                        .push(PyExpr::compare(element, "==", bound.clone())),
                    None => {
                        self.bindings.insert(v.clone(), element);
                    }
                }
            }
        }
        for (j, v) in fixed {
            self.conditions
                .push(PyExpr::compare(PyExpr::index(list.clone(), j), "==", v));
        }
        Ok(true)
    }

    /// Name of the list holding every object of `ty`. Types that sanitize
    /// to the same identifier still get separate lists.
    fn all_list(&mut self, ty: &str) -> PyExpr {
        if let Some((name, _)) = self.all_lists.iter().find(|(_, t)| t == ty) {
            return PyExpr::raw(name.as_str());
        }
        let taken: Vec<String> = self.all_lists.iter().map(|(n, _)| n.clone()).collect();
        let name = unique(format!("__all_{}", sanitize(ty)), &taken);
        self.all_lists.push((name.clone(), ty.to_owned()));
        PyExpr::Raw(name)
    }

    // -- Values -------------------------------------------------

    /// Python expression for `expr`, or `None` while a placeholder it
    /// mentions is still free.
    fn value(&mut self, expr: &Expr) -> Result<Option<PyExpr>, CompileError> {
        Ok(match expr {
            Expr::Var(v) => self.bindings.get(v).cloned(),
            Expr::Literal(s) => Some(PyExpr::str(s)),
            Expr::Int(n) | Expr::Decimal(n) => Some(PyExpr::raw(n)),
            Expr::State(args) => {
                let mut call_args = vec![PyExpr::raw("state")];
                for a in args {
                    match self.value(a)? {
                        Some(v) => call_args.push(v),
                        None => return Ok(None),
                    }
                }
                Some(PyExpr::call("lookup_state", call_args))
            }
            Expr::Code(code) => self.code(code),
            Expr::Type(v) => self
                .bindings
                .get(v)
                .map(|obj| PyExpr::raw(format!("state.objs[{}][0]", obj.render()))),
            Expr::All(ty) => Some(self.all_list(ty)),
            Expr::List(items) => return self.sequence(items),
            Expr::Cont(k) => {
                return Err(malformed_cont(
                    self.rule,
                    *k,
                    "only allowed at the end of an argument list",
                ))
            }
        })
    }

    fn code(&self, code: &str) -> Option<PyExpr> {
        substitute_refs(code, |name| self.bindings.get(name).map(|e| e.render()))
            .ok()
            .map(PyExpr::Code)
    }

    /// Tuple of `items`; a trailing `CONTk` continues with the slice after
    /// the anchor's index in its sequence.
    fn sequence(&mut self, items: &[Expr]) -> Result<Option<PyExpr>, CompileError> {
        let tail = find_tail(self.rule, items)?;
        let mut head = Vec::with_capacity(items.len());
        for item in items.iter().filter(|e| !matches!(e, Expr::Cont(_))) {
            match self.value(item)? {
                Some(v) => head.push(v),
                None => return Ok(None),
            }
        }
        let mut parts = vec![PyExpr::Tuple(head)];
        if let Some(tail) = tail {
            match self.bindings.get(&tail.anchor) {
                Some(PyExpr::Index(base, j)) => parts.push(PyExpr::call(
                    "tuple",
                    vec![PyExpr::slice((**base).clone(), j + 1)],
                )),
                Some(other) => {
                    return Err(malformed_cont(
                        self.rule,
                        tail.k,
                        format!(
                            "'{}' is bound to {}, not to an element of a variadic parameter or ALL(type) list",
                            tail.anchor,
                            other.render()
                        ),
                    ))
                }
                None => return Ok(None),
            }
        }
        Ok(Some(if parts.len() == 1 {
            parts.remove(0)
        } else {
            PyExpr::Concat(parts)
        }))
    }

    // -- Unresolved names ---------------------------------------

    fn unresolved(&self, expr: &Expr) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_unresolved(expr, &mut names);
        names
    }

    fn unit_unresolved(&self, unit: &GuardUnit) -> Vec<String> {
        let mut names = Vec::new();
        match unit {
            GuardUnit::Compare { left, right, .. } => {
                self.collect_unresolved(left, &mut names);
                self.collect_unresolved(right, &mut names);
            }
            GuardUnit::Code(code) => self.collect_code_refs(code, &mut names),
        }
        names
    }

    fn collect_unresolved(&self, expr: &Expr, names: &mut Vec<String>) {
        let note = |name: &str, names: &mut Vec<String>| {
            if !self.bindings.contains_key(name) && !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        };
        match expr {
            Expr::Var(v) | Expr::Type(v) => note(v, names),
            Expr::State(items) | Expr::List(items) => {
                for item in items {
                    self.collect_unresolved(item, names);
                }
            }
            Expr::Code(code) => self.collect_code_refs(code, names),
            Expr::Literal(_) | Expr::Int(_) | Expr::Decimal(_) | Expr::All(_) | Expr::Cont(_) => {}
        }
    }

    fn collect_code_refs(&self, code: &str, names: &mut Vec<String>) {
        for name in code_refs(code) {
            if !self.bindings.contains_key(&name) && !names.contains(&name) {
                names.push(name);
            }
        }
    }

    // -- Return value -------------------------------------------

    /// Resolve the action list and package the reduction.
    pub(super) fn finish(mut self) -> Result<Reduction, CompileError> {
        let rule = self.rule;
        let mut actions = Vec::with_capacity(rule.actions().len());
        for act in rule.actions() {
            let tail = find_tail(rule, &act.args)?;
            let mut items = vec![Expr::Literal(act.name.clone())];
            items.extend(act.args.iter().cloned());
            match self.sequence(&items)? {
                Some(tuple) => actions.push(tuple),
                None => {
                    let mut names = Vec::new();
                    for arg in &act.args {
                        self.collect_unresolved(arg, &mut names);
                    }
                    if let Some(tail) = tail {
                        if !names.contains(&tail.anchor) {
                            names.push(tail.anchor);
                        }
                    }
                    return Err(binding(
                        rule,
                        names,
                        format!(
                            "action {} uses placeholders bound by neither the intention nor the guard",
                            act.name
                        ),
                    ));
                }
            }
        }

        let preamble = self
            .all_lists
            .iter()
            .map(|(name, ty)| {
                PyStmt::Assign(
                    name.clone(),
                    PyExpr::raw(format!(
                        "[__id for __id in state.objs if state.objs[__id][0] == {}]",
                        PyExpr::str(ty).render()
                    )),
                )
            })
            .collect();

        Ok(Reduction {
            rule: rule.index,
            preamble,
            conditions: self.conditions,
            actions: PyExpr::List(actions),
        })
    }
}
