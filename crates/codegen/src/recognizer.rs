//! Recognition backend: one guarded fragment of `causes(v)` per rule.
//!
//! Each fragment matches the observed action names against the rule's
//! action list, binds `__aI` to the I-th action's argument tuple, checks the
//! guard, and adds the reconstructed intention to the candidate set `g`.

use std::collections::BTreeMap;

use causal_core::{CmpOp, CompileError, Condition, Expr, GuardUnit, Program, Rule};

use crate::error::{binding, malformed_cont, unsupported};
use crate::python::{render_block, sanitize, substitute_refs, unique, PyExpr, PyStmt};
use crate::tail::find_tail;

/// Compiled recognizer: the body of `causes(v)` plus the window bound `M`.
#[derive(Debug, Clone)]
pub struct RecognizerOutput {
    pub fragments: Vec<PyStmt>,
    /// Length of the longest action list of any rule.
    pub m: usize,
}

impl RecognizerOutput {
    /// Fragments serialized at the indentation of the `causes` body.
    pub fn render(&self) -> String {
        render_block(&self.fragments, 1)
    }
}

pub fn compile_recognizer(program: &Program) -> Result<RecognizerOutput, CompileError> {
    let mut fragments = Vec::with_capacity(program.rules.len());
    let mut m = 0;
    for rule in &program.rules {
        m = m.max(rule.actions().len());
        fragments.push(compile_rule(rule)?);
        tracing::debug!(rule = rule.index, intention = %rule.intention().name, "recognizer fragment");
    }
    tracing::info!(rules = fragments.len(), m, "recognizer compiled");
    Ok(RecognizerOutput { fragments, m })
}

fn compile_rule(rule: &Rule) -> Result<PyStmt, CompileError> {
    let mut scope = RuleScope::new(rule);
    let mut conditions = scope.bind_actions()?;

    let intention_args = scope.sequence(&rule.intention().args)?;
    if let Some(guard) = &rule.guard {
        conditions.push(scope.condition(&guard.flatten())?);
    }

    let add = PyStmt::Expr(PyExpr::call(
        "g.add",
        vec![PyExpr::Tuple(vec![
            PyExpr::raw("states[0]"),
            PyExpr::str(&rule.intention().name),
            intention_args,
        ])],
    ));

    let mut body: Vec<PyStmt> = (0..rule.actions().len())
        .map(|i| PyStmt::Assign(format!("__a{}", i), PyExpr::raw(format!("arguments[{}]", i))))
        .collect();
    for (name, ty) in &scope.all_lists {
        body.push(PyStmt::Assign(
            name.clone(),
            PyExpr::raw(format!(
                "[obj[0] for obj in states[0] if obj[1] == {}]",
                PyExpr::str(ty).render()
            )),
        ));
    }
    if conditions.is_empty() {
        body.push(add);
    } else {
        body.push(PyStmt::If(PyExpr::all(conditions), vec![add]));
    }

    let names = rule
        .actions()
        .iter()
        .map(|a| PyExpr::str(&a.name))
        .collect();
    Ok(PyStmt::If(
        PyExpr::compare(PyExpr::raw("actions"), "==", PyExpr::Tuple(names)),
        body,
    ))
}

fn slot(action: usize, arg: usize) -> PyExpr {
    PyExpr::index(PyExpr::raw(format!("__a{}", action)), arg)
}

struct RuleScope<'r> {
    rule: &'r Rule,
    /// Placeholder -> (action index, argument index); the last occurrence wins.
    slots: BTreeMap<String, (usize, usize)>,
    /// `ALL(type)` lists the fragment needs, in first-use order.
    all_lists: Vec<(String, String)>,
}

impl<'r> RuleScope<'r> {
    fn new(rule: &'r Rule) -> Self {
        RuleScope {
            rule,
            slots: BTreeMap::new(),
            all_lists: Vec::new(),
        }
    }

    /// Index every action placeholder. A placeholder seen twice and any
    /// literal action argument become equality checks on the observed slots.
    fn bind_actions(&mut self) -> Result<Vec<PyExpr>, CompileError> {
        let mut checks = Vec::new();
        let mut fixed = Vec::new();
        for (i, act) in self.rule.actions().iter().enumerate() {
            find_tail(self.rule, &act.args)?;
            for (j, arg) in act.args.iter().enumerate() {
                match arg {
                    Expr::Var(v) => {
                        if let Some((pi, pj)) = self.slots.insert(v.clone(), (i, j)) {
                            checks.push(PyExpr::compare(slot(pi, pj), "==", slot(i, j)));
                        }
                    }
                    Expr::Cont(_) => {}
                    other => fixed.push((i, j, other)),
                }
            }
        }
        for (i, j, value) in fixed {
            let value = self.value(value)?;
            checks.push(PyExpr::compare(slot(i, j), "==", value));
        }
        Ok(checks)
    }

    fn var(&self, name: &str) -> Result<PyExpr, CompileError> {
        self.slots
            .get(name)
            .map(|&(i, j)| slot(i, j))
            .ok_or_else(|| {
                binding(
                    self.rule,
                    vec![name.to_owned()],
                    "does not appear in any action argument",
                )
            })
    }

    /// Name of the list holding every object of `ty`. Types that sanitize
    /// to the same identifier still get separate lists.
    fn all_list(&mut self, ty: &str) -> PyExpr {
        if let Some((name, _)) = self.all_lists.iter().find(|(_, t)| t == ty) {
            return PyExpr::raw(name.as_str());
        }
        let taken: Vec<String> = self.all_lists.iter().map(|(n, _)| n.clone()).collect();
        let name = unique(format!("all_{}", sanitize(ty)), &taken);
        self.all_lists.push((name.clone(), ty.to_owned()));
        PyExpr::Raw(name)
    }

    fn value(&mut self, expr: &Expr) -> Result<PyExpr, CompileError> {
        match expr {
            Expr::Var(v) => self.var(v),
            Expr::Literal(s) => Ok(PyExpr::str(s)),
            Expr::Int(n) | Expr::Decimal(n) => Ok(PyExpr::raw(n)),
            Expr::State(args) => {
                let mut call_args = vec![PyExpr::raw("states[0]")];
                for a in args {
                    call_args.push(self.value(a)?);
                }
                Ok(PyExpr::call("lookup_state", call_args))
            }
            Expr::Code(code) => self.code(code),
            Expr::List(items) => self.sequence(items),
            Expr::Type(v) => Ok(PyExpr::call(
                "lookup_type",
                vec![self.var(v)?, PyExpr::raw("states[0]")],
            )),
            Expr::All(ty) => Ok(self.all_list(ty)),
            Expr::Cont(k) => Err(malformed_cont(
                self.rule,
                *k,
                "only allowed at the end of an argument list",
            )),
        }
    }

    fn code(&self, code: &str) -> Result<PyExpr, CompileError> {
        substitute_refs(code, |name| {
            self.slots.get(name).map(|&(i, j)| slot(i, j).render())
        })
        .map(PyExpr::Code)
        .map_err(|missing| {
            binding(
                self.rule,
                missing,
                "inlined code refers to placeholders no action binds",
            )
        })
    }

    /// Tuple of `items`; a trailing `CONTk` continues with the observed
    /// arguments that follow its anchor's slot.
    fn sequence(&mut self, items: &[Expr]) -> Result<PyExpr, CompileError> {
        let tail = find_tail(self.rule, items)?;
        let mut head = Vec::with_capacity(items.len());
        for item in items.iter().filter(|e| !matches!(e, Expr::Cont(_))) {
            head.push(self.value(item)?);
        }
        let mut parts = vec![PyExpr::Tuple(head)];
        if let Some(tail) = tail {
            let (i, j) = match self.slots.get(&tail.anchor) {
                Some(&s) => s,
                None => {
                    return Err(binding(
                        self.rule,
                        vec![tail.anchor.clone()],
                        format!("CONT{} continues from a placeholder no action binds", tail.k),
                    ))
                }
            };
            parts.push(PyExpr::slice(PyExpr::raw(format!("__a{}", i)), j + 1));
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            PyExpr::Concat(parts)
        })
    }

    fn condition(&mut self, cond: &Condition) -> Result<PyExpr, CompileError> {
        match cond {
            Condition::Unit(unit) => self.unit(unit),
            Condition::All(items) => Ok(PyExpr::all(self.conditions(items)?)),
            Condition::Any(items) => Ok(PyExpr::any(self.conditions(items)?)),
        }
    }

    fn conditions(&mut self, items: &[Condition]) -> Result<Vec<PyExpr>, CompileError> {
        items.iter().map(|c| self.condition(c)).collect()
    }

    fn unit(&mut self, unit: &GuardUnit) -> Result<PyExpr, CompileError> {
        let (left, op, right) = match unit {
            GuardUnit::Code(code) => return self.code(code),
            GuardUnit::Compare { left, op, right } => (left, *op, right),
        };
        let equality = matches!(op, CmpOp::Eq | CmpOp::Ne);
        match (left, right) {
            (Expr::All(_), _) | (_, Expr::All(_)) => {
                if !equality {
                    return Err(unsupported(self.rule, op, "ALL(type) comparison"));
                }
                let l = self.as_set(left)?;
                let r = self.as_set(right)?;
                Ok(PyExpr::compare(l, op.as_python(), r))
            }
            (Expr::Type(_), _) | (_, Expr::Type(_)) if !equality => {
                Err(unsupported(self.rule, op, "TYPE(var) comparison"))
            }
            (Expr::List(_), _) | (_, Expr::List(_)) if !equality => {
                Err(unsupported(self.rule, op, "list comparison"))
            }
            _ => {
                let l = self.value(left)?;
                let r = self.value(right)?;
                Ok(PyExpr::compare(l, op.as_python(), r))
            }
        }
    }

    fn as_set(&mut self, expr: &Expr) -> Result<PyExpr, CompileError> {
        let inner = match expr {
            Expr::All(_) | Expr::List(_) => self.value(expr)?,
            other => PyExpr::Tuple(vec![self.value(other)?]),
        };
        Ok(PyExpr::call("set", vec![inner]))
    }
}
