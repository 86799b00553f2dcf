//! Guard normalization shared by both backends.
//!
//! The parser keeps guards exactly as written: a right-recursive spine of
//! `And`/`Or` nodes with `Group` marking explicit parentheses. Backends need
//! either a precedence-correct condition tree (the recognizer emits one
//! compound `if`) or disjunctive normal form (the decomposer emits one
//! reduction per disjunct).

use crate::ast::{Guard, GuardUnit};

/// Precedence-correct view of a guard: `&&` binds tighter than `||`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Unit(GuardUnit),
    /// Conjunction, in source order
    All(Vec<Condition>),
    /// Disjunction, in source order
    Any(Vec<Condition>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Conn {
    And,
    Or,
}

impl Guard {
    /// Regroup the right spine with conventional precedence. A `Group` is
    /// an atomic operand and is flattened on its own.
    pub fn flatten(&self) -> Condition {
        let mut operands: Vec<&Guard> = Vec::new();
        let mut conns: Vec<Conn> = Vec::new();
        let mut node = self;
        loop {
            match node {
                Guard::And(l, r) => {
                    operands.push(l);
                    conns.push(Conn::And);
                    node = r;
                }
                Guard::Or(l, r) => {
                    operands.push(l);
                    conns.push(Conn::Or);
                    node = r;
                }
                leaf => {
                    operands.push(leaf);
                    break;
                }
            }
        }

        let mut disjuncts: Vec<Condition> = Vec::new();
        let mut conjuncts: Vec<Condition> = Vec::new();
        for (i, operand) in operands.into_iter().enumerate() {
            conjuncts.push(operand.atom());
            if conns.get(i) != Some(&Conn::And) {
                disjuncts.push(collapse(std::mem::take(&mut conjuncts), Condition::All));
            }
        }
        collapse(disjuncts, Condition::Any)
    }

    fn atom(&self) -> Condition {
        match self {
            Guard::Unit(u) => Condition::Unit(u.clone()),
            Guard::Group(inner) => inner.flatten(),
            spine => spine.flatten(),
        }
    }

    /// Disjunctive normal form: outer list is ORed, each inner list ANDed.
    /// Conjunctions of disjunctions distribute left to right, so both the
    /// disjuncts and the units inside each keep source order.
    pub fn disjuncts(&self) -> Vec<Vec<GuardUnit>> {
        self.flatten().disjuncts()
    }
}

impl Condition {
    pub fn disjuncts(&self) -> Vec<Vec<GuardUnit>> {
        match self {
            Condition::Unit(u) => vec![vec![u.clone()]],
            Condition::Any(items) => items.iter().flat_map(|c| c.disjuncts()).collect(),
            Condition::All(items) => {
                let mut acc: Vec<Vec<GuardUnit>> = vec![Vec::new()];
                for item in items {
                    let branches = item.disjuncts();
                    let mut next = Vec::with_capacity(acc.len() * branches.len());
                    for prefix in &acc {
                        for branch in &branches {
                            let mut clause = prefix.clone();
                            clause.extend(branch.iter().cloned());
                            next.push(clause);
                        }
                    }
                    acc = next;
                }
                acc
            }
        }
    }
}

fn collapse(mut items: Vec<Condition>, wrap: fn(Vec<Condition>) -> Condition) -> Condition {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn guard_of(cond: &str) -> Guard {
        let src = format!("RULES {{ if ({}) : a(x) := b(x) }}", cond);
        parse(&lex(&src).unwrap()).unwrap().rules[0]
            .guard
            .clone()
            .unwrap()
    }

    fn names(clauses: Vec<Vec<GuardUnit>>) -> Vec<Vec<String>> {
        clauses
            .into_iter()
            .map(|c| c.into_iter().map(|u| u.to_string()).collect())
            .collect()
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let g = guard_of("a = 1 && b = 2 || c = 3");
        assert_eq!(
            names(g.disjuncts()),
            vec![vec!["a = 1", "b = 2"], vec!["c = 3"]]
        );
        let g = guard_of("a = 1 || b = 2 && c = 3");
        assert_eq!(
            names(g.disjuncts()),
            vec![vec!["a = 1"], vec!["b = 2", "c = 3"]]
        );
    }

    #[test]
    fn simple_disjunction_splits_in_two() {
        let g = guard_of("(p = 1 || p = 2)");
        assert_eq!(names(g.disjuncts()), vec![vec!["p = 1"], vec!["p = 2"]]);
    }

    #[test]
    fn group_distributes_over_conjunction() {
        let g = guard_of("(a = 1 || a = 2) && (b = 3 || b = 4)");
        assert_eq!(
            names(g.disjuncts()),
            vec![
                vec!["a = 1", "b = 3"],
                vec!["a = 1", "b = 4"],
                vec!["a = 2", "b = 3"],
                vec!["a = 2", "b = 4"],
            ]
        );
    }

    #[test]
    fn flatten_keeps_group_atomic() {
        let g = guard_of("a = 1 && (b = 2 || c = 3)");
        match g.flatten() {
            Condition::All(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Condition::Unit(_)));
                assert!(matches!(&items[1], Condition::Any(v) if v.len() == 2));
            }
            other => panic!("unexpected condition {:?}", other),
        }
    }

    #[test]
    fn single_unit_flattens_to_unit() {
        let g = guard_of("a = 1");
        assert!(matches!(g.flatten(), Condition::Unit(_)));
        assert_eq!(g.disjuncts().len(), 1);
    }

    #[test]
    fn disjuncts_keep_source_order() {
        let g = guard_of("x = 1 || (y = 2 && z = 3)");
        let listed: Vec<Vec<String>> = g
            .disjuncts()
            .iter()
            .map(|d| d.iter().map(|u| u.to_string()).collect())
            .collect();
        assert_eq!(listed, vec![vec!["x = 1"], vec!["y = 2", "z = 3"]]);
    }
}
