//! `CONT<k>` continuation markers.
//!
//! `CONTk` at position `p` of an argument list says the `k` placeholders
//! before it open a variadic tail that runs to the end of the list. The
//! marker must be last, `1 <= k <= p`, and the slot just before it must
//! be a placeholder: that placeholder is the anchor the tail continues
//! from.

use causal_core::{CompileError, Expr, Rule};

use crate::error::malformed_cont;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tail {
    /// Index of the marker itself; also the number of explicit elements.
    pub pos: usize,
    pub k: u32,
    /// Placeholder immediately before the marker.
    pub anchor: String,
}

impl Tail {
    /// Index of the first argument that belongs to the tail.
    pub fn start(&self) -> usize {
        self.pos - self.k as usize
    }
}

/// Validate the continuation marker of `args`, if it has one.
pub fn find_tail(rule: &Rule, args: &[Expr]) -> Result<Option<Tail>, CompileError> {
    let Some((pos, k)) = args.iter().enumerate().find_map(|(i, a)| match a {
        Expr::Cont(k) => Some((i, *k)),
        _ => None,
    }) else {
        return Ok(None);
    };

    if pos + 1 != args.len() {
        return Err(malformed_cont(rule, k, "must be the last argument"));
    }
    if k == 0 {
        return Err(malformed_cont(rule, k, "offset must be at least 1"));
    }
    if k as usize > pos {
        return Err(malformed_cont(
            rule,
            k,
            format!("offset {} reaches past the first argument", k),
        ));
    }
    match &args[pos - 1] {
        Expr::Var(anchor) => Ok(Some(Tail {
            pos,
            k,
            anchor: anchor.clone(),
        })),
        other => Err(malformed_cont(
            rule,
            k,
            format!("must follow a placeholder, not {}", other),
        )),
    }
}
