//! Symbolic folding for stack operations.
//!
//! Concrete operands are evaluated outright; otherwise a handful of
//! identities keep recurring compiler idioms (masking with all ones, adding
//! zero, double negation) from growing the expression tree.

use crate::core::arithmetic;
use crate::expr::{Expr, SELECTOR_MASK};
use crate::utils::opcodes::Mnemonic;
use primitive_types::U256;

/// Lowercase node name used for `op` in symbolic results.
pub fn node_name(op: Mnemonic) -> String {
    op.to_string().to_ascii_lowercase()
}

/// Apply `op` to `args` (pop order, top of stack first).
pub fn fold(op: Mnemonic, args: Vec<Expr>) -> Expr {
    let concrete: Option<Vec<U256>> = args.iter().map(Expr::as_val).collect();
    if let Some(values) = concrete {
        if let Some(v) = arithmetic::eval(op, &values) {
            return Expr::Val(v);
        }
    }

    use Mnemonic::*;
    let folded = match (op, args.as_slice()) {
        (Add, [x, z]) | (Add, [z, x]) | (Or, [x, z]) | (Or, [z, x]) | (Xor, [x, z])
            if is_zero(z) => Some(x.clone()),
        (Sub, [x, z]) if is_zero(z) => Some(x.clone()),
        (Sub, [x, y]) if x == y => Some(Expr::val(0)),
        (Mul, [_, z]) | (Mul, [z, _]) | (And, [_, z]) | (And, [z, _]) if is_zero(z) => {
            Some(Expr::val(0))
        }
        (Mul, [x, o]) | (Mul, [o, x]) if o.as_val() == Some(U256::one()) => Some(x.clone()),
        (And, [x, m]) | (And, [m, x]) if m.as_val() == Some(U256::MAX) => Some(x.clone()),
        // masking an already 4-byte selector is a no-op
        (And, [x, m]) | (And, [m, x]) if m.as_val() == Some(SELECTOR_MASK) && is_selector(x) => {
            Some(x.clone())
        }
        (Iszero, [x]) if x.opcode() == Some("iszero") && x.children().len() == 1 => {
            let inner = &x.children()[0];
            Some(if is_predicate(inner) {
                inner.clone()
            } else {
                Expr::node1("bool", inner.clone())
            })
        }
        _ => None,
    };
    folded.unwrap_or_else(|| Expr::Node(node_name(op), args))
}

fn is_zero(e: &Expr) -> bool {
    e.as_val().map_or(false, |v| v.is_zero())
}

/// `true` for expressions that only ever evaluate to 0 or 1.
pub fn is_predicate(e: &Expr) -> bool {
    matches!(e, Expr::Bool(_))
        || matches!(
            e.opcode(),
            Some("iszero" | "eq" | "lt" | "gt" | "slt" | "sgt" | "bool")
        )
}

fn is_calldata_head(e: &Expr) -> bool {
    e.opcode() == Some("cd") && e.children().first().map_or(false, is_zero)
}

/// Recognize the first four bytes of call data: `shr(224, cd(0))`,
/// `div(cd(0), 2^224)`, or either masked with `0xffffffff`.
pub fn is_selector(e: &Expr) -> bool {
    let ch = e.children();
    match e.opcode() {
        Some("shr") => ch.len() == 2 && ch[0].as_val() == Some(U256::from(224u64)) && is_calldata_head(&ch[1]),
        Some("div") => ch.len() == 2 && is_calldata_head(&ch[0]) && ch[1].as_val() == Some(U256::one() << 224),
        Some("and") => {
            ch.len() == 2
                && ((ch[0].as_val() == Some(SELECTOR_MASK) && is_selector(&ch[1]))
                    || (ch[1].as_val() == Some(SELECTOR_MASK) && is_selector(&ch[0])))
        }
        _ => false,
    }
}

/// If `cond` compares the call-data selector against a 4-byte constant,
/// return that constant.
pub fn selector_match(cond: &Expr) -> Option<u32> {
    if cond.opcode() != Some("eq") {
        return None;
    }
    let ch = cond.children();
    if ch.len() != 2 {
        return None;
    }
    let (constant, other) = if ch[0].is_concrete() { (&ch[0], &ch[1]) } else { (&ch[1], &ch[0]) };
    let value = constant.as_val()?;
    if value > SELECTOR_MASK || !is_selector(other) {
        return None;
    }
    Some(value.low_u32())
}
