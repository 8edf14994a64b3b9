//! The recovered instruction tree.
//!
//! Straight-line effects are flat statements; a symbolic `JUMPI` becomes a
//! two-way [`Instruction::Branch`], or an [`Instruction::Function`] when the
//! condition is a selector comparison in the dispatcher.

use crate::expr::Expr;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    Stop,
    Return {
        offset: Expr,
        size: Expr,
        /// Memory words covered by the returned range when it is concrete.
        words: Vec<Expr>,
    },
    Revert {
        offset: Expr,
        size: Expr,
        /// Decoded `Error(string)` message, when the payload is concrete.
        reason: Option<String>,
    },
    Invalid {
        reason: String,
    },
    SelfDestruct {
        beneficiary: Expr,
    },
    Store {
        slot: Expr,
        value: Expr,
    },
    TransientStore {
        slot: Expr,
        value: Expr,
    },
    Log {
        topics: Vec<Expr>,
        /// Event signature when topic0 resolves.
        label: Option<String>,
        offset: Expr,
        size: Expr,
    },
    Call {
        /// `CALL`, `CALLCODE`, `DELEGATECALL` or `STATICCALL`.
        opcode: String,
        gas: Expr,
        address: Expr,
        value: Option<Expr>,
        input_offset: Expr,
        input_size: Expr,
        result: Expr,
    },
    Create {
        /// `CREATE` or `CREATE2`.
        opcode: String,
        value: Expr,
        offset: Expr,
        size: Expr,
        result: Expr,
    },
    Branch {
        condition: Expr,
        taken: Vec<Instruction>,
        not_taken: Vec<Instruction>,
    },
    Function {
        selector: String,
        label: String,
        body: Vec<Instruction>,
    },
    /// The path took a jump edge it had already taken too often.
    Loop {
        target: usize,
    },
    /// The exploration budget ended the path early.
    Truncated {
        reason: String,
    },
}

impl Instruction {
    /// Direct children of a branch or function node.
    pub fn subtrees(&self) -> Vec<&[Instruction]> {
        match self {
            Instruction::Branch { taken, not_taken, .. } => vec![taken.as_slice(), not_taken.as_slice()],
            Instruction::Function { body, .. } => vec![body.as_slice()],
            _ => Vec::new(),
        }
    }

    fn writes_state(&self) -> bool {
        match self {
            Instruction::Store { .. }
            | Instruction::TransientStore { .. }
            | Instruction::Log { .. }
            | Instruction::Create { .. }
            | Instruction::SelfDestruct { .. } => true,
            Instruction::Call { opcode, .. } => opcode != "STATICCALL",
            _ => false,
        }
    }
}

/// `true` when any node of `tree` changes state.
pub fn is_state_changing(tree: &[Instruction]) -> bool {
    tree.iter().any(|i| {
        i.writes_state() || i.subtrees().into_iter().any(is_state_changing)
    })
}

/// First `RETURN` in depth-first, taken-before-fallthrough order.
pub fn first_return(tree: &[Instruction]) -> Option<&Instruction> {
    tree.iter().find_map(|i| match i {
        Instruction::Return { .. } => Some(i),
        _ => i.subtrees().into_iter().find_map(first_return),
    })
}

/// Visit every node of `tree`, parents before children.
pub fn walk<'a>(tree: &'a [Instruction], visit: &mut dyn FnMut(&'a Instruction)) {
    for node in tree {
        visit(node);
        for sub in node.subtrees() {
            walk(sub, visit);
        }
    }
}
