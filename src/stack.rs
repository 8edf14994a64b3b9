//! Bounded symbolic operand stack.

use crate::errors::StackError;
use crate::expr::Expr;

/// Maximum operand stack depth of the EVM.
pub const MAX_STACK_DEPTH: usize = 1024;

/// A cloneable symbolic EVM stack. Forks clone it; the top is the last item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Expr>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Expr] {
        &self.items
    }

    /// Push a value. Fails once the depth limit is reached.
    pub fn push(&mut self, val: Expr) -> Result<(), StackError> {
        if self.items.len() >= MAX_STACK_DEPTH {
            return Err(StackError::Overflow(MAX_STACK_DEPTH));
        }
        self.items.push(val);
        Ok(())
    }

    pub fn try_pop(&mut self) -> Result<Expr, StackError> {
        self.items.pop().ok_or(StackError::Underflow { needed: 1, have: 0 })
    }

    /// Pop `n` items, top first. Nothing is removed on underflow.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Expr>, StackError> {
        let have = self.items.len();
        if have < n {
            return Err(StackError::Underflow { needed: n, have });
        }
        Ok(self.items.drain(have - n..).rev().collect())
    }

    pub fn peek(&self) -> Option<&Expr> {
        self.items.last()
    }

    /// Duplicate the n-th element from the top (`DUPn`).
    pub fn try_dup(&mut self, n: usize) -> Result<(), StackError> {
        if n == 0 || n > self.items.len() {
            return Err(StackError::DupOutOfRange(n, self.items.len()));
        }
        let val = self.items[self.items.len() - n].clone();
        self.push(val)
    }

    /// Swap the top with the n-th element below it (`SWAPn`).
    pub fn try_swap(&mut self, n: usize) -> Result<(), StackError> {
        if n == 0 || self.items.len() <= n {
            return Err(StackError::SwapOutOfRange(n, self.items.len()));
        }
        let top = self.items.len() - 1;
        self.items.swap(top, top - n);
        Ok(())
    }
}
