//! Entries of the discovery maps shared across forks: functions, events,
//! storage variables and mappings.

use crate::core::masks::type_of;
use crate::instruction::{first_return, is_state_changing, Instruction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A dispatched function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// `0x`-prefixed 4-byte selector.
    pub selector: String,
    /// `name(type,…)`.
    pub label: String,
    /// The body never writes state, logs, calls out or self-destructs.
    pub constant: bool,
    pub returns: Vec<String>,
}

impl Function {
    /// Build an entry from the recovered body of a dispatcher branch.
    ///
    /// Return types come from the first `RETURN` reached: one type per
    /// 32-byte word read back from memory, or `bytes` when the returned size
    /// is not concrete.
    pub fn from_body(selector: String, label: String, body: &[Instruction]) -> Self {
        let returns = match first_return(body) {
            Some(Instruction::Return { size, words, .. }) if size.is_concrete() => {
                words.iter().map(|w| type_of(w).to_string()).collect()
            }
            Some(Instruction::Return { .. }) => vec!["bytes".to_string()],
            _ => Vec::new(),
        };
        Self {
            selector,
            label,
            constant: !is_state_changing(body),
            returns,
        }
    }
}

/// An emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// `0x`-prefixed topic hash.
    pub topic: String,
    pub label: String,
    /// Leading parameters carried in topics (`LOGn` → `n − 1`).
    pub indexed_count: usize,
}

/// A storage slot read at a concrete address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub label: String,
    pub slot: String,
}

/// A mapping rooted at a storage slot, with every key seen for it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mapping {
    pub name: String,
    pub slot: String,
    pub keys: BTreeSet<String>,
}
