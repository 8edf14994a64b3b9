//! The aggregated result of decompiling one contract.

use crate::abi::AbiEntry;
use crate::function::{Event, Function, Mapping, Variable};
use crate::instruction::Instruction;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters describing how much exploration a decompilation took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationStats {
    pub forks: usize,
    pub steps: usize,
    pub gas_used: u64,
}

/// Everything recovered from one bytecode.
#[derive(Debug, Clone, Serialize)]
pub struct Decompilation {
    /// `0x`-prefixed input.
    pub bytecode: String,
    pub swarm_hash: Option<String>,
    /// Selector signatures found in `PUSH4` payloads, first-seen order.
    pub recovered_functions: Vec<String>,
    /// Topic signatures found in `PUSH32` payloads, first-seen order.
    pub recovered_events: Vec<String>,
    pub erc165: bool,
    pub functions: BTreeMap<String, Function>,
    pub events: BTreeMap<String, Event>,
    pub variables: BTreeMap<String, Variable>,
    pub mappings: BTreeMap<String, Mapping>,
    pub abi: Vec<AbiEntry>,
    pub stats: ExplorationStats,
    pub instructions: Vec<Instruction>,
}

impl Decompilation {
    /// Serialise the decompilation to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "bytecode": self.bytecode,
            "swarm_hash": self.swarm_hash,
            "erc165": self.erc165,
            "recovered": {
                "functions": self.recovered_functions,
                "events": self.recovered_events,
            },
            "functions": self.functions,
            "events": self.events,
            "variables": self.variables,
            "mappings": self.mappings,
            "abi": self.abi,
            "stats": self.stats,
            "instructions": self.instructions,
        })
    }

    /// Labels of the functions reached through the dispatcher, sorted by
    /// selector.
    pub fn function_labels(&self) -> Vec<&str> {
        self.functions.values().map(|f| f.label.as_str()).collect()
    }
}
