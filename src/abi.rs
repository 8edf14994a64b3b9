//! Interface descriptor built from the recovered function and event labels.

use crate::function::{Event, Function};
use crate::utils::helpers::split_params;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

static LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^(]+)\((.*)\)$").expect("label pattern is valid"));

/// One ABI parameter. Recovered parameters are unnamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl AbiParam {
    fn unnamed(kind: impl Into<String>) -> Self {
        Self { name: String::new(), kind: kind.into(), indexed: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AbiEntry {
    Function {
        name: String,
        inputs: Vec<AbiParam>,
        outputs: Vec<AbiParam>,
        constant: bool,
    },
    Event {
        name: String,
        inputs: Vec<AbiParam>,
        anonymous: bool,
    },
}

impl AbiEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Function { name, .. } | Self::Event { name, .. } => name,
        }
    }
}

/// Split `name(type,…)` into its name and parameter types. Labels not of
/// that shape yield `None`.
pub fn parse_label(label: &str) -> Option<(String, Vec<String>)> {
    let caps = LABEL.captures(label.trim())?;
    let name = caps.get(1)?.as_str().trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), split_params(caps.get(2)?.as_str())))
}

/// Functions first, then events, each in map order. Entries whose label
/// does not parse are skipped.
pub fn build_abi(
    functions: &BTreeMap<String, Function>,
    events: &BTreeMap<String, Event>,
) -> Vec<AbiEntry> {
    let mut abi = Vec::with_capacity(functions.len() + events.len());

    for function in functions.values() {
        let Some((name, args)) = parse_label(&function.label) else {
            log::debug!("skipping function with unparsable label {:?}", function.label);
            continue;
        };
        abi.push(AbiEntry::Function {
            name,
            inputs: args.into_iter().map(AbiParam::unnamed).collect(),
            outputs: function.returns.iter().map(AbiParam::unnamed).collect(),
            constant: function.constant,
        });
    }

    for event in events.values() {
        let Some((name, args)) = parse_label(&event.label) else {
            log::debug!("skipping event with unparsable label {:?}", event.label);
            continue;
        };
        let inputs = args
            .into_iter()
            .enumerate()
            .map(|(i, kind)| AbiParam { indexed: Some(i < event.indexed_count), ..AbiParam::unnamed(kind) })
            .collect();
        abi.push(AbiEntry::Event { name, inputs, anonymous: false });
    }

    abi
}
