//! Function-selector and event-topic dictionaries, and signature recovery
//! from the decoded opcode stream.
//!
//! The default dictionary is a bundled gzip-compressed TSV decompressed on
//! first access. Callers can build their own [`Signatures`] (from TSV text or
//! by registering plain signature strings) and hand it to the decompiler.

use crate::loader::Program;
use crate::utils::opcodes::Mnemonic;
use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

/// The gzip-compressed signature database, embedded at compile time.
/// Format: one line per entry,
///   `f\t<hex_selector>\t<signature>\t<param_names>\n`   for functions,
///   `e\t<hex_topic>\t<signature>\t<param_names>\n`      for events.
static EMBEDDED_DB: &[u8] = include_bytes!("../../data/signatures.db.gz");

static EMBEDDED: Lazy<Arc<Signatures>> = Lazy::new(|| Arc::new(load_embedded()));

fn load_embedded() -> Signatures {
    let mut decoder = flate2::read::GzDecoder::new(EMBEDDED_DB);
    let mut text = String::new();
    if let Err(e) = decoder.read_to_string(&mut text) {
        log::warn!("embedded signature DB is unreadable: {e}");
        return Signatures::empty();
    }
    let sigs = Signatures::from_tsv(&text);
    log::info!(
        "Loaded local signature DB: {} functions, {} events",
        sigs.functions.len(),
        sigs.events.len()
    );
    sigs
}

/// Lowercase hex without prefix; the dictionary key format.
fn normalize(hash: &str) -> String {
    let hash = hash.trim();
    hash.strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .unwrap_or(hash)
        .to_ascii_lowercase()
}

/// Selector → signature and topic → signature maps.
#[derive(Debug, Clone, Default)]
pub struct Signatures {
    functions: HashMap<String, String>,
    events: HashMap<String, String>,
}

impl Signatures {
    /// The bundled dictionary (shared, loaded once).
    pub fn embedded() -> Arc<Signatures> {
        Arc::clone(&EMBEDDED)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse TSV text in the bundled format. Malformed lines are skipped and
    /// the first entry for a hash wins.
    pub fn from_tsv(text: &str) -> Self {
        let mut sigs = Self::empty();
        for line in text.lines() {
            let parts: Vec<&str> = line.splitn(4, '\t').collect();
            if parts.len() < 3 {
                continue;
            }
            let map = match parts[0] {
                "f" => &mut sigs.functions,
                "e" => &mut sigs.events,
                _ => continue,
            };
            map.entry(normalize(parts[1]))
                .or_insert_with(|| parts[2].to_string());
        }
        sigs
    }

    /// Register a function signature under its computed selector.
    pub fn with_function(mut self, signature: &str) -> Self {
        self.functions
            .insert(selector_of(signature), signature.to_string());
        self
    }

    /// Register an event signature under its computed topic.
    pub fn with_event(mut self, signature: &str) -> Self {
        self.events.insert(topic_of(signature), signature.to_string());
        self
    }

    /// Look up a 4-byte selector (hex, prefix optional).
    pub fn function(&self, selector: &str) -> Option<&str> {
        self.functions.get(&normalize(selector)).map(String::as_str)
    }

    /// Look up a 32-byte event topic (hex, prefix optional).
    pub fn event(&self, topic: &str) -> Option<&str> {
        self.events.get(&normalize(topic)).map(String::as_str)
    }

    pub fn has_function(&self, payload: &[u8]) -> bool {
        self.functions.contains_key(&hex::encode(payload))
    }

    pub fn has_event(&self, payload: &[u8]) -> bool {
        self.events.contains_key(&hex::encode(payload))
    }
}

/// Keccak-256 of `text`.
pub fn keccak256(text: &[u8]) -> [u8; 32] {
    Keccak256::digest(text).into()
}

/// Selector of a canonical function signature, as 8 lowercase hex chars.
pub fn selector_of(signature: &str) -> String {
    hex::encode(&keccak256(signature.as_bytes())[..4])
}

/// Topic of a canonical event signature, as 64 lowercase hex chars.
pub fn topic_of(signature: &str) -> String {
    hex::encode(keccak256(signature.as_bytes()))
}

// ---------------------------------------------------------------------------
// Recovery from the decoded stream
// ---------------------------------------------------------------------------

fn recover<'a>(
    program: &Program,
    width: u8,
    resolve: impl Fn(&str) -> Option<&'a str>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in program.records() {
        if record.mnemonic != Mnemonic::Push(width) {
            continue;
        }
        let Some(hash) = record.push_hex() else { continue };
        if let Some(signature) = resolve(&hash) {
            if seen.insert(signature) {
                out.push(signature.to_string());
            }
        }
    }
    out
}

/// Signatures of every `PUSH4` payload found in the selector dictionary,
/// deduplicated in first-seen order.
pub fn recovered_functions(program: &Program, sigs: &Signatures) -> Vec<String> {
    recover(program, 4, |hash| sigs.function(hash))
}

/// Signatures of every `PUSH32` payload found in the topic dictionary,
/// deduplicated in first-seen order.
pub fn recovered_events(program: &Program, sigs: &Signatures) -> Vec<String> {
    recover(program, 32, |hash| sigs.event(hash))
}
