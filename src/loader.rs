//! Bytecode normalization and decoding.
//!
//! Turns a byte sequence into an ordered list of [`OpcodeRecord`]s. Besides
//! the plain linear sweep, the decoder recovers selector and topic constants
//! that compilers park in unreachable code right after a `JUMP; STOP` pair.

use crate::errors::{LoaderError, MAX_BYTECODE_SIZE};
use crate::expr::Expr;
use crate::utils::opcodes::{self, Mnemonic, JUMP, PUSH32, PUSH4, STOP};
use crate::utils::signatures::Signatures;
use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Input normalization
// ---------------------------------------------------------------------------

/// Normalized contract bytecode. Raw bytes and hex text (with or without a
/// `0x` prefix) produce the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytecode(Vec<u8>);

impl Bytecode {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, LoaderError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_BYTECODE_SIZE {
            return Err(LoaderError::BytecodeTooLarge(bytes.len(), MAX_BYTECODE_SIZE));
        }
        Ok(Self(bytes))
    }

    /// Parse hex text. Surrounding whitespace and a `0x` prefix are ignored;
    /// the empty string is valid and yields empty bytecode.
    pub fn from_hex(source: &str) -> Result<Self, LoaderError> {
        let trimmed = source.trim();
        let hex_str = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(hex_str).map_err(|_| {
            LoaderError::InvalidHex(if hex_str.len() > 40 {
                format!("{}...", &hex_str[..40])
            } else {
                hex_str.to_string()
            })
        })?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl FromStr for Bytecode {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// Decoded records
// ---------------------------------------------------------------------------

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeRecord {
    /// Byte offset of the opcode.
    pub pc: usize,
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    /// Immediate payload; present for the push family only. May be shorter
    /// than the nominal width when the code ends mid-payload.
    pub push_data: Option<Vec<u8>>,
}

impl OpcodeRecord {
    pub fn name(&self) -> String {
        self.mnemonic.to_string()
    }

    /// Payload as lowercase hex without prefix.
    pub fn push_hex(&self) -> Option<String> {
        self.push_data.as_ref().map(hex::encode)
    }

    /// Payload as a 256-bit value, zero-padded on the right when truncated.
    pub fn value(&self) -> Option<Expr> {
        self.push_data
            .as_ref()
            .map(|data| Expr::from_be_bytes(data, self.mnemonic.push_size()))
    }

    /// Number of bytes this record covers in the code.
    pub fn size(&self) -> usize {
        1 + self.push_data.as_ref().map_or(0, Vec::len)
    }
}

impl fmt::Display for OpcodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x} {}", self.pc, self.mnemonic)?;
        match &self.push_data {
            Some(data) if !data.is_empty() => write!(f, " 0x{}", hex::encode(data)),
            _ => Ok(()),
        }
    }
}

/// The decoded program: records in decode order plus a byte-offset index.
#[derive(Debug, Clone, Default)]
pub struct Program {
    records: Vec<OpcodeRecord>,
    index_by_pc: HashMap<usize, usize>,
    code_size: usize,
}

impl Program {
    pub fn records(&self) -> &[OpcodeRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&OpcodeRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size in bytes of the code this program was decoded from.
    pub fn code_size(&self) -> usize {
        self.code_size
    }

    /// Record index of the instruction starting at byte offset `pc`.
    pub fn index_of(&self, pc: usize) -> Option<usize> {
        self.index_by_pc.get(&pc).copied()
    }

    /// Byte offsets of every `JUMPDEST` record.
    pub fn jump_destinations(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.mnemonic == Mnemonic::Jumpdest)
            .map(|r| r.pc)
            .collect()
    }

    /// One `0x{pc:04x} MNEMONIC [0xpayload]` line per record.
    pub fn disasm(&self) -> Vec<String> {
        self.records.iter().map(ToString::to_string).collect()
    }
}

/// Decode `code` into a [`Program`].
///
/// After a `JUMP` immediately followed by `STOP`, the bytes at the cursor are
/// first tried as a 32-byte event topic, then as a 4-byte selector. A hit
/// becomes a synthesized `PUSH32`/`PUSH4` record that is appended after the
/// linear pass instead of at its offset, and the cursor then skips the
/// payload plus one byte. Both quirks are kept for output parity with
/// existing decompiler tooling.
pub fn decode(code: &[u8], sigs: &Signatures) -> Program {
    let mut records: Vec<OpcodeRecord> = Vec::new();
    let mut recovered: Vec<OpcodeRecord> = Vec::new();
    let mut index = 0usize;

    while index < code.len() {
        let byte = code[index];
        let n = records.len();

        if n >= 2 && records[n - 2].opcode == JUMP && records[n - 1].opcode == STOP {
            if let Some(record) = recover_hidden(code, index, sigs) {
                log::debug!("recovered {} at 0x{index:04x} after jump/stop", record.mnemonic);
                index += record.mnemonic.push_size() + 1;
                recovered.push(record);
                continue;
            }
        }

        let mnemonic = opcodes::mnemonic_of(byte);
        let mut record = OpcodeRecord { pc: index, opcode: byte, mnemonic, push_data: None };
        if mnemonic.is_push() {
            let start = (index + 1).min(code.len());
            let end = (index + 1 + mnemonic.push_size()).min(code.len());
            record.push_data = Some(code[start..end].to_vec());
            index += mnemonic.push_size();
        }
        records.push(record);
        index += 1;
    }

    records.extend(recovered);

    let mut index_by_pc = HashMap::with_capacity(records.len());
    for (i, r) in records.iter().enumerate() {
        index_by_pc.entry(r.pc).or_insert(i);
    }

    Program { records, index_by_pc, code_size: code.len() }
}

fn recover_hidden(code: &[u8], index: usize, sigs: &Signatures) -> Option<OpcodeRecord> {
    let candidates = [(PUSH32, 32usize), (PUSH4, 4usize)];
    for (opcode, width) in candidates {
        let Some(payload) = code.get(index..index + width) else { continue };
        let known = if width == 32 {
            sigs.has_event(payload)
        } else {
            sigs.has_function(payload)
        };
        if known {
            return Some(OpcodeRecord {
                pc: index,
                opcode,
                mnemonic: opcodes::mnemonic_of(opcode),
                push_data: Some(payload.to_vec()),
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Memoizing loader
// ---------------------------------------------------------------------------

/// Owns the bytecode and decodes it at most once.
#[derive(Debug, Clone)]
pub struct Loader {
    bytecode: Bytecode,
    signatures: Arc<Signatures>,
    program: OnceCell<Rc<Program>>,
}

impl Loader {
    pub fn new(bytecode: Bytecode, signatures: Arc<Signatures>) -> Self {
        Self { bytecode, signatures, program: OnceCell::new() }
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    pub fn signatures(&self) -> &Arc<Signatures> {
        &self.signatures
    }

    /// The decoded program. The first call decodes; later calls return the
    /// same shared instance.
    pub fn program(&self) -> Rc<Program> {
        Rc::clone(
            self.program
                .get_or_init(|| Rc::new(decode(self.bytecode.as_bytes(), &self.signatures))),
        )
    }
}
