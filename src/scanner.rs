//! Static scans over the raw bytecode: compiler metadata and opcode presence.

use crate::errors::ScanError;
use crate::utils::opcodes::{self, Mnemonic, JUMPDEST, TERMINAL_OPCODES};
use once_cell::sync::Lazy;
use regex::Regex;

/// Legacy solc metadata trailer: `a1 65 "bzzr0" 58 20 <32-byte hash> 00 29`.
static SWARM_TRAILER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"a165627a7a72305820([a-f0-9]{64})0029$").expect("swarm trailer pattern is valid")
});

/// The `bzzr://` swarm hash embedded at the very end of the code, if any.
pub fn swarm_hash(code: &[u8]) -> Option<String> {
    let hex = format!("0x{}", hex::encode(code));
    SWARM_TRAILER
        .captures(&hex)
        .and_then(|caps| caps.get(1))
        .map(|hash| format!("bzzr://{}", hash.as_str()))
}

/// What [`contains_opcode`] looks for: a raw byte, a mnemonic, or a mnemonic
/// name to be resolved against the opcode table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpcodeQuery {
    Byte(u8),
    Mnemonic(Mnemonic),
    Name(String),
}

impl From<u8> for OpcodeQuery {
    fn from(byte: u8) -> Self {
        Self::Byte(byte)
    }
}

impl From<Mnemonic> for OpcodeQuery {
    fn from(mnemonic: Mnemonic) -> Self {
        Self::Mnemonic(mnemonic)
    }
}

impl From<&str> for OpcodeQuery {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl OpcodeQuery {
    fn resolve(&self) -> Result<u8, ScanError> {
        match self {
            Self::Byte(byte) => Ok(*byte),
            Self::Mnemonic(m) => opcodes::byte_for_name(&m.to_string())
                .ok_or_else(|| ScanError::UnknownMnemonic(m.to_string())),
            Self::Name(name) => opcodes::byte_for_name(name)
                .ok_or_else(|| ScanError::UnknownMnemonic(name.clone())),
        }
    }
}

/// Whether `target` occurs as live code.
///
/// Code after a terminal opcode is treated as unreachable until the next
/// `JUMPDEST`, and push payloads are skipped, so neither dead data nor
/// immediates are reported.
pub fn contains_opcode(code: &[u8], target: impl Into<OpcodeQuery>) -> Result<bool, ScanError> {
    let target = target.into().resolve()?;
    let mut halted = false;
    let mut i = 0usize;
    while i < code.len() {
        let byte = code[i];
        if byte == target && !halted {
            return Ok(true);
        } else if byte == JUMPDEST {
            halted = false;
        } else if TERMINAL_OPCODES.contains(&byte) {
            halted = true;
        } else if opcodes::is_push_with_payload(byte) {
            i += opcodes::mnemonic_of(byte).push_size();
        }
        i += 1;
    }
    Ok(false)
}
