//! Domain-specific error types.
//!
//! Uses `thiserror` for structured error definitions; `anyhow` is reserved
//! for the binary and the `decompile_bytecode` convenience wrapper.

use thiserror::Error;

/// Errors from bytecode normalization.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    #[error("bytecode too large ({0} bytes, max {1})")]
    BytecodeTooLarge(usize, usize),
}

/// Errors from the symbolic stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("stack underflow: needed {needed} items, have {have}")]
    Underflow { needed: usize, have: usize },

    #[error("stack overflow: depth limit {0} reached")]
    Overflow(usize),

    #[error("dup{0} out of range (stack depth {1})")]
    DupOutOfRange(usize, usize),

    #[error("swap{0} out of range (stack depth {1})")]
    SwapOutOfRange(usize, usize),
}

/// Errors from the interpreter loop.
#[derive(Debug, Error)]
pub enum VmError {
    /// A record was reached whose mnemonic has no registered handler.
    #[error("unknown opcode {name} at offset {pc:#x}")]
    UnknownOpcode { pc: usize, name: String },

    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Errors from metadata and presence scans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),
}

/// Maximum accepted bytecode size. Generous relative to the 24 KB deploy
/// limit so init code with appended constructor arguments still loads.
pub const MAX_BYTECODE_SIZE: usize = 0x60000;
