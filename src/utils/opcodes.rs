//! EVM mnemonic table covering every hard-fork from Frontier through Cancun.
//!
//! Each opcode carries its byte value, mnemonic, the stack items it pops /
//! pushes, the hard-fork that introduced it, the size of its immediate
//! payload and a base gas tier used for the synthetic gas counter.

use crate::errors::ScanError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const STOP: u8 = 0x00;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const JUMPDEST: u8 = 0x5B;
pub const PUSH0: u8 = 0x5F;
pub const PUSH1: u8 = 0x60;
pub const PUSH4: u8 = 0x63;
pub const PUSH32: u8 = 0x7F;
pub const RETURN: u8 = 0xF3;
pub const REVERT: u8 = 0xFD;
pub const INVALID: u8 = 0xFE;
pub const SELFDESTRUCT: u8 = 0xFF;

/// Base of the push family: `PUSHn` has byte `PUSH_BASE + n`.
pub const PUSH_BASE: u8 = 0x5F;

/// Opcodes after which the following bytes are unreachable until the next
/// `JUMPDEST`.
pub const TERMINAL_OPCODES: [u8; 5] = [STOP, RETURN, REVERT, INVALID, SELFDESTRUCT];

/// The closed set of mnemonics the decoder can produce.
///
/// Parametrised families keep their width: `Push(4)` is `PUSH4`, `Log(2)` is
/// `LOG2`. Bytes without an assigned opcode decode to [`Mnemonic::Invalid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mnemonic {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    Addmod,
    Mulmod,
    Exp,
    Signextend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    Iszero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    Calldataload,
    Calldatasize,
    Calldatacopy,
    Codesize,
    Codecopy,
    Gasprice,
    Extcodesize,
    Extcodecopy,
    Returndatasize,
    Returndatacopy,
    Extcodehash,
    Blockhash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    Gaslimit,
    Chainid,
    Selfbalance,
    Basefee,
    Blobhash,
    Blobbasefee,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Pc,
    Msize,
    Gas,
    Jumpdest,
    Tload,
    Tstore,
    Mcopy,
    Push(u8),
    Dup(u8),
    Swap(u8),
    Log(u8),
    Create,
    Call,
    Callcode,
    Return,
    Delegatecall,
    Create2,
    Staticcall,
    Revert,
    Invalid,
    Selfdestruct,
}

impl Mnemonic {
    /// `true` for `PUSH0`..`PUSH32`.
    pub fn is_push(self) -> bool {
        matches!(self, Mnemonic::Push(_))
    }

    /// Immediate payload length in bytes (zero outside the push family).
    pub fn push_size(self) -> usize {
        match self {
            Mnemonic::Push(n) => n as usize,
            _ => 0,
        }
    }

    /// `true` for opcodes that end execution of the current path.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Mnemonic::Stop
                | Mnemonic::Return
                | Mnemonic::Revert
                | Mnemonic::Invalid
                | Mnemonic::Selfdestruct
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mnemonic::Push(n) => return write!(f, "PUSH{n}"),
            Mnemonic::Dup(n) => return write!(f, "DUP{n}"),
            Mnemonic::Swap(n) => return write!(f, "SWAP{n}"),
            Mnemonic::Log(n) => return write!(f, "LOG{n}"),
            Mnemonic::Stop => "STOP",
            Mnemonic::Add => "ADD",
            Mnemonic::Mul => "MUL",
            Mnemonic::Sub => "SUB",
            Mnemonic::Div => "DIV",
            Mnemonic::Sdiv => "SDIV",
            Mnemonic::Mod => "MOD",
            Mnemonic::Smod => "SMOD",
            Mnemonic::Addmod => "ADDMOD",
            Mnemonic::Mulmod => "MULMOD",
            Mnemonic::Exp => "EXP",
            Mnemonic::Signextend => "SIGNEXTEND",
            Mnemonic::Lt => "LT",
            Mnemonic::Gt => "GT",
            Mnemonic::Slt => "SLT",
            Mnemonic::Sgt => "SGT",
            Mnemonic::Eq => "EQ",
            Mnemonic::Iszero => "ISZERO",
            Mnemonic::And => "AND",
            Mnemonic::Or => "OR",
            Mnemonic::Xor => "XOR",
            Mnemonic::Not => "NOT",
            Mnemonic::Byte => "BYTE",
            Mnemonic::Shl => "SHL",
            Mnemonic::Shr => "SHR",
            Mnemonic::Sar => "SAR",
            Mnemonic::Sha3 => "SHA3",
            Mnemonic::Address => "ADDRESS",
            Mnemonic::Balance => "BALANCE",
            Mnemonic::Origin => "ORIGIN",
            Mnemonic::Caller => "CALLER",
            Mnemonic::Callvalue => "CALLVALUE",
            Mnemonic::Calldataload => "CALLDATALOAD",
            Mnemonic::Calldatasize => "CALLDATASIZE",
            Mnemonic::Calldatacopy => "CALLDATACOPY",
            Mnemonic::Codesize => "CODESIZE",
            Mnemonic::Codecopy => "CODECOPY",
            Mnemonic::Gasprice => "GASPRICE",
            Mnemonic::Extcodesize => "EXTCODESIZE",
            Mnemonic::Extcodecopy => "EXTCODECOPY",
            Mnemonic::Returndatasize => "RETURNDATASIZE",
            Mnemonic::Returndatacopy => "RETURNDATACOPY",
            Mnemonic::Extcodehash => "EXTCODEHASH",
            Mnemonic::Blockhash => "BLOCKHASH",
            Mnemonic::Coinbase => "COINBASE",
            Mnemonic::Timestamp => "TIMESTAMP",
            Mnemonic::Number => "NUMBER",
            Mnemonic::Difficulty => "DIFFICULTY",
            Mnemonic::Gaslimit => "GASLIMIT",
            Mnemonic::Chainid => "CHAINID",
            Mnemonic::Selfbalance => "SELFBALANCE",
            Mnemonic::Basefee => "BASEFEE",
            Mnemonic::Blobhash => "BLOBHASH",
            Mnemonic::Blobbasefee => "BLOBBASEFEE",
            Mnemonic::Pop => "POP",
            Mnemonic::Mload => "MLOAD",
            Mnemonic::Mstore => "MSTORE",
            Mnemonic::Mstore8 => "MSTORE8",
            Mnemonic::Sload => "SLOAD",
            Mnemonic::Sstore => "SSTORE",
            Mnemonic::Jump => "JUMP",
            Mnemonic::Jumpi => "JUMPI",
            Mnemonic::Pc => "PC",
            Mnemonic::Msize => "MSIZE",
            Mnemonic::Gas => "GAS",
            Mnemonic::Jumpdest => "JUMPDEST",
            Mnemonic::Tload => "TLOAD",
            Mnemonic::Tstore => "TSTORE",
            Mnemonic::Mcopy => "MCOPY",
            Mnemonic::Create => "CREATE",
            Mnemonic::Call => "CALL",
            Mnemonic::Callcode => "CALLCODE",
            Mnemonic::Return => "RETURN",
            Mnemonic::Delegatecall => "DELEGATECALL",
            Mnemonic::Create2 => "CREATE2",
            Mnemonic::Staticcall => "STATICCALL",
            Mnemonic::Revert => "REVERT",
            Mnemonic::Invalid => "INVALID",
            Mnemonic::Selfdestruct => "SELFDESTRUCT",
        };
        f.write_str(name)
    }
}

impl FromStr for Mnemonic {
    type Err = ScanError;

    /// Parse an upper-case mnemonic name; `KECCAK256` and `PREVRANDAO` are
    /// accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        byte_for_name(s)
            .and_then(lookup)
            .map(|info| info.mnemonic)
            .ok_or_else(|| ScanError::UnknownMnemonic(s.to_string()))
    }
}

/// Information about a single opcode.
#[derive(Debug, Clone)]
pub struct OpcodeInfo {
    pub byte: u8,
    pub mnemonic: Mnemonic,
    /// Number of stack items consumed.
    pub pops: u8,
    /// Number of stack items produced.
    pub pushes: u8,
    /// If this is a `PUSHn`, the number of immediate bytes.
    pub immediate_bytes: u8,
    /// Static base cost; dynamic components are ignored.
    pub gas: u64,
}

impl OpcodeInfo {
    /// Stack diff = pushes − pops  (may be negative).
    pub fn stack_diff(&self) -> i16 {
        self.pushes as i16 - self.pops as i16
    }
}

static OPCODE_TABLE: Lazy<HashMap<u8, OpcodeInfo>> = Lazy::new(build_opcode_table);

static NAME_TABLE: Lazy<HashMap<String, u8>> = Lazy::new(|| {
    let mut names: HashMap<String, u8> = OPCODE_TABLE
        .values()
        .map(|info| (info.mnemonic.to_string(), info.byte))
        .collect();
    names.insert("KECCAK256".to_string(), 0x20);
    names.insert("PREVRANDAO".to_string(), 0x44);
    names
});

/// Build the full opcode table (byte → info).
pub fn build_opcode_table() -> HashMap<u8, OpcodeInfo> {
    use Mnemonic::*;

    let mut m: HashMap<u8, OpcodeInfo> = HashMap::new();

    macro_rules! op {
        ($byte:expr, $mnemonic:expr, $pops:expr, $pushes:expr, $gas:expr) => {
            m.insert($byte, OpcodeInfo {
                byte: $byte,
                mnemonic: $mnemonic,
                pops: $pops,
                pushes: $pushes,
                immediate_bytes: 0,
                gas: $gas,
            });
        };
    }

    // -- Stop and Arithmetic -----------------------------------------------
    op!(0x00, Stop,           0, 0, 0);
    op!(0x01, Add,            2, 1, 3);
    op!(0x02, Mul,            2, 1, 5);
    op!(0x03, Sub,            2, 1, 3);
    op!(0x04, Div,            2, 1, 5);
    op!(0x05, Sdiv,           2, 1, 5);
    op!(0x06, Mod,            2, 1, 5);
    op!(0x07, Smod,           2, 1, 5);
    op!(0x08, Addmod,         3, 1, 8);
    op!(0x09, Mulmod,         3, 1, 8);
    op!(0x0A, Exp,            2, 1, 10);
    op!(0x0B, Signextend,     2, 1, 5);

    // -- Comparison and Bitwise Logic --------------------------------------
    op!(0x10, Lt,             2, 1, 3);
    op!(0x11, Gt,             2, 1, 3);
    op!(0x12, Slt,            2, 1, 3);
    op!(0x13, Sgt,            2, 1, 3);
    op!(0x14, Eq,             2, 1, 3);
    op!(0x15, Iszero,         1, 1, 3);
    op!(0x16, And,            2, 1, 3);
    op!(0x17, Or,             2, 1, 3);
    op!(0x18, Xor,            2, 1, 3);
    op!(0x19, Not,            1, 1, 3);
    op!(0x1A, Byte,           2, 1, 3);
    op!(0x1B, Shl,            2, 1, 3);
    op!(0x1C, Shr,            2, 1, 3);
    op!(0x1D, Sar,            2, 1, 3);

    op!(0x20, Sha3,           2, 1, 30);

    // -- Environment Information -------------------------------------------
    op!(0x30, Address,        0, 1, 2);
    op!(0x31, Balance,        1, 1, 100);
    op!(0x32, Origin,         0, 1, 2);
    op!(0x33, Caller,         0, 1, 2);
    op!(0x34, Callvalue,      0, 1, 2);
    op!(0x35, Calldataload,   1, 1, 3);
    op!(0x36, Calldatasize,   0, 1, 2);
    op!(0x37, Calldatacopy,   3, 0, 3);
    op!(0x38, Codesize,       0, 1, 2);
    op!(0x39, Codecopy,       3, 0, 3);
    op!(0x3A, Gasprice,       0, 1, 2);
    op!(0x3B, Extcodesize,    1, 1, 100);
    op!(0x3C, Extcodecopy,    4, 0, 100);
    op!(0x3D, Returndatasize, 0, 1, 2);
    op!(0x3E, Returndatacopy, 3, 0, 3);
    op!(0x3F, Extcodehash,    1, 1, 100);

    // -- Block Information -------------------------------------------------
    op!(0x40, Blockhash,      1, 1, 20);
    op!(0x41, Coinbase,       0, 1, 2);
    op!(0x42, Timestamp,      0, 1, 2);
    op!(0x43, Number,         0, 1, 2);
    op!(0x44, Difficulty,     0, 1, 2);
    op!(0x45, Gaslimit,       0, 1, 2);
    op!(0x46, Chainid,        0, 1, 2);
    op!(0x47, Selfbalance,    0, 1, 5);
    op!(0x48, Basefee,        0, 1, 2);
    op!(0x49, Blobhash,       1, 1, 3);
    op!(0x4A, Blobbasefee,    0, 1, 2);

    // -- Stack, Memory, Storage and Flow -----------------------------------
    op!(0x50, Pop,            1, 0, 2);
    op!(0x51, Mload,          1, 1, 3);
    op!(0x52, Mstore,         2, 0, 3);
    op!(0x53, Mstore8,        2, 0, 3);
    op!(0x54, Sload,          1, 1, 100);
    op!(0x55, Sstore,         2, 0, 100);
    op!(0x56, Jump,           1, 0, 8);
    op!(0x57, Jumpi,          2, 0, 10);
    op!(0x58, Pc,             0, 1, 2);
    op!(0x59, Msize,          0, 1, 2);
    op!(0x5A, Gas,            0, 1, 2);
    op!(0x5B, Jumpdest,       0, 0, 1);
    op!(0x5C, Tload,          1, 1, 100);
    op!(0x5D, Tstore,         2, 0, 100);
    op!(0x5E, Mcopy,          3, 0, 3);

    // -- PUSH0..PUSH32 -----------------------------------------------------
    for n in 0u8..=32 {
        let byte = PUSH_BASE + n;
        m.insert(byte, OpcodeInfo {
            byte,
            mnemonic: Push(n),
            pops: 0,
            pushes: 1,
            immediate_bytes: n,
            gas: if n == 0 { 2 } else { 3 },
        });
    }

    // -- DUP1..DUP16 / SWAP1..SWAP16 ----------------------------------------
    for n in 1u8..=16 {
        m.insert(0x7F + n, OpcodeInfo {
            byte: 0x7F + n,
            mnemonic: Dup(n),
            pops: n,
            pushes: n + 1,
            immediate_bytes: 0,
            gas: 3,
        });
        m.insert(0x8F + n, OpcodeInfo {
            byte: 0x8F + n,
            mnemonic: Swap(n),
            pops: n + 1,
            pushes: n + 1,
            immediate_bytes: 0,
            gas: 3,
        });
    }

    // -- LOG0..LOG4 ---------------------------------------------------------
    for n in 0u8..=4 {
        m.insert(0xA0 + n, OpcodeInfo {
            byte: 0xA0 + n,
            mnemonic: Log(n),
            pops: n + 2,
            pushes: 0,
            immediate_bytes: 0,
            gas: 375 * (n as u64 + 1),
        });
    }

    // -- System operations -------------------------------------------------
    op!(0xF0, Create,         3, 1, 32000);
    op!(0xF1, Call,           7, 1, 100);
    op!(0xF2, Callcode,       7, 1, 100);
    op!(0xF3, Return,         2, 0, 0);
    op!(0xF4, Delegatecall,   6, 1, 100);
    op!(0xF5, Create2,        4, 1, 32000);
    op!(0xFA, Staticcall,     6, 1, 100);
    op!(0xFD, Revert,         2, 0, 0);
    op!(0xFE, Invalid,        0, 0, 0);
    op!(0xFF, Selfdestruct,   1, 0, 5000);

    m
}

/// Look up opcode information by byte value.
pub fn lookup(byte: u8) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE.get(&byte)
}

/// Mnemonic for a byte; unassigned bytes map to `INVALID`.
pub fn mnemonic_of(byte: u8) -> Mnemonic {
    lookup(byte).map(|info| info.mnemonic).unwrap_or(Mnemonic::Invalid)
}

/// Reverse lookup: exact upper-case mnemonic name → byte value.
pub fn byte_for_name(name: &str) -> Option<u8> {
    NAME_TABLE.get(name).copied()
}

/// Base gas tier charged when the interpreter dispatches `mnemonic`.
pub fn base_gas(byte: u8) -> u64 {
    lookup(byte).map(|info| info.gas).unwrap_or(0)
}

/// `true` for `PUSH1`..`PUSH32` (the bytes followed by an immediate payload).
pub fn is_push_with_payload(byte: u8) -> bool {
    (PUSH1..=PUSH32).contains(&byte)
}
