//! Opcode handler table.
//!
//! A handler receives the record being executed and the path's context. It
//! may mutate any part of the context, halt it, or fork it and drive the
//! children to completion. The interpreter advances `pc` unless the handler
//! moved it; jumps set `pc` to the index of the destination `JUMPDEST`.

mod arithmetic;
mod environment;
mod flow;
mod memory;
mod stack_ops;
mod storage;
mod system;

use crate::context::ExecutionContext;
use crate::errors::VmError;
use crate::loader::OpcodeRecord;
use crate::utils::opcodes::{self, Mnemonic};
use std::collections::HashMap;

pub type Handler = fn(&OpcodeRecord, &mut ExecutionContext) -> Result<(), VmError>;

/// Mnemonic → handler dispatch over the closed opcode set.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<Mnemonic, Handler>,
}

impl HandlerTable {
    /// A table with no handlers; every dispatch fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default symbolic semantics for every mnemonic, `INVALID` included.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for byte in 0..=u8::MAX {
            if let Some(info) = opcodes::lookup(byte) {
                table.register(info.mnemonic, default_handler(info.mnemonic));
            }
        }
        table
    }

    pub fn register(&mut self, mnemonic: Mnemonic, handler: Handler) -> &mut Self {
        self.handlers.insert(mnemonic, handler);
        self
    }

    pub fn remove(&mut self, mnemonic: Mnemonic) -> Option<Handler> {
        self.handlers.remove(&mnemonic)
    }

    pub fn get(&self, mnemonic: Mnemonic) -> Option<Handler> {
        self.handlers.get(&mnemonic).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn default_handler(mnemonic: Mnemonic) -> Handler {
    use Mnemonic::*;
    match mnemonic {
        Add | Mul | Sub | Div | Sdiv | Mod | Smod | Addmod | Mulmod | Exp | Signextend | Lt
        | Gt | Slt | Sgt | Eq | Iszero | And | Or | Xor | Not | Byte | Shl | Shr | Sar => {
            arithmetic::apply
        }

        Push(_) => stack_ops::push,
        Dup(_) => stack_ops::dup,
        Swap(_) => stack_ops::swap,
        Pop => stack_ops::pop,

        Calldataload => environment::calldataload,
        Codesize => environment::codesize,
        Pc => environment::pc,
        Balance | Extcodesize | Extcodehash | Blockhash | Blobhash => environment::query,
        Address | Origin | Caller | Callvalue | Calldatasize | Gasprice | Returndatasize
        | Coinbase | Timestamp | Number | Difficulty | Gaslimit | Chainid | Selfbalance
        | Basefee | Blobbasefee | Gas | Msize => environment::atom,

        Mload => memory::mload,
        Mstore | Mstore8 => memory::mstore,
        Calldatacopy | Codecopy | Returndatacopy | Extcodecopy | Mcopy => memory::copy,

        Sha3 => storage::sha3,
        Sload => storage::sload,
        Sstore => storage::sstore,
        Tload => storage::tload,
        Tstore => storage::tstore,

        Jump => flow::jump,
        Jumpi => flow::jumpi,
        Jumpdest => flow::jumpdest,
        Stop => flow::stop,
        Return => flow::ret,
        Revert => flow::revert,
        Invalid => flow::invalid,
        Selfdestruct => flow::selfdestruct,

        Log(_) => system::log,
        Call | Callcode | Delegatecall | Staticcall => system::call,
        Create | Create2 => system::create,
    }
}
