//! `PUSHn`, `DUPn`, `SWAPn` and `POP`.

use crate::context::ExecutionContext;
use crate::errors::VmError;
use crate::expr::Expr;
use crate::loader::OpcodeRecord;
use crate::utils::opcodes::Mnemonic;

pub(super) fn push(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    ctx.push(record.value().unwrap_or_else(|| Expr::val(0)))?;
    Ok(())
}

pub(super) fn dup(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    if let Mnemonic::Dup(n) = record.mnemonic {
        ctx.stack.try_dup(n as usize)?;
    }
    Ok(())
}

pub(super) fn swap(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    if let Mnemonic::Swap(n) = record.mnemonic {
        ctx.stack.try_swap(n as usize)?;
    }
    Ok(())
}

pub(super) fn pop(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    ctx.pop()?;
    Ok(())
}
