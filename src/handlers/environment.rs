//! Environment and block information.

use crate::context::ExecutionContext;
use crate::core::algebra::node_name;
use crate::errors::VmError;
use crate::expr::Expr;
use crate::loader::OpcodeRecord;

/// Zero-operand opcodes push a named atom (`caller`, `timestamp`, …).
pub(super) fn atom(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    ctx.push(Expr::Atom(node_name(record.mnemonic)))?;
    Ok(())
}

/// One-operand lookups such as `BALANCE` or `BLOCKHASH`.
pub(super) fn query(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let arg = ctx.pop()?;
    ctx.push(Expr::Node(node_name(record.mnemonic), vec![arg]))?;
    Ok(())
}

pub(super) fn calldataload(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let offset = ctx.pop()?;
    ctx.push(Expr::node1("cd", offset))?;
    Ok(())
}

pub(super) fn codesize(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let size = ctx.program().code_size();
    ctx.push(Expr::val(size as u64))?;
    Ok(())
}

pub(super) fn pc(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    ctx.push(Expr::val(record.pc as u64))?;
    Ok(())
}
