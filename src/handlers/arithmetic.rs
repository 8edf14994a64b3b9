//! Arithmetic, comparison and bitwise opcodes.

use crate::context::ExecutionContext;
use crate::core::algebra;
use crate::errors::VmError;
use crate::loader::OpcodeRecord;
use crate::utils::opcodes;

/// Pop the operands, push the folded result.
pub(super) fn apply(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let arity = opcodes::lookup(record.opcode).map_or(2, |info| info.pops as usize);
    let args = ctx.pop_n(arity)?;
    ctx.push(algebra::fold(record.mnemonic, args))?;
    Ok(())
}
