//! Interpreter loop.
//!
//! Drives one [`ExecutionContext`] to a terminal state by dispatching each
//! record to the handler table. Branching is not handled here: the `JUMPI`
//! handler forks and calls [`run`] recursively on each child, so exploration
//! is a depth-first recursion bounded by the shared [`Budget`].
//!
//! [`Budget`]: crate::context::Budget

use crate::context::ExecutionContext;
use crate::errors::VmError;
use crate::instruction::Instruction;
use crate::utils::opcodes;
use std::rc::Rc;

/// Run `ctx` until it halts or runs out of records.
///
/// A context that is already terminal and has produced instructions is left
/// untouched, so calling this twice is harmless. Falling off the end of the
/// code is an implicit `STOP`.
///
/// Stack faults inside a handler end only the current path (recorded as
/// `Instruction::Invalid`). Reaching a mnemonic without a registered handler
/// is fatal and returns [`VmError::UnknownOpcode`].
pub fn run(ctx: &mut ExecutionContext) -> Result<(), VmError> {
    if ctx.is_terminal() && !ctx.instructions.is_empty() {
        return Ok(());
    }
    let program = Rc::clone(ctx.program());

    while !ctx.halted {
        let Some(record) = program.get(ctx.pc) else {
            ctx.halt_with(Instruction::Stop);
            break;
        };
        if let Some(reason) = ctx.budget().tick() {
            ctx.halt_with(Instruction::Truncated { reason: reason.into() });
            break;
        }

        log::trace!(
            "[{}] 0x{:04x} {:<14} {:<66} depth={}",
            ctx.layer,
            record.pc,
            record.mnemonic.to_string(),
            record.push_hex().unwrap_or_default(),
            ctx.stack.len()
        );

        let handler = ctx.handlers().get(record.mnemonic).ok_or_else(|| {
            VmError::UnknownOpcode { pc: record.pc, name: record.name() }
        })?;
        ctx.gas_used += opcodes::base_gas(record.opcode);

        let before = ctx.pc;
        match handler(record, ctx) {
            Ok(()) => {}
            Err(VmError::Stack(err)) => {
                log::debug!("path halted at 0x{:04x} {}: {err}", record.pc, record.mnemonic);
                ctx.halt_with(Instruction::Invalid { reason: err.to_string() });
            }
            Err(err) => return Err(err),
        }
        // Jumps set the index themselves.
        if ctx.pc == before {
            ctx.pc += 1;
        }
    }
    Ok(())
}
