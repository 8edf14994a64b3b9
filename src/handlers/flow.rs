//! Control flow: jumps, branch forking and terminal opcodes.

use super::memory::{offset_of, read_word, read_words, MAX_WORDS};
use crate::context::ExecutionContext;
use crate::core::algebra::selector_match;
use crate::decompiler::ExplorationOrder;
use crate::errors::VmError;
use crate::expr::Expr;
use crate::function::Function;
use crate::instruction::Instruction;
use crate::loader::OpcodeRecord;
use crate::utils::helpers::padded_hex;
use crate::utils::opcodes::{Mnemonic, INVALID};
use crate::vm;
use primitive_types::U256;

/// Selector of `Error(string)`.
const ERROR_SELECTOR: u32 = 0x08c3_79a0;

/// Record index of the `JUMPDEST` at byte offset `target`.
fn destination(ctx: &ExecutionContext, target: usize) -> Option<usize> {
    let program = ctx.program();
    program
        .index_of(target)
        .filter(|&i| program.get(i).map(|r| r.mnemonic) == Some(Mnemonic::Jumpdest))
}

/// Resolve a jump target, ending the path when it is unusable.
fn resolve_target(ctx: &mut ExecutionContext, target: &Expr) -> Option<(usize, usize)> {
    let Some(offset) = target.as_usize() else {
        ctx.halt_with(Instruction::Invalid { reason: "dynamic jump".into() });
        return None;
    };
    match destination(ctx, offset) {
        Some(index) => Some((offset, index)),
        None => {
            ctx.halt_with(Instruction::Invalid { reason: "bad jump destination".into() });
            None
        }
    }
}

/// Take the edge `from → to` on `ctx`, or end the path as a loop.
fn follow(ctx: &mut ExecutionContext, from: usize, to: usize, index: usize) {
    if ctx.take_edge(from, to) {
        ctx.pc = index;
    } else {
        ctx.halt_with(Instruction::Loop { target: to });
    }
}

pub(super) fn jump(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let target = ctx.pop()?;
    if let Some((offset, index)) = resolve_target(ctx, &target) {
        follow(ctx, record.pc, offset, index);
    }
    Ok(())
}

/// A concrete condition behaves like `JUMP` or falls through. A symbolic
/// one forks both edges, runs them to completion and folds the results into
/// this path, which then halts.
pub(super) fn jumpi(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let target = ctx.pop()?;
    let condition = ctx.pop()?;

    if let Some(value) = condition.as_val() {
        if !value.is_zero() {
            if let Some((offset, index)) = resolve_target(ctx, &target) {
                follow(ctx, record.pc, offset, index);
            }
        }
        return Ok(());
    }

    let Some((offset, index)) = resolve_target(ctx, &target) else {
        return Ok(());
    };
    if let Err(reason) = ctx.budget().try_fork(ctx.layer) {
        log::warn!("not forking at 0x{:04x}: {reason}", record.pc);
        ctx.halt_with(Instruction::Truncated { reason: reason.into() });
        return Ok(());
    }
    log::debug!("fork at 0x{:04x} (layer {}): {condition}", record.pc, ctx.layer);

    let mut taken = ctx.fork_on(condition.clone());
    follow(&mut taken, record.pc, offset, index);

    let mut not_taken = ctx.fork_on(condition.negated());
    let next = record.pc + record.size();
    follow(&mut not_taken, record.pc, next, ctx.pc + 1);

    match ctx.order() {
        ExplorationOrder::TakenFirst => {
            vm::run(&mut taken)?;
            vm::run(&mut not_taken)?;
        }
        ExplorationOrder::FallthroughFirst => {
            vm::run(&mut not_taken)?;
            vm::run(&mut taken)?;
        }
    }

    ctx.gas_used = taken.gas_used.max(not_taken.gas_used);
    match selector_match(&condition) {
        Some(selector) => {
            let selector = padded_hex(U256::from(selector), 8);
            let label = ctx
                .signatures()
                .function(&selector)
                .map_or_else(|| format!("unknown_{selector}()"), str::to_string);
            let entry = Function::from_body(selector.clone(), label.clone(), &taken.instructions);
            ctx.functions.insert_if_absent(selector.clone(), entry);
            ctx.emit(Instruction::Function { selector, label, body: taken.instructions });
            ctx.instructions.extend(not_taken.instructions);
        }
        None => ctx.emit(Instruction::Branch {
            condition,
            taken: taken.instructions,
            not_taken: not_taken.instructions,
        }),
    }
    ctx.halted = true;
    Ok(())
}

pub(super) fn jumpdest(_: &OpcodeRecord, _: &mut ExecutionContext) -> Result<(), VmError> {
    Ok(())
}

pub(super) fn stop(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    ctx.halt_with(Instruction::Stop);
    Ok(())
}

pub(super) fn ret(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let offset = ctx.pop()?;
    let size = ctx.pop()?;
    let words = read_words(ctx, &offset, &size).unwrap_or_default();
    ctx.halt_with(Instruction::Return { offset, size, words });
    Ok(())
}

pub(super) fn revert(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let offset = ctx.pop()?;
    let size = ctx.pop()?;
    let reason = offset_of(&offset).and_then(|off| revert_reason(ctx, off));
    ctx.halt_with(Instruction::Revert { offset, size, reason });
    Ok(())
}

/// Decode an `Error(string)` payload laid out as the compiler writes it:
/// selector word at `off`, data offset at `off + 4`, length at `off + 36`,
/// text from `off + 68`.
fn revert_reason(ctx: &ExecutionContext, off: usize) -> Option<String> {
    let head = read_word(ctx, off).as_val()?;
    if (head >> 224).low_u32() != ERROR_SELECTOR {
        return None;
    }
    let len = read_word(ctx, off + 36).as_usize()?;
    if len > 32 * MAX_WORDS {
        return None;
    }
    let mut bytes = Vec::with_capacity(len);
    let mut at = off + 68;
    while bytes.len() < len {
        let word: U256 = read_word(ctx, at).as_val()?;
        let mut buf = [0u8; 32];
        word.to_big_endian(&mut buf);
        bytes.extend_from_slice(&buf);
        at += 32;
    }
    bytes.truncate(len);
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

pub(super) fn invalid(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let reason = if record.opcode == INVALID {
        "invalid opcode".to_string()
    } else {
        format!("unassigned opcode 0x{:02x}", record.opcode)
    };
    ctx.halt_with(Instruction::Invalid { reason });
    Ok(())
}

pub(super) fn selfdestruct(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let beneficiary = ctx.pop()?;
    ctx.halt_with(Instruction::SelfDestruct { beneficiary });
    Ok(())
}
