//! Word-granular path memory.
//!
//! Only writes at concrete offsets are tracked. Reads that miss yield a
//! `mem(range(offset, size))` node.

use crate::context::ExecutionContext;
use crate::core::algebra;
use crate::errors::VmError;
use crate::expr::Expr;
use crate::loader::OpcodeRecord;
use crate::utils::opcodes::Mnemonic;
use primitive_types::U256;

pub(super) const WORD: usize = 32;
/// Upper bound on words materialized for one copy or read-back.
pub(super) const MAX_WORDS: usize = 64;
/// Concrete offsets above this are treated like symbolic ones.
const MEMORY_LIMIT: usize = u32::MAX as usize;

/// A concrete offset small enough to track.
pub(super) fn offset_of(e: &Expr) -> Option<usize> {
    e.as_usize().filter(|&offset| offset <= MEMORY_LIMIT)
}

pub(super) fn mem_range(offset: Expr, size: Expr) -> Expr {
    Expr::node1("mem", Expr::node2("range", offset, size))
}

pub(super) fn read_word(ctx: &ExecutionContext, offset: usize) -> Expr {
    ctx.memory
        .get(&offset)
        .cloned()
        .unwrap_or_else(|| mem_range(Expr::val(offset as u64), Expr::val(WORD as u64)))
}

/// The words covering `[offset, offset + size)`, when both are concrete and
/// the range is small enough to materialize.
pub(super) fn read_words(ctx: &ExecutionContext, offset: &Expr, size: &Expr) -> Option<Vec<Expr>> {
    let (offset, size) = (offset_of(offset)?, size.as_usize()?);
    let count = size.div_ceil(WORD);
    if count > MAX_WORDS {
        return None;
    }
    Some((0..count).map(|i| read_word(ctx, offset + i * WORD)).collect())
}

/// Forget every word overlapping `[offset, offset + len)`.
fn clobber(ctx: &mut ExecutionContext, offset: usize, len: usize) {
    for key in overlapping(ctx, offset, len) {
        ctx.memory.remove(&key);
    }
}

fn overlapping(ctx: &ExecutionContext, offset: usize, len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let start = offset.saturating_sub(WORD - 1);
    let end = offset.saturating_add(len);
    ctx.memory.range(start..end).map(|(k, _)| *k).collect()
}

/// Overwrite `[offset, offset + len)` inside the words it overlaps. A
/// concrete word takes the concrete `bytes` in place; any other overlap is
/// forgotten.
fn patch(ctx: &mut ExecutionContext, offset: usize, bytes: Option<&[u8]>, len: usize) {
    for key in overlapping(ctx, offset, len) {
        let merged = match (ctx.memory.get(&key).and_then(Expr::as_val), bytes) {
            (Some(old), Some(bytes)) => {
                let mut buf = [0u8; WORD];
                old.to_big_endian(&mut buf);
                for (i, b) in bytes.iter().enumerate() {
                    if let Some(pos) = (offset + i).checked_sub(key).filter(|&p| p < WORD) {
                        buf[pos] = *b;
                    }
                }
                Some(Expr::Val(U256::from_big_endian(&buf)))
            }
            _ => None,
        };
        match merged {
            Some(word) => ctx.memory.insert(key, word),
            None => ctx.memory.remove(&key),
        };
    }
}

pub(super) fn write_word(ctx: &mut ExecutionContext, offset: usize, value: Expr) {
    let bytes = value.as_val().map(|v| {
        let mut buf = [0u8; WORD];
        v.to_big_endian(&mut buf);
        buf
    });
    patch(ctx, offset, bytes.as_ref().map(|b| b.as_slice()), WORD);
    ctx.memory.insert(offset, value);
}

pub(super) fn mload(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let offset = ctx.pop()?;
    let value = match offset_of(&offset) {
        Some(off) => read_word(ctx, off),
        None => mem_range(offset, Expr::val(WORD as u64)),
    };
    ctx.push(value)?;
    Ok(())
}

/// `MSTORE` tracks the word; `MSTORE8` patches the byte into what it overlaps.
pub(super) fn mstore(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let offset = ctx.pop()?;
    let value = ctx.pop()?;
    match (offset_of(&offset), record.mnemonic) {
        (Some(off), Mnemonic::Mstore) => write_word(ctx, off, value),
        (Some(off), _) => {
            let byte = value.as_val().map(|v| [v.low_u32() as u8]);
            patch(ctx, off, byte.as_ref().map(|b| b.as_slice()), 1);
        }
        (None, _) => log::debug!("untracked memory write at symbolic offset {offset}"),
    }
    Ok(())
}

/// `CALLDATACOPY`, `CODECOPY`, `RETURNDATACOPY`, `EXTCODECOPY`, `MCOPY`.
pub(super) fn copy(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let account = if record.mnemonic == Mnemonic::Extcodecopy { Some(ctx.pop()?) } else { None };
    let dest = ctx.pop()?;
    let src = ctx.pop()?;
    let size = ctx.pop()?;

    let (Some(dest), Some(len)) = (offset_of(&dest), size.as_usize()) else {
        log::debug!("untracked {} to symbolic range", record.mnemonic);
        return Ok(());
    };
    let words = len.div_ceil(WORD);
    if words > MAX_WORDS {
        clobber(ctx, dest, len);
        return Ok(());
    }

    let mut copied = Vec::with_capacity(words);
    for i in 0..words {
        let at = algebra::fold(Mnemonic::Add, vec![src.clone(), Expr::val((i * WORD) as u64)]);
        let word = match (record.mnemonic, at.as_usize()) {
            (Mnemonic::Mcopy, Some(from)) => read_word(ctx, from),
            (Mnemonic::Mcopy, None) => mem_range(at, Expr::val(WORD as u64)),
            (Mnemonic::Calldatacopy, _) => Expr::node1("cd", at),
            (Mnemonic::Codecopy, _) => Expr::node1("code", at),
            (Mnemonic::Extcodecopy, _) => Expr::node(
                "extcode",
                vec![account.clone().unwrap_or_else(|| Expr::atom("?")), at],
            ),
            _ => Expr::node1("returndata", at),
        };
        copied.push(word);
    }
    clobber(ctx, dest, len);
    for (i, word) in copied.into_iter().enumerate() {
        ctx.memory.insert(dest + i * WORD, word);
    }
    Ok(())
}
