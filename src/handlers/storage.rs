//! `SHA3` and storage access.
//!
//! Storage writes belong to the path that made them: an `SLOAD` sees values
//! stored earlier on its own path, never a sibling branch's.

use super::memory::{mem_range, read_words, WORD};
use crate::context::ExecutionContext;
use crate::errors::VmError;
use crate::expr::Expr;
use crate::function::{Mapping, Variable};
use crate::instruction::Instruction;
use crate::loader::OpcodeRecord;
use crate::utils::signatures::keccak256;
use primitive_types::U256;

/// Hash of `[offset, offset + size)`.
///
/// `keccak(key . slot)` with a concrete slot becomes `mapping(slot, key)` and
/// registers the key; `keccak(slot)` becomes `array(slot)`. Other fully
/// concrete inputs are hashed for real.
pub(super) fn sha3(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let offset = ctx.pop()?;
    let size = ctx.pop()?;

    let hashed = match (size.as_usize(), read_words(ctx, &offset, &size)) {
        (Some(64), Some(words)) if words[1].is_concrete() => {
            let (key, slot) = (words[0].clone(), words[1].clone());
            record_mapping(ctx, &slot, &key);
            Expr::node2("mapping", slot, key)
        }
        (Some(32), Some(words)) if words[0].is_concrete() => {
            Expr::node1("array", words[0].clone())
        }
        (Some(len), Some(words)) if words.iter().all(Expr::is_concrete) => {
            let mut bytes = Vec::with_capacity(words.len() * WORD);
            for word in &words {
                let mut buf = [0u8; WORD];
                word.as_val().unwrap_or_default().to_big_endian(&mut buf);
                bytes.extend_from_slice(&buf);
            }
            bytes.truncate(len);
            Expr::Val(U256::from_big_endian(&keccak256(&bytes)))
        }
        _ => Expr::node1("sha3", mem_range(offset, size)),
    };
    ctx.push(hashed)?;
    Ok(())
}

fn record_mapping(ctx: &ExecutionContext, slot: &Expr, key: &Expr) {
    let slot = slot.to_string();
    let key = key.to_string();
    ctx.mappings.update_with(
        slot.clone(),
        || Mapping { name: format!("mapping{slot}"), slot: slot.clone(), ..Default::default() },
        |m| {
            m.keys.insert(key);
        },
    );
}

fn record_variable(ctx: &ExecutionContext, slot: &Expr) {
    if slot.is_concrete() {
        ctx.variables.insert_if_absent(
            slot.to_string(),
            Variable { label: format!("var{slot}"), slot: slot.to_string() },
        );
    }
}

pub(super) fn sload(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let slot = ctx.pop()?;
    record_variable(ctx, &slot);
    let value = ctx
        .storage
        .get(&slot)
        .cloned()
        .unwrap_or_else(|| Expr::node1("storage", slot));
    ctx.push(value)?;
    Ok(())
}

pub(super) fn sstore(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let slot = ctx.pop()?;
    let value = ctx.pop()?;
    record_variable(ctx, &slot);
    ctx.storage.insert(slot.clone(), value.clone());
    ctx.emit(Instruction::Store { slot, value });
    Ok(())
}

pub(super) fn tload(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let slot = ctx.pop()?;
    ctx.push(Expr::node1("tload", slot))?;
    Ok(())
}

pub(super) fn tstore(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let slot = ctx.pop()?;
    let value = ctx.pop()?;
    ctx.emit(Instruction::TransientStore { slot, value });
    Ok(())
}
