//! Logs, external calls and contract creation.

use crate::context::ExecutionContext;
use crate::errors::VmError;
use crate::expr::Expr;
use crate::function::Event;
use crate::instruction::Instruction;
use crate::loader::OpcodeRecord;
use crate::utils::helpers::word_hex;
use crate::utils::opcodes::Mnemonic;

/// `LOGn`. A concrete topic0 registers the event, labelled from the
/// dictionary or `Event_<first 4 bytes>()` when unknown.
pub(super) fn log(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let Mnemonic::Log(n) = record.mnemonic else {
        return Ok(());
    };
    let offset = ctx.pop()?;
    let size = ctx.pop()?;
    let topics = ctx.pop_n(n as usize)?;

    let mut label = None;
    if let Some(topic0) = topics.first().and_then(Expr::as_val) {
        let topic = format!("0x{}", word_hex(topic0));
        let name = ctx
            .signatures()
            .event(&topic)
            .map_or_else(|| format!("Event_{}()", &topic[2..10]), str::to_string);
        ctx.events.insert_if_absent(
            topic.clone(),
            Event { topic, label: name.clone(), indexed_count: (n as usize).saturating_sub(1) },
        );
        label = Some(name);
    }
    ctx.emit(Instruction::Log { topics, label, offset, size });
    Ok(())
}

/// `CALL`, `CALLCODE`, `DELEGATECALL`, `STATICCALL`.
pub(super) fn call(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let gas = ctx.pop()?;
    let address = ctx.pop()?;
    let value = match record.mnemonic {
        Mnemonic::Call | Mnemonic::Callcode => Some(ctx.pop()?),
        _ => None,
    };
    let input_offset = ctx.pop()?;
    let input_size = ctx.pop()?;
    let _return_offset = ctx.pop()?;
    let _return_size = ctx.pop()?;

    let result = Expr::Atom(format!("call_result_{}", record.pc));
    ctx.emit(Instruction::Call {
        opcode: record.name(),
        gas,
        address,
        value,
        input_offset,
        input_size,
        result: result.clone(),
    });
    ctx.push(result)?;
    Ok(())
}

/// `CREATE` and `CREATE2` (the salt is dropped).
pub(super) fn create(record: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
    let value = ctx.pop()?;
    let offset = ctx.pop()?;
    let size = ctx.pop()?;
    if record.mnemonic == Mnemonic::Create2 {
        ctx.pop()?;
    }
    let result = Expr::Atom(format!("create_result_{}", record.pc));
    ctx.emit(Instruction::Create {
        opcode: record.name(),
        value,
        offset,
        size,
        result: result.clone(),
    });
    ctx.push(result)?;
    Ok(())
}
