//! Interpreter and default handler tests, driven through the public
//! context API.

use ceres::context::ExecutionContext;
use ceres::decompiler::DecompilerConfig;
use ceres::errors::VmError;
use ceres::expr::Expr;
use ceres::handlers::HandlerTable;
use ceres::instruction::{walk, Instruction};
use ceres::loader::{decode, Bytecode, OpcodeRecord};
use ceres::utils::opcodes::Mnemonic;
use ceres::utils::signatures::Signatures;
use ceres::vm;
use primitive_types::U256;
use std::rc::Rc;
use std::sync::Arc;

fn run_with(hex: &str, handlers: HandlerTable, config: &DecompilerConfig) -> Result<ExecutionContext, VmError> {
    let sigs = Arc::new(Signatures::empty());
    let code = Bytecode::from_hex(hex).unwrap();
    let program = Rc::new(decode(code.as_bytes(), &sigs));
    let mut ctx = ExecutionContext::new(program, sigs, Rc::new(handlers), config);
    vm::run(&mut ctx)?;
    Ok(ctx)
}

fn run(hex: &str) -> ExecutionContext {
    run_with(hex, HandlerTable::standard(), &DecompilerConfig::default()).unwrap()
}

#[test]
fn test_concrete_arithmetic() {
    // PUSH1 3 PUSH1 5 SUB PUSH1 2 EXP STOP  → (5 - 3) ** 2
    let ctx = run("600360050360020a00");
    assert_eq!(ctx.stack.items(), &[Expr::val(4)]);
}

#[test]
fn test_symbolic_arithmetic_builds_nodes() {
    // CALLER PUSH1 1 ADD STOP
    let ctx = run("3360010100");
    assert_eq!(ctx.stack.items(), &[Expr::node2("add", Expr::val(1), Expr::atom("caller"))]);
}

#[test]
fn test_memory_round_trip() {
    // PUSH1 42 PUSH1 0x40 MSTORE PUSH1 0x40 MLOAD STOP
    let ctx = run("602a60405260405100");
    assert_eq!(ctx.stack.peek(), Some(&Expr::val(42)));
}

#[test]
fn test_unwritten_memory_is_symbolic() {
    // PUSH1 0x80 MLOAD STOP
    let ctx = run("60805100");
    assert_eq!(ctx.stack.peek().and_then(Expr::opcode), Some("mem"));
}

#[test]
fn test_overlapping_mstore_merges_concrete_bytes() {
    // MSTORE(0, MAX) MSTORE(16, MAX) MLOAD(0)
    let ctx = run(concat!("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff600052", "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff601052", "60005100"));
    assert_eq!(ctx.stack.peek(), Some(&Expr::Val(U256::MAX)));
    assert_eq!(ctx.memory.get(&16), Some(&Expr::Val(U256::MAX)));
}

#[test]
fn test_mstore8_patches_one_byte() {
    // MSTORE(0, MAX) MSTORE8(5, 0) MLOAD(0)
    let ctx = run(concat!("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff600052", "6000600553", "60005100"));
    let expected = U256::MAX & !(U256::from(0xffu64) << (8 * 26));
    assert_eq!(ctx.stack.peek(), Some(&Expr::Val(expected)));
}

#[test]
fn test_partial_overwrite_of_symbolic_word_is_forgotten() {
    // MSTORE(0, CALLER) MSTORE(16, 1) MLOAD(0)
    let ctx = run(concat!("33600052", "6001601052", "60005100"));
    assert_eq!(ctx.stack.peek().and_then(Expr::opcode), Some("mem"));
    assert_eq!(ctx.memory.get(&16), Some(&Expr::val(1)));
}

#[test]
fn test_sload_records_variable() {
    // PUSH1 3 SLOAD STOP
    let ctx = run("60035400");
    assert!(ctx.variables.contains_key(&"3".to_string()));
    assert_eq!(ctx.stack.peek(), Some(&Expr::node1("storage", Expr::val(3))));
}

#[test]
fn test_sstore_then_sload_sees_value() {
    // PUSH1 7 PUSH1 1 SSTORE PUSH1 1 SLOAD STOP
    let ctx = run("600760015560015400");
    assert_eq!(ctx.stack.peek(), Some(&Expr::val(7)));
    assert!(matches!(ctx.instructions[0], Instruction::Store { .. }));
}

#[test]
fn test_sha3_of_key_and_slot_is_mapping() {
    // CALLER PUSH1 0 MSTORE PUSH1 2 PUSH1 0x20 MSTORE PUSH1 0x40 PUSH1 0 SHA3 SLOAD STOP
    let ctx = run("33600052600260205260406000205400");
    let mapping = ctx.mappings.get(&"2".to_string()).unwrap();
    assert!(mapping.keys.contains("caller"));
    assert_eq!(
        ctx.stack.peek(),
        Some(&Expr::node1("storage", Expr::node2("mapping", Expr::val(2), Expr::atom("caller"))))
    );
}

#[test]
fn test_revert_reason_decoded() {
    // MSTORE(0, selector) MSTORE(4, 0x20) MSTORE(0x24, 4) MSTORE(0x44, "nope") REVERT(0, 0x64)
    let pad = "00".repeat(28);
    let ctx = run(&format!(
        "7f08c379a0{pad}600052602060045260046024527f6e6f7065{pad}60445260646000fd"
    ));
    match ctx.instructions.as_slice() {
        [Instruction::Revert { reason, .. }] => assert_eq!(reason.as_deref(), Some("nope")),
        other => panic!("unexpected tree {other:?}"),
    }
}

#[test]
fn test_jump_to_non_jumpdest_is_invalid() {
    // PUSH1 3 JUMP STOP
    let ctx = run("60035600");
    assert_eq!(
        ctx.instructions,
        vec![Instruction::Invalid { reason: "bad jump destination".into() }]
    );
}

#[test]
fn test_concrete_jumpi_does_not_fork() {
    // PUSH1 1 PUSH1 6 JUMPI INVALID JUMPDEST STOP
    let ctx = run("6001600657fe5b00");
    assert_eq!(ctx.instructions, vec![Instruction::Stop]);
    assert_eq!(ctx.budget().forks(), 0);
}

#[test]
fn test_symbolic_jumpi_builds_branch() {
    // CALLVALUE PUSH1 5 JUMPI STOP JUMPDEST PUSH1 0 DUP1 REVERT
    let ctx = run("34600557005b600080fd");
    match ctx.instructions.as_slice() {
        [Instruction::Branch { condition, taken, not_taken }] => {
            assert_eq!(condition, &Expr::atom("callvalue"));
            assert!(matches!(taken.as_slice(), [Instruction::Revert { .. }]));
            assert_eq!(not_taken, &vec![Instruction::Stop]);
        }
        other => panic!("unexpected tree {other:?}"),
    }
    assert_eq!(ctx.budget().forks(), 2);
}

#[test]
fn test_unconditional_loop_is_cut() {
    // JUMPDEST PUSH1 0 JUMP
    let ctx = run("5b600056");
    assert_eq!(ctx.instructions, vec![Instruction::Loop { target: 0 }]);
}

#[test]
fn test_loop_revisits_allowance() {
    // JUMPDEST CALLDATALOAD(0) PUSH1 0 JUMPI STOP
    let config = DecompilerConfig { loop_revisits: 0, ..Default::default() };
    let ctx = run_with("5b60003560005700", HandlerTable::standard(), &config).unwrap();
    let mut loops = 0;
    walk(&ctx.instructions, &mut |i| {
        if matches!(i, Instruction::Loop { .. }) {
            loops += 1;
        }
    });
    assert_eq!(loops, 1);
}

#[test]
fn test_log_registers_event() {
    // PUSH32 <topic> PUSH1 0 PUSH1 0 LOG1 STOP
    let topic = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
    let sigs = Arc::new(Signatures::empty().with_event("Transfer(address,address,uint256)"));
    let code = Bytecode::from_hex(&format!("7f{topic}60006000a100")).unwrap();
    let program = Rc::new(decode(code.as_bytes(), &sigs));
    let mut ctx = ExecutionContext::new(
        program,
        sigs,
        Rc::new(HandlerTable::standard()),
        &DecompilerConfig::default(),
    );
    vm::run(&mut ctx).unwrap();
    let event = ctx.events.get(&format!("0x{topic}")).unwrap();
    assert_eq!(event.label, "Transfer(address,address,uint256)");
    assert_eq!(event.indexed_count, 0);
}

#[test]
fn test_call_pushes_result_atom() {
    // PUSH1 0 DUP1 DUP1 DUP1 DUP1 CALLER GAS CALL STOP
    let ctx = run("600080808080335af100");
    assert_eq!(ctx.stack.peek(), Some(&Expr::atom("call_result_8")));
    assert!(matches!(ctx.instructions[0], Instruction::Call { .. }));
}

#[test]
fn test_custom_handler() {
    fn loud_stop(_: &OpcodeRecord, ctx: &mut ExecutionContext) -> Result<(), VmError> {
        ctx.halt_with(Instruction::Invalid { reason: "custom".into() });
        Ok(())
    }
    let mut table = HandlerTable::standard();
    table.register(Mnemonic::Stop, loud_stop);
    let ctx = run_with("00", table, &DecompilerConfig::default()).unwrap();
    assert_eq!(ctx.instructions, vec![Instruction::Invalid { reason: "custom".into() }]);
}

#[test]
fn test_empty_table_fails_on_first_record() {
    let err = run_with("6001", HandlerTable::empty(), &DecompilerConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "unknown opcode PUSH1 at offset 0x0");
}
