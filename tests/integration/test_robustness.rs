//! Robustness: malformed input, hostile control flow and exhausted budgets
//! must end in a well-formed result, never a panic.

use ceres::decompiler::{decompile_bytecode, Decompiler, DecompilerConfig};
use ceres::errors::VmError;
use ceres::handlers::HandlerTable;
use ceres::instruction::{walk, Instruction};
use ceres::loader::Bytecode;
use ceres::utils::opcodes::Mnemonic;

const TOKEN: &str = concat!(
    "60003560e01c806318160ddd14601f578063a9059cbb14602b5760006000fd",
    "5b60005460805260206080f3",
    "5b6024356004356000526001602052604060002055",
    "7fddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef60006000a100"
);

fn config() -> DecompilerConfig {
    DecompilerConfig { timeout_secs: 5, ..Default::default() }
}

fn count(tree: &[Instruction], pred: fn(&Instruction) -> bool) -> usize {
    let mut n = 0;
    walk(tree, &mut |i| {
        if pred(i) {
            n += 1;
        }
    });
    n
}

/// Deterministic byte source for fuzz-style inputs.
struct Lcg(u64);

impl Lcg {
    fn byte(&mut self) -> u8 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 56) as u8
    }
}

// =========================================================================
// Malformed input
// =========================================================================

#[test]
fn test_empty_input_is_error() {
    assert!(decompile_bytecode("", &config()).is_err());
    assert!(decompile_bytecode("0x", &config()).is_err());
}

#[test]
fn test_bad_hex_is_error() {
    assert!(decompile_bytecode("ZZZZ", &config()).is_err());
    assert!(decompile_bytecode("6001f", &config()).is_err());
}

#[test]
fn test_empty_bytecode_decompiles_to_stop() {
    let mut d = Decompiler::new(Bytecode::default());
    assert!(d.opcodes().is_empty());
    assert_eq!(d.parse().unwrap(), &[Instruction::Stop]);
}

#[test]
fn test_truncated_push_at_end() {
    let result = decompile_bytecode("7f0102", &config()).unwrap();
    assert_eq!(result.instructions, vec![Instruction::Stop]);
}

#[test]
fn test_unassigned_opcode_halts_path() {
    let result = decompile_bytecode("60010c", &config()).unwrap();
    assert_eq!(
        result.instructions,
        vec![Instruction::Invalid { reason: "unassigned opcode 0x0c".into() }]
    );
}

#[test]
fn test_stack_underflow_halts_path() {
    let result = decompile_bytecode("6000f3", &config()).unwrap();
    assert!(matches!(result.instructions.as_slice(), [Instruction::Invalid { .. }]));
}

#[test]
fn test_stack_overflow_halts_path() {
    // 1100 × PUSH1 1
    let result = decompile_bytecode(&"6001".repeat(1100), &config()).unwrap();
    match result.instructions.as_slice() {
        [Instruction::Invalid { reason }] => assert!(reason.contains("overflow")),
        other => panic!("unexpected tree {other:?}"),
    }
}

#[test]
fn test_huge_memory_offsets() {
    // PUSH1 1 PUSH8 ff..ff MSTORE PUSH1 64 PUSH8 ff..ff RETURN
    let hex = format!("6001 67{ff} 52 6040 67{ff} f3", ff = "ff".repeat(8)).replace(' ', "");
    let result = decompile_bytecode(&hex, &config()).unwrap();
    assert!(matches!(result.instructions.as_slice(), [Instruction::Return { words, .. }] if words.is_empty()));
}

// =========================================================================
// Hostile control flow
// =========================================================================

#[test]
fn test_dynamic_jump() {
    let result = decompile_bytecode("3356", &config()).unwrap();
    assert_eq!(result.instructions, vec![Instruction::Invalid { reason: "dynamic jump".into() }]);
}

#[test]
fn test_jump_into_push_data() {
    // PUSH1 4 JUMP PUSH1 0x5b: offset 4 is push data, not a JUMPDEST record
    let result = decompile_bytecode("600456605b00", &config()).unwrap();
    assert_eq!(
        result.instructions,
        vec![Instruction::Invalid { reason: "bad jump destination".into() }]
    );
}

#[test]
fn test_symbolic_loop_terminates() {
    let result = decompile_bytecode("5b60003560005700", &config()).unwrap();
    assert_eq!(count(&result.instructions, |i| matches!(i, Instruction::Loop { .. })), 1);
    assert_eq!(count(&result.instructions, |i| matches!(i, Instruction::Stop)), 3);
}

#[test]
fn test_branch_ladder_hits_depth_limit() {
    // 100 × (PUSH1 0 CALLDATALOAD PUSH2 next JUMPI JUMPDEST). Each JUMPI
    // targets the JUMPDEST right after it, so every level forks.
    let mut hex = String::new();
    for i in 0..100usize {
        let next = i * 8 + 7;
        hex.push_str(&format!("600035 61{next:04x} 57 5b").replace(' ', ""));
    }
    hex.push_str("00");
    let cfg = DecompilerConfig { max_depth: 8, ..config() };
    let mut d = Decompiler::from_hex(&hex).unwrap().with_config(cfg);
    let result = d.decompile().unwrap();
    assert!(count(&result.instructions, |i| matches!(i, Instruction::Truncated { .. })) > 0);
    assert!(result.stats.forks <= 2 * ((1 << 8) - 1));
}

#[test]
fn test_fork_budget() {
    let cfg = DecompilerConfig { max_forks: 2, ..config() };
    let result = Decompiler::from_hex(TOKEN).unwrap().with_config(cfg).decompile().unwrap();
    assert_eq!(result.stats.forks, 2);
    assert_eq!(count(&result.instructions, |i| matches!(i, Instruction::Truncated { .. })), 1);
    assert_eq!(result.functions.len(), 1);
}

#[test]
fn test_step_budget() {
    let cfg = DecompilerConfig { max_steps: 10, ..config() };
    let result = Decompiler::from_hex(TOKEN).unwrap().with_config(cfg).decompile().unwrap();
    assert!(count(&result.instructions, |i| matches!(i, Instruction::Truncated { .. })) >= 1);
    assert_eq!(result.stats.steps, 11);
}

// =========================================================================
// Fatal dispatch
// =========================================================================

#[test]
fn test_missing_handler_aborts_decompilation() {
    let mut table = HandlerTable::standard();
    table.remove(Mnemonic::Sstore);
    let mut d = Decompiler::from_hex(TOKEN).unwrap().with_handlers(table);
    match d.decompile() {
        Err(VmError::UnknownOpcode { pc, name }) => {
            assert_eq!(pc, 0x3f);
            assert_eq!(name, "SSTORE");
        }
        other => panic!("expected unknown opcode, got {:?}", other.map(|r| r.instructions)),
    }
    // static queries still work
    assert_eq!(d.functions().len(), 2);
}

#[test]
fn test_unknown_opcode_message() {
    let mut table = HandlerTable::standard();
    table.remove(Mnemonic::Push(1));
    let err = Decompiler::from_hex("600100").unwrap().with_handlers(table).decompile().unwrap_err();
    assert_eq!(err.to_string(), "unknown opcode PUSH1 at offset 0x0");
}

// =========================================================================
// Fuzz-style
// =========================================================================

#[test]
fn test_random_bytecode_never_fails() {
    let mut rng = Lcg(0x5eed);
    for round in 0..200 {
        let len = 1 + (rng.byte() as usize) * 2;
        let code: Vec<u8> = (0..len).map(|_| rng.byte()).collect();
        let cfg = DecompilerConfig { max_steps: 20_000, ..config() };
        let mut d = Decompiler::new(Bytecode::new(code).unwrap()).with_config(cfg);
        let result = d.decompile();
        assert!(result.is_ok(), "round {round}: {:?}", result.err());
    }
}
