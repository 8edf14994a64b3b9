//! Properties that must hold for any input: decode coverage, idempotence,
//! independence from exploration order.

use ceres::decompiler::{Decompiler, DecompilerConfig, ExplorationOrder};
use ceres::loader::{decode, Bytecode};
use ceres::scanner::contains_opcode;
use ceres::utils::signatures::Signatures;

const TOKEN: &str = concat!(
    "60003560e01c806318160ddd14601f578063a9059cbb14602b5760006000fd",
    "5b60005460805260206080f3",
    "5b6024356004356000526001602052604060002055",
    "7fddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef60006000a100"
);

const ERC165: &str = "60003560e01c806301ffc9a714601157005b600160005260206000f3";

/// Nested symbolic branches over calldata, one of them writing storage.
const NESTED: &str = "60043515600c5760016000555b60243515601a576002600155005b00";

/// `transfer` stores a predicate in slot 0, `totalSupply` returns slot 0.
const SIBLING_STORE: &str = concat!(
    "60003560e01c806318160ddd14601f578063a9059cbb14602b5760006000fd",
    "5b60005460805260206080f3",
    "5b341560005500"
);

struct Lcg(u64);

impl Lcg {
    fn byte(&mut self) -> u8 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 56) as u8
    }

    fn bytes(&mut self, max: usize) -> Vec<u8> {
        let len = 1 + self.byte() as usize % max;
        (0..len).map(|_| self.byte()).collect()
    }
}

fn deterministic() -> DecompilerConfig {
    DecompilerConfig { timeout_secs: 0, max_steps: 20_000, ..Default::default() }
}

// =========================================================================
// Decode coverage
// =========================================================================

#[test]
fn test_decode_covers_every_byte() {
    let mut rng = Lcg(7);
    let sigs = Signatures::empty();
    for _ in 0..300 {
        let code = rng.bytes(256);
        let program = decode(&code, &sigs);
        let mut expected = 0;
        for record in program.records() {
            assert_eq!(record.pc, expected, "gap in decode of {}", hex::encode(&code));
            if let Some(data) = &record.push_data {
                let width = record.mnemonic.push_size();
                assert!(data.len() == width || record.pc + 1 + data.len() == code.len());
            } else {
                assert!(!record.mnemonic.is_push());
            }
            expected += record.size();
        }
        assert_eq!(expected, code.len());
    }
}

#[test]
fn test_duplicate_selector_reported_once() {
    let d = Decompiler::from_hex("63a9059cbb63a9059cbb00").unwrap();
    assert_eq!(d.functions(), vec!["transfer(address,uint256)"]);
}

// =========================================================================
// Idempotence
// =========================================================================

#[test]
fn test_decode_is_idempotent() {
    let mut rng = Lcg(11);
    for _ in 0..50 {
        let d = Decompiler::new(Bytecode::new(rng.bytes(128)).unwrap());
        assert_eq!(d.opcodes(), d.opcodes());
        assert_eq!(d.functions(), d.functions());
    }
}

#[test]
fn test_decompile_is_idempotent() {
    for hex in [TOKEN, ERC165, NESTED] {
        let first = Decompiler::from_hex(hex).unwrap().with_config(deterministic()).decompile().unwrap();
        let second = Decompiler::from_hex(hex).unwrap().with_config(deterministic()).decompile().unwrap();
        assert_eq!(first.to_json(), second.to_json());
    }
}

#[test]
fn test_random_decompile_is_idempotent() {
    let mut rng = Lcg(23);
    for _ in 0..40 {
        let code = rng.bytes(200);
        let run = || {
            Decompiler::new(Bytecode::new(code.clone()).unwrap())
                .with_config(deterministic())
                .decompile()
                .unwrap()
                .to_json()
        };
        assert_eq!(run(), run());
    }
}

#[test]
fn test_reset_reproduces_result() {
    let mut d = Decompiler::from_hex(TOKEN).unwrap().with_config(deterministic());
    let before = d.decompile().unwrap().to_json();
    d.reset();
    assert_eq!(d.decompile().unwrap().to_json(), before);
}

// =========================================================================
// Exploration order
// =========================================================================

#[test]
fn test_discoveries_independent_of_order() {
    for hex in [TOKEN, ERC165, NESTED, SIBLING_STORE] {
        let taken = Decompiler::from_hex(hex).unwrap().with_config(deterministic()).decompile().unwrap();
        let config = DecompilerConfig { order: ExplorationOrder::FallthroughFirst, ..deterministic() };
        let fallthrough = Decompiler::from_hex(hex).unwrap().with_config(config).decompile().unwrap();

        assert_eq!(
            taken.functions.keys().collect::<Vec<_>>(),
            fallthrough.functions.keys().collect::<Vec<_>>()
        );
        assert_eq!(taken.events.keys().collect::<Vec<_>>(), fallthrough.events.keys().collect::<Vec<_>>());
        assert_eq!(
            taken.variables.keys().collect::<Vec<_>>(),
            fallthrough.variables.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            taken.mappings.keys().collect::<Vec<_>>(),
            fallthrough.mappings.keys().collect::<Vec<_>>()
        );
        assert_eq!(taken.abi, fallthrough.abi);
    }
}

#[test]
fn test_sibling_store_does_not_leak_into_return_type() {
    for order in [ExplorationOrder::TakenFirst, ExplorationOrder::FallthroughFirst] {
        let config = DecompilerConfig { order, ..deterministic() };
        let result = Decompiler::from_hex(SIBLING_STORE).unwrap().with_config(config).decompile().unwrap();
        assert_eq!(result.functions["0x18160ddd"].returns, vec!["uint256"]);
        assert!(result.variables.contains_key("0"));
    }
}

#[test]
fn test_nested_branches_fork_at_every_level() {
    let result = Decompiler::from_hex(NESTED).unwrap().with_config(deterministic()).decompile().unwrap();
    assert_eq!(result.stats.forks, 6);
    assert!(result.functions.is_empty());
    assert_eq!(result.variables.keys().collect::<Vec<_>>(), vec!["0", "1"]);
}

// =========================================================================
// Reachability scan
// =========================================================================

#[test]
fn test_push_payload_is_never_reported() {
    let mut rng = Lcg(42);
    for _ in 0..100 {
        let target = rng.byte();
        // PUSH32 whose payload is entirely the target byte, then STOP.
        let mut code = vec![0x7f];
        code.extend(std::iter::repeat(target).take(32));
        code.push(0x00);
        let expected = target == 0x7f || target == 0x00;
        assert_eq!(contains_opcode(&code, target).unwrap(), expected, "target 0x{target:02x}");
    }
}
