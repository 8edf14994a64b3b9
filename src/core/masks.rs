//! Bitmask ↔ Solidity type inference.

use crate::core::algebra::is_predicate;
use crate::expr::Expr;
use primitive_types::U256;

/// Convert a mask size in bits to a Solidity type name.
pub fn mask_to_type(bits: u16) -> Option<&'static str> {
    const LOOKUP: &[(u16, &str)] = &[
        (1, "bool"),
        (8, "uint8"),
        (16, "uint16"),
        (32, "uint32"),
        (64, "uint64"),
        (128, "uint128"),
        (160, "address"),
        (256, "uint256"),
    ];
    LOOKUP.iter().find(|(b, _)| *b == bits).map(|(_, name)| *name)
}

/// Decompose `num` into a contiguous run of one bits: `(size, offset)` such
/// that `num == (2^size − 1) << offset`, or `None` if the ones are not
/// contiguous.
pub fn to_mask(num: U256) -> Option<(u16, u16)> {
    if num.is_zero() {
        return Some((0, 0));
    }
    let offset = num.trailing_zeros() as u16;
    let shifted = num >> offset as usize;
    let size = 256 - shifted.leading_zeros() as u16;
    // a contiguous run shifted down is 2^size − 1
    let full = if size == 256 { U256::MAX } else { (U256::one() << size as usize) - U256::one() };
    (shifted == full).then_some((size, offset))
}

/// Best-effort ABI type of a returned word.
pub fn type_of(word: &Expr) -> &'static str {
    if is_predicate(word) {
        return "bool";
    }
    if word.opcode() == Some("and") {
        let mask = word.children().iter().find_map(|c| c.as_val().and_then(to_mask));
        if let Some((size, 0)) = mask {
            if let Some(name) = mask_to_type(size) {
                return name;
            }
        }
    }
    "uint256"
}
