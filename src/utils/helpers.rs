//! General helper utilities.

use primitive_types::U256;

/// Pad a hex value to `len` hex characters, `0x`-prefixed.
pub fn padded_hex(value: U256, len: usize) -> String {
    let hex = format!("{value:x}");
    if hex.len() > len {
        "?".repeat(len)
    } else {
        format!("0x{hex:0>len$}")
    }
}

/// A full 32-byte word as 64 lowercase hex characters, no prefix.
pub fn word_hex(value: U256) -> String {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    hex::encode(buf)
}

/// Split a parameter list at top-level commas, so tuple types such as
/// `(uint256,address)[]` stay in one piece. Empty input yields no items.
pub fn split_params(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in args.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() || !out.is_empty() {
        out.push(current.trim().to_string());
    }
    out
}
