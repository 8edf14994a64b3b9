//! Concrete EVM arithmetic, comparison and bitwise operations on `U256`.
//!
//! Signed operations use two's complement over the full 256 bits.

use crate::utils::opcodes::Mnemonic;
use primitive_types::{U256, U512};

const SIGN_BIT: U256 = U256([0, 0, 0, 1 << 63]);

fn is_negative(v: U256) -> bool {
    !(v & SIGN_BIT).is_zero()
}

fn negate(v: U256) -> U256 {
    (!v).overflowing_add(U256::one()).0
}

/// Magnitude of a two's-complement value.
fn abs(v: U256) -> U256 {
    if is_negative(v) { negate(v) } else { v }
}

fn flag(b: bool) -> U256 {
    if b { U256::one() } else { U256::zero() }
}

fn low_u256(v: U512) -> U256 {
    let limbs = v.0;
    U256([limbs[0], limbs[1], limbs[2], limbs[3]])
}

pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() { U256::zero() } else { a / b }
}

pub fn modulo(a: U256, b: U256) -> U256 {
    if b.is_zero() { U256::zero() } else { a % b }
}

/// SDIV: truncates toward zero; `MIN / -1` wraps to `MIN`.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let q = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) { negate(q) } else { q }
}

/// SMOD: the result takes the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let r = abs(a) % abs(b);
    if is_negative(a) { negate(r) } else { r }
}

pub fn addmod(a: U256, b: U256, m: U256) -> U256 {
    if m.is_zero() {
        return U256::zero();
    }
    low_u256((U512::from(a) + U512::from(b)) % U512::from(m))
}

pub fn mulmod(a: U256, b: U256, m: U256) -> U256 {
    if m.is_zero() {
        return U256::zero();
    }
    low_u256((U512::from(a) * U512::from(b)) % U512::from(m))
}

/// EXP modulo 2^256 by square-and-multiply.
pub fn exp(base: U256, exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut b = base;
    let mut e = exponent;
    while !e.is_zero() {
        if e.bit(0) {
            result = result.overflowing_mul(b).0;
        }
        e >>= 1;
        b = b.overflowing_mul(b).0;
    }
    result
}

/// SIGNEXTEND from the sign bit of byte `bytes` (counted from the right).
pub fn signextend(bytes: U256, value: U256) -> U256 {
    if bytes >= U256::from(31u64) {
        return value;
    }
    let bit = bytes.low_u64() as usize * 8 + 7;
    let low = (U256::one() << (bit + 1)) - U256::one();
    if value.bit(bit) { value | !low } else { value & low }
}

pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// BYTE: byte `position` of `value`, counted from the most significant.
pub fn byte_at(position: U256, value: U256) -> U256 {
    if position >= U256::from(32u64) {
        return U256::zero();
    }
    U256::from(value.byte(31 - position.low_u64() as usize))
}

pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u64) { U256::zero() } else { value << shift.low_u64() as usize }
}

pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u64) { U256::zero() } else { value >> shift.low_u64() as usize }
}

/// SAR: shift right, filling with the sign bit.
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256u64) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let n = shift.low_u64() as usize;
    let shifted = value >> n;
    if negative && n > 0 {
        shifted | !(U256::MAX >> n)
    } else {
        shifted
    }
}

/// Evaluate a pure stack operation over concrete operands, given in pop
/// order (top of stack first). Returns `None` for anything else or on an
/// arity mismatch.
pub fn eval(op: Mnemonic, args: &[U256]) -> Option<U256> {
    use Mnemonic::*;
    let v = match (op, args) {
        (Add, [a, b]) => a.overflowing_add(*b).0,
        (Mul, [a, b]) => a.overflowing_mul(*b).0,
        (Sub, [a, b]) => a.overflowing_sub(*b).0,
        (Div, [a, b]) => div(*a, *b),
        (Sdiv, [a, b]) => sdiv(*a, *b),
        (Mod, [a, b]) => modulo(*a, *b),
        (Smod, [a, b]) => smod(*a, *b),
        (Addmod, [a, b, m]) => addmod(*a, *b, *m),
        (Mulmod, [a, b, m]) => mulmod(*a, *b, *m),
        (Exp, [a, b]) => exp(*a, *b),
        (Signextend, [a, b]) => signextend(*a, *b),
        (Lt, [a, b]) => flag(a < b),
        (Gt, [a, b]) => flag(a > b),
        (Slt, [a, b]) => flag(slt(*a, *b)),
        (Sgt, [a, b]) => flag(slt(*b, *a)),
        (Eq, [a, b]) => flag(a == b),
        (Iszero, [a]) => flag(a.is_zero()),
        (And, [a, b]) => *a & *b,
        (Or, [a, b]) => *a | *b,
        (Xor, [a, b]) => *a ^ *b,
        (Not, [a]) => !*a,
        (Byte, [a, b]) => byte_at(*a, *b),
        (Shl, [a, b]) => shl(*a, *b),
        (Shr, [a, b]) => shr(*a, *b),
        (Sar, [a, b]) => sar(*a, *b),
        _ => return None,
    };
    Some(v)
}
