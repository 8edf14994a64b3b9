//! Symbolic values carried on the operand stack, in memory and in storage.
//!
//! A value is either concrete (`Val`), a named environment atom such as
//! `caller`, or an operation node whose children are further values.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2^160 − 1, the address mask.
pub const ADDRESS_MASK: U256 = U256([u64::MAX, u64::MAX, u32::MAX as u64, 0]);
/// 2^32 − 1, the selector mask.
pub const SELECTOR_MASK: U256 = U256([u32::MAX as u64, 0, 0, 0]);

// -- Serde helpers for U256 --------------------------------------------------

mod u256_serde {
    use primitive_types::U256;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(val: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{val:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let hex_str = String::deserialize(d)?;
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(&hex_str);
        U256::from_str_radix(hex_str, 16).map_err(serde::de::Error::custom)
    }
}

/// A symbolic 256-bit value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    /// Concrete 256-bit value.
    Val(#[serde(with = "u256_serde")] U256),
    /// Boolean literal.
    Bool(bool),
    /// Symbolic atom: `caller`, `callvalue`, `call_result_12`...
    Atom(String),
    /// Operation node: `(op, children…)`.
    Node(String, Vec<Expr>),
}

impl Expr {
    pub fn val(v: u64) -> Self {
        Expr::Val(U256::from(v))
    }

    pub fn atom(s: &str) -> Self {
        Expr::Atom(s.to_string())
    }

    pub fn node(op: &str, children: Vec<Expr>) -> Self {
        Expr::Node(op.to_string(), children)
    }

    pub fn node1(op: &str, a: Expr) -> Self {
        Expr::Node(op.to_string(), vec![a])
    }

    pub fn node2(op: &str, a: Expr, b: Expr) -> Self {
        Expr::Node(op.to_string(), vec![a, b])
    }

    /// Build a concrete value from big-endian bytes, right-padding with
    /// zeros when fewer than `width` bytes are available.
    pub fn from_be_bytes(bytes: &[u8], width: usize) -> Self {
        let mut word = [0u8; 32];
        let width = width.min(32);
        let start = 32 - width;
        for (i, b) in bytes.iter().take(width).enumerate() {
            word[start + i] = *b;
        }
        Expr::Val(U256::from_big_endian(&word))
    }

    /// Return the operation name if this is a `Node`.
    pub fn opcode(&self) -> Option<&str> {
        match self {
            Expr::Node(op, _) => Some(op.as_str()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Node(_, ch) => ch.as_slice(),
            _ => &[],
        }
    }

    /// Concrete value, with booleans read as 0/1.
    pub fn as_val(&self) -> Option<U256> {
        match self {
            Expr::Val(v) => Some(*v),
            Expr::Bool(b) => Some(if *b { U256::one() } else { U256::zero() }),
            _ => None,
        }
    }

    /// Concrete value that fits a `usize` (offsets, sizes, jump targets).
    pub fn as_usize(&self) -> Option<usize> {
        match self.as_val() {
            Some(v) if v <= U256::from(usize::MAX as u64) => Some(v.low_u64() as usize),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.as_val().is_some()
    }

    /// Logical negation: unwraps an existing `iszero` instead of nesting.
    pub fn negated(&self) -> Expr {
        match self {
            Expr::Node(op, ch) if op == "iszero" && ch.len() == 1 => ch[0].clone(),
            Expr::Bool(b) => Expr::Bool(!b),
            other => Expr::node1("iszero", other.clone()),
        }
    }
}

impl From<U256> for Expr {
    fn from(v: U256) -> Self {
        Expr::Val(v)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Val(v) if *v <= U256::from(9999u64) => write!(f, "{v}"),
            Expr::Val(v) => write!(f, "0x{v:x}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Atom(s) => f.write_str(s),
            Expr::Node(op, children) => {
                write!(f, "{op}(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str(")")
            }
        }
    }
}
