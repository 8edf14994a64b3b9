//! Static tables and shared helpers.

pub mod helpers;
pub mod opcodes;
pub mod signatures;
