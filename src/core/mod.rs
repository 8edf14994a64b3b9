//! Value-level support for the opcode handlers.

pub mod algebra;
pub mod arithmetic;
pub mod masks;
