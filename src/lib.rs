//! Ceres — EVM bytecode decompiler
//!
//! Decodes contract bytecode (recovering selector and topic constants hidden
//! after `JUMP; STOP`), explores it symbolically by forking at every
//! conditional branch, and reconstructs the function/event signatures, ABI
//! and storage layout it finds along the way.

pub mod core;
pub mod utils;

pub mod abi;
pub mod context;
pub mod contract;
pub mod decompiler;
pub mod errors;
pub mod expr;
pub mod function;
pub mod handlers;
pub mod instruction;
pub mod loader;
pub mod scanner;
pub mod stack;
pub mod vm;
