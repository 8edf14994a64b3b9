//! Decompilation orchestrator.
//!
//! A [`Decompiler`] owns one bytecode. Decoding is memoized by its loader;
//! symbolic exploration runs once on first demand and is kept until
//! [`Decompiler::reset`]. Static queries (signatures, metadata, opcode
//! presence) never need exploration.

use crate::abi::{build_abi, AbiEntry};
use crate::context::ExecutionContext;
use crate::contract::{Decompilation, ExplorationStats};
use crate::errors::{LoaderError, ScanError, VmError};
use crate::handlers::HandlerTable;
use crate::instruction::Instruction;
use crate::loader::{Bytecode, Loader, OpcodeRecord};
use crate::scanner::{self, OpcodeQuery};
use crate::utils::signatures::{self, Signatures};
use crate::vm;
use anyhow::{Context, Result};
use std::rc::Rc;
use std::sync::Arc;

/// Signature of the ERC-165 interface query.
const ERC165_SIGNATURE: &str = "supportsInterface(bytes4)";

/// Which edge of a symbolic branch is explored first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExplorationOrder {
    #[default]
    TakenFirst,
    FallthroughFirst,
}

/// Configuration for the decompiler.
#[derive(Debug, Clone)]
pub struct DecompilerConfig {
    /// Deepest fork layer; branches below it are truncated.
    pub max_depth: usize,
    /// Total forks per decompilation.
    pub max_forks: usize,
    /// Total interpreted records per decompilation.
    pub max_steps: usize,
    /// Extra traversals of one jump edge a path may make before it is
    /// treated as a loop.
    pub loop_revisits: usize,
    /// Wall-clock budget; 0 disables it.
    pub timeout_secs: u64,
    pub order: ExplorationOrder,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_forks: 4096,
            max_steps: 200_000,
            loop_revisits: 1,
            timeout_secs: 60,
            order: ExplorationOrder::TakenFirst,
        }
    }
}

/// Decompiler for one contract bytecode.
pub struct Decompiler {
    loader: Loader,
    config: DecompilerConfig,
    handlers: Rc<HandlerTable>,
    explored: Option<ExecutionContext>,
}

impl Decompiler {
    /// Decompiler over `bytecode` with the bundled dictionary and default
    /// configuration.
    pub fn new(bytecode: Bytecode) -> Self {
        Self {
            loader: Loader::new(bytecode, Signatures::embedded()),
            config: DecompilerConfig::default(),
            handlers: Rc::new(HandlerTable::standard()),
            explored: None,
        }
    }

    pub fn from_hex(source: &str) -> Result<Self, LoaderError> {
        Ok(Self::new(Bytecode::from_hex(source)?))
    }

    pub fn with_config(mut self, config: DecompilerConfig) -> Self {
        self.config = config;
        self.explored = None;
        self
    }

    /// Use another dictionary. Decoding depends on it, so the decode cache
    /// starts over.
    pub fn with_signatures(mut self, signatures: Arc<Signatures>) -> Self {
        self.loader = Loader::new(self.loader.bytecode().clone(), signatures);
        self.explored = None;
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = Rc::new(handlers);
        self.explored = None;
        self
    }

    pub fn config(&self) -> &DecompilerConfig {
        &self.config
    }

    /// The input as `0x`-prefixed lowercase hex.
    pub fn bytecode(&self) -> String {
        self.loader.bytecode().to_hex()
    }

    /// The decoded records, recovered hidden constants last.
    pub fn opcodes(&self) -> Vec<OpcodeRecord> {
        self.loader.program().records().to_vec()
    }

    /// Function signatures recovered from `PUSH4` payloads.
    pub fn functions(&self) -> Vec<String> {
        signatures::recovered_functions(&self.loader.program(), self.loader.signatures())
    }

    /// Event signatures recovered from `PUSH32` payloads.
    pub fn events(&self) -> Vec<String> {
        signatures::recovered_events(&self.loader.program(), self.loader.signatures())
    }

    pub fn is_erc165(&self) -> bool {
        self.functions().iter().any(|f| f == ERC165_SIGNATURE)
    }

    pub fn contains_opcode(&self, opcode: impl Into<OpcodeQuery>) -> Result<bool, ScanError> {
        scanner::contains_opcode(self.loader.bytecode().as_bytes(), opcode)
    }

    /// Byte offsets of every decoded `JUMPDEST`.
    pub fn jump_destinations(&self) -> Vec<usize> {
        self.loader.program().jump_destinations()
    }

    pub fn swarm_hash(&self) -> Option<String> {
        scanner::swarm_hash(self.loader.bytecode().as_bytes())
    }

    pub fn disassemble(&self) -> Vec<String> {
        self.loader.program().disasm()
    }

    /// Run the symbolic exploration if it has not run yet.
    fn explore(&mut self) -> Result<&ExecutionContext, VmError> {
        let ctx = match self.explored.take() {
            Some(ctx) => ctx,
            None => {
                let mut ctx = ExecutionContext::new(
                    self.loader.program(),
                    Arc::clone(self.loader.signatures()),
                    Rc::clone(&self.handlers),
                    &self.config,
                );
                vm::run(&mut ctx)?;
                log::debug!(
                    "explored {} steps, {} forks, {} functions",
                    ctx.budget().steps(),
                    ctx.budget().forks(),
                    ctx.functions.len()
                );
                ctx
            }
        };
        let ctx: &ExecutionContext = self.explored.insert(ctx);
        Ok(ctx)
    }

    /// The instruction tree. Explores on the first call only.
    pub fn parse(&mut self) -> Result<&[Instruction], VmError> {
        Ok(self.explore()?.instructions.as_slice())
    }

    /// ABI entries for the functions and events found while exploring.
    pub fn abi(&mut self) -> Result<Vec<AbiEntry>, VmError> {
        let ctx = self.explore()?;
        Ok(build_abi(&ctx.functions.snapshot(), &ctx.events.snapshot()))
    }

    /// Drop the exploration result; the decode cache is kept.
    pub fn reset(&mut self) {
        self.explored = None;
    }

    pub fn decompile(&mut self) -> Result<Decompilation, VmError> {
        let recovered_functions = self.functions();
        let recovered_events = self.events();
        let erc165 = recovered_functions.iter().any(|f| f == ERC165_SIGNATURE);
        let bytecode = self.bytecode();
        let swarm_hash = self.swarm_hash();

        let ctx = self.explore()?;
        let functions = ctx.functions.snapshot();
        let events = ctx.events.snapshot();
        let abi = build_abi(&functions, &events);
        Ok(Decompilation {
            bytecode,
            swarm_hash,
            recovered_functions,
            recovered_events,
            erc165,
            functions,
            events,
            variables: ctx.variables.snapshot(),
            mappings: ctx.mappings.snapshot(),
            abi,
            stats: ExplorationStats {
                forks: ctx.budget().forks(),
                steps: ctx.budget().steps(),
                gas_used: ctx.gas_used,
            },
            instructions: ctx.instructions.clone(),
        })
    }
}

/// Decompile hex bytecode with the bundled dictionary.
pub fn decompile_bytecode(hex_code: &str, config: &DecompilerConfig) -> Result<Decompilation> {
    let bytecode = Bytecode::from_hex(hex_code).context("failed to load bytecode")?;
    if bytecode.is_empty() {
        anyhow::bail!("empty bytecode");
    }
    Decompiler::new(bytecode)
        .with_config(config.clone())
        .decompile()
        .context("decompilation failed")
}
