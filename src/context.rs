//! Execution context of one symbolic path, and forking.
//!
//! Per-path state (stack, memory, storage writes, jump counts, condition
//! trail) is copied on fork. Discovery maps (mappings, functions, variables,
//! events), the decoded program and the exploration budget are shared
//! handles, so a signature found on one path is immediately visible to every
//! other path.

use crate::decompiler::{DecompilerConfig, ExplorationOrder};
use crate::errors::StackError;
use crate::expr::Expr;
use crate::function::{Event, Function, Mapping, Variable};
use crate::handlers::HandlerTable;
use crate::instruction::Instruction;
use crate::loader::Program;
use crate::stack::Stack;
use crate::utils::signatures::Signatures;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Shared discovery maps
// ---------------------------------------------------------------------------

/// A map shared by every fork of one decompilation.
///
/// Exploration is single-threaded and depth-first, so `Rc<RefCell<_>>` is
/// enough; no borrow is held across a handler call.
#[derive(Debug)]
pub struct SharedMap<K, V>(Rc<RefCell<BTreeMap<K, V>>>);

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<K, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(BTreeMap::new())))
    }
}

impl<K: Ord + Clone, V: Clone> SharedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present. Returns whether it was
    /// inserted. Discovery maps only grow through this, which keeps their
    /// final content independent of exploration order.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut map = self.0.borrow_mut();
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, value);
        true
    }

    /// Overwrite an entry (storage writes).
    pub fn insert(&self, key: K, value: V) {
        self.0.borrow_mut().insert(key, value);
    }

    /// Mutate the entry for `key`, creating it with `init` first if needed.
    pub fn update_with(&self, key: K, init: impl FnOnce() -> V, f: impl FnOnce(&mut V)) {
        let mut map = self.0.borrow_mut();
        f(map.entry(key).or_insert_with(init));
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.0.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copy of the current content, in key order.
    pub fn snapshot(&self) -> BTreeMap<K, V> {
        self.0.borrow().clone()
    }

    /// `true` if both handles point to the same map.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ---------------------------------------------------------------------------
// Exploration budget
// ---------------------------------------------------------------------------

/// Work limits shared by every path of one decompilation.
#[derive(Debug)]
pub struct Budget {
    max_depth: usize,
    max_forks: usize,
    max_steps: usize,
    deadline: Option<Instant>,
    forks: Cell<usize>,
    steps: Cell<usize>,
    exhausted: Cell<Option<&'static str>>,
}

impl Budget {
    pub fn new(config: &DecompilerConfig) -> Self {
        let deadline = (config.timeout_secs > 0)
            .then(|| Instant::now() + Duration::from_secs(config.timeout_secs));
        Self {
            max_depth: config.max_depth,
            max_forks: config.max_forks,
            max_steps: config.max_steps,
            deadline,
            forks: Cell::new(0),
            steps: Cell::new(0),
            exhausted: Cell::new(None),
        }
    }

    /// Account for one interpreted record. Returns the reason once the step
    /// or time budget is spent; every later call returns it too.
    pub fn tick(&self) -> Option<&'static str> {
        if let Some(reason) = self.exhausted.get() {
            return Some(reason);
        }
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        let reason = if steps > self.max_steps {
            Some("step budget exhausted")
        } else if steps % 1024 == 0 && self.deadline.map_or(false, |d| Instant::now() >= d) {
            Some("timeout")
        } else {
            None
        };
        if let Some(reason) = reason {
            log::warn!("exploration stopped after {steps} steps: {reason}");
            self.exhausted.set(Some(reason));
        }
        reason
    }

    /// Reserve one two-way fork at `layer`, or say why not.
    pub fn try_fork(&self, layer: usize) -> Result<(), &'static str> {
        if layer >= self.max_depth {
            return Err("fork depth limit reached");
        }
        if self.forks.get() + 2 > self.max_forks {
            return Err("fork limit reached");
        }
        self.forks.set(self.forks.get() + 2);
        Ok(())
    }

    pub fn forks(&self) -> usize {
        self.forks.get()
    }

    pub fn steps(&self) -> usize {
        self.steps.get()
    }
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Everything a handler may read or mutate on one path.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Index into the decoded records (not a byte offset).
    pub pc: usize,
    pub stack: Stack,
    /// Concrete byte offset → word written there.
    pub memory: BTreeMap<usize, Expr>,
    /// Slot → value written by `SSTORE` on this path.
    pub storage: BTreeMap<Expr, Expr>,
    /// Jump edge `(from, to)` in byte offsets → times taken on this path.
    pub jumps: HashMap<(usize, usize), usize>,
    pub mappings: SharedMap<String, Mapping>,
    /// Fork depth; 0 for the root context.
    pub layer: usize,
    pub halted: bool,
    pub gas_used: u64,
    /// Conditions assumed to reach this path, outermost first.
    pub conditions: Vec<Expr>,
    pub functions: SharedMap<String, Function>,
    pub variables: SharedMap<String, Variable>,
    pub events: SharedMap<String, Event>,
    pub instructions: Vec<Instruction>,
    program: Rc<Program>,
    signatures: Arc<Signatures>,
    handlers: Rc<HandlerTable>,
    budget: Rc<Budget>,
    order: ExplorationOrder,
    loop_revisits: usize,
}

impl ExecutionContext {
    /// Root context of a decompilation.
    pub fn new(
        program: Rc<Program>,
        signatures: Arc<Signatures>,
        handlers: Rc<HandlerTable>,
        config: &DecompilerConfig,
    ) -> Self {
        Self {
            pc: 0,
            stack: Stack::new(),
            memory: BTreeMap::new(),
            storage: BTreeMap::new(),
            jumps: HashMap::new(),
            mappings: SharedMap::new(),
            layer: 0,
            halted: false,
            gas_used: 0,
            conditions: Vec::new(),
            functions: SharedMap::new(),
            variables: SharedMap::new(),
            events: SharedMap::new(),
            instructions: Vec::new(),
            program,
            signatures,
            handlers,
            budget: Rc::new(Budget::new(config)),
            order: config.order,
            loop_revisits: config.loop_revisits,
        }
    }

    /// New context for exploring one edge of a branch: per-path state is
    /// copied, shared maps are referenced, `layer` grows by one and the
    /// instruction list starts empty.
    pub fn fork(&self) -> Self {
        Self {
            pc: self.pc,
            stack: self.stack.clone(),
            memory: self.memory.clone(),
            storage: self.storage.clone(),
            jumps: self.jumps.clone(),
            mappings: self.mappings.clone(),
            layer: self.layer + 1,
            halted: false,
            gas_used: self.gas_used,
            conditions: self.conditions.clone(),
            functions: self.functions.clone(),
            variables: self.variables.clone(),
            events: self.events.clone(),
            instructions: Vec::new(),
            program: Rc::clone(&self.program),
            signatures: Arc::clone(&self.signatures),
            handlers: Rc::clone(&self.handlers),
            budget: Rc::clone(&self.budget),
            order: self.order,
            loop_revisits: self.loop_revisits,
        }
    }

    /// [`fork`](Self::fork) with `condition` appended to the trail.
    pub fn fork_on(&self, condition: Expr) -> Self {
        let mut child = self.fork();
        child.conditions.push(condition);
        child
    }

    /// Halted, or no record left to execute.
    pub fn is_terminal(&self) -> bool {
        self.halted || self.pc >= self.program.len()
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    pub fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn order(&self) -> ExplorationOrder {
        self.order
    }

    // -- Handler conveniences --------------------------------------------

    pub fn push(&mut self, value: Expr) -> Result<(), StackError> {
        self.stack.push(value)
    }

    pub fn pop(&mut self) -> Result<Expr, StackError> {
        self.stack.try_pop()
    }

    /// Pop `n` values, top first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Expr>, StackError> {
        self.stack.pop_n(n)
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Emit a terminal instruction and stop this path.
    pub fn halt_with(&mut self, instruction: Instruction) {
        self.emit(instruction);
        self.halted = true;
    }

    /// Count one traversal of the jump edge `from → to`. Returns `false` once
    /// the edge has been taken more often than the loop allowance.
    pub fn take_edge(&mut self, from: usize, to: usize) -> bool {
        let count = self.jumps.entry((from, to)).or_insert(0);
        *count += 1;
        *count <= self.loop_revisits + 1
    }
}
