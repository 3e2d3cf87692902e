//! Lumo Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Lumo crates.

use serde::{Deserialize, Serialize};

/// Configuration for the garbage-collected heap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapConfig {
    /// Maximum number of heap blocks the arena may hold
    pub max_blocks: usize,
}

/// Configuration for interpreter limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmLimits {
    /// Maximum operand-stack depth (fast locals included)
    pub max_stack_depth: usize,
    /// Maximum exception-handler nesting depth
    pub max_handler_depth: usize,
}

/// Optional runtime behavior toggles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Whether to print each dispatched instruction
    pub show_steps: bool,
    /// Whether to dump the loaded unit before execution
    pub dump_bytecode: bool,
    /// Whether to print heap statistics after execution
    pub mem_info: bool,
}

/// Execution phase enum for phase-specific configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loader,
    Vm,
    Heap,
}

impl Phase {
    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Loader => "loader",
            Phase::Vm => "vm",
            Phase::Heap => "heap",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("lumo::{}", self.as_str())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self { max_blocks: 4096 }
    }
}

impl Default for VmLimits {
    fn default() -> Self {
        Self {
            max_stack_depth: 1024,
            max_handler_depth: 64,
        }
    }
}
