//! Lumo Core - Execution engine (bytecode VM, unwind protocol, GC heap)
//!
//! This crate contains the runtime core only. It consumes compiled units
//! produced elsewhere and executes them; there is no source-language front
//! end here.
//!
//! # Architecture
//!
//! - `core`: pure data types (Value, Unit, OpCode, errors) with no IO
//! - `runtime`: the VM, the garbage-collected heap, root walking, streams
//! - `binary`: the on-disk unit container (.lumod / .lumor)

// lumo-log macros expand to alloc::format! so the alloc crate must be
// nameable here even though this crate is std.
extern crate alloc;

pub mod binary;
pub mod core;
pub mod runtime;

// Re-export the types embedders touch most.
pub use crate::core::{
    Constant, Fault, NativeId, OpCode, Raised, TokenId, TokenTable, Unit, Value,
};
pub use crate::runtime::{
    Cursor, Heap, HeapError, HeapId, HeapObj, HeapStats, Outcome, Resume, Vm,
};

// Re-export config vocabulary so embedders do not need a direct
// lumo-config dependency for the common path.
pub use lumo_config::{HeapConfig, Phase, RuntimeOptions, VmLimits};
