//! Lumo API - Execution orchestration layer
//!
//! Provides unified execution interface, including:
//! - Execution flow orchestration (load, execute, settle)
//! - Configuration abstraction (RunConfig)
//! - Unified error handling (LumoError)
//!
//! For CLI convenience, this crate provides a global singleton API.
//! For library use, prefer the explicit `run_program(&program, &config)` API.
//! Hosts that drive coroutines or register natives use `lumo_core` directly.

extern crate alloc;

use std::path::Path;

use lumo_log::{debug, info};

use lumo_core::binary::load_program_file;
use lumo_core::{HeapObj, Outcome, Vm};

// Re-export config
pub mod config;
pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};

// Re-export config types from lumo_config
pub use lumo_config::{HeapConfig, Phase, RuntimeOptions, VmLimits};

// Re-export error and types
pub mod error;
pub mod types;
pub use error::{ErrorReport, LumoError};
pub use types::ExecuteOutput;

// Re-export core types
pub use lumo_config;
pub use lumo_core::binary::Program;
pub use lumo_core::{Unit, Value};

/// Load a compiled program from disk
pub fn load(path: impl AsRef<Path>, config: &RunConfig) -> Result<Program, LumoError> {
    let path = path.as_ref();
    info!(config.logger, "loading program from {}", path.display());

    let program = load_program_file(path)?;
    debug!(
        config.logger,
        "loaded {} unit(s), entry '{}', build mode {:?}",
        program.units.len(),
        program.entry().name,
        program.build_mode,
    );
    Ok(program)
}

/// Execute a loaded program with explicit configuration
///
/// This is the recommended API for library users.
pub fn run_program(program: &Program, config: &RunConfig) -> Result<ExecuteOutput, LumoError> {
    run_unit(program.entry(), config)
}

/// Execute a single unit with explicit configuration
pub fn run_unit(unit: &Unit, config: &RunConfig) -> Result<ExecuteOutput, LumoError> {
    info!(config.logger, "starting execution of '{}'", unit.name);

    if config.dump_bytecode {
        unit.disassemble(&unit.name);
    }

    let mut vm = Vm::with_config(&config.heap, &config.limits, &config.to_options())
        .with_logger(config.logger.clone());
    let outcome = vm.execute(unit)?;
    settle(vm, outcome, config)
}

/// Load and run a program file
pub fn run_file(path: impl AsRef<Path>, config: &RunConfig) -> Result<ExecuteOutput, LumoError> {
    let program = load(path, config)?;
    run_program(&program, config)
}

/// Map a finished interpreter run onto the API result shape
fn settle(vm: Vm, outcome: Outcome, config: &RunConfig) -> Result<ExecuteOutput, LumoError> {
    match outcome {
        Outcome::Return(value) => {
            let output = ExecuteOutput {
                value,
                rendered: vm.render_value(value),
                stats: vm.heap_stats(),
            };
            info!(config.logger, "execution completed");
            Ok(output)
        }
        Outcome::Raised(value) => {
            // 趁 VM 还活着把异常链渲染出来
            let report = report_uncaught(&vm, value);
            info!(config.logger, "execution failed: {}", report.to_short());
            Err(LumoError::Uncaught(report))
        }
        Outcome::Suspended { .. } => Err(LumoError::Suspended),
    }
}

/// Build a structured report for an exception that escaped to the host
fn report_uncaught(vm: &Vm, value: Value) -> ErrorReport {
    let traceback = vm.format_exception(value);
    let (error_kind, line, message) = match value {
        Value::Ref(id) => match vm.heap().get(id) {
            Ok(HeapObj::Exception(data)) => (
                vm.tokens()
                    .resolve(data.kind)
                    .unwrap_or("Exception")
                    .to_string(),
                data.line,
                data.message.clone().unwrap_or_default(),
            ),
            _ => ("Exception".to_string(), None, vm.render_value(value)),
        },
        _ => ("Exception".to_string(), None, vm.render_value(value)),
    };

    ErrorReport {
        phase: Phase::Vm.as_str(),
        line,
        error_kind,
        message,
        traceback: Some(traceback),
    }
}

// ==================== Legacy API (using global config) ====================

/// Run a program file (uses global config)
///
/// # Panics
/// If global config is not initialized
pub fn execute_file(path: impl AsRef<Path>) -> Result<ExecuteOutput, LumoError> {
    run_file(path, get_config())
}

/// Quick run with default config (auto-initializes if needed)
pub fn quick_run_file(path: impl AsRef<Path>) -> Result<ExecuteOutput, LumoError> {
    if !is_initialized() {
        init_config(RunConfig::default());
    }
    execute_file(path)
}
