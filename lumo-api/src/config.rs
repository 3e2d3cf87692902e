//! API 层配置
//!
//! 包含执行配置 RunConfig 和全局单例（供 CLI 使用）

use lumo_config::{HeapConfig, RuntimeOptions, VmLimits};
use lumo_log::Logger;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Execution configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Whether to log each dispatched instruction
    pub show_steps: bool,
    /// Whether to dump the entry unit before execution
    pub dump_bytecode: bool,
    /// Whether to report heap statistics after execution
    pub mem_info: bool,
    /// Heap sizing
    pub heap: HeapConfig,
    /// Execution limits
    pub limits: VmLimits,
    /// Logger (optional)
    pub logger: Arc<Logger>,
}

impl RunConfig {
    /// Bundle the behavior toggles the interpreter consumes
    pub fn to_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            show_steps: self.show_steps,
            dump_bytecode: self.dump_bytecode,
            mem_info: self.mem_info,
        }
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("show_steps", &self.show_steps)
            .field("dump_bytecode", &self.dump_bytecode)
            .field("mem_info", &self.mem_info)
            .field("heap", &self.heap)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            show_steps: false,
            dump_bytecode: false,
            mem_info: false,
            heap: HeapConfig::default(),
            limits: VmLimits::default(),
            logger: Logger::noop(),
        }
    }
}

// Global config singleton for CLI convenience
static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();

/// Initialize global configuration (must be called once before any operation)
///
/// # Panics
/// If config is already initialized
pub fn init(config: RunConfig) {
    GLOBAL_CONFIG
        .set(config)
        .expect("Config already initialized");
}

/// Get global config reference
///
/// # Panics
/// If config is not initialized
pub fn config() -> &'static RunConfig {
    GLOBAL_CONFIG.get().expect("Config not initialized")
}

/// Check if config is initialized
pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config() {
        let cfg = RunConfig::default();
        assert!(!cfg.show_steps);
        assert!(!cfg.dump_bytecode);
        assert!(!cfg.mem_info);
        assert_eq!(cfg.heap.max_blocks, 4096);
        assert_eq!(cfg.limits.max_stack_depth, 1024);
        assert_eq!(cfg.limits.max_handler_depth, 64);
    }

    #[test]
    fn test_run_config_to_options() {
        let cfg = RunConfig {
            show_steps: true,
            mem_info: true,
            ..RunConfig::default()
        };
        let options = cfg.to_options();
        assert!(options.show_steps);
        assert!(!options.dump_bytecode);
        assert!(options.mem_info);
    }

    #[test]
    fn test_run_config_debug() {
        let cfg = RunConfig::default();
        let debug_str = format!("{:?}", cfg);
        assert!(debug_str.contains("show_steps"));
        assert!(debug_str.contains("heap"));
        assert!(debug_str.contains("limits"));
    }

    #[test]
    fn test_global_config_init_and_get() {
        // 注意：全局状态，完整测试套件下可能已被其他测试初始化
        if !is_initialized() {
            init(RunConfig::default());
        }
        assert!(is_initialized());
        let retrieved = config();
        assert_eq!(retrieved.heap.max_blocks, 4096);
    }
}
