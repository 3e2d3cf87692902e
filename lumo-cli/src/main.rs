//! Lumo CLI - Command line interface
//!
//! Project-based execution - configuration from lumo.json, or a compiled
//! program file (.lumod / .lumor) passed directly.

extern crate alloc;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

mod platform;

use crate::platform::{print_exception_report, print_heap_report};
use lumo_api::{init_config, run_file, HeapConfig, LumoError, RunConfig, Value, VmLimits};
use lumo_core::binary::{detect_build_mode_from_ext, BinaryReader, FileInfo};
use lumo_log::{debug, Level, LogConfig, LogRingBuffer, Logger};

/// 进程退出码
const EXIT_OK: i32 = 0;
const EXIT_UNCAUGHT: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_FAULT: i32 = 70;

/// 崩溃转储保留的日志条数
const LOG_RING_CAPACITY: usize = 256;

/// lumo.json 结构
#[derive(Debug, serde::Deserialize)]
struct ProjectJson {
    /// 入口程序文件路径
    entry: String,
    /// 运行时配置
    runtime: Option<RuntimeJson>,
}

/// 运行时配置
#[derive(Debug, Default, serde::Deserialize)]
struct RuntimeJson {
    /// 堆大小（块数）
    heap_blocks: Option<usize>,
    /// 日志级别: "silent", "error", "warn", "info", "debug", "trace"
    log_level: Option<String>,
    /// 是否输出入口单元的反汇编
    dump_bytecode: Option<bool>,
    /// 是否显示执行步骤
    show_steps: Option<bool>,
    /// 是否在结束后打印堆报告
    mem_info: Option<bool>,
}

#[derive(Parser)]
#[command(
    name = "lumo",
    about = "Lumo runtime - bytecode program execution",
    version = "0.1.0"
)]
struct Cli {
    /// Program file (.lumod / .lumor) or project manifest (default: ./lumo.json)
    #[arg(value_name = "PATH", default_value = "lumo.json")]
    path: PathBuf,

    /// Heap size in blocks (overrides manifest)
    #[arg(long, value_name = "N")]
    heap_blocks: Option<usize>,

    /// Log level: silent, error, warn, info, debug, trace (overrides manifest)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print the entry unit's disassembly before running
    #[arg(long)]
    dump_bytecode: bool,

    /// Show execution phases and step info
    #[arg(long)]
    show_steps: bool,

    /// Print a heap report after the run
    #[arg(long)]
    mem_info: bool,

    /// Print container info instead of executing
    #[arg(long)]
    inspect: bool,
}

fn main() {
    let cli = Cli::parse();

    // Resolve what to run: direct program file or project manifest
    let (entry_path, project) = match resolve_target(&cli) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_USAGE);
        }
    };

    if cli.inspect {
        process::exit(inspect_file(&entry_path));
    }

    let runtime = project.as_ref().and_then(|p| p.runtime.as_ref());

    // Build logger from merged settings
    let level = cli
        .log_level
        .as_deref()
        .or_else(|| runtime.and_then(|r| r.log_level.as_deref()))
        .and_then(parse_log_level)
        .unwrap_or(Level::Warn);
    let (logger, ring) = LogConfig::new(level)
        .with_stdout()
        .with_ring_buffer(LOG_RING_CAPACITY)
        .init();

    // Build run configuration (CLI flags override manifest)
    let run_config = build_run_config(&cli, runtime, logger);
    debug!(
        run_config.logger,
        "entry '{}', heap {} blocks",
        entry_path.display(),
        run_config.heap.max_blocks
    );

    // Initialize API config (global singleton for convenience)
    init_config(run_config.clone());

    // Show step info
    if run_config.show_steps {
        println!("[Lumo VM - Bytecode Execution]");
        println!("======================");
        println!("Entry: {}", entry_path.display());
    }

    // Execute
    let code = match run_file(&entry_path, &run_config) {
        Ok(output) => {
            if run_config.show_steps {
                println!("✅ Execution successful!");
                println!("Return value: {}", output.rendered);
            } else if output.value != Value::None {
                // Non-step mode: only print the return value (actual program output)
                println!("{}", output.rendered);
            }
            if run_config.mem_info {
                print_heap_report(&output.stats);
            }
            EXIT_OK
        }
        Err(e) => report_failure(&e, ring.as_deref()),
    };
    process::exit(code);
}

/// Resolve the execution target from the CLI path
///
/// A path with a known program extension runs directly; anything else is
/// treated as a project manifest whose `entry` names the program file.
fn resolve_target(cli: &Cli) -> Result<(PathBuf, Option<ProjectJson>), String> {
    if detect_build_mode_from_ext(&cli.path).is_some() {
        return Ok((cli.path.clone(), None));
    }

    let project = read_project_json(&cli.path)?;
    let entry = resolve_entry_path(&cli.path, &project.entry);
    Ok((entry, Some(project)))
}

/// Read and parse lumo.json
fn read_project_json(path: &Path) -> Result<ProjectJson, String> {
    if !path.exists() {
        return Err(format!(
            "未找到 '{}'\n\n当前目录不是一个 Lumo 项目。\n提示: 创建 '{}' 文件并指定 'entry' 字段，或直接传入 .lumod / .lumor 程序文件",
            path.display(),
            path.display()
        ));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("无法读取 '{}': {}", path.display(), e))?;

    let project: ProjectJson = serde_json::from_str(&content)
        .map_err(|e| format!("解析 '{}' 失败: {}", path.display(), e))?;

    if project.entry.is_empty() {
        return Err(format!("'{}' 中的 'entry' 字段不能为空", path.display()));
    }

    Ok(project)
}

/// Resolve entry file path relative to the manifest directory
fn resolve_entry_path(project_path: &Path, entry: &str) -> PathBuf {
    let base_dir = project_path.parent().unwrap_or(Path::new("."));
    base_dir.join(entry)
}

/// Build run configuration from merged CLI flags and manifest settings
fn build_run_config(cli: &Cli, runtime: Option<&RuntimeJson>, logger: Arc<Logger>) -> RunConfig {
    let heap_blocks = cli
        .heap_blocks
        .or_else(|| runtime.and_then(|r| r.heap_blocks))
        .unwrap_or_else(|| HeapConfig::default().max_blocks);

    RunConfig {
        show_steps: cli.show_steps || runtime.and_then(|r| r.show_steps).unwrap_or(false),
        dump_bytecode: cli.dump_bytecode || runtime.and_then(|r| r.dump_bytecode).unwrap_or(false),
        mem_info: cli.mem_info || runtime.and_then(|r| r.mem_info).unwrap_or(false),
        heap: HeapConfig {
            max_blocks: heap_blocks,
        },
        limits: VmLimits::default(),
        logger,
    }
}

/// Parse log level string
fn parse_log_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "silent" => Some(Level::Error), // silent = only errors
        "error" => Some(Level::Error),
        "warn" => Some(Level::Warn),
        "info" => Some(Level::Info),
        "debug" => Some(Level::Debug),
        "trace" => Some(Level::Trace),
        _ => None,
    }
}

/// Print container info for a program file
fn inspect_file(path: &Path) -> i32 {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: 无法读取 '{}': {}", path.display(), e);
            return EXIT_USAGE;
        }
    };

    match BinaryReader::from_bytes(data) {
        Ok(reader) => {
            println!("{}", FileInfo::from_reader(&reader));
            EXIT_OK
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            EXIT_USAGE
        }
    }
}

/// Print a failure and pick the matching exit code
fn report_failure(error: &LumoError, ring: Option<&LogRingBuffer>) -> i32 {
    match error {
        LumoError::Uncaught(report) => {
            print_exception_report(report);
            EXIT_UNCAUGHT
        }
        LumoError::Load(_) => {
            eprintln!("❌ {}", error);
            EXIT_USAGE
        }
        LumoError::Fatal(_) | LumoError::Suspended => {
            eprintln!("❌ {}", error);
            // 致命错误时转储最近日志，便于排查
            if let Some(ring) = ring {
                let dump = ring.dump();
                if !dump.is_empty() {
                    eprintln!("--- 最近日志 ---");
                    eprint!("{}", dump);
                }
            }
            EXIT_FAULT
        }
    }
}
