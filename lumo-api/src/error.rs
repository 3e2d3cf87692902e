//! API 错误类型
//!
//! 提供统一的错误类型和结构化错误报告。

use thiserror::Error;

use lumo_config::Phase;
use lumo_core::binary::LoadError;
use lumo_core::Fault;

/// Lumo 错误类型
#[derive(Error, Debug)]
pub enum LumoError {
    /// 程序装载错误（文件 IO、容器损坏）
    #[error("{0}")]
    Load(#[from] LoadError),

    /// 脚本抛出且无人捕获的异常
    #[error("{0}")]
    Uncaught(ErrorReport),

    /// 解释器致命故障（字节码损坏、内部不变量破坏）
    #[error("interpreter fault: {0}")]
    Fatal(#[from] Fault),

    /// 顶层执行在 yield 处挂起；编排接口不驱动协程
    #[error("top-level execution suspended at a yield point")]
    Suspended,
}

impl LumoError {
    /// 获取错误行号（如果有）
    pub fn line(&self) -> Option<usize> {
        match self {
            LumoError::Uncaught(report) => report.line,
            _ => None,
        }
    }

    /// 获取错误阶段名称
    pub fn phase(&self) -> &'static str {
        match self {
            LumoError::Load(_) => Phase::Loader.as_str(),
            LumoError::Uncaught(_) | LumoError::Suspended => Phase::Vm.as_str(),
            LumoError::Fatal(Fault::ReentrantCollect) => Phase::Heap.as_str(),
            LumoError::Fatal(_) => Phase::Vm.as_str(),
        }
    }

    /// 转换为结构化错误报告
    ///
    /// 适用于需要结构化数据的场景。CLI 可以直接打印，
    /// 上层应用可以序列化为 JSON。
    pub fn to_report(&self) -> ErrorReport {
        match self {
            LumoError::Uncaught(report) => report.clone(),
            LumoError::Load(e) => ErrorReport {
                phase: Phase::Loader.as_str(),
                line: None,
                error_kind: load_error_kind(e).to_string(),
                message: e.to_string(),
                traceback: None,
            },
            LumoError::Fatal(e) => ErrorReport {
                phase: self.phase(),
                line: None,
                error_kind: "Fault".to_string(),
                message: e.to_string(),
                traceback: None,
            },
            LumoError::Suspended => ErrorReport {
                phase: Phase::Vm.as_str(),
                line: None,
                error_kind: "Suspended".to_string(),
                message: self.to_string(),
                traceback: None,
            },
        }
    }
}

fn load_error_kind(e: &LoadError) -> &'static str {
    match e {
        LoadError::Io(_) => "Io",
        LoadError::Read(_) => "Read",
        LoadError::Codec(_) => "Codec",
        LoadError::NoUnits => "NoUnits",
        LoadError::BadEntryIndex { .. } => "BadEntryIndex",
    }
}

/// 结构化错误报告
///
/// 上层应用（CLI、嵌入宿主）可以根据自己的需求格式化。
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    /// 错误阶段: loader, vm, heap
    pub phase: &'static str,
    /// 错误行号（1-based，行号信息未剥离时才有）
    pub line: Option<usize>,
    /// 错误类型（可用于程序化处理；未捕获异常时为异常种类名）
    pub error_kind: String,
    /// 人类可读的错误消息
    pub message: String,
    /// 完整回溯（含异常前因链），未捕获异常时才有
    pub traceback: Option<String>,
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "[line {}] {} error: {}",
                line, self.phase, self.message
            ),
            None => write!(f, "[{}] error: {}", self.phase, self.message),
        }
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式
    ///
    /// 不依赖 serde，手动构建 JSON 字符串。
    pub fn to_json(&self) -> String {
        let line = self
            .line
            .map(|l| l.to_string())
            .unwrap_or_else(|| "null".to_string());

        format!(
            r#"{{"phase":"{}","line":{},"error_kind":"{}","message":"{}"}}"#,
            self.phase,
            line,
            escape_json(&self.error_kind),
            escape_json(&self.message)
        )
    }

    /// 简洁格式（适合终端）
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.error_kind, self.message)
    }
}

/// 简单的 JSON 字符串转义
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ErrorReport {
        ErrorReport {
            phase: "vm",
            line: Some(12),
            error_kind: "ValueError".to_string(),
            message: "integer overflow".to_string(),
            traceback: None,
        }
    }

    #[test]
    fn test_report_display_with_line() {
        let report = sample_report();
        assert_eq!(
            report.to_string(),
            "[line 12] vm error: integer overflow"
        );
    }

    #[test]
    fn test_report_display_without_line() {
        let mut report = sample_report();
        report.line = None;
        assert_eq!(report.to_string(), "[vm] error: integer overflow");
    }

    #[test]
    fn test_report_to_json_escapes() {
        let mut report = sample_report();
        report.message = "bad \"quote\"\nnewline".to_string();
        let json = report.to_json();
        assert!(json.contains(r#""message":"bad \"quote\"\nnewline""#));
        assert!(json.contains(r#""line":12"#));
    }

    #[test]
    fn test_report_to_short() {
        assert_eq!(sample_report().to_short(), "ValueError: integer overflow");
    }

    #[test]
    fn test_load_error_phase() {
        let err = LumoError::Load(LoadError::NoUnits);
        assert_eq!(err.phase(), "loader");
        assert_eq!(err.to_report().error_kind, "NoUnits");
    }

    #[test]
    fn test_fatal_error_phase() {
        let err = LumoError::Fatal(Fault::ReentrantCollect);
        assert_eq!(err.phase(), "heap");

        let err = LumoError::Fatal(Fault::NotSuspended);
        assert_eq!(err.phase(), "vm");
    }

    #[test]
    fn test_uncaught_line_passthrough() {
        let err = LumoError::Uncaught(sample_report());
        assert_eq!(err.line(), Some(12));
        assert_eq!(err.phase(), "vm");
    }
}
