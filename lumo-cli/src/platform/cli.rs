//! CLI 格式化输出
//!
//! 提供命令行友好的异常回溯和堆报告打印。

use lumo_api::ErrorReport;
use lumo_core::HeapStats;

/// 打印未捕获异常的报告
///
/// 先给出单行摘要，再展开完整的异常链回溯。
pub fn print_exception_report(report: &ErrorReport) {
    eprintln!("❌ {}", report);

    if let Some(traceback) = report.traceback.as_deref() {
        eprintln!("Traceback (most recent call last):");
        eprintln!("{}", traceback);
    }
}

/// 打印运行结束后的堆报告
pub fn print_heap_report(stats: &HeapStats) {
    println!("[Heap Report]");
    println!("Blocks used:  {}", stats.blocks_used);
    println!("Blocks free:  {}", stats.blocks_free);
    println!("Peak blocks:  {}", stats.peak_blocks);
    println!("Collections:  {}", stats.collections);
    println!("Freed last:   {}", stats.freed_last);
}
