// ==========================================
// Cusmon 表格数据管理 - 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// RUST_LOG 控制过滤；CLI 可用 --verbose 提升到 debug
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=cusmon_import::importer=trace
///
/// # 示例
/// ```no_run
/// use cusmon_import::logging;
/// logging::init();
/// ```
pub fn init() {
    init_with_default("info");
}

/// 初始化日志系统，RUST_LOG 未设置时使用给定的默认级别
pub fn init_with_default(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // 日志输出到 stderr，stdout 留给命令输出
    let result = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init();

    // 重复初始化时沿用已安装的全局 subscriber
    if let Err(e) = result {
        tracing::debug!(error = %e, "日志系统已初始化，忽略重复初始化");
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别；多个测试重复调用时保留首个 subscriber
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
