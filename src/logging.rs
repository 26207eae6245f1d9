// ==========================================
// 国际象棋赛事管理引擎 - 日志
// ==========================================
// stdout 留给命令输出（排名表、TRF），日志一律写 stderr
// 过滤: RUST_LOG 优先，未设置时只放行本 crate 的 info
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的过滤规则
pub const DEFAULT_DIRECTIVES: &str = "warn,chess_arbiter=info";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// CLI 入口调用一次
pub fn init() {
    fmt()
        .with_env_filter(filter_or(DEFAULT_DIRECTIVES))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// 测试用，可重复调用；输出交给测试框架捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(filter_or("chess_arbiter=debug"))
        .with_test_writer()
        .try_init();
}
