//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步层的日志初始化功能。

use tracing_subscriber::EnvFilter;

/// 初始化日志输出
///
/// 此函数应该在应用程序启动时调用一次。设置了 `RUST_LOG` 时以环境变量为准，
/// 否则使用传入的过滤规则。重复调用会被忽略。
///
/// # 参数
///
/// * `default_filter` - 默认过滤规则（例如 "info" 或 "savesync=debug"）
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // 已经设置过全局 subscriber 时返回错误，这里忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
