//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 安装全局 fmt 日志订阅者
///
/// `RUST_LOG` 优先；未设置时默认 `info`，`debug` 为真时默认 `debug`。
/// 可以重复调用，已安装订阅者时返回 `false`。
pub fn init_logging(debug: bool) -> bool {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_idempotent() {
        init_logging(false);
        // 第二次安装一定失败（全局订阅者已存在），但不会 panic
        assert!(!init_logging(true));
    }
}
