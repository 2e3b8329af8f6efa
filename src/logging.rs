// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing + tracing-subscriber
// 导入链路的结构化字段: import_id / clinic_id / row / product_id
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

// 本 crate 默认 info，依赖库只保留 warn 以上
const DEFAULT_DIRECTIVES: &str = "warn,clinic_tariff=info";

// 测试中逐行展开导入过程
const TEST_DIRECTIVES: &str = "warn,clinic_tariff=debug";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读的单行文本
    Pretty,
    /// JSON 行（便于日志采集）
    Json,
}

impl LogFormat {
    /// 解析 LOG_FORMAT 取值，未知值按 Pretty 处理
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or(LogFormat::Pretty)
    }
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 覆盖默认过滤器，例如 RUST_LOG=clinic_tariff::importer=trace
/// - LOG_FORMAT: json | pretty（默认 pretty）
///
/// # 示例
/// ```no_run
/// use clinic_tariff::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    match LogFormat::from_env() {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(false)
            .init(),
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .init(),
    }
}

/// 初始化测试环境的日志系统（可重复调用）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(TEST_DIRECTIVES))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        tracing::debug!(row = 1, "日志已初始化");
    }
}
