// ==========================================
// 诊所收费目录系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 多租户诊所后台的收费目录（价目）导入与对账
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 价目 CSV
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 缓存层 - 读模型缓存
pub mod cache;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConsumablePolicy, PaymentMode, PriceType, Role, RowOrdering};

// 领域实体
pub use domain::{PaymentContext, Principal, ProductQuote, ProductTariff, TariffImportSummary};

// 导入
pub use importer::{TariffImporter, TariffImporterImpl};

// API
pub use api::{ApiError, ApiResult, TariffApi};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "诊所收费目录系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
