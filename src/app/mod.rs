// ==========================================
// 诊所收费目录系统 - 应用层
// ==========================================
// 职责: 组件装配，供命令行入口与集成测试使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
