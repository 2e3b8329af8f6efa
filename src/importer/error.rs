// ==========================================
// 诊所收费目录系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 输入错误（整个请求失败） =====
    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("CSV 中没有有效记录")]
    EmptyCsv,

    // ===== 行级错误（仅该行失败） =====
    #[error("NAME 为空 (行 {0})")]
    EmptyName(usize),

    #[error("未找到参考号 {reference} 对应的父产品")]
    ParentNotFound { reference: String },

    #[error("保险公司不存在: {0}")]
    InsuranceCompanyNotFound(String),

    #[error("耗材格式错误: {0}（期望 名称(数量)）")]
    MalformedConsumable(String),

    // ===== 基础设施错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("配置读取失败: {0}")]
    ConfigReadError(String),

    #[error("行任务执行失败: {0}")]
    TaskJoinError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为输入级错误（整个请求应以 BAD_REQUEST 拒绝）
    pub fn is_input_error(&self) -> bool {
        matches!(self, ImportError::CsvParseError(_) | ImportError::EmptyCsv)
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<tokio::task::JoinError>
impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::TaskJoinError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors() {
        assert!(ImportError::EmptyCsv.is_input_error());
        assert!(ImportError::CsvParseError("x".to_string()).is_input_error());
        assert!(!ImportError::ParentNotFound {
            reference: "7".to_string()
        }
        .is_input_error());
    }

    #[test]
    fn test_row_error_messages() {
        let err = ImportError::ParentNotFound {
            reference: "12".to_string(),
        };
        assert!(err.to_string().contains("12"));

        let err = ImportError::from(RepositoryError::LockError("poisoned".to_string()));
        assert!(matches!(err, ImportError::Repository(_)));
    }
}
