// ==========================================
// 诊所收费目录系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把 Repository/导入/缓存错误转换为调用方可理解的错误
// ==========================================

use crate::cache::CacheError;
use crate::i18n::{t, t_with_args};
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 鉴权错误
    // ==========================================
    #[error("{0}")]
    Forbidden(String),

    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 整个请求被拒绝（CSV 无法解析 / 无有效记录）
    #[error("请求错误: {0}")]
    BadRequest(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("价目导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("缓存错误: {0}")]
    CacheError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 对应的 HTTP 状态码（供上层网关映射）
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Forbidden(_) => 403,
            ApiError::InvalidInput(_) | ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::BusinessRuleViolation(_) => 422,
            _ => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(e) => ApiError::Other(e),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
// 输入级错误 → BadRequest（一行都未处理）
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            e if e.is_input_error() => ApiError::BadRequest(input_error_message(&e)),
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::InternalError(msg) | ImportError::TaskJoinError(msg) => {
                ApiError::InternalError(msg)
            }
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// 输入级错误直接返回给调用方，按当前语言翻译
fn input_error_message(err: &ImportError) -> String {
    match err {
        ImportError::EmptyCsv => t("import.empty_csv"),
        ImportError::CsvParseError(reason) => {
            t_with_args("import.parse_failed", &[("reason", reason.as_str())])
        }
        other => other.to_string(),
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::CacheError(err.to_string())
    }
}

/// API 结果类型
pub type ApiResult<T> = Result<T, ApiError>;
