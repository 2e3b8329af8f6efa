// ==========================================
// 诊所收费目录系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口（鉴权 + 调用导入层/仓储层 + 响应信封）
// ==========================================

pub mod error;
pub mod tariff_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use tariff_api::{ApiResponse, ImportProductsRequest, ImportProductsResponse, TariffApi};
