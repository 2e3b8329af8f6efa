// ==========================================
// 诊所收费目录系统 - 价目导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{ConsumablePolicy, RowOrdering};
use async_trait::async_trait;
use std::error::Error;
use std::time::Duration;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// TariffImportConfigReader Trait
// ==========================================
// 用途: 价目导入所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait TariffImportConfigReader: Send + Sync {
    // ===== 批处理 =====

    /// 每批行数
    ///
    /// # 默认值
    /// - 20
    async fn get_batch_size(&self) -> ConfigResult<usize>;

    /// 批次间隔
    ///
    /// # 默认值
    /// - 500ms
    async fn get_batch_pause(&self) -> ConfigResult<Duration>;

    /// 返回的错误信息条数上限
    ///
    /// # 默认值
    /// - 10
    async fn get_error_sample_limit(&self) -> ConfigResult<usize>;

    /// 行排序策略
    ///
    /// # 默认值
    /// - PARENTS_FIRST
    async fn get_row_ordering(&self) -> ConfigResult<RowOrdering>;

    // ===== 保险公司 =====

    /// 私立保险公司名单（TARIFF / TARIFF_WITH_CO 写入对象）
    ///
    /// # 默认值
    /// - RSSB, MUTUELLE DE SANTE, PRIVATE INSURANCE
    async fn get_private_insurers(&self) -> ConfigResult<Vec<String>>;

    /// 政府/特殊保险公司名单（GOV_INSURANCE 写入对象）
    ///
    /// # 默认值
    /// - GOVERNMENT, MILITARY
    async fn get_gov_insurers(&self) -> ConfigResult<Vec<String>>;

    /// 未知保险公司是否自动创建（否则该行失败）
    ///
    /// # 默认值
    /// - false
    async fn get_auto_create_insurers(&self) -> ConfigResult<bool>;

    // ===== 耗材 / 库存 =====

    /// 耗材格式异常处理策略
    ///
    /// # 默认值
    /// - REJECT_ROW
    async fn get_consumable_policy(&self) -> ConfigResult<ConsumablePolicy>;

    /// 自动创建库存物品的补货水位
    ///
    /// # 默认值
    /// - 50
    async fn get_inventory_reorder_level(&self) -> ConfigResult<i64>;

    // ===== 缓存 =====

    /// 价目读缓存 TTL
    ///
    /// # 默认值
    /// - 3600s
    async fn get_tariff_cache_ttl(&self) -> ConfigResult<Duration>;
}
