// ==========================================
// 诊所收费目录系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigResult, TariffImportConfigReader};
use crate::config::tariff_import_settings::{DEFAULT_GOV_INSURERS, DEFAULT_PRIVATE_INSURERS};
use crate::db::open_sqlite_connection;
use crate::domain::types::{ConsumablePolicy, RowOrdering};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    fn get_list_or_default(&self, key: &str, default: &[&str]) -> ConfigResult<Vec<String>> {
        let value = self.get_config_or_default(key, &default.join(","))?;

        let items: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if items.is_empty() {
            Ok(default.iter().map(|s| s.to_string()).collect())
        } else {
            Ok(items)
        }
    }
}

// ==========================================
// TariffImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl TariffImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(config_keys::BATCH_SIZE, "20")?;
        // 0 会导致空批次死循环，回退默认值
        Ok(value.trim().parse::<usize>().ok().filter(|&n| n > 0).unwrap_or(20))
    }

    async fn get_batch_pause(&self) -> ConfigResult<Duration> {
        let value = self.get_config_or_default(config_keys::BATCH_PAUSE_MS, "500")?;
        Ok(Duration::from_millis(value.trim().parse::<u64>().unwrap_or(500)))
    }

    async fn get_error_sample_limit(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(config_keys::ERROR_SAMPLE_LIMIT, "10")?;
        Ok(value.trim().parse::<usize>().unwrap_or(10))
    }

    async fn get_row_ordering(&self) -> ConfigResult<RowOrdering> {
        let value = self.get_config_or_default(config_keys::ROW_ORDERING, "PARENTS_FIRST")?;
        Ok(RowOrdering::from_db_str(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::ROW_ORDERING,
                raw_value = %value,
                "行排序策略配置无效，使用 PARENTS_FIRST"
            );
            RowOrdering::ParentsFirst
        }))
    }

    async fn get_private_insurers(&self) -> ConfigResult<Vec<String>> {
        self.get_list_or_default(config_keys::PRIVATE_INSURERS, &DEFAULT_PRIVATE_INSURERS)
    }

    async fn get_gov_insurers(&self) -> ConfigResult<Vec<String>> {
        self.get_list_or_default(config_keys::GOV_INSURERS, &DEFAULT_GOV_INSURERS)
    }

    async fn get_auto_create_insurers(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::AUTO_CREATE_INSURERS, "false")?;
        Ok(matches!(
            value.trim().to_lowercase().as_str(),
            "true" | "1" | "yes"
        ))
    }

    async fn get_consumable_policy(&self) -> ConfigResult<ConsumablePolicy> {
        let value = self.get_config_or_default(config_keys::CONSUMABLE_POLICY, "REJECT_ROW")?;
        Ok(ConsumablePolicy::from_db_str(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::CONSUMABLE_POLICY,
                raw_value = %value,
                "耗材策略配置无效，使用 REJECT_ROW"
            );
            ConsumablePolicy::RejectRow
        }))
    }

    async fn get_inventory_reorder_level(&self) -> ConfigResult<i64> {
        let value = self.get_config_or_default(config_keys::INVENTORY_REORDER_LEVEL, "50")?;
        Ok(value.trim().parse::<i64>().unwrap_or(50))
    }

    async fn get_tariff_cache_ttl(&self) -> ConfigResult<Duration> {
        let value = self.get_config_or_default(config_keys::TARIFF_CACHE_TTL_SECS, "3600")?;
        Ok(Duration::from_secs(value.trim().parse::<u64>().unwrap_or(3600)))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批处理
    pub const BATCH_SIZE: &str = "tariff_import.batch_size";
    pub const BATCH_PAUSE_MS: &str = "tariff_import.batch_pause_ms";
    pub const ERROR_SAMPLE_LIMIT: &str = "tariff_import.error_sample_limit";
    pub const ROW_ORDERING: &str = "tariff_import.row_ordering";

    // 保险公司（逗号分隔）
    pub const PRIVATE_INSURERS: &str = "tariff_import.private_insurers";
    pub const GOV_INSURERS: &str = "tariff_import.gov_insurers";
    pub const AUTO_CREATE_INSURERS: &str = "tariff_import.auto_create_insurers";

    // 耗材 / 库存
    pub const CONSUMABLE_POLICY: &str = "tariff_import.consumable_policy";
    pub const INVENTORY_REORDER_LEVEL: &str = "tariff_import.inventory_reorder_level";

    // 缓存
    pub const TARIFF_CACHE_TTL_SECS: &str = "cache.tariff_ttl_secs";
}
