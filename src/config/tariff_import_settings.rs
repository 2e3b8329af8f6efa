// ==========================================
// 诊所收费目录系统 - 价目导入配置快照
// ==========================================
// 职责: 单次导入开始时一次性读取全部配置，导入过程中不再变化
// ==========================================

use crate::config::import_config_trait::{ConfigResult, TariffImportConfigReader};
use crate::domain::types::{ConsumablePolicy, RowOrdering};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认私立保险公司
pub const DEFAULT_PRIVATE_INSURERS: [&str; 3] = ["RSSB", "MUTUELLE DE SANTE", "PRIVATE INSURANCE"];

/// 默认政府/特殊保险公司
pub const DEFAULT_GOV_INSURERS: [&str; 2] = ["GOVERNMENT", "MILITARY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffImportSettings {
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub error_sample_limit: usize,
    pub row_ordering: RowOrdering,
    pub private_insurers: Vec<String>,
    pub gov_insurers: Vec<String>,
    pub auto_create_insurers: bool,
    pub consumable_policy: ConsumablePolicy,
    pub inventory_reorder_level: i64,
}

impl Default for TariffImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            batch_pause: Duration::from_millis(500),
            error_sample_limit: 10,
            row_ordering: RowOrdering::ParentsFirst,
            private_insurers: DEFAULT_PRIVATE_INSURERS.iter().map(|s| s.to_string()).collect(),
            gov_insurers: DEFAULT_GOV_INSURERS.iter().map(|s| s.to_string()).collect(),
            auto_create_insurers: false,
            consumable_policy: ConsumablePolicy::RejectRow,
            inventory_reorder_level: 50,
        }
    }
}

impl TariffImportSettings {
    /// 从配置读取器加载快照
    pub async fn load(reader: &dyn TariffImportConfigReader) -> ConfigResult<Self> {
        Ok(Self {
            batch_size: reader.get_batch_size().await?,
            batch_pause: reader.get_batch_pause().await?,
            error_sample_limit: reader.get_error_sample_limit().await?,
            row_ordering: reader.get_row_ordering().await?,
            private_insurers: reader.get_private_insurers().await?,
            gov_insurers: reader.get_gov_insurers().await?,
            auto_create_insurers: reader.get_auto_create_insurers().await?,
            consumable_policy: reader.get_consumable_policy().await?,
            inventory_reorder_level: reader.get_inventory_reorder_level().await?,
        })
    }

    /// 全部已知保险公司（私立 + 政府）
    pub fn all_insurers(&self) -> Vec<String> {
        self.private_insurers
            .iter()
            .chain(self.gov_insurers.iter())
            .cloned()
            .collect()
    }
}
