// ==========================================
// 诊所收费目录系统 - 价目导入器 Trait
// ==========================================
// 职责: 定义价目 CSV 导入接口（不包含实现）
// ==========================================

use crate::config::TariffImportSettings;
use crate::domain::tariff::TariffImportSummary;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// TariffImporter Trait
// ==========================================
// 实现者: TariffImporterImpl
#[async_trait]
pub trait TariffImporter: Send + Sync {
    /// 导入 CSV 文本到指定诊所（导入开始时读取配置快照）
    ///
    /// # 返回
    /// - Ok(TariffImportSummary): 成功/失败行数与前若干条错误
    /// - Err: 输入级错误（CSV 无法解析 / 无记录）或配置读取失败
    ///
    /// # 说明
    /// 单行失败不会中断导入，只计入 failed_imports
    async fn import_csv(&self, clinic_id: i64, csv_content: &str)
        -> ImportResult<TariffImportSummary>;

    /// 使用给定配置导入
    async fn import_csv_with_settings(
        &self,
        clinic_id: i64,
        csv_content: &str,
        settings: &TariffImportSettings,
    ) -> ImportResult<TariffImportSummary>;
}
