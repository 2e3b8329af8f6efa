// ==========================================
// 诊所收费目录系统 - 价目导入器实现
// ==========================================
// 职责: 批次编排，从 CSV 文本到落库
// 流程: 解析 → 父行优先排序 → 分批 → 批内并发处理 → 汇总
// 并发: 每行一个 spawn_blocking 任务（共享连接互斥串行化），批次之间顺序执行
// ==========================================

use crate::config::{TariffImportConfigReader, TariffImportSettings};
use crate::domain::tariff::{RowOutcome, TariffCsvRow, TariffImportSummary};
use crate::domain::types::RowOrdering;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::product_writer::process_row;
use crate::importer::row_parser::{parse_csv, sort_parents_first};
use crate::importer::tariff_importer::TariffImporter;
use crate::repository::TariffRepository;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// TariffImporterImpl - 价目导入器实现
// ==========================================
pub struct TariffImporterImpl {
    // 数据访问层
    repo: Arc<TariffRepository>,

    // 配置读取器
    config: Arc<dyn TariffImportConfigReader>,
}

impl TariffImporterImpl {
    /// 创建新的 TariffImporter 实例
    ///
    /// # 参数
    /// - repo: 价目仓储（事务边界）
    /// - config: 配置读取器
    pub fn new(repo: Arc<TariffRepository>, config: Arc<dyn TariffImportConfigReader>) -> Self {
        Self { repo, config }
    }

    /// 按排序策略切分批次
    ///
    /// - PARENTS_FIRST: 父行与其余行分属不同阶段，阶段之间不混批
    /// - SORT_ONLY: 排序后直接按批次大小切分
    fn plan_batches(
        mut rows: Vec<TariffCsvRow>,
        settings: &TariffImportSettings,
    ) -> Vec<Vec<TariffCsvRow>> {
        sort_parents_first(&mut rows);

        let phases = match settings.row_ordering {
            RowOrdering::ParentsFirst => {
                let split = rows
                    .iter()
                    .position(|r| !r.has_reference())
                    .unwrap_or(rows.len());
                let rest = rows.split_off(split);
                vec![rows, rest]
            }
            RowOrdering::SortOnly => vec![rows],
        };

        let batch_size = settings.batch_size.max(1);
        phases
            .into_iter()
            .flat_map(|phase| {
                phase
                    .chunks(batch_size)
                    .map(|chunk| chunk.to_vec())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// 单行处理（运行在阻塞线程上，整行一个事务）
fn run_row(
    repo: &TariffRepository,
    clinic_id: i64,
    row: &TariffCsvRow,
    settings: &TariffImportSettings,
) -> ImportResult<RowOutcome> {
    let prepared = row.prepare(settings.consumable_policy)?;
    repo.in_transaction(|store| process_row(store, clinic_id, &prepared, settings))
}

#[async_trait]
impl TariffImporter for TariffImporterImpl {
    async fn import_csv(
        &self,
        clinic_id: i64,
        csv_content: &str,
    ) -> ImportResult<TariffImportSummary> {
        let settings = TariffImportSettings::load(self.config.as_ref())
            .await
            .map_err(|e| ImportError::ConfigReadError(e.to_string()))?;
        self.import_csv_with_settings(clinic_id, csv_content, &settings)
            .await
    }

    #[instrument(skip(self, csv_content, settings), fields(import_id))]
    async fn import_csv_with_settings(
        &self,
        clinic_id: i64,
        csv_content: &str,
        settings: &TariffImportSettings,
    ) -> ImportResult<TariffImportSummary> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("import_id", import_id.as_str());

        // === 步骤 1: 解析 CSV ===
        let rows = parse_csv(csv_content).map_err(|e| {
            error!(error = %e, "CSV 解析失败");
            e
        })?;
        let total_rows = rows.len();

        // === 步骤 2: 排序 + 分批 ===
        let batches = Self::plan_batches(rows, settings);
        let total_batches = batches.len();
        info!(
            clinic_id,
            total_rows,
            total_batches,
            row_ordering = %settings.row_ordering,
            "开始导入价目"
        );

        // === 步骤 3: 批内并发，批次顺序 ===
        let shared_settings = Arc::new(settings.clone());
        let mut summary = TariffImportSummary::default();

        for (batch_idx, batch) in batches.into_iter().enumerate() {
            let tasks = batch.into_iter().map(|row| {
                let repo = Arc::clone(&self.repo);
                let settings = Arc::clone(&shared_settings);
                async move {
                    let name = row.name.clone();
                    let row_number = row.row_number;
                    let result = tokio::task::spawn_blocking(move || {
                        run_row(&repo, clinic_id, &row, &settings)
                    })
                    .await
                    .unwrap_or_else(|e| Err(ImportError::from(e)));
                    (row_number, name, result)
                }
            });

            let results = join_all(tasks).await;

            for (row_number, name, result) in results {
                match result {
                    Ok(outcome) => {
                        summary.successful_imports += 1;
                        summary.touched_product_ids.insert(outcome.product_id);
                        debug!(
                            row = row_number,
                            name = %name,
                            product_id = outcome.product_id,
                            created = outcome.created,
                            "行导入成功"
                        );
                    }
                    Err(e) => {
                        summary.failed_imports += 1;
                        error!(row = row_number, name = %name, error = %e, "行导入失败");
                        if summary.errors.len() < settings.error_sample_limit {
                            summary.errors.push(format!("{}: {}", name, e));
                        }
                    }
                }
            }

            debug!(
                batch = batch_idx + 1,
                total_batches,
                successful = summary.successful_imports,
                failed = summary.failed_imports,
                "批次完成"
            );

            // 最后一批之后不再等待
            if batch_idx + 1 < total_batches && !settings.batch_pause.is_zero() {
                tokio::time::sleep(settings.batch_pause).await;
            }
        }

        info!(
            successful = summary.successful_imports,
            failed = summary.failed_imports,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "价目导入完成"
        );

        Ok(summary)
    }
}
