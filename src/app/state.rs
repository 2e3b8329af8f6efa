// ==========================================
// 诊所收费目录系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 装配: 共享连接 → Repository / ConfigManager → 导入器 → TariffApi
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use rusqlite::Connection;

use crate::api::TariffApi;
use crate::cache::MemoryCache;
use crate::config::{ConfigManager, TariffImportSettings};
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::TariffImporterImpl;
use crate::repository::TariffRepository;

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 价目API
    pub tariff_api: Arc<TariffApi>,

    /// 价目仓储（基础数据初始化）
    pub tariff_repo: Arc<TariffRepository>,

    /// 配置管理
    pub config_manager: Arc<ConfigManager>,

    /// 读模型缓存（暴露命中统计）
    pub cache: Arc<MemoryCache>,
}

impl AppState {
    /// 创建新的AppState实例（幂等建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: String) -> anyhow::Result<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        init_schema(&conn).context("建表失败")?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接装配（连接需已完成建表）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> anyhow::Result<Self> {
        let tariff_repo = Arc::new(TariffRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn).map_err(|e| anyhow!("初始化配置失败: {}", e))?,
        );
        let cache = Arc::new(MemoryCache::new());

        let importer = Arc::new(TariffImporterImpl::new(
            tariff_repo.clone(),
            config_manager.clone(),
        ));
        let tariff_api = Arc::new(TariffApi::new(
            importer,
            tariff_repo.clone(),
            config_manager.clone(),
            cache.clone(),
        ));

        Ok(Self {
            db_path,
            tariff_api,
            tariff_repo,
            config_manager,
            cache,
        })
    }

    /// 初始化诊所与已配置的保险公司（均幂等）
    ///
    /// # 返回
    /// 新建的保险公司数量
    pub async fn bootstrap_clinic(&self, clinic_id: i64, clinic_name: &str) -> anyhow::Result<usize> {
        self.tariff_repo.ensure_clinic(clinic_id, clinic_name)?;

        let settings = TariffImportSettings::load(self.config_manager.as_ref())
            .await
            .map_err(|e| anyhow!("读取导入配置失败: {}", e))?;
        let created = self
            .tariff_repo
            .ensure_insurance_companies(&settings.all_insurers())?;

        tracing::info!(clinic_id, created, "诊所基础数据已就绪");
        Ok(created)
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 CLINIC_TARIFF_DB_PATH，其次用户数据目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("CLINIC_TARIFF_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./clinic_tariff.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("clinic-tariff");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("clinic_tariff.db");
        }
    }

    path.to_string_lossy().to_string()
}
