// ==========================================
// 诊所收费目录系统 - 价目 Repository
// ==========================================
// 职责: 持有共享连接，提供事务边界与读模型查询
// 红线: Repository 不含业务规则；单行导入的全部写入在一个事务内
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::product::ProductTariff;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::tariff_store::TariffStore;
use crate::repository::tariff_store_impl::SqliteTariffStore;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// TariffRepository
// ==========================================
pub struct TariffRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TariffRepository {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 等共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在单个事务中执行闭包
    ///
    /// # 说明
    /// - 闭包返回 Ok 时提交，返回 Err 时事务随 drop 回滚
    /// - 错误类型由调用方决定（只需能从 RepositoryError 转换）
    pub fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&dyn TariffStore) -> Result<T, E>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let store = SqliteTariffStore::new(&tx);
        let value = f(&store)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    /// 只读访问（不开启显式事务）
    pub fn read<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&dyn TariffStore) -> RepositoryResult<T>,
    {
        let conn = self.lock()?;
        let store = SqliteTariffStore::new(&conn);
        f(&store)
    }

    // ===== 基础数据 =====

    /// 确保诊所存在（已存在则忽略）
    pub fn ensure_clinic(&self, clinic_id: i64, name: &str) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO clinic (id, name) VALUES (?1, ?2)",
            params![clinic_id, name],
        )?;
        Ok(())
    }

    /// 诊所是否存在
    pub fn clinic_exists(&self, clinic_id: i64) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM clinic WHERE id = ?1)",
            params![clinic_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// 确保保险公司存在，返回新建数量
    pub fn ensure_insurance_companies(&self, names: &[String]) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("INSERT OR IGNORE INTO insurance_company (company_name) VALUES (?1)")?;
        let mut created = 0;
        for name in names {
            created += stmt.execute(params![name])?;
        }
        Ok(created)
    }

    // ===== 读模型 =====

    /// 查询诊所内单个产品的价目（产品未关联该诊所视为不存在）
    pub fn find_product_tariff(
        &self,
        clinic_id: i64,
        product_id: i64,
    ) -> RepositoryResult<Option<ProductTariff>> {
        self.read(|store| load_product_tariff(store, clinic_id, product_id))
    }

    /// 批量查询诊所内产品价目（顺序与入参一致）
    ///
    /// # 错误
    /// 任一产品不存在或未关联该诊所 → NotFound
    pub fn find_product_tariffs(
        &self,
        clinic_id: i64,
        product_ids: &[i64],
    ) -> RepositoryResult<Vec<ProductTariff>> {
        self.read(|store| {
            product_ids
                .iter()
                .map(|&id| {
                    load_product_tariff(store, clinic_id, id)?.ok_or_else(|| {
                        RepositoryError::NotFound {
                            entity: "Product".to_string(),
                            id: id.to_string(),
                        }
                    })
                })
                .collect()
        })
    }
}

fn load_product_tariff(
    store: &dyn TariffStore,
    clinic_id: i64,
    product_id: i64,
) -> RepositoryResult<Option<ProductTariff>> {
    let product = match store.find_product_by_id(product_id)? {
        Some(p) => p,
        None => return Ok(None),
    };

    if !store.list_product_clinic_ids(product_id)?.contains(&clinic_id) {
        return Ok(None);
    }

    Ok(Some(ProductTariff {
        insurance_prices: store.list_insurance_prices(product_id)?,
        departments: store.list_product_departments(product_id)?,
        exam_tests: store.list_exam_tests(product_id)?,
        product,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::product::NewProduct;
    use crate::domain::types::PriceType;
    use rust_decimal::Decimal;

    fn setup() -> TariffRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = TariffRepository::from_connection(Arc::new(Mutex::new(conn)));
        repo.ensure_clinic(1, "Kigali").unwrap();
        repo.ensure_clinic(2, "Huye").unwrap();
        repo
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let repo = setup();

        let result: RepositoryResult<()> = repo.in_transaction(|store| {
            store.create_product(&NewProduct {
                code: "C1".to_string(),
                name: "Consultation".to_string(),
                ..Default::default()
            })?;
            Err(RepositoryError::InternalError("boom".to_string()))
        });
        assert!(result.is_err());

        let found = repo
            .read(|store| store.find_product_by_name("Consultation"))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_find_product_tariff_is_clinic_scoped() {
        let repo = setup();
        repo.ensure_insurance_companies(&["RSSB".to_string()])
            .unwrap();

        let product_id = repo
            .in_transaction(|store| -> RepositoryResult<i64> {
                let id = store.create_product(&NewProduct {
                    code: "C1".to_string(),
                    name: "Consultation".to_string(),
                    base_price: Some(Decimal::new(4500, 0)),
                    ..Default::default()
                })?;
                store.connect_product_clinic(id, 1)?;
                let company = store
                    .find_insurance_company_id("RSSB")?
                    .ok_or_else(|| RepositoryError::InternalError("missing".to_string()))?;
                store.create_insurance_price(
                    id,
                    company,
                    Decimal::new(5000, 0),
                    None,
                    PriceType::Private,
                )?;
                Ok(id)
            })
            .unwrap();

        let tariff = repo.find_product_tariff(1, product_id).unwrap().unwrap();
        assert_eq!(tariff.product.name, "Consultation");
        assert_eq!(tariff.insurance_prices.len(), 1);

        assert!(repo.find_product_tariff(2, product_id).unwrap().is_none());
        assert!(matches!(
            repo.find_product_tariffs(2, &[product_id]),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_ensure_insurance_companies_is_idempotent() {
        let repo = setup();
        let names = vec!["RSSB".to_string(), "MILITARY".to_string()];
        assert_eq!(repo.ensure_insurance_companies(&names).unwrap(), 2);
        assert_eq!(repo.ensure_insurance_companies(&names).unwrap(), 0);
        assert!(repo.clinic_exists(1).unwrap());
        assert!(!repo.clinic_exists(99).unwrap());
    }
}
