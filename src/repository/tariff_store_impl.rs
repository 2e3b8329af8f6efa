// ==========================================
// 诊所收费目录系统 - 价目数据访问实现（rusqlite）
// ==========================================
// 职责: 在给定连接/事务上实现 TariffStore
// 约束: 所有查询使用参数化；金额以 TEXT 存 Decimal
// ==========================================

use crate::domain::product::{
    Consumable, Department, ExamTest, ExamTestDraft, InsurancePrice, InsurancePriceField,
    NewProduct, Product, ProductFieldUpdate,
};
use crate::domain::types::{InventoryUnit, ItemType, PriceType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::tariff_store::TariffStore;
use chrono::Utc;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

const PRODUCT_COLUMNS: &str = "p.id, p.code, p.name, p.category, p.base_price, p.foreigners_price, \
     p.unit, p.normal_range, p.consumables, p.panel_ref, p.is_active, p.created_at, p.updated_at";

const EXAM_TEST_COLUMNS: &str =
    "id, product_id, name, unit, normal_range, consumables, reference_number";

// ==========================================
// 列解码辅助函数
// ==========================================

pub(crate) fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Decimal::from_str(s.trim())
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn consumables_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<Consumable>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Vec::new()),
        Some(s) if s.trim().is_empty() => Ok(Vec::new()),
        Some(s) => serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn decimal_to_sql(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.normalize().to_string())
}

fn consumables_to_sql(value: Option<&Vec<Consumable>>) -> RepositoryResult<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}

pub(crate) fn map_product_row(row: &Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        base_price: decimal_column(row, 4)?,
        foreigners_price: decimal_column(row, 5)?,
        unit: row.get(6)?,
        normal_range: row.get(7)?,
        consumables: consumables_column(row, 8)?,
        panel_ref: row.get(9)?,
        is_active: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub(crate) fn map_exam_test_row(row: &Row) -> rusqlite::Result<ExamTest> {
    Ok(ExamTest {
        id: row.get(0)?,
        product_id: row.get(1)?,
        name: row.get(2)?,
        unit: row.get(3)?,
        normal_range: row.get(4)?,
        consumables: consumables_column(row, 5)?,
        reference_number: row.get(6)?,
    })
}

pub(crate) fn map_insurance_price_row(row: &Row) -> rusqlite::Result<InsurancePrice> {
    let price_type_raw: String = row.get(6)?;
    let price_type = PriceType::from_db_str(&price_type_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            format!("未知价格类型: {}", price_type_raw).into(),
        )
    })?;

    Ok(InsurancePrice {
        id: row.get(0)?,
        product_id: row.get(1)?,
        insurance_company_id: row.get(2)?,
        company_name: row.get(3)?,
        price: decimal_column(row, 4)?.unwrap_or(Decimal::ZERO),
        price_with_co: decimal_column(row, 5)?,
        price_type,
    })
}

// ==========================================
// SqliteTariffStore
// ==========================================
// 借用连接（通常是事务），生命周期与事务一致
pub struct SqliteTariffStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteTariffStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl TariffStore for SqliteTariffStore<'_> {
    fn find_product_by_name(&self, name: &str) -> RepositoryResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM product p WHERE p.name = ?1 ORDER BY p.id LIMIT 1",
            PRODUCT_COLUMNS
        );
        let product = self
            .conn
            .query_row(&sql, params![name], map_product_row)
            .optional()?;
        Ok(product)
    }

    fn find_product_by_id(&self, product_id: i64) -> RepositoryResult<Option<Product>> {
        let sql = format!("SELECT {} FROM product p WHERE p.id = ?1", PRODUCT_COLUMNS);
        let product = self
            .conn
            .query_row(&sql, params![product_id], map_product_row)
            .optional()?;
        Ok(product)
    }

    fn find_panel_parent(
        &self,
        clinic_id: i64,
        panel_ref: &str,
    ) -> RepositoryResult<Option<Product>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM product p
            JOIN product_clinic pc ON pc.product_id = p.id
            WHERE pc.clinic_id = ?1 AND p.panel_ref = ?2
            ORDER BY p.id
            LIMIT 1
            "#,
            PRODUCT_COLUMNS
        );
        let product = self
            .conn
            .query_row(&sql, params![clinic_id, panel_ref], map_product_row)
            .optional()?;
        Ok(product)
    }

    fn panel_has_children(&self, clinic_id: i64, panel_ref: &str) -> RepositoryResult<bool> {
        let exists: bool = self.conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM exam_test et
                JOIN product_clinic pc ON pc.product_id = et.product_id
                WHERE pc.clinic_id = ?1 AND et.reference_number = ?2
            )
            "#,
            params![clinic_id, panel_ref],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn product_has_child_tests(&self, product_id: i64) -> RepositoryResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM exam_test WHERE product_id = ?1 AND reference_number IS NOT NULL)",
            params![product_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn create_product(&self, product: &NewProduct) -> RepositoryResult<i64> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO product (
                code, name, category, base_price, foreigners_price, unit,
                normal_range, consumables, panel_ref, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
            "#,
            params![
                product.code,
                product.name,
                product.category,
                decimal_to_sql(product.base_price),
                decimal_to_sql(product.foreigners_price),
                product.unit,
                product.normal_range,
                consumables_to_sql(product.consumables.as_ref())?,
                product.panel_ref,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_product_fields(
        &self,
        product_id: i64,
        update: &ProductFieldUpdate,
    ) -> RepositoryResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let affected = self.conn.execute(
            r#"
            UPDATE product SET
                category = COALESCE(?2, category),
                base_price = COALESCE(?3, base_price),
                foreigners_price = COALESCE(?4, foreigners_price),
                unit = COALESCE(?5, unit),
                normal_range = COALESCE(?6, normal_range),
                consumables = COALESCE(?7, consumables),
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                product_id,
                update.category,
                decimal_to_sql(update.base_price),
                decimal_to_sql(update.foreigners_price),
                update.unit,
                update.normal_range,
                consumables_to_sql(update.consumables.as_ref())?,
                Utc::now(),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            });
        }
        Ok(())
    }

    fn list_product_clinic_ids(&self, product_id: i64) -> RepositoryResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT clinic_id FROM product_clinic WHERE product_id = ?1 ORDER BY clinic_id",
        )?;
        let ids = stmt
            .query_map(params![product_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn connect_product_clinic(&self, product_id: i64, clinic_id: i64) -> RepositoryResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO product_clinic (product_id, clinic_id) VALUES (?1, ?2)",
            params![product_id, clinic_id],
        )?;
        Ok(())
    }

    fn upsert_departments(&self, names: &[String]) -> RepositoryResult<Vec<Department>> {
        let mut insert = self
            .conn
            .prepare("INSERT OR IGNORE INTO department (name) VALUES (?1)")?;
        let mut select = self
            .conn
            .prepare("SELECT id, name FROM department WHERE name = ?1")?;

        let mut departments = Vec::with_capacity(names.len());
        for name in names {
            insert.execute(params![name])?;
            let department = select.query_row(params![name], |row| {
                Ok(Department {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            departments.push(department);
        }
        Ok(departments)
    }

    fn connect_product_departments(
        &self,
        product_id: i64,
        department_ids: &[i64],
    ) -> RepositoryResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO product_department (product_id, department_id) VALUES (?1, ?2)",
        )?;
        for department_id in department_ids {
            stmt.execute(params![product_id, department_id])?;
        }
        Ok(())
    }

    fn list_product_departments(&self, product_id: i64) -> RepositoryResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.name
            FROM department d
            JOIN product_department pd ON pd.department_id = d.id
            WHERE pd.product_id = ?1
            ORDER BY d.name
            "#,
        )?;
        let names = stmt
            .query_map(params![product_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn find_insurance_company_id(&self, company_name: &str) -> RepositoryResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM insurance_company WHERE company_name = ?1",
                params![company_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_or_create_insurance_company(&self, company_name: &str) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO insurance_company (company_name) VALUES (?1)",
            params![company_name],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM insurance_company WHERE company_name = ?1",
            params![company_name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn list_insurance_prices(&self, product_id: i64) -> RepositoryResult<Vec<InsurancePrice>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT ip.id, ip.product_id, ip.insurance_company_id, ic.company_name,
                   ip.price, ip.price_with_co, ip.price_type
            FROM insurance_price ip
            JOIN insurance_company ic ON ic.id = ip.insurance_company_id
            WHERE ip.product_id = ?1
            ORDER BY ip.id
            "#,
        )?;
        let prices = stmt
            .query_map(params![product_id], map_insurance_price_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    fn create_insurance_price(
        &self,
        product_id: i64,
        insurance_company_id: i64,
        price: Decimal,
        price_with_co: Option<Decimal>,
        price_type: PriceType,
    ) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO insurance_price (
                product_id, insurance_company_id, price, price_with_co, price_type
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                product_id,
                insurance_company_id,
                decimal_to_sql(Some(price)),
                decimal_to_sql(price_with_co),
                price_type.to_db_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_insurance_price_field(
        &self,
        insurance_price_id: i64,
        field: InsurancePriceField,
        value: Decimal,
    ) -> RepositoryResult<()> {
        let sql = match field {
            InsurancePriceField::Price => "UPDATE insurance_price SET price = ?2 WHERE id = ?1",
            InsurancePriceField::PriceWithCo => {
                "UPDATE insurance_price SET price_with_co = ?2 WHERE id = ?1"
            }
        };
        let affected = self
            .conn
            .execute(sql, params![insurance_price_id, decimal_to_sql(Some(value))])?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "InsurancePrice".to_string(),
                id: insurance_price_id.to_string(),
            });
        }
        Ok(())
    }

    fn find_exam_test(&self, product_id: i64, name: &str) -> RepositoryResult<Option<ExamTest>> {
        let sql = format!(
            "SELECT {} FROM exam_test WHERE product_id = ?1 AND name = ?2",
            EXAM_TEST_COLUMNS
        );
        let test = self
            .conn
            .query_row(&sql, params![product_id, name], map_exam_test_row)
            .optional()?;
        Ok(test)
    }

    fn list_exam_tests(&self, product_id: i64) -> RepositoryResult<Vec<ExamTest>> {
        let sql = format!(
            "SELECT {} FROM exam_test WHERE product_id = ?1 ORDER BY id",
            EXAM_TEST_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tests = stmt
            .query_map(params![product_id], map_exam_test_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tests)
    }

    fn create_exam_test(&self, draft: &ExamTestDraft) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO exam_test (
                product_id, name, unit, normal_range, consumables, reference_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                draft.product_id,
                draft.name,
                draft.unit,
                draft.normal_range,
                consumables_to_sql(draft.consumables.as_ref())?,
                draft.reference_number,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_exam_test(&self, exam_test_id: i64, draft: &ExamTestDraft) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            UPDATE exam_test SET
                unit = COALESCE(?2, unit),
                normal_range = COALESCE(?3, normal_range),
                consumables = COALESCE(?4, consumables),
                reference_number = COALESCE(?5, reference_number)
            WHERE id = ?1
            "#,
            params![
                exam_test_id,
                draft.unit,
                draft.normal_range,
                consumables_to_sql(draft.consumables.as_ref())?,
                draft.reference_number,
            ],
        )?;
        Ok(())
    }

    fn find_inventory_item_names(
        &self,
        clinic_id: i64,
        names: &[String],
    ) -> RepositoryResult<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..names.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT item_name FROM inventory_item WHERE clinic_id = ?1 AND item_name IN ({})",
            placeholders
        );

        let mut values = Vec::with_capacity(names.len() + 1);
        values.push(Value::Integer(clinic_id));
        values.extend(names.iter().map(|n| Value::Text(n.clone())));

        let mut stmt = self.conn.prepare(&sql)?;
        let existing = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(existing)
    }

    fn create_consumable_items(
        &self,
        clinic_id: i64,
        names: &[String],
        reorder_level: i64,
    ) -> RepositoryResult<usize> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT OR IGNORE INTO inventory_item (
                clinic_id, item_name, item_type, unit, reorder_level, min_order_quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0)
            "#,
        )?;

        let mut created = 0;
        for name in names {
            created += stmt.execute(params![
                clinic_id,
                name,
                ItemType::Consumable.to_db_str(),
                InventoryUnit::Piece.to_db_str(),
                reorder_level,
            ])?;
        }
        Ok(created)
    }
}
