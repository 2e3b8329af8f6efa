// ==========================================
// 诊所收费目录系统 - 产品/检验项写入
// ==========================================
// 职责: 单行导入状态机（新建/已存在 × 检验/非检验 × 父/子行）
// 约束: 调用方保证整行在一个事务内执行（失败整体回滚）
// ==========================================
// 新建:
//   检验子行 → 诊所内按 panel_ref 找父产品（找不到则失败）→ 父产品下建/改检验项
//   检验父行 → 建产品（PARENT-<#> 编码 + panel_ref）→ 已有子项则为空壳父产品，否则建同名检验项
//   检验行（无 #）→ 仅建产品
//   非检验行 → 建产品（单位/参考范围/耗材/价格内联）
// 已存在:
//   关联诊所 → 保险价格 → 基础价格 → 检验项/产品字段 → 科室
// 两条路径都会把缺失的耗材补入诊所库存
// ==========================================

use crate::config::TariffImportSettings;
use crate::domain::product::{Consumable, ExamTestDraft, NewProduct, ProductFieldUpdate};
use crate::domain::tariff::{ExistingProduct, PreparedRow, RowOutcome};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::pricing::{apply_base_pricing, apply_insurance_updates};
use crate::importer::product_resolver::{
    find_existing_product, load_existing_product, load_existing_product_by_id,
};
use crate::repository::error::RepositoryResult;
use crate::repository::tariff_store::TariffStore;
use tracing::{debug, info};
use uuid::Uuid;

/// 处理单行（在事务内调用）
pub fn process_row(
    store: &dyn TariffStore,
    clinic_id: i64,
    row: &PreparedRow,
    settings: &TariffImportSettings,
) -> ImportResult<RowOutcome> {
    add_consumables_to_inventory(
        store,
        clinic_id,
        &row.consumables,
        settings.inventory_reorder_level,
    )?;

    match find_existing_product(store, &row.raw_name)? {
        Some(existing) => update_existing_product(store, clinic_id, row, &existing, settings),
        None => create_new_product(store, clinic_id, row, settings),
    }
}

// ==========================================
// 新建路径
// ==========================================

fn create_new_product(
    store: &dyn TariffStore,
    clinic_id: i64,
    row: &PreparedRow,
    settings: &TariffImportSettings,
) -> ImportResult<RowOutcome> {
    let parsed = &row.parsed_name;

    if row.is_child_test() {
        let reference = parsed.reference_number.as_deref().unwrap_or_default();
        let parent = match store.find_panel_parent(clinic_id, reference)? {
            Some(p) => p,
            None => {
                info!(
                    child = %parsed.test_name,
                    reference,
                    "未找到父产品，子检验行失败"
                );
                return Err(ImportError::ParentNotFound {
                    reference: reference.to_string(),
                });
            }
        };

        info!(
            parent_id = parent.id,
            parent = %parent.name,
            child = %parsed.test_name,
            "子检验项挂靠父产品"
        );
        upsert_exam_test(store, parent.id, row, Some(reference))?;

        let parent = load_existing_product(store, parent)?;
        apply_insurance_updates(store, &parent, &row.tariffs, settings)?;

        return Ok(RowOutcome {
            product_id: parent.id,
            created: false,
        });
    }

    let panel_ref = row.panel_reference();
    let mut code = generate_product_code(clinic_id, &parsed.test_name);
    if let Some(reference) = panel_ref {
        code = format!("PARENT-{}-{}", reference, code);
    }

    let product_id = store.create_product(&NewProduct {
        code,
        name: parsed.test_name.clone(),
        category: row.category.clone(),
        base_price: row.tariffs.private_tariff,
        foreigners_price: row.tariffs.foreigners_tariff,
        unit: row.unit.clone(),
        normal_range: row.normal_range.clone(),
        // 检验产品的耗材挂在检验项上
        consumables: if row.is_lab_test {
            None
        } else {
            non_empty(&row.consumables)
        },
        panel_ref: panel_ref.map(str::to_string),
    })?;
    store.connect_product_clinic(product_id, clinic_id)?;
    connect_departments(store, product_id, &row.departments)?;

    if let Some(reference) = panel_ref {
        if store.panel_has_children(clinic_id, reference)? {
            info!(
                product_id,
                name = %parsed.test_name,
                reference,
                "新建父产品（已有子检验项）"
            );
        } else {
            info!(
                product_id,
                name = %parsed.test_name,
                reference,
                "新建父产品并创建同名检验项（无子检验项）"
            );
            upsert_exam_test(store, product_id, row, None)?;
        }
    }

    let created = load_existing_product_by_id(store, product_id)?;
    apply_insurance_updates(store, &created, &row.tariffs, settings)?;

    debug!(product_id, name = %parsed.test_name, "新建产品完成");
    Ok(RowOutcome {
        product_id,
        created: true,
    })
}

// ==========================================
// 已存在路径
// ==========================================

fn update_existing_product(
    store: &dyn TariffStore,
    clinic_id: i64,
    row: &PreparedRow,
    existing: &ExistingProduct,
    settings: &TariffImportSettings,
) -> ImportResult<RowOutcome> {
    if !existing.clinic_ids.contains(&clinic_id) {
        store.connect_product_clinic(existing.id, clinic_id)?;
    }

    apply_insurance_updates(store, existing, &row.tariffs, settings)?;
    apply_base_pricing(
        store,
        existing.id,
        row.tariffs.private_tariff,
        row.tariffs.foreigners_tariff,
    )?;

    if row.is_lab_test {
        if let Some(reference) = row.parsed_name.reference_number.as_deref() {
            upsert_exam_test(store, existing.id, row, Some(reference))?;
        } else if store.product_has_child_tests(existing.id)? {
            // 有子检验项：共享字段写在产品上
            store.update_product_fields(
                existing.id,
                &ProductFieldUpdate {
                    unit: row.unit.clone(),
                    normal_range: row.normal_range.clone(),
                    consumables: non_empty(&row.consumables),
                    ..Default::default()
                },
            )?;
        } else {
            upsert_exam_test(store, existing.id, row, None)?;
        }
    } else {
        store.update_product_fields(
            existing.id,
            &ProductFieldUpdate {
                category: row.category.clone(),
                unit: row.unit.clone(),
                normal_range: row.normal_range.clone(),
                consumables: non_empty(&row.consumables),
                ..Default::default()
            },
        )?;
    }

    connect_departments(store, existing.id, &row.departments)?;

    debug!(product_id = existing.id, name = %existing.name, "更新已存在产品完成");
    Ok(RowOutcome {
        product_id: existing.id,
        created: false,
    })
}

// ==========================================
// 辅助函数
// ==========================================

/// 按 (product_id, 检验项名称) 新建或更新检验项
fn upsert_exam_test(
    store: &dyn TariffStore,
    product_id: i64,
    row: &PreparedRow,
    reference_number: Option<&str>,
) -> RepositoryResult<i64> {
    let draft = ExamTestDraft {
        product_id,
        name: row.parsed_name.test_name.clone(),
        unit: row.unit.clone(),
        normal_range: row.normal_range.clone(),
        consumables: non_empty(&row.consumables),
        reference_number: reference_number.map(str::to_string),
    };

    match store.find_exam_test(product_id, &draft.name)? {
        Some(test) => {
            store.update_exam_test(test.id, &draft)?;
            Ok(test.id)
        }
        None => store.create_exam_test(&draft),
    }
}

fn connect_departments(
    store: &dyn TariffStore,
    product_id: i64,
    departments: &[String],
) -> RepositoryResult<()> {
    if departments.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = store
        .upsert_departments(departments)?
        .into_iter()
        .map(|d| d.id)
        .collect();
    store.connect_product_departments(product_id, &ids)
}

/// 把诊所库存中尚不存在的耗材补为库存物品
fn add_consumables_to_inventory(
    store: &dyn TariffStore,
    clinic_id: i64,
    consumables: &[Consumable],
    reorder_level: i64,
) -> RepositoryResult<usize> {
    if consumables.is_empty() {
        return Ok(0);
    }

    let mut names: Vec<String> = Vec::with_capacity(consumables.len());
    for c in consumables {
        if !names.contains(&c.name) {
            names.push(c.name.clone());
        }
    }

    let existing = store.find_inventory_item_names(clinic_id, &names)?;
    names.retain(|n| !existing.contains(n));
    if names.is_empty() {
        return Ok(0);
    }

    let created = store.create_consumable_items(clinic_id, &names, reorder_level)?;
    debug!(clinic_id, created, "耗材已加入库存");
    Ok(created)
}

fn non_empty(consumables: &[Consumable]) -> Option<Vec<Consumable>> {
    if consumables.is_empty() {
        None
    } else {
        Some(consumables.to_vec())
    }
}

/// 生成产品编码: <诊所>-<名称前三字符>-<6 位随机>，全大写
pub fn generate_product_code(clinic_id: i64, product_name: &str) -> String {
    let prefix: String = product_name.chars().take(3).collect();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", clinic_id, prefix, &random[..6]).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::tariff::TariffCsvRow;
    use crate::domain::types::ConsumablePolicy;
    use crate::repository::tariff_store_impl::SqliteTariffStore;
    use rusqlite::Connection;
    use rust_decimal::Decimal;

    fn setup() -> (Connection, TariffImportSettings) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO clinic (id, name) VALUES (1, 'Kigali')", [])
            .unwrap();
        let settings = TariffImportSettings::default();
        for name in settings.all_insurers() {
            conn.execute(
                "INSERT INTO insurance_company (company_name) VALUES (?1)",
                rusqlite::params![name],
            )
            .unwrap();
        }
        (conn, settings)
    }

    fn lab_row(reference: Option<&str>, name: &str, unit: &str) -> PreparedRow {
        TariffCsvRow {
            reference: reference.map(str::to_string),
            name: name.to_string(),
            department: Some("LABORATOIRE".to_string()),
            unit: Some(unit.to_string()),
            tariff: Some("1500".to_string()),
            row_number: 1,
            ..Default::default()
        }
        .prepare(ConsumablePolicy::RejectRow)
        .unwrap()
    }

    #[test]
    fn test_generate_product_code_shape() {
        let code = generate_product_code(3, "consultation");
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts[0], "3");
        assert_eq!(parts[1], "CON");
        assert_eq!(parts[2].len(), 6);
        assert_eq!(code, code.to_uppercase());

        assert!(generate_product_code(1, "X").starts_with("1-X-"));
    }

    #[test]
    fn test_child_without_parent_fails() {
        let (conn, settings) = setup();
        let store = SqliteTariffStore::new(&conn);

        let err = process_row(&store, 1, &lab_row(None, "(9)Hemoglobin", "g/dL"), &settings)
            .unwrap_err();
        assert!(matches!(err, ImportError::ParentNotFound { reference } if reference == "9"));
    }

    #[test]
    fn test_parent_then_child_attaches_exam_test() {
        let (conn, settings) = setup();
        let store = SqliteTariffStore::new(&conn);

        let parent = process_row(&store, 1, &lab_row(Some("9"), "Full Blood Count", "-"), &settings)
            .unwrap();
        assert!(parent.created);
        let product = store.find_product_by_id(parent.product_id).unwrap().unwrap();
        assert!(product.code.starts_with("PARENT-9-1-FUL-"));
        assert_eq!(product.panel_ref.as_deref(), Some("9"));
        // 无子项时建同名检验项
        assert_eq!(store.list_exam_tests(parent.product_id).unwrap().len(), 1);

        let child = process_row(&store, 1, &lab_row(None, "(9)Hemoglobin", "g/dL"), &settings)
            .unwrap();
        assert_eq!(child.product_id, parent.product_id);
        assert!(!child.created);

        let test = store
            .find_exam_test(parent.product_id, "Hemoglobin")
            .unwrap()
            .unwrap();
        assert_eq!(test.unit.as_deref(), Some("g/dL"));
        assert_eq!(test.reference_number.as_deref(), Some("9"));
        assert!(store.find_product_by_name("(9)Hemoglobin").unwrap().is_none());
    }

    #[test]
    fn test_existing_non_lab_updates_supplied_fields_only() {
        let (conn, settings) = setup();
        let store = SqliteTariffStore::new(&conn);

        let first = TariffCsvRow {
            name: "X-Ray".to_string(),
            department: Some("RADIOLOGY".to_string()),
            unit: Some("film".to_string()),
            private_tariff: Some("8000".to_string()),
            ..Default::default()
        }
        .prepare(ConsumablePolicy::RejectRow)
        .unwrap();
        let created = process_row(&store, 1, &first, &settings).unwrap();

        let second = TariffCsvRow {
            name: "X-Ray".to_string(),
            normal_range: Some("n/a".to_string()),
            foreigners_tariff: Some("12000".to_string()),
            ..Default::default()
        }
        .prepare(ConsumablePolicy::RejectRow)
        .unwrap();
        let updated = process_row(&store, 1, &second, &settings).unwrap();
        assert_eq!(updated.product_id, created.product_id);
        assert!(!updated.created);

        let product = store.find_product_by_id(created.product_id).unwrap().unwrap();
        assert_eq!(product.unit.as_deref(), Some("film"));
        assert_eq!(product.normal_range.as_deref(), Some("n/a"));
        assert_eq!(product.base_price, Some(Decimal::new(8000, 0)));
        assert_eq!(product.foreigners_price, Some(Decimal::new(12000, 0)));
    }

    #[test]
    fn test_inventory_skips_known_names() {
        let (conn, _) = setup();
        let store = SqliteTariffStore::new(&conn);
        let consumables = vec![
            Consumable {
                name: "Gloves".to_string(),
                quantity: "2".to_string(),
            },
            Consumable {
                name: "Gloves".to_string(),
                quantity: "1".to_string(),
            },
        ];

        assert_eq!(add_consumables_to_inventory(&store, 1, &consumables, 50).unwrap(), 1);
        assert_eq!(add_consumables_to_inventory(&store, 1, &consumables, 50).unwrap(), 0);
    }
}
