// ==========================================
// 诊所收费目录系统 - 已存在产品解析
// ==========================================
// 职责: 按名称精确查找产品，组装 ExistingProduct 快照
// 规则: 同名多条时取 id 最小者；缺失金额归一为 0；空字符串归一为 None
// ==========================================

use crate::domain::product::Product;
use crate::domain::tariff::{ExistingInsurancePrice, ExistingProduct};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::tariff_store::TariffStore;
use rust_decimal::Decimal;

/// 按名称查找已存在产品
pub fn find_existing_product(
    store: &dyn TariffStore,
    name: &str,
) -> RepositoryResult<Option<ExistingProduct>> {
    match store.find_product_by_name(name)? {
        Some(product) => load_existing_product(store, product).map(Some),
        None => Ok(None),
    }
}

/// 按 id 组装快照（产品必须存在）
pub fn load_existing_product_by_id(
    store: &dyn TariffStore,
    product_id: i64,
) -> RepositoryResult<ExistingProduct> {
    let product = store
        .find_product_by_id(product_id)?
        .ok_or_else(|| RepositoryError::NotFound {
            entity: "Product".to_string(),
            id: product_id.to_string(),
        })?;
    load_existing_product(store, product)
}

/// 为已知产品组装快照（用于子检验行解析到的父产品）
pub fn load_existing_product(
    store: &dyn TariffStore,
    product: Product,
) -> RepositoryResult<ExistingProduct> {
    let insurance_prices = store
        .list_insurance_prices(product.id)?
        .into_iter()
        .map(|ip| ExistingInsurancePrice {
            id: ip.id,
            price: ip.price,
            price_with_co: ip.price_with_co,
            company_name: ip.company_name,
            price_type: ip.price_type,
        })
        .collect();

    let clinic_ids = store.list_product_clinic_ids(product.id)?;

    Ok(ExistingProduct {
        id: product.id,
        name: product.name,
        code: product.code,
        category: blank_to_none(product.category),
        base_price: product.base_price.unwrap_or(Decimal::ZERO),
        foreigners_price: product.foreigners_price.unwrap_or(Decimal::ZERO),
        insurance_prices,
        unit: blank_to_none(product.unit),
        normal_range: blank_to_none(product.normal_range),
        consumables: if product.consumables.is_empty() {
            None
        } else {
            Some(product.consumables)
        },
        panel_ref: blank_to_none(product.panel_ref),
        clinic_ids,
    })
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
