// ==========================================
// 诊所收费目录系统 - 价格对账
// ==========================================
// 职责: 将一行的五个价格字段写入保险价格与产品基础价格
// 映射:
// - TARIFF          → 私立保险公司 price          (PRIVATE)
// - GOV_INSURANCE   → 政府/特殊保险公司 price     (GOV)
// - TARIFF_WITH_CO  → 私立保险公司 price_with_co  (PRIVATE)
// - PRIVATE_TARIFF  → product.base_price
// - FOREIGNERS_TARIFF → product.foreigners_price
// 规则: 值为 None 的字段不更新；已有 (公司, 价格类型) 只改对应字段
// ==========================================

use crate::config::TariffImportSettings;
use crate::domain::product::{InsurancePriceField, ProductFieldUpdate};
use crate::domain::tariff::{ExistingInsurancePrice, ExistingProduct, TariffValues};
use crate::domain::types::PriceType;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::error::RepositoryResult;
use crate::repository::tariff_store::TariffStore;
use rust_decimal::Decimal;
use tracing::debug;

/// 写入保险价格，返回写入（新建 + 更新）条数
pub fn apply_insurance_updates(
    store: &dyn TariffStore,
    product: &ExistingProduct,
    tariffs: &TariffValues,
    settings: &TariffImportSettings,
) -> ImportResult<usize> {
    // 本行内新建的价格也要参与后续字段的匹配
    let mut working = product.clone();
    let mut written = 0;

    let passes = [
        (
            "TARIFF",
            tariffs.tariff,
            &settings.private_insurers,
            PriceType::Private,
            InsurancePriceField::Price,
        ),
        (
            "GOV_INSURANCE",
            tariffs.gov_insurance,
            &settings.gov_insurers,
            PriceType::Gov,
            InsurancePriceField::Price,
        ),
        (
            "TARIFF_WITH_CO",
            tariffs.tariff_with_co,
            &settings.private_insurers,
            PriceType::Private,
            InsurancePriceField::PriceWithCo,
        ),
    ];

    for (column, value, companies, price_type, field) in passes {
        let value = match value {
            Some(v) => v,
            None => {
                debug!(product_id = product.id, column, "价格非数字，跳过");
                continue;
            }
        };

        for company in companies.iter() {
            match working.find_price(company, price_type).map(|ip| ip.id) {
                Some(price_id) => store.update_insurance_price_field(price_id, field, value)?,
                None => {
                    let company_id =
                        resolve_insurance_company(store, company, settings.auto_create_insurers)?;
                    let (price, price_with_co) = match field {
                        InsurancePriceField::Price => (value, None),
                        InsurancePriceField::PriceWithCo => (Decimal::ZERO, Some(value)),
                    };
                    let id = store.create_insurance_price(
                        product.id,
                        company_id,
                        price,
                        price_with_co,
                        price_type,
                    )?;
                    working.insurance_prices.push(ExistingInsurancePrice {
                        id,
                        price,
                        price_with_co,
                        company_name: company.clone(),
                        price_type,
                    });
                }
            }
            written += 1;
        }
    }

    Ok(written)
}

fn resolve_insurance_company(
    store: &dyn TariffStore,
    company_name: &str,
    auto_create: bool,
) -> ImportResult<i64> {
    if auto_create {
        return Ok(store.get_or_create_insurance_company(company_name)?);
    }
    store
        .find_insurance_company_id(company_name)?
        .ok_or_else(|| ImportError::InsuranceCompanyNotFound(company_name.to_string()))
}

/// 写入产品基础价格（PRIVATE_TARIFF / FOREIGNERS_TARIFF）
pub fn apply_base_pricing(
    store: &dyn TariffStore,
    product_id: i64,
    private_tariff: Option<Decimal>,
    foreigners_tariff: Option<Decimal>,
) -> RepositoryResult<()> {
    store.update_product_fields(
        product_id,
        &ProductFieldUpdate {
            base_price: private_tariff,
            foreigners_price: foreigners_tariff,
            ..Default::default()
        },
    )
}
