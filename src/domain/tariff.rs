// ==========================================
// 诊所收费目录系统 - 价目导入领域模型
// ==========================================
// 职责: CSV 原始行 / 预处理行 / 已存在产品快照 / 导入汇总
// 红线: 不含解析逻辑（解析在 importer 层）
// ==========================================

use crate::domain::product::Consumable;
use crate::domain::types::PriceType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 触发检验模式的科室名称
pub const LAB_DEPARTMENT: &str = "LABORATOIRE";

// ==========================================
// TariffCsvRow - CSV 原始行
// ==========================================
// 列名区分大小写；仅 NAME 为必需列
// 空单元格反序列化为 None
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TariffCsvRow {
    #[serde(rename = "#", default)]
    pub reference: Option<String>,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "CATEGORY", default)]
    pub category: Option<String>,
    #[serde(rename = "DEPARTMENT", default)]
    pub department: Option<String>,
    #[serde(rename = "UNIT", default)]
    pub unit: Option<String>,
    #[serde(rename = "NORMAL_RANGE", default)]
    pub normal_range: Option<String>,
    #[serde(rename = "TARIFF", default)]
    pub tariff: Option<String>,
    #[serde(rename = "GOV_INSURANCE", default)]
    pub gov_insurance: Option<String>,
    #[serde(rename = "TARIFF_WITH_CO", default)]
    pub tariff_with_co: Option<String>,
    #[serde(rename = "PRIVATE_TARIFF", default)]
    pub private_tariff: Option<String>,
    #[serde(rename = "CONSUMABLES", default)]
    pub consumables: Option<String>,
    #[serde(rename = "FOREIGNERS_TARIFF", default)]
    pub foreigners_tariff: Option<String>,

    // 元信息（数据行号，从 1 开始，不含表头）
    #[serde(skip)]
    pub row_number: usize,
}

impl TariffCsvRow {
    /// 行是否携带 "#" 父行标记
    pub fn has_reference(&self) -> bool {
        self.reference
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }
}

// ==========================================
// TariffValues - 五个价格字段
// ==========================================
// None = 非数字/空白 → 该字段不更新（不是置零）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TariffValues {
    pub tariff: Option<Decimal>,
    pub gov_insurance: Option<Decimal>,
    pub tariff_with_co: Option<Decimal>,
    pub private_tariff: Option<Decimal>,
    pub foreigners_tariff: Option<Decimal>,
}

// ==========================================
// ParsedLabTest - 检验项名称解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLabTest {
    pub reference_number: Option<String>,
    pub test_name: String,
}

// ==========================================
// PreparedRow - 预处理后的导入行
// ==========================================
#[derive(Debug, Clone)]
pub struct PreparedRow {
    pub row_number: usize,
    pub raw_name: String,
    pub reference: Option<String>,
    pub category: Option<String>,
    pub departments: Vec<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Vec<Consumable>,
    pub tariffs: TariffValues,
    pub is_lab_test: bool,
    pub parsed_name: ParsedLabTest,
}

impl PreparedRow {
    /// 子检验行：检验模式 + 名称内嵌参考号
    pub fn is_child_test(&self) -> bool {
        self.is_lab_test && self.parsed_name.reference_number.is_some()
    }

    /// 父检验行的套餐参考号（检验模式 + 携带 "#" + 名称无内嵌参考号）
    pub fn panel_reference(&self) -> Option<&str> {
        if !self.is_lab_test || self.is_child_test() {
            return None;
        }
        self.reference.as_deref()
    }
}

// ==========================================
// ExistingProduct - 已存在产品快照
// ==========================================
// 金额缺失归一为 0；空字符串归一为 None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingProduct {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub base_price: Decimal,
    pub foreigners_price: Decimal,
    pub insurance_prices: Vec<ExistingInsurancePrice>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Option<Vec<Consumable>>,
    pub panel_ref: Option<String>,
    pub clinic_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingInsurancePrice {
    pub id: i64,
    pub price: Decimal,
    pub price_with_co: Option<Decimal>,
    pub company_name: String,
    pub price_type: PriceType,
}

impl ExistingProduct {
    /// 按 (保险公司, 价格类型) 查找已有价格
    pub fn find_price(
        &self,
        company_name: &str,
        price_type: PriceType,
    ) -> Option<&ExistingInsurancePrice> {
        self.insurance_prices
            .iter()
            .find(|ip| ip.company_name == company_name && ip.price_type == price_type)
    }
}

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    /// 最终落点产品（子检验行为父产品）
    pub product_id: i64,
    /// 是否新建了产品
    pub created: bool,
}

// ==========================================
// TariffImportSummary - 导入汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffImportSummary {
    pub successful_imports: usize,
    pub failed_imports: usize,
    pub errors: Vec<String>,
    /// 成功行写入的产品（子检验行记父产品），用于导入后失效缓存
    #[serde(skip)]
    pub touched_product_ids: BTreeSet<i64>,
}
