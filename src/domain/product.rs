// ==========================================
// 诊所收费目录系统 - 产品领域模型
// ==========================================
// 职责: 产品 / 保险价格 / 检验项 / 科室 / 保险公司 / 库存物品
// 约束: 金额统一使用 Decimal，仅在展示时转换
// ==========================================

use crate::domain::types::{InventoryUnit, ItemType, PriceType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Consumable - 耗材用量
// ==========================================
// quantity 保留原始文本（如 "2"、"0.5"）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub name: String,
    pub quantity: String,
}

// ==========================================
// Product - 收费产品
// ==========================================
// code: 全局唯一
// name: 导入去重键（先匹配者胜出）
// panel_ref: 检验套餐参考号（父检验产品），子检验行据此挂靠
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub base_price: Option<Decimal>,
    pub foreigners_price: Option<Decimal>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Vec<Consumable>,
    pub panel_ref: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// NewProduct - 新建产品载荷
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub base_price: Option<Decimal>,
    pub foreigners_price: Option<Decimal>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Option<Vec<Consumable>>,
    pub panel_ref: Option<String>,
}

// ==========================================
// ProductFieldUpdate - 产品字段局部更新
// ==========================================
// None 表示该字段不更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFieldUpdate {
    pub category: Option<String>,
    pub base_price: Option<Decimal>,
    pub foreigners_price: Option<Decimal>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Option<Vec<Consumable>>,
}

impl ProductFieldUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProductFieldUpdate::default()
    }
}

// ==========================================
// InsurancePrice - 保险价格
// ==========================================
// 唯一性: (product_id, insurance_company_id, price_type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePrice {
    pub id: i64,
    pub product_id: i64,
    pub insurance_company_id: i64,
    pub company_name: String,
    pub price: Decimal,
    pub price_with_co: Option<Decimal>,
    pub price_type: PriceType,
}

/// 保险价格可更新字段
/// - Price: 标准价格
/// - PriceWithCo: 共付价格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsurancePriceField {
    Price,
    PriceWithCo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceCompany {
    pub id: i64,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

// ==========================================
// ExamTest - 检验项
// ==========================================
// reference_number: 来自子检验行 "(ref)名称" 时记录参考号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamTest {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Vec<Consumable>,
    pub reference_number: Option<String>,
}

/// 检验项写入载荷（按 product_id + name 定位）
#[derive(Debug, Clone, Default)]
pub struct ExamTestDraft {
    pub product_id: i64,
    pub name: String,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub consumables: Option<Vec<Consumable>>,
    pub reference_number: Option<String>,
}

// ==========================================
// InventoryItem - 库存物品
// ==========================================
// 唯一性: (clinic_id, item_name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub clinic_id: i64,
    pub item_name: String,
    pub item_type: ItemType,
    pub unit: InventoryUnit,
    pub reorder_level: i64,
    pub min_order_quantity: i64,
}

// ==========================================
// ProductTariff - 产品价目读模型
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTariff {
    pub product: Product,
    pub insurance_prices: Vec<InsurancePrice>,
    pub departments: Vec<String>,
    pub exam_tests: Vec<ExamTest>,
}
