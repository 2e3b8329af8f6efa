// ==========================================
// 诊所收费目录系统 - 报价领域模型
// ==========================================
// 职责: 按支付方式为一组产品计算应收金额
// 规则:
// - 保险: 保险公司价格 × 覆盖比例 → 保险承担 / 患者自付
// - 现金: 本国患者按 base_price，外籍患者按 foreigners_price
// ==========================================

use crate::domain::types::PaymentMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 本国国籍（现金支付按 base_price 计价）
pub const HOME_NATIONALITY: &str = "Rwanda";

/// 报价上下文（来自就诊记录）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentContext {
    pub payment_mode: PaymentMode,
    pub insurance_company: Option<String>,
    /// 覆盖比例（0-100）
    pub coverage_percentage: Option<Decimal>,
    pub nationality: String,
    pub is_a_foreigner: bool,
}

impl PaymentContext {
    pub fn is_national(&self) -> bool {
        self.nationality == HOME_NATIONALITY && !self.is_a_foreigner
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    pub product_id: i64,
    pub product_name: String,
    pub amount: Decimal,
    pub patient_amount: Decimal,
    pub insurance_amount: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuote {
    pub payment_mode: PaymentMode,
    pub amount: Decimal,
    pub patient_amount: Decimal,
    pub insurance_amount: Decimal,
    pub details: Vec<PaymentDetail>,
}
