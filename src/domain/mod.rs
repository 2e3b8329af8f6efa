// ==========================================
// 诊所收费目录系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod payment;
pub mod principal;
pub mod product;
pub mod tariff;
pub mod types;

// 重导出核心类型
pub use payment::{PaymentContext, PaymentDetail, ProductQuote, HOME_NATIONALITY};
pub use principal::Principal;
pub use product::{
    Consumable, Department, ExamTest, ExamTestDraft, InsuranceCompany, InsurancePrice,
    InsurancePriceField,
    InventoryItem, NewProduct, Product, ProductFieldUpdate, ProductTariff,
};
pub use tariff::{
    ExistingInsurancePrice, ExistingProduct, ParsedLabTest, PreparedRow, RowOutcome,
    TariffCsvRow, TariffImportSummary, TariffValues, LAB_DEPARTMENT,
};
pub use types::{
    ConsumablePolicy, InventoryUnit, ItemType, PaymentMode, PriceType, Role, RowOrdering,
};
