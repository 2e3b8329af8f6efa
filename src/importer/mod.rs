// ==========================================
// 诊所收费目录系统 - 导入层
// ==========================================
// 职责: 价目 CSV 导入与对账
// 流程: 行解析 → 产品解析 → 价格对账 → 产品/检验项写入 → 批次编排
// ==========================================

// 模块声明
pub mod error;
pub mod lab_test_name;
pub mod pricing;
pub mod product_resolver;
pub mod product_writer;
pub mod row_parser;
pub mod tariff_importer;
pub mod tariff_importer_impl;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use lab_test_name::parse_lab_test_name;
pub use pricing::{apply_base_pricing, apply_insurance_updates};
pub use product_resolver::find_existing_product;
pub use product_writer::{generate_product_code, process_row};
pub use row_parser::{
    parse_consumables, parse_csv, parse_departments, parse_tariff, sort_parents_first,
};
pub use tariff_importer::TariffImporter;
pub use tariff_importer_impl::TariffImporterImpl;
