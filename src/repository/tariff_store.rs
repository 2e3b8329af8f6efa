// ==========================================
// 诊所收费目录系统 - 价目数据访问 Trait
// ==========================================
// 职责: 定义单行导入所需的数据 CRUD（不包含业务逻辑）
// 红线: Store 不含业务规则；调用方负责事务边界
// ==========================================

use crate::domain::product::{
    Department, ExamTest, ExamTestDraft, InsurancePrice, InsurancePriceField, NewProduct,
    Product, ProductFieldUpdate,
};
use crate::domain::types::PriceType;
use crate::repository::error::RepositoryResult;
use rust_decimal::Decimal;

// ==========================================
// TariffStore Trait
// ==========================================
// 用途: 价目导入的同步数据访问（运行在单个事务内）
// 实现者: SqliteTariffStore
pub trait TariffStore {
    // ===== 产品 =====

    /// 按名称精确查找产品（多条时取 id 最小者）
    fn find_product_by_name(&self, name: &str) -> RepositoryResult<Option<Product>>;

    /// 按 id 查找产品
    fn find_product_by_id(&self, product_id: i64) -> RepositoryResult<Option<Product>>;

    /// 查找诊所内指定套餐参考号的父产品
    fn find_panel_parent(&self, clinic_id: i64, panel_ref: &str)
        -> RepositoryResult<Option<Product>>;

    /// 诊所内是否已有挂靠该参考号的子检验项
    fn panel_has_children(&self, clinic_id: i64, panel_ref: &str) -> RepositoryResult<bool>;

    /// 产品下是否存在子检验项（reference_number 非空）
    fn product_has_child_tests(&self, product_id: i64) -> RepositoryResult<bool>;

    /// 新建产品，返回 id
    fn create_product(&self, product: &NewProduct) -> RepositoryResult<i64>;

    /// 局部更新产品字段（None 字段不变）
    fn update_product_fields(
        &self,
        product_id: i64,
        update: &ProductFieldUpdate,
    ) -> RepositoryResult<()>;

    // ===== 诊所 / 科室关联 =====

    /// 产品已关联的诊所
    fn list_product_clinic_ids(&self, product_id: i64) -> RepositoryResult<Vec<i64>>;

    /// 关联产品与诊所（已关联则忽略）
    fn connect_product_clinic(&self, product_id: i64, clinic_id: i64) -> RepositoryResult<()>;

    /// 按名称 upsert 科室，返回各科室（顺序与入参一致）
    fn upsert_departments(&self, names: &[String]) -> RepositoryResult<Vec<Department>>;

    /// 关联产品与科室（已关联则忽略）
    fn connect_product_departments(
        &self,
        product_id: i64,
        department_ids: &[i64],
    ) -> RepositoryResult<()>;

    /// 产品关联的科室名称
    fn list_product_departments(&self, product_id: i64) -> RepositoryResult<Vec<String>>;

    // ===== 保险公司 / 保险价格 =====

    /// 按名称查找保险公司 id
    fn find_insurance_company_id(&self, company_name: &str) -> RepositoryResult<Option<i64>>;

    /// 按名称获取或创建保险公司，返回 id
    fn get_or_create_insurance_company(&self, company_name: &str) -> RepositoryResult<i64>;

    /// 产品的全部保险价格（附保险公司名称）
    fn list_insurance_prices(&self, product_id: i64) -> RepositoryResult<Vec<InsurancePrice>>;

    /// 新建保险价格，返回 id
    fn create_insurance_price(
        &self,
        product_id: i64,
        insurance_company_id: i64,
        price: Decimal,
        price_with_co: Option<Decimal>,
        price_type: PriceType,
    ) -> RepositoryResult<i64>;

    /// 更新保险价格的单个字段
    fn update_insurance_price_field(
        &self,
        insurance_price_id: i64,
        field: InsurancePriceField,
        value: Decimal,
    ) -> RepositoryResult<()>;

    // ===== 检验项 =====

    /// 按 (product_id, name) 查找检验项
    fn find_exam_test(&self, product_id: i64, name: &str) -> RepositoryResult<Option<ExamTest>>;

    /// 产品下全部检验项
    fn list_exam_tests(&self, product_id: i64) -> RepositoryResult<Vec<ExamTest>>;

    /// 新建检验项，返回 id
    fn create_exam_test(&self, draft: &ExamTestDraft) -> RepositoryResult<i64>;

    /// 更新检验项（draft 中 None 字段不变）
    fn update_exam_test(&self, exam_test_id: i64, draft: &ExamTestDraft) -> RepositoryResult<()>;

    // ===== 库存 =====

    /// 诊所库存中已存在的物品名称（限定在 names 内）
    fn find_inventory_item_names(
        &self,
        clinic_id: i64,
        names: &[String],
    ) -> RepositoryResult<Vec<String>>;

    /// 批量新建耗材库存物品（名称已存在则跳过），返回新建数量
    fn create_consumable_items(
        &self,
        clinic_id: i64,
        names: &[String],
        reorder_level: i64,
    ) -> RepositoryResult<usize>;
}
