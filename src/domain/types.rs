// ==========================================
// 诊所收费目录系统 - 领域类型定义
// ==========================================
// 职责: 角色 / 价格类型 / 库存类型 / 导入策略等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 用户角色 (Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    ClinicAdmin,
    Doctor,
    Nurse,
    Accountant,
    Receptionist,
    LabTechnician,
    Pharmacist,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Role {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "CLINIC_ADMIN" => Some(Role::ClinicAdmin),
            "DOCTOR" => Some(Role::Doctor),
            "NURSE" => Some(Role::Nurse),
            "ACCOUNTANT" => Some(Role::Accountant),
            "RECEPTIONIST" => Some(Role::Receptionist),
            "LAB_TECHNICIAN" => Some(Role::LabTechnician),
            "PHARMACIST" => Some(Role::Pharmacist),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::ClinicAdmin => "CLINIC_ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Nurse => "NURSE",
            Role::Accountant => "ACCOUNTANT",
            Role::Receptionist => "RECEPTIONIST",
            Role::LabTechnician => "LAB_TECHNICIAN",
            Role::Pharmacist => "PHARMACIST",
        }
    }
}

// ==========================================
// 保险价格类型 (Price Type)
// ==========================================
// PRIVATE: 私立保险公司价格
// GOV: 政府/特殊保险公司价格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceType {
    Private,
    Gov,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PriceType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "PRIVATE" => Some(PriceType::Private),
            "GOV" => Some(PriceType::Gov),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PriceType::Private => "PRIVATE",
            PriceType::Gov => "GOV",
        }
    }
}

// ==========================================
// 库存物品类型 (Item Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Consumable,
    Medication,
    Equipment,
}

impl ItemType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ItemType::Consumable => "CONSUMABLE",
            ItemType::Medication => "MEDICATION",
            ItemType::Equipment => "EQUIPMENT",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "CONSUMABLE" => Some(ItemType::Consumable),
            "MEDICATION" => Some(ItemType::Medication),
            "EQUIPMENT" => Some(ItemType::Equipment),
            _ => None,
        }
    }
}

// ==========================================
// 库存计量单位 (Inventory Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryUnit {
    Piece,
    Box,
    Bottle,
}

impl InventoryUnit {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            InventoryUnit::Piece => "PIECE",
            InventoryUnit::Box => "BOX",
            InventoryUnit::Bottle => "BOTTLE",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "PIECE" => Some(InventoryUnit::Piece),
            "BOX" => Some(InventoryUnit::Box),
            "BOTTLE" => Some(InventoryUnit::Bottle),
            _ => None,
        }
    }
}

// ==========================================
// 支付方式 (Payment Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Insurance,
    Cash,
}

// ==========================================
// 导入行排序策略 (Row Ordering)
// ==========================================
// PARENTS_FIRST: 两阶段，带 "#" 的父行全部落库后再派发其余行
// SORT_ONLY: 仅排序后按批次并发（同批次内父子行顺序不保证）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowOrdering {
    ParentsFirst,
    SortOnly,
}

impl fmt::Display for RowOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOrdering::ParentsFirst => write!(f, "PARENTS_FIRST"),
            RowOrdering::SortOnly => write!(f, "SORT_ONLY"),
        }
    }
}

impl RowOrdering {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PARENTS_FIRST" => Some(RowOrdering::ParentsFirst),
            "SORT_ONLY" => Some(RowOrdering::SortOnly),
            _ => None,
        }
    }
}

// ==========================================
// 耗材格式异常处理策略 (Consumable Policy)
// ==========================================
// REJECT_ROW: 缺少括号的耗材项使整行失败
// BEST_EFFORT: 保留名称，数量置空
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumablePolicy {
    RejectRow,
    BestEffort,
}

impl fmt::Display for ConsumablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumablePolicy::RejectRow => write!(f, "REJECT_ROW"),
            ConsumablePolicy::BestEffort => write!(f, "BEST_EFFORT"),
        }
    }
}

impl ConsumablePolicy {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "REJECT_ROW" => Some(ConsumablePolicy::RejectRow),
            "BEST_EFFORT" => Some(ConsumablePolicy::BestEffort),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_db_str() {
        assert_eq!(Role::from_db_str("clinic_admin"), Some(Role::ClinicAdmin));
        assert_eq!(Role::SuperAdmin.to_db_str(), "SUPER_ADMIN");
        assert_eq!(Role::from_db_str("JANITOR"), None);
    }

    #[test]
    fn test_price_type_serde_format() {
        let json = serde_json::to_string(&PriceType::Gov).unwrap();
        assert_eq!(json, "\"GOV\"");
        assert_eq!(PriceType::from_db_str("PRIVATE"), Some(PriceType::Private));
    }

    #[test]
    fn test_import_policies_parse() {
        assert_eq!(
            RowOrdering::from_db_str("sort_only"),
            Some(RowOrdering::SortOnly)
        );
        assert_eq!(
            ConsumablePolicy::from_db_str("BEST_EFFORT"),
            Some(ConsumablePolicy::BestEffort)
        );
        assert_eq!(ConsumablePolicy::from_db_str("whatever"), None);
    }
}
