// ==========================================
// 诊所收费目录系统 - 调用主体
// ==========================================
// 职责: 会话服务解析出的调用者（角色 + 诊所/分院范围）
// ==========================================

use crate::domain::types::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub clinic_id: i64,
    pub branch_id: Option<i64>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, clinic_id: i64) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            clinic_id,
            branch_id: None,
        }
    }

    /// 价目管理权限：仅 CLINIC_ADMIN / SUPER_ADMIN
    pub fn can_manage_tariffs(&self) -> bool {
        matches!(self.role, Role::ClinicAdmin | Role::SuperAdmin)
    }
}
