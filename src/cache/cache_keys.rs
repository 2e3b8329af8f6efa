// ==========================================
// 诊所收费目录系统 - 缓存键
// ==========================================
// 格式: <基础键>:<clinic_id>:...
// 产品为全局共享（经 product_clinic 关联多个诊所），
// 导入改写的产品需在所有诊所的缓存中失效
// ==========================================

use crate::cache::cache_store::{CacheResult, CacheStore};
use std::collections::BTreeSet;
use tracing::info;

pub const TARIFF: &str = "tariff";
pub const PRODUCTS: &str = "products";

/// 单个产品价目缓存键
pub fn product_tariff_key(clinic_id: i64, product_id: i64) -> String {
    format!("{}:{}:product:{}", TARIFF, clinic_id, product_id)
}

/// 任意诊所下该产品价目缓存的通配模式
fn product_tariff_pattern(product_id: i64) -> String {
    format!("{}:*:product:{}", TARIFF, product_id)
}

/// 导入完成后失效缓存，返回删除键数
///
/// - 导入诊所: 价目与产品列表缓存全部失效
/// - 其他诊所: 本次导入写入过的产品价目缓存失效
pub async fn invalidate_tariff_caches(
    cache: &dyn CacheStore,
    clinic_id: i64,
    touched_product_ids: &BTreeSet<i64>,
) -> CacheResult<usize> {
    let mut removed = 0;
    for base in [TARIFF, PRODUCTS] {
        removed += cache
            .delete_pattern(&format!("{}:{}:*", base, clinic_id))
            .await?;
    }
    for &product_id in touched_product_ids {
        removed += cache
            .delete_pattern(&product_tariff_pattern(product_id))
            .await?;
    }
    info!(
        clinic_id,
        touched_products = touched_product_ids.len(),
        removed,
        "价目缓存已失效"
    );
    Ok(removed)
}
