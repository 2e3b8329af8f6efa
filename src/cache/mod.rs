// ==========================================
// 诊所收费目录系统 - 缓存层
// ==========================================
// 职责: 读模型缓存（价目查询），导入后按诊所失效
// 实现: MemoryCache（进程内，带过期时间与命中统计）
// ==========================================

pub mod cache_keys;
pub mod cache_store;
pub mod memory_cache;

pub use cache_keys::{invalidate_tariff_caches, product_tariff_key};
pub use cache_store::{get_or_load, CacheError, CacheResult, CacheStore};
pub use memory_cache::{CacheHitRate, CacheStats, KeyStats, MemoryCache};
