// ==========================================
// 诊所收费目录系统 - 缓存存储 Trait
// ==========================================
// 职责: 定义缓存读写接口（值为 JSON 文本）
// 实现者: MemoryCache
// ==========================================

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("缓存序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("缓存锁获取失败: {0}")]
    LockError(String),

    #[error("无效的缓存键模式: {0}")]
    InvalidPattern(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

// ==========================================
// CacheStore Trait
// ==========================================
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取未过期的值
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// 写入并设置过期时间
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// 按通配模式删除（`*` 任意串，`?` 单字符），返回删除数量
    async fn delete_pattern(&self, pattern: &str) -> CacheResult<usize>;
}

/// 读穿缓存：命中则反序列化返回，未命中则加载后写入
///
/// 缓存内容损坏时视为未命中并重新加载
pub async fn get_or_load<T, E, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    load: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    E: From<CacheError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(raw) = cache.get(key).await? {
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => return Ok(value),
            Err(e) => warn!(key, error = %e, "缓存内容无法解析，重新加载"),
        }
    }

    let value = load().await?;
    let raw = serde_json::to_string(&value).map_err(CacheError::from)?;
    cache.set_with_ttl(key, raw, ttl).await?;
    Ok(value)
}
