// ==========================================
// 诊所收费目录系统 - 进程内缓存
// ==========================================
// 职责: 带过期时间的键值缓存 + 命中统计
// 统计: 按基础键（key 第一个 ':' 之前的部分）分组
// ==========================================

use crate::cache::cache_store::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub hits: u64,
    pub misses: u64,
}

impl KeyStats {
    fn rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: BTreeMap<String, KeyStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHitRate {
    pub overall: f64,
    pub by_key: BTreeMap<String, f64>,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    stats: Mutex<CacheStats>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 统计快照
    pub fn stats(&self) -> CacheResult<CacheStats> {
        Ok(lock(&self.stats)?.clone())
    }

    /// 命中率（总体 + 按基础键）
    pub fn hit_rate(&self) -> CacheResult<CacheHitRate> {
        let stats = lock(&self.stats)?;
        let overall = KeyStats {
            hits: stats.hits,
            misses: stats.misses,
        }
        .rate();
        let by_key = stats
            .keys
            .iter()
            .map(|(k, s)| (k.clone(), s.rate()))
            .collect();
        Ok(CacheHitRate { overall, by_key })
    }

    pub fn reset_stats(&self) -> CacheResult<()> {
        *lock(&self.stats)? = CacheStats::default();
        Ok(())
    }

    pub fn len(&self) -> CacheResult<usize> {
        Ok(lock(&self.entries)?.len())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    fn record(&self, key: &str, hit: bool) -> CacheResult<()> {
        let base_key = key.split(':').next().unwrap_or(key).to_string();
        let mut guard = lock(&self.stats)?;
        let stats = &mut *guard;
        let per_key = stats.keys.entry(base_key).or_default();
        if hit {
            per_key.hits += 1;
            stats.hits += 1;
        } else {
            per_key.misses += 1;
            stats.misses += 1;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> CacheResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| CacheError::LockError(e.to_string()))
}

/// 通配模式 → 锚定正则
fn glob_to_regex(pattern: &str) -> CacheResult<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| CacheError::InvalidPattern(format!("{}: {}", pattern, e)))
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let value = {
            let mut entries = lock(&self.entries)?;
            match entries.get(key).map(|e| (e.expires_at > now, e.value.clone())) {
                Some((true, value)) => Some(value),
                Some((false, _)) => {
                    // 过期即删
                    entries.remove(key);
                    None
                }
                None => None,
            }
        };

        self.record(key, value.is_some())?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = lock(&self.entries)?;
        // 写入时顺带清理过期项，不再被读取的键也不会常驻
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let expired = before - entries.len();
        if expired > 0 {
            debug!(expired, "清理过期缓存");
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let re = glob_to_regex(pattern)?;
        let mut entries = lock(&self.entries)?;
        let before = entries.len();
        entries.retain(|key, _| !re.is_match(key));
        let removed = before - entries.len();
        debug!(pattern, removed, "缓存按模式失效");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::cache_store::get_or_load;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_get_respects_expiry() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("tariff:1:product:1", "1".into(), TTL).await.unwrap();
        cache
            .set_with_ttl("tariff:1:product:2", "2".into(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("tariff:1:product:1").await.unwrap().as_deref(), Some("1"));
        assert_eq!(cache.get("tariff:1:product:2").await.unwrap(), None);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_prunes_expired_entries() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("tariff:1:product:1", "1".into(), Duration::ZERO)
            .await
            .unwrap();
        cache
            .set_with_ttl("tariff:2:product:1", "2".into(), Duration::ZERO)
            .await
            .unwrap();
        cache.set_with_ttl("tariff:3:product:1", "3".into(), TTL).await.unwrap();

        // 过期键从未被再次读取
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.stats().unwrap().misses, 0);
    }

    #[tokio::test]
    async fn test_delete_pattern_matches_glob() {
        let cache = MemoryCache::new();
        for key in ["tariff:1:product:1", "tariff:1:product:2", "tariff:12:product:1", "products:1:list"] {
            cache.set_with_ttl(key, "x".into(), TTL).await.unwrap();
        }

        assert_eq!(cache.delete_pattern("tariff:1:*").await.unwrap(), 2);
        assert_eq!(cache.delete_pattern("tariff:?2:*").await.unwrap(), 1);
        assert_eq!(cache.delete_pattern("nothing*").await.unwrap(), 0);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pattern_metacharacters_are_literal() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("a.b", "x".into(), TTL).await.unwrap();
        cache.set_with_ttl("axb", "x".into(), TTL).await.unwrap();

        assert_eq!(cache.delete_pattern("a.b").await.unwrap(), 1);
        assert!(cache.get("axb").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hit_rate_by_base_key() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("tariff:1", "1".into(), TTL).await.unwrap();

        cache.get("tariff:1").await.unwrap();
        cache.get("tariff:2").await.unwrap();
        cache.get("products:1").await.unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.keys["tariff"], KeyStats { hits: 1, misses: 1 });

        let rate = cache.hit_rate().unwrap();
        assert!((rate.overall - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(rate.by_key["tariff"], 0.5);
        assert_eq!(rate.by_key["products"], 0.0);

        cache.reset_stats().unwrap();
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
        assert_eq!(cache.hit_rate().unwrap().overall, 0.0);
    }

    #[tokio::test]
    async fn test_get_or_load_loads_once() {
        let cache = MemoryCache::new();
        let mut calls = 0;

        for _ in 0..2 {
            let value: Vec<i64> = get_or_load(&cache, "tariff:1:x", TTL, || {
                calls += 1;
                async { Ok::<_, CacheError>(vec![1, 2]) }
            })
            .await
            .unwrap();
            assert_eq!(value, vec![1, 2]);
        }

        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_get_or_load_reloads_corrupt_entry() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("tariff:1:x", "not json".into(), TTL).await.unwrap();

        let value: i64 = get_or_load(&cache, "tariff:1:x", TTL, || async { Ok::<_, CacheError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(cache.get("tariff:1:x").await.unwrap().as_deref(), Some("7"));
    }
}
