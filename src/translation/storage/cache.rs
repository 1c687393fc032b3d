//! 翻译缓存模块
//!
//! 原文到译文的有界映射。超出容量时淘汰最早插入的条目（FIFO，而非LRU），
//! 启动时从持久化存储加载一次，写入后经防抖延迟整体写回。

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use super::area::StorageArea;
use crate::translation::config::constants;
use crate::translation::error::StorageResult;

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

/// 有界翻译缓存
///
/// 底层使用 `LruCache`，但读取只走 `peek`，因此条目的新旧顺序就是插入顺序。
pub struct TranslationCache {
    entries: LruCache<String, String>,
    stats: CacheStats,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, text: &str) -> Option<String> {
        match self.entries.peek(text) {
            Some(translated) => {
                self.stats.hits += 1;
                Some(translated.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains(text)
    }

    /// 插入条目，返回被淘汰的最早条目
    ///
    /// 已存在的键原地更新，不改变其插入位置。
    pub fn put(&mut self, text: String, translated: String) -> Option<(String, String)> {
        self.stats.inserts += 1;

        if let Some(existing) = self.entries.peek_mut(&text) {
            *existing = translated;
            return None;
        }

        let evicted = self.entries.push(text, translated);
        if evicted.is_some() {
            self.stats.evictions += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 按插入顺序（从旧到新）列出条目
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter().rev()
    }

    /// 序列化为保持插入顺序的 JSON 对象
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .iter_oldest_first()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    /// 从 JSON 对象追加条目，返回读入的条目数
    pub fn extend_from_json(&mut self, value: Value) -> usize {
        let Value::Object(map) = value else {
            tracing::warn!("缓存数据不是 JSON 对象，已忽略");
            return 0;
        };

        let mut count = 0;
        for (text, translated) in map {
            if let Value::String(translated) = translated {
                self.entries.push(text, translated);
                count += 1;
            }
        }
        count
    }
}

struct CacheState {
    cache: TranslationCache,
    dirty: bool,
    revision: u64,
    loaded: bool,
}

/// 带持久化的翻译缓存
///
/// 内存中的缓存在会话内始终是权威数据；存储读写失败只记录警告。
pub struct PersistentCache {
    state: Arc<Mutex<CacheState>>,
    area: Arc<dyn StorageArea>,
    debounce: Duration,
    pending_save: Mutex<Option<JoinHandle<()>>>,
}

impl PersistentCache {
    pub fn new(area: Arc<dyn StorageArea>, capacity: usize, debounce: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                cache: TranslationCache::new(capacity),
                dirty: false,
                revision: 0,
                loaded: false,
            })),
            area,
            debounce,
            pending_save: Mutex::new(None),
        }
    }

    /// 从持久化存储加载缓存，重复调用无副作用
    pub async fn load(&self) {
        if lock(&self.state).loaded {
            return;
        }

        let stored = match self.area.get(constants::CACHE_STORAGE_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("加载翻译缓存失败，使用空缓存: {}", e);
                None
            }
        };

        let mut state = lock(&self.state);
        if state.loaded {
            return;
        }
        state.loaded = true;

        if let Some(value) = stored {
            let count = state.cache.extend_from_json(value);
            tracing::info!("已加载 {} 条缓存译文", count);
        }
    }

    pub fn get(&self, text: &str) -> Option<String> {
        lock(&self.state).cache.get(text)
    }

    /// 写入条目并安排一次延迟保存
    pub fn put(&self, text: String, translated: String) {
        {
            let mut state = lock(&self.state);
            if let Some((evicted, _)) = state.cache.put(text, translated) {
                tracing::debug!("缓存已满，淘汰最早条目: {}", preview(&evicted));
            }
        }
        self.schedule_save();
    }

    /// 标记为脏并重新设定防抖计时器
    pub fn schedule_save(&self) {
        {
            let mut state = lock(&self.state);
            state.dirty = true;
            state.revision += 1;
        }

        let state = Arc::clone(&self.state);
        let area = Arc::clone(&self.area);
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Err(e) = flush_state(&state, area.as_ref()).await {
                tracing::warn!("保存翻译缓存失败: {}", e);
            }
        });

        if let Some(previous) = lock(&self.pending_save).replace(task) {
            previous.abort();
        }
    }

    /// 立即保存脏数据，返回是否发生了写入
    pub async fn flush(&self) -> StorageResult<bool> {
        self.cancel_pending_save();
        flush_state(&self.state, self.area.as_ref()).await
    }

    /// 取消尚未触发的延迟保存
    pub fn cancel_pending_save(&self) {
        if let Some(task) = lock(&self.pending_save).take() {
            task.abort();
        }
    }

    /// 清空内存缓存并删除持久化副本
    pub async fn clear(&self) {
        self.cancel_pending_save();
        {
            let mut state = lock(&self.state);
            state.cache.clear();
            state.dirty = false;
            state.revision += 1;
        }

        if let Err(e) = self.area.remove(constants::CACHE_STORAGE_KEY).await {
            tracing::warn!("删除持久化缓存失败: {}", e);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.state).cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        lock(&self.state).dirty
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.state).cache.stats().clone()
    }

    /// 导出当前条目（从旧到新）
    pub fn entries(&self) -> Vec<(String, String)> {
        lock(&self.state)
            .cache
            .iter_oldest_first()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Drop for PersistentCache {
    fn drop(&mut self) {
        self.cancel_pending_save();
    }
}

/// 保存失败时保留脏标记，等待下一次防抖周期
async fn flush_state(state: &Mutex<CacheState>, area: &dyn StorageArea) -> StorageResult<bool> {
    let (snapshot, revision) = {
        let state = lock(state);
        if !state.dirty {
            return Ok(false);
        }
        (state.cache.to_json(), state.revision)
    };

    area.set(constants::CACHE_STORAGE_KEY, snapshot).await?;

    let mut state = lock(state);
    if state.revision == revision {
        state.dirty = false;
    }
    tracing::debug!("翻译缓存已保存: {} 条", state.cache.len());
    Ok(true)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::error::StorageError;
    use crate::translation::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    impl CountingStorage {
        fn new(fail_writes: bool) -> Self {
            Self {
                inner: MemoryStorage::new(),
                writes: AtomicUsize::new(0),
                fail_writes,
            }
        }
    }

    #[async_trait]
    impl StorageArea for CountingStorage {
        async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StorageError::Io("read-only".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key).await
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn overflow_evicts_oldest_insert() {
        let mut cache = TranslationCache::new(3);
        cache.put("een".into(), "one".into());
        cache.put("twee".into(), "two".into());
        cache.put("drie".into(), "three".into());

        // 读取不改变淘汰顺序
        assert_eq!(cache.get("een"), Some("one".to_string()));

        let evicted = cache.put("vier".into(), "four".into());
        assert_eq!(evicted, Some(("een".to_string(), "one".to_string())));
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("een"));
        assert!(cache.contains("twee"));
    }

    #[test]
    fn updating_existing_key_keeps_its_position() {
        let mut cache = TranslationCache::new(2);
        cache.put("een".into(), "one".into());
        cache.put("twee".into(), "two".into());
        assert_eq!(cache.put("een".into(), "ONE".into()), None);

        let evicted = cache.put("drie".into(), "three".into());
        assert_eq!(evicted.map(|(k, _)| k), Some("een".to_string()));
    }

    #[test]
    fn json_snapshot_preserves_insertion_order() {
        let mut cache = TranslationCache::new(10);
        cache.put("zeta".into(), "z".into());
        cache.put("alfa".into(), "a".into());

        let mut reloaded = TranslationCache::new(1);
        assert_eq!(reloaded.extend_from_json(cache.to_json()), 2);
        // 容量为1时只保留最新插入的条目
        assert!(reloaded.contains("alfa"));
        assert!(!reloaded.contains("zeta"));
    }

    #[tokio::test(start_paused = true)]
    async fn puts_within_debounce_window_collapse_into_one_write() {
        let storage = Arc::new(CountingStorage::new(false));
        let cache = PersistentCache::new(storage.clone(), 10, Duration::from_secs(2));

        cache.put("een".into(), "one".into());
        tokio::time::sleep(Duration::from_millis(500)).await;
        cache.put("twee".into(), "two".into());
        tokio::time::sleep(Duration::from_millis(500)).await;
        cache.put("drie".into(), "three".into());
        settle().await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        assert!(!cache.is_dirty());

        let stored = storage
            .get(constants::CACHE_STORAGE_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.as_object().map(|m| m.len()), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_cache_dirty() {
        let storage = Arc::new(CountingStorage::new(true));
        let cache = PersistentCache::new(storage.clone(), 10, Duration::from_secs(2));

        cache.put("een".into(), "one".into());
        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;

        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        assert!(cache.is_dirty());
        assert_eq!(cache.get("een"), Some("one".to_string()));
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let storage: Arc<dyn StorageArea> = Arc::new(MemoryStorage::new());
        storage
            .set(
                constants::CACHE_STORAGE_KEY,
                serde_json::json!({"Dit is een test": "This is a test"}),
            )
            .await
            .unwrap();

        let cache = PersistentCache::new(storage.clone(), 10, Duration::from_secs(2));
        cache.load().await;
        cache.put("nieuw".into(), "new".into());
        cache.load().await;

        assert_eq!(cache.len(), 2);
        cache.cancel_pending_save();
    }

    #[tokio::test]
    async fn clear_removes_persisted_copy() {
        let storage: Arc<dyn StorageArea> = Arc::new(MemoryStorage::new());
        let cache = PersistentCache::new(storage.clone(), 10, Duration::from_secs(2));

        cache.put("een".into(), "one".into());
        assert!(cache.flush().await.unwrap());
        assert!(storage
            .get(constants::CACHE_STORAGE_KEY)
            .await
            .unwrap()
            .is_some());

        cache.clear().await;
        assert!(cache.is_empty());
        assert!(storage
            .get(constants::CACHE_STORAGE_KEY)
            .await
            .unwrap()
            .is_none());
    }
}
