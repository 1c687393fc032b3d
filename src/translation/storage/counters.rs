//! 翻译来源计数器
//!
//! 记录译文来自缓存还是远程接口，跨会话持久化。

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use super::area::StorageArea;
use crate::translation::config::constants;

/// 计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationCounters {
    pub api: u64,
    pub cache: u64,
}

/// 计数器存储
pub struct CounterStore {
    counters: Mutex<TranslationCounters>,
    /// 修改与落盘在同一把锁内完成，存储中的值不会被旧快照覆盖
    persist_lock: AsyncMutex<()>,
    area: Arc<dyn StorageArea>,
}

impl CounterStore {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self {
            counters: Mutex::new(TranslationCounters::default()),
            persist_lock: AsyncMutex::new(()),
            area,
        }
    }

    /// 从存储加载计数，失败时从零开始
    pub async fn load(&self) {
        let loaded = match self.area.get(constants::COUNTERS_STORAGE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<TranslationCounters>(value) {
                Ok(counters) => counters,
                Err(e) => {
                    tracing::warn!("计数器数据损坏，重置为0: {}", e);
                    TranslationCounters::default()
                }
            },
            Ok(None) => TranslationCounters::default(),
            Err(e) => {
                tracing::warn!("加载计数器失败: {}", e);
                TranslationCounters::default()
            }
        };

        *self.lock() = loaded;
    }

    pub async fn increment_api(&self) -> TranslationCounters {
        self.update(|counters| counters.api += 1).await
    }

    pub async fn increment_cache(&self) -> TranslationCounters {
        self.update(|counters| counters.cache += 1).await
    }

    pub async fn reset(&self) {
        self.update(|counters| *counters = TranslationCounters::default())
            .await;
    }

    pub fn snapshot(&self) -> TranslationCounters {
        *self.lock()
    }

    /// 修改计数并按修改顺序写入存储
    async fn update<F>(&self, apply: F) -> TranslationCounters
    where
        F: FnOnce(&mut TranslationCounters),
    {
        let _guard = self.persist_lock.lock().await;
        let snapshot = {
            let mut counters = self.lock();
            apply(&mut *counters);
            *counters
        };
        self.persist(snapshot).await;
        snapshot
    }

    async fn persist(&self, counters: TranslationCounters) {
        let value = match serde_json::to_value(counters) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("序列化计数器失败: {}", e);
                return;
            }
        };

        if let Err(e) = self.area.set(constants::COUNTERS_STORAGE_KEY, value).await {
            tracing::warn!("保存计数器失败: {}", e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TranslationCounters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}
