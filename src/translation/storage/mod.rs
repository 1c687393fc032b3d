//! 存储模块
//!
//! 提供键值存储区域、翻译缓存和翻译来源计数器。

pub mod area;
pub mod cache;
pub mod counters;

pub use area::{JsonFileStorage, MemoryStorage, StorageArea};
pub use cache::{CacheStats, PersistentCache, TranslationCache};
pub use counters::{CounterStore, TranslationCounters};
