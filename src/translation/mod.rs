//! 翻译模块
//!
//! 将页面中的荷兰语内容翻译为英语：
//! - **config**: 配置管理
//! - **core**: 页面翻译编排与翻译策略
//! - **pipeline**: 文本节点扫描、语言判断、已处理记录
//! - **remote**: 远程翻译客户端与后台中继
//! - **storage**: 持久化存储、翻译缓存与计数器
//! - **options**: 选项页（选择器设置与测试翻译）
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! use seobrein_translator::parsers::Page;
//! use seobrein_translator::translation::{
//!     BackgroundWorker, CounterStore, MemoryStorage, PageTranslator, PersistentCache,
//!     RemoteTranslatorClient, StorageArea, TranslatorConfig, TranslatorStrategy,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslatorConfig::default();
//! let storage: Arc<dyn StorageArea> = Arc::new(MemoryStorage::new());
//!
//! let client = Arc::new(RemoteTranslatorClient::from_config(&config)?);
//! let counters = Arc::new(CounterStore::new(storage.clone()));
//! let (relay, _worker) = BackgroundWorker::new(client, counters, storage.clone()).spawn().await;
//!
//! let page = Rc::new(Page::parse(r#"<div class="post__body">Dit is een test</div>"#)?);
//! let cache = Arc::new(PersistentCache::new(
//!     storage,
//!     config.cache_capacity,
//!     config.cache_save_debounce(),
//! ));
//! let translator = PageTranslator::new(page, config, cache, TranslatorStrategy::relay(relay))?;
//!
//! let local = tokio::task::LocalSet::new();
//! local.run_until(translator.start()).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod remote;
pub mod storage;

pub use config::{ConfigManager, OverflowPolicy, TranslatorConfig};
pub use core::{
    Lifecycle, PageStats, PageTranslator, PassGate, PassSummary, RescanOutcome,
    TranslatorStrategy,
};
pub use error::{
    ErrorSeverity, RelayError, RemoteError, SelectorError, StorageError, TranslationError,
    TranslationResult,
};
pub use options::{ContentMessage, OptionsPage, TestOutcome};
pub use pipeline::{is_likely_english, DomScanner, ProcessedSet};
pub use remote::{BackgroundWorker, Message, RelayHandle, RemoteTranslatorClient, Reply, Translate};
pub use storage::{
    CounterStore, JsonFileStorage, MemoryStorage, PersistentCache, StorageArea, TranslationCache,
    TranslationCounters,
};
