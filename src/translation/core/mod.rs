//! 翻译系统核心模块
//!
//! - **orchestrator**: 页面翻译编排（整页翻译、变化处理、周期性重扫描）
//! - **translator**: 翻译策略（后台中继或内置引擎加回退）
//! - **gate**: 整页翻译互斥门
//!
//! ## 模块依赖关系
//!
//! ```text
//! PageTranslator (orchestrator.rs)
//!     ├── DomScanner (pipeline/scanner.rs)
//!     ├── ProcessedSet (pipeline/processed.rs)
//!     ├── PersistentCache (storage/cache.rs)
//!     └── TranslatorStrategy (translator.rs)
//!             └── RelayHandle (remote/relay.rs)
//!                     └── BackgroundWorker ── RemoteTranslatorClient
//! ```

pub mod gate;
pub mod orchestrator;
pub mod translator;

pub use gate::{PassGate, PassPermit};
pub use orchestrator::{Lifecycle, PageStats, PageTranslator, PassSummary, RescanOutcome};
pub use translator::TranslatorStrategy;
