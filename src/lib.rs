//! # SEO Brein Translator
//!
//! 将社区页面中的荷兰语内容自动翻译为英语。
//!
//! ## 模块组织
//!
//! - `env` - 环境变量
//! - `parsers` - HTML 解析、可观察页面、CSS 选择器
//! - `translation` - 翻译管道、缓存、后台中继与选项页

pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use parsers::{Page, SelectorSet};
pub use translation::{PageTranslator, TranslationError, TranslationResult, TranslatorConfig};
