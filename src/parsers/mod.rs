//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM操作、可观察页面
//! - `selector` - 目标选择器的解析与匹配

pub mod html;
pub mod selector;

pub use html::{html_to_dom, serialize_document, MutationRecord, Page};
pub use selector::SelectorSet;
