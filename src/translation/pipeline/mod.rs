//! 翻译管道模块
//!
//! 提供文本节点的发现、语言判断和已处理记录

pub mod heuristic;
pub mod processed;
pub mod scanner;

// 重新导出主要类型
pub use heuristic::{count_words, is_likely_english, WordCounts};
pub use processed::ProcessedSet;
pub use scanner::{collect_text_nodes, is_hidden, DomScanner, TextNodes};
