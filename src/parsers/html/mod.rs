//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `page`: 可观察的页面文档
//! - `serializer`: 序列化功能

pub mod dom;
pub mod page;
pub mod serializer;

pub use dom::{
    find_nodes, get_node_attr, get_node_name, get_parent_node, get_text,
    html_to_dom, set_text,
};
pub use page::{MutationRecord, Page};
pub use serializer::serialize_document;
