//! 已处理节点集合
//!
//! 按节点身份记录已处理（已翻译、判定为英语或过短）的文本节点。
//! 只持有弱引用，不会阻止被移除的节点释放；`prune` 清理已释放的条目。

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

use crate::parsers::html::dom::node_id;

#[derive(Default)]
pub struct ProcessedSet {
    nodes: HashMap<usize, Weak<Node>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 节点是否已处理
    ///
    /// 地址可能被新节点复用，所以需要同时确认弱引用仍指向同一节点。
    pub fn contains(&self, node: &Handle) -> bool {
        self.nodes
            .get(&node_id(node))
            .and_then(Weak::upgrade)
            .is_some_and(|existing| Rc::ptr_eq(&existing, node))
    }

    /// 标记为已处理，节点此前未被标记时返回 `true`
    pub fn insert(&mut self, node: &Handle) -> bool {
        if self.contains(node) {
            return false;
        }
        self.nodes.insert(node_id(node), Rc::downgrade(node));
        true
    }

    /// 清理已释放节点的条目，返回清理数量
    pub fn prune(&mut self) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, weak| weak.strong_count() > 0);
        before - self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
