//! 可观察的页面文档
//!
//! `Page` 持有一棵 rcdom 树，并在子节点增删时向订阅者发送 `MutationRecord`。
//! 文本内容的修改属于字符数据变化，不产生记录，因此翻译结果写回不会再次触发观察者。

use std::cell::RefCell;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::dom::{find_nodes, get_parent_node, get_text, html_to_dom, set_text};
use super::serializer::serialize_document;

/// 子节点列表变化记录
#[derive(Clone)]
pub struct MutationRecord {
    /// 发生变化的父节点
    pub target: Handle,
    pub added_nodes: Vec<Handle>,
    pub removed_nodes: Vec<Handle>,
}

impl std::fmt::Debug for MutationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationRecord")
            .field("added_nodes", &self.added_nodes.len())
            .field("removed_nodes", &self.removed_nodes.len())
            .finish()
    }
}

/// 页面文档
pub struct Page {
    dom: RcDom,
    encoding: String,
    observers: RefCell<Vec<UnboundedSender<MutationRecord>>>,
}

impl Page {
    /// 从 HTML 字符串构建页面
    pub fn parse(html: &str) -> std::io::Result<Self> {
        Self::from_bytes(html.as_bytes(), "")
    }

    /// 从字节构建页面，`encoding` 为文档声明的字符集
    pub fn from_bytes(data: &[u8], encoding: &str) -> std::io::Result<Self> {
        Ok(Self {
            dom: html_to_dom(data, encoding)?,
            encoding: encoding.to_string(),
            observers: RefCell::new(Vec::new()),
        })
    }

    pub fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    /// `<body>` 元素，解析器总会补全它；缺失时退回文档节点
    pub fn body(&self) -> Handle {
        find_nodes(&self.dom.document, &["html", "body"])
            .into_iter()
            .next()
            .unwrap_or_else(|| self.document())
    }

    /// 订阅子节点变化
    pub fn observe(&self) -> UnboundedReceiver<MutationRecord> {
        let (tx, rx) = unbounded_channel();
        self.observers.borrow_mut().push(tx);
        rx
    }

    /// 将节点追加为 `parent` 的最后一个子节点
    pub fn append_child(&self, parent: &Handle, child: Handle) {
        self.detach(&child);
        self.attach(parent, &child);
        self.notify(MutationRecord {
            target: parent.clone(),
            added_nodes: vec![child],
            removed_nodes: Vec::new(),
        });
    }

    /// 解析 HTML 片段并追加到 `parent`，返回新加入的顶层节点
    pub fn append_html(&self, parent: &Handle, html: &str) -> std::io::Result<Vec<Handle>> {
        let fragment = html_to_dom(html.as_bytes(), "")?;
        let Some(fragment_body) = find_nodes(&fragment.document, &["html", "body"])
            .into_iter()
            .next()
        else {
            return Ok(Vec::new());
        };

        let nodes: Vec<Handle> = std::mem::take(&mut *fragment_body.children.borrow_mut());
        if nodes.is_empty() {
            return Ok(nodes);
        }

        for node in &nodes {
            self.attach(parent, node);
        }
        self.notify(MutationRecord {
            target: parent.clone(),
            added_nodes: nodes.clone(),
            removed_nodes: Vec::new(),
        });

        Ok(nodes)
    }

    /// 移除子节点，`child` 不属于 `parent` 时返回 `false`
    pub fn remove_child(&self, parent: &Handle, child: &Handle) -> bool {
        let removed = {
            let mut children = parent.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, child)) {
                Some(index) => children.remove(index),
                None => return false,
            }
        };
        removed.parent.set(None);

        self.notify(MutationRecord {
            target: parent.clone(),
            added_nodes: Vec::new(),
            removed_nodes: vec![removed],
        });
        true
    }

    /// 修改文本节点内容，不通知观察者
    pub fn set_text(&self, node: &Handle, text: &str) -> bool {
        set_text(node, text)
    }

    pub fn text_of(&self, node: &Handle) -> Option<String> {
        get_text(node)
    }

    /// 按页面原始字符集序列化
    pub fn serialize(&self) -> std::io::Result<Vec<u8>> {
        serialize_document(&self.dom.document, &self.encoding)
    }

    /// 序列化为 UTF-8 字符串
    pub fn to_html(&self) -> std::io::Result<String> {
        let bytes = serialize_document(&self.dom.document, "")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn attach(&self, parent: &Handle, child: &Handle) {
        child.parent.set(Some(Rc::downgrade(parent)));
        parent.children.borrow_mut().push(child.clone());
    }

    fn detach(&self, child: &Handle) {
        if let Some(old_parent) = get_parent_node(child) {
            old_parent
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(c, child));
            child.parent.set(None);
        }
    }

    fn notify(&self, record: MutationRecord) {
        self.observers
            .borrow_mut()
            .retain(|tx| tx.send(record.clone()).is_ok());
    }
}
