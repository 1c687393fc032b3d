use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
///
/// `document_encoding` 为空或无法识别时按 UTF-8 宽松解码。
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> std::io::Result<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.into_owned()
        }
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let Some((&node_name, rest)) = node_names.split_first() else {
        return Vec::new();
    };

    let mut found_nodes = Vec::new();
    let name_matches = get_node_name(node) == Some(node_name);

    if name_matches && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    let next_names = if name_matches && !rest.is_empty() {
        rest
    } else {
        node_names
    };

    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, next_names));
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// `parent` 字段是 `Cell`，读取时先取出再放回，不改变树结构。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take()?;
    let parent = weak.upgrade();
    child.parent.set(Some(weak));
    parent
}

/// 向上遍历所有祖先元素（不含自身和文档节点）
pub fn ancestor_elements(node: &Handle) -> impl Iterator<Item = Handle> {
    std::iter::successors(get_parent_node(node), get_parent_node).filter(is_element)
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 文本节点的内容，非文本节点返回 `None`
pub fn get_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 替换文本节点的内容
pub fn set_text(node: &Handle, text: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            let mut contents = contents.borrow_mut();
            contents.clear();
            contents.push_slice(text);
            true
        }
        _ => false,
    }
}

/// 节点身份标识，节点存活期间稳定
pub fn node_id(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

/// 节点是否仍挂在以 `root` 为根的树上
pub fn is_attached_to(node: &Handle, root: &Handle) -> bool {
    if Rc::ptr_eq(node, root) {
        return true;
    }
    std::iter::successors(get_parent_node(node), get_parent_node).any(|p| Rc::ptr_eq(&p, root))
}
