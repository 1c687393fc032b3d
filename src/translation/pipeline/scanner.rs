//! DOM 扫描器
//!
//! 在目标选择器匹配的子树中查找可翻译的文本节点。遍历直接作用于活动的 DOM，
//! 所以在页面变化后重新扫描自然会发现新节点。

use std::rc::Rc;

use cssparser::{Delimiter, ParseError, Parser, ParserInput};
use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{
    ancestor_elements, get_node_attr, get_node_name, get_parent_node, is_element, is_text,
};
use crate::parsers::selector::SelectorSet;
use crate::translation::config::constants;

/// 读取行内样式中某个属性的首个关键字值
pub fn inline_style_value(element: &Handle, property: &str) -> Option<String> {
    let style = get_node_attr(element, "style")?;
    let mut input = ParserInput::new(&style);
    let mut parser = Parser::new(&mut input);

    let mut found = None;
    while !parser.is_exhausted() {
        let declaration = parser.parse_until_after(Delimiter::Semicolon, |p| {
            let name = p.expect_ident()?.to_ascii_lowercase();
            p.expect_colon()?;
            let value = p.expect_ident()?.to_ascii_lowercase();
            // 忽略 `!important` 等剩余部分
            while p.next().is_ok() {}
            Ok::<_, ParseError<'_, ()>>((name, value))
        });

        // 后出现的声明覆盖前面的
        if let Ok((name, value)) = declaration {
            if name == property {
                found = Some(value);
            }
        }
    }

    found
}

/// 元素自身是否被隐藏（`display: none` 或 `hidden` 属性）
fn is_display_none(element: &Handle) -> bool {
    get_node_attr(element, "hidden").is_some()
        || inline_style_value(element, "display").as_deref() == Some("none")
}

/// 解析后的 `visibility` 是否为 `hidden`，沿祖先继承
fn is_visibility_hidden(element: &Handle) -> bool {
    std::iter::once(element.clone())
        .chain(ancestor_elements(element))
        .find_map(|e| match inline_style_value(&e, "visibility")?.as_str() {
            "hidden" | "collapse" => Some(true),
            "visible" => Some(false),
            _ => None,
        })
        .unwrap_or(false)
}

/// 元素是否不可见
pub fn is_hidden(element: &Handle) -> bool {
    is_display_none(element) || is_visibility_hidden(element)
}

/// 文本节点是否通过过滤条件，只检查直接父元素
pub fn accept_text_node(node: &Handle) -> bool {
    if !is_text(node) {
        return false;
    }

    let Some(parent) = get_parent_node(node).filter(is_element) else {
        return false;
    };

    if let Some(tag) = get_node_name(&parent) {
        if constants::SKIP_ELEMENTS.contains(&tag) {
            return false;
        }
    }

    !is_hidden(&parent)
}

/// 深度优先遍历子树中的文本节点
///
/// 迭代器是惰性的，每次调用 `collect_text_nodes` 都从当前 DOM 重新开始。
pub struct TextNodes {
    stack: Vec<Handle>,
}

impl Iterator for TextNodes {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        while let Some(node) = self.stack.pop() {
            match node.data {
                NodeData::Text { .. } => {
                    if accept_text_node(&node) {
                        return Some(node);
                    }
                }
                NodeData::Element { .. } | NodeData::Document => {
                    let children = node.children.borrow();
                    self.stack.extend(children.iter().rev().cloned());
                }
                _ => {}
            }
        }
        None
    }
}

/// 收集元素下的文本节点
pub fn collect_text_nodes(element: &Handle) -> TextNodes {
    TextNodes {
        stack: vec![element.clone()],
    }
}

/// 按文档顺序收集子树中（含自身）匹配选择器的元素
fn matching_elements(root: &Handle, selectors: &SelectorSet, found: &mut Vec<Handle>) {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if selectors.matches(&node) {
            found.push(node.clone());
        }
        let children = node.children.borrow();
        stack.extend(children.iter().rev().filter(|c| is_element(c)).cloned());
    }
}

/// DOM 扫描器
#[derive(Debug, Clone)]
pub struct DomScanner {
    selectors: SelectorSet,
}

impl DomScanner {
    pub fn new(selectors: SelectorSet) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &SelectorSet {
        &self.selectors
    }

    pub fn set_selectors(&mut self, selectors: SelectorSet) {
        self.selectors = selectors;
    }

    /// 查找文档中所有目标元素
    pub fn find_target_elements(&self, root: &Handle) -> Vec<Handle> {
        let mut found = Vec::new();
        matching_elements(root, &self.selectors, &mut found);
        found
    }

    /// 所有目标元素下的文本节点
    ///
    /// 嵌套的目标元素会让同一节点出现多次，这里按节点身份去重。
    pub fn collect_target_text_nodes(&self, root: &Handle) -> Vec<Handle> {
        let mut nodes: Vec<Handle> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for element in self.find_target_elements(root) {
            for node in collect_text_nodes(&element) {
                if seen.insert(Rc::as_ptr(&node)) {
                    nodes.push(node);
                }
            }
        }

        nodes
    }

    /// 节点是否位于某个目标元素之内（从父元素开始向上检查）
    pub fn is_within_target_element(&self, node: &Handle) -> bool {
        ancestor_elements(node).any(|ancestor| self.selectors.matches(&ancestor))
    }

    /// 新插入子树中的目标元素（含自身）
    ///
    /// 子树根本身位于目标元素之内时，整棵子树都在范围内，直接返回根。
    pub fn elements_matching_selectors(&self, node: &Handle) -> Vec<Handle> {
        if !is_element(node) {
            return Vec::new();
        }
        if self.is_within_target_element(node) {
            return vec![node.clone()];
        }

        let mut found = Vec::new();
        matching_elements(node, &self.selectors, &mut found);
        found
    }

    /// 变化记录中新增节点对应的待处理文本节点
    pub fn text_nodes_for_added(&self, node: &Handle) -> Vec<Handle> {
        if is_text(node) {
            if self.is_within_target_element(node) && accept_text_node(node) {
                return vec![node.clone()];
            }
            return Vec::new();
        }

        self.elements_matching_selectors(node)
            .iter()
            .flat_map(collect_text_nodes)
            .collect()
    }
}
