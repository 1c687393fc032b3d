//! CSS 选择器
//!
//! 使用 cssparser 对目标选择器进行分词，支持以下子集：
//!
//! - 类型选择器与通配符：`div`、`*`
//! - 类与 ID：`.post__body`、`#main`
//! - 属性存在与相等：`[data-role]`、`[lang="nl"]`
//! - 后代与子组合器：`article p`、`ul > li`
//! - 逗号分隔的选择器列表
//!
//! 匹配从最右侧的复合选择器开始，逐级向上检查祖先。

use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;

use super::html::dom::{ancestor_elements, get_node_attr, get_node_name, get_parent_node, is_element};
use crate::translation::error::SelectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeFilter {
    name: String,
    value: Option<String>,
}

/// 复合选择器，例如 `div.post__body[lang]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// `None` 表示通配
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeFilter>,
    started: bool,
}

impl Compound {
    fn matches(&self, element: &Handle) -> bool {
        let Some(name) = get_node_name(element) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = get_node_attr(element, "id");
            if !self.ids.iter().all(|wanted| id.as_deref() == Some(wanted)) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class_attr = get_node_attr(element, "class").unwrap_or_default();
            let classes: Vec<&str> = class_attr.split_ascii_whitespace().collect();
            if !self.classes.iter().all(|wanted| classes.contains(&wanted.as_str())) {
                return false;
            }
        }

        self.attributes.iter().all(|filter| {
            match (get_node_attr(element, &filter.name), &filter.value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => &actual == expected,
                (None, _) => false,
            }
        })
    }
}

/// 单个复杂选择器
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    /// 从左到右的复合选择器
    compounds: Vec<Compound>,
    /// `combinators[i]` 连接 `compounds[i]` 与 `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl Selector {
    fn matches(&self, element: &Handle) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.matches_at(n - 1, element),
        }
    }

    fn matches_at(&self, index: usize, element: &Handle) -> bool {
        if !self.compounds[index].matches(element) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => get_parent_node(element)
                .filter(is_element)
                .is_some_and(|parent| self.matches_at(index - 1, &parent)),
            Combinator::Descendant => {
                ancestor_elements(element).any(|ancestor| self.matches_at(index - 1, &ancestor))
            }
        }
    }
}

/// 目标选择器集合
///
/// 保留原始字符串的顺序，元素只要匹配任意一个选择器即视为目标。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    sources: Vec<String>,
    selectors: Vec<Selector>,
}

impl SelectorSet {
    /// 解析一组选择器字符串，任意一个无效都会返回错误
    pub fn parse<S: AsRef<str>>(sources: &[S]) -> Result<Self, SelectorError> {
        let mut selectors = Vec::new();
        for source in sources {
            selectors.extend(parse_selector_list(source.as_ref())?);
        }

        Ok(Self {
            sources: sources.iter().map(|s| s.as_ref().to_string()).collect(),
            selectors,
        })
    }

    /// 原始选择器字符串
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// 元素是否匹配任意一个选择器，非元素节点总是返回 `false`
    pub fn matches(&self, element: &Handle) -> bool {
        is_element(element) && self.selectors.iter().any(|s| s.matches(element))
    }
}

fn invalid(source: &str, reason: impl Into<String>) -> SelectorError {
    SelectorError {
        selector: source.to_string(),
        reason: reason.into(),
    }
}

fn describe(error: ParseError<'_, String>) -> String {
    match error.kind {
        ParseErrorKind::Custom(reason) => reason,
        ParseErrorKind::Basic(basic) => format!("{:?}", basic),
    }
}

/// 构建中的选择器
#[derive(Default)]
struct SelectorBuilder {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
    current: Compound,
    pending: Option<Combinator>,
}

impl SelectorBuilder {
    /// 开始或继续当前复合选择器
    fn compound(&mut self) -> &mut Compound {
        if let Some(combinator) = self.pending.take() {
            let finished = std::mem::take(&mut self.current);
            self.compounds.push(finished);
            self.combinators.push(combinator);
        }
        self.current.started = true;
        &mut self.current
    }

    fn whitespace(&mut self) {
        if self.current.started && self.pending.is_none() {
            self.pending = Some(Combinator::Descendant);
        }
    }

    fn child(&mut self) -> Result<(), String> {
        if !self.current.started || self.pending == Some(Combinator::Child) {
            return Err("子组合器 '>' 前缺少选择器".to_string());
        }
        self.pending = Some(Combinator::Child);
        Ok(())
    }

    fn finish(mut self) -> Result<Selector, String> {
        if !self.current.started {
            return Err("选择器为空".to_string());
        }
        if self.pending == Some(Combinator::Child) {
            return Err("子组合器 '>' 后缺少选择器".to_string());
        }
        self.compounds.push(self.current);
        Ok(Selector {
            compounds: self.compounds,
            combinators: self.combinators,
        })
    }
}

fn parse_selector_list(source: &str) -> Result<Vec<Selector>, SelectorError> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);

    let mut selectors = Vec::new();
    let mut builder = SelectorBuilder::default();

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => builder.whitespace(),
            Token::Delim('>') => builder.child().map_err(|e| invalid(source, e))?,
            Token::Delim('*') => {
                let compound = builder.compound();
                if compound.tag.is_some() || !compound.classes.is_empty() {
                    return Err(invalid(source, "通配符必须位于复合选择器开头"));
                }
            }
            Token::Ident(name) => {
                let compound = builder.compound();
                if compound.tag.is_some()
                    || !compound.ids.is_empty()
                    || !compound.classes.is_empty()
                    || !compound.attributes.is_empty()
                {
                    return Err(invalid(source, "类型选择器必须位于复合选择器开头"));
                }
                compound.tag = Some(name.to_ascii_lowercase());
            }
            Token::Delim('.') => match parser.next_including_whitespace() {
                Ok(Token::Ident(class)) => {
                    let class = class.to_string();
                    builder.compound().classes.push(class);
                }
                _ => return Err(invalid(source, "'.' 后缺少类名")),
            },
            Token::IDHash(id) => builder.compound().ids.push(id.to_string()),
            Token::SquareBracketBlock => {
                let attribute = parser
                    .parse_nested_block(parse_attribute)
                    .map_err(|e| invalid(source, describe(e)))?;
                builder.compound().attributes.push(attribute);
            }
            Token::Comma => {
                let finished = std::mem::take(&mut builder);
                selectors.push(finished.finish().map_err(|e| invalid(source, e))?);
            }
            other => {
                return Err(invalid(source, format!("不支持的记号 {:?}", other)));
            }
        }
    }

    selectors.push(builder.finish().map_err(|e| invalid(source, e))?);
    Ok(selectors)
}

fn parse_attribute<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> Result<AttributeFilter, ParseError<'i, String>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    if parser.is_exhausted() {
        return Ok(AttributeFilter { name, value: None });
    }

    parser.expect_delim('=')?;
    let value = parser.expect_ident_or_string()?.to_string();
    parser.expect_exhausted()?;

    Ok(AttributeFilter {
        name,
        value: Some(value),
    })
}
