//! 页面翻译编排
//!
//! `PageTranslator` 驱动整个流程：扫描目标元素中的文本节点，分批翻译，
//! 写回 DOM 并记录已处理节点；之后跟随 DOM 变化和周期性重扫描继续翻译新内容。
//!
//! 编排器运行在单线程上（节点句柄是 `Rc`），后台任务通过
//! `tokio::task::spawn_local` 启动，因此 [`PageTranslator::start`] 必须在
//! `tokio::task::LocalSet` 中调用。

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use futures::future::join_all;
use markup5ever_rcdom::Handle;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::gate::PassGate;
use super::translator::TranslatorStrategy;
use crate::parsers::html::dom::{is_attached_to, node_id};
use crate::parsers::html::{MutationRecord, Page};
use crate::parsers::selector::SelectorSet;
use crate::translation::config::{OverflowPolicy, TranslatorConfig};
use crate::translation::error::{StorageResult, TranslationResult};
use crate::translation::options::ContentMessage;
use crate::translation::pipeline::heuristic::is_likely_english;
use crate::translation::pipeline::processed::ProcessedSet;
use crate::translation::pipeline::scanner::DomScanner;
use crate::translation::storage::PersistentCache;

/// 页面生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    /// 初次整页扫描中
    Scanning,
    /// 跟随变化与重扫描
    Steady,
    Unloading,
}

/// 一次整页翻译的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// 发现的未处理文本节点
    pub text_nodes: usize,
    pub batches: usize,
    pub translated: usize,
    /// 已有翻译在运行，本次请求被忽略
    pub skipped: bool,
}

/// 一次重扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanOutcome {
    pub found: usize,
    pub translated: usize,
    /// 未翻译但被标记为已处理的节点
    pub abandoned: usize,
}

/// 调试统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub total_text_nodes: usize,
    pub target_elements: usize,
    pub target_selectors: Vec<String>,
    pub cache_size: usize,
    pub is_translating: bool,
    pub has_built_in_translator: bool,
    pub processed_nodes: usize,
}

struct Inner {
    page: Rc<Page>,
    config: TranslatorConfig,
    scanner: RefCell<DomScanner>,
    processed: RefCell<ProcessedSet>,
    cache: Arc<PersistentCache>,
    strategy: TranslatorStrategy,
    gate: PassGate,
    lifecycle: Cell<Lifecycle>,
    tasks: RefCell<Vec<JoinHandle<()>>>,
}

/// 页面翻译器
#[derive(Clone)]
pub struct PageTranslator {
    inner: Rc<Inner>,
}

impl PageTranslator {
    pub fn new(
        page: Rc<Page>,
        config: TranslatorConfig,
        cache: Arc<PersistentCache>,
        strategy: TranslatorStrategy,
    ) -> TranslationResult<Self> {
        // 之后的分批逻辑要求批次参数非零
        config.validate()?;
        let selectors = SelectorSet::parse(&config.selectors)?;

        Ok(Self {
            inner: Rc::new(Inner {
                page,
                config,
                scanner: RefCell::new(DomScanner::new(selectors)),
                processed: RefCell::new(ProcessedSet::new()),
                cache,
                strategy,
                gate: PassGate::new(),
                lifecycle: Cell::new(Lifecycle::Idle),
                tasks: RefCell::new(Vec::new()),
            }),
        })
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade()
            .map(|inner| Self { inner })
            .filter(|translator| translator.lifecycle() != Lifecycle::Unloading)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    pub fn page(&self) -> &Rc<Page> {
        &self.inner.page
    }

    pub fn cache(&self) -> &Arc<PersistentCache> {
        &self.inner.cache
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.inner.config
    }

    pub fn is_processed(&self, node: &Handle) -> bool {
        self.inner.processed.borrow().contains(node)
    }

    pub fn processed_count(&self) -> usize {
        self.inner.processed.borrow().len()
    }

    /// 初始化：加载缓存、整页翻译，然后开始监听 DOM 变化和周期性重扫描
    pub async fn start(&self) -> PassSummary {
        if self.lifecycle() != Lifecycle::Idle {
            tracing::warn!("翻译器已启动，忽略重复初始化");
            return PassSummary {
                skipped: true,
                ..Default::default()
            };
        }

        tracing::info!("开始页面翻译初始化");
        self.inner.lifecycle.set(Lifecycle::Scanning);

        // 先订阅，初次扫描期间的变化也不会丢失
        let mutations = self.inner.page.observe();
        self.inner.cache.load().await;

        let summary = self.translate_page().await;
        if self.lifecycle() == Lifecycle::Unloading {
            return summary;
        }

        self.spawn_observer(mutations);
        if self.inner.config.rescan_enabled && self.inner.config.max_rescans > 0 {
            self.spawn_rescan();
        }

        self.inner.lifecycle.set(Lifecycle::Steady);
        summary
    }

    /// 整页翻译
    ///
    /// 已有整页翻译在运行时立即返回。批次之间插入短暂延迟，让出事件循环。
    pub async fn translate_page(&self) -> PassSummary {
        let Some(_permit) = self.inner.gate.try_acquire() else {
            tracing::debug!("已有翻译任务在运行，跳过本次请求");
            return PassSummary {
                skipped: true,
                ..Default::default()
            };
        };

        let nodes = self.unprocessed_text_nodes();
        let config = &self.inner.config;
        let max_batches = config.max_batches_per_pass.unwrap_or(usize::MAX);
        tracing::info!("发现 {} 个待处理文本节点", nodes.len());

        let mut summary = PassSummary {
            text_nodes: nodes.len(),
            ..Default::default()
        };

        for (index, batch) in nodes.chunks(config.batch_size).take(max_batches).enumerate() {
            if index > 0 {
                tokio::time::sleep(config.batch_delay()).await;
            }
            if self.lifecycle() == Lifecycle::Unloading {
                break;
            }

            let results = self.process_batch(batch).await;
            summary.batches += 1;
            summary.translated += results.iter().filter(|ok| **ok).count();
        }

        tracing::info!(
            "页面翻译完成: {} 个批次, 翻译 {} 个节点",
            summary.batches,
            summary.translated
        );
        summary
    }

    /// 并发翻译一批节点，单个节点失败不影响其他节点
    pub async fn process_batch(&self, nodes: &[Handle]) -> Vec<bool> {
        join_all(nodes.iter().map(|node| self.translate_text_node(node))).await
    }

    /// 翻译单个文本节点，写回成功时返回 `true`
    ///
    /// 节点在开始时即被标记为已处理：无论跳过、失败还是成功都不会再次处理。
    pub async fn translate_text_node(&self, node: &Handle) -> bool {
        if !self.inner.processed.borrow_mut().insert(node) {
            return false;
        }

        let Some(content) = self.inner.page.text_of(node) else {
            return false;
        };
        let text = content.trim();
        if text.chars().count() < self.inner.config.min_text_length {
            return false;
        }
        if is_likely_english(text) {
            tracing::trace!("跳过英文文本: {}", preview(text));
            return false;
        }

        match self.translate_text(text).await {
            Ok(translated) if !translated.is_empty() && translated != text => {
                tracing::debug!("已翻译: \"{}\" -> \"{}\"", preview(text), preview(&translated));
                self.inner.page.set_text(node, &translated)
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!("翻译文本失败 \"{}\": {}", preview(text), e);
                false
            }
        }
    }

    /// 翻译文本：先查缓存，未命中再请求翻译并写入缓存
    pub async fn translate_text(&self, text: &str) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let relay = self.inner.strategy.relay_handle();
        if let Some(cached) = self.inner.cache.get(text) {
            tracing::debug!("缓存命中: {}", preview(text));
            if let Err(e) = relay.increment_cache_count().await {
                tracing::warn!("更新缓存计数失败: {}", e);
            }
            return Ok(cached);
        }

        let config = &self.inner.config;
        let translated = self
            .inner
            .strategy
            .translate(text, &config.source_lang, &config.target_lang)
            .await?;

        if !translated.is_empty() {
            self.inner.cache.put(text.to_string(), translated.clone());
        }
        Ok(translated)
    }

    /// 处理一组 DOM 变化记录，每次最多翻译一个批次
    pub async fn handle_mutations(&self, records: Vec<MutationRecord>) -> Vec<bool> {
        let document = self.inner.page.document();
        let mut removed = false;
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        {
            let scanner = self.inner.scanner.borrow();
            let processed = self.inner.processed.borrow();
            for record in &records {
                removed |= !record.removed_nodes.is_empty();
                for added in &record.added_nodes {
                    if !is_attached_to(added, &document) {
                        continue;
                    }
                    for node in scanner.text_nodes_for_added(added) {
                        if !processed.contains(&node) && seen.insert(node_id(&node)) {
                            nodes.push(node);
                        }
                    }
                }
            }
        }

        // 记录持有被移除节点的强引用，先释放才能清理
        drop(records);
        if removed {
            let pruned = self.inner.processed.borrow_mut().prune();
            if pruned > 0 {
                tracing::debug!("清理 {} 个已移除节点", pruned);
            }
        }

        if nodes.is_empty() {
            return Vec::new();
        }

        tracing::debug!("DOM 变化带来 {} 个新文本节点", nodes.len());
        nodes.truncate(self.inner.config.batch_size);
        self.process_batch(&nodes).await
    }

    /// 一次周期性重扫描：只翻译一个批次，剩余节点按溢出策略处置
    pub async fn rescan(&self, last_cycle: bool) -> RescanOutcome {
        if self.inner.gate.is_active() {
            tracing::debug!("整页翻译进行中，跳过本轮重扫描");
            return RescanOutcome::default();
        }

        let nodes = self.unprocessed_text_nodes();
        if nodes.is_empty() {
            return RescanOutcome::default();
        }

        let batch_len = nodes.len().min(self.inner.config.batch_size);
        let results = self.process_batch(&nodes[..batch_len]).await;

        let abandon = match self.inner.config.rescan_overflow {
            OverflowPolicy::Abandon => true,
            OverflowPolicy::Defer => last_cycle,
        };

        let mut abandoned = 0;
        if abandon {
            let mut processed = self.inner.processed.borrow_mut();
            for node in &nodes[batch_len..] {
                if processed.insert(node) {
                    abandoned += 1;
                }
            }
        }
        if abandoned > 0 {
            tracing::warn!("重扫描放弃 {} 个未翻译节点", abandoned);
        }

        RescanOutcome {
            found: nodes.len(),
            translated: results.iter().filter(|ok| **ok).count(),
            abandoned,
        }
    }

    /// 清空已处理集合和缓存后重新翻译整页
    pub async fn force_retranslate(&self) -> PassSummary {
        tracing::info!("强制重新翻译");
        self.inner.processed.borrow_mut().clear();
        self.inner.cache.clear().await;
        self.translate_page().await
    }

    pub fn get_stats(&self) -> PageStats {
        let document = self.inner.page.document();
        let scanner = self.inner.scanner.borrow();

        PageStats {
            total_text_nodes: scanner.collect_target_text_nodes(&document).len(),
            target_elements: scanner.find_target_elements(&document).len(),
            target_selectors: scanner.selectors().sources().to_vec(),
            cache_size: self.inner.cache.len(),
            is_translating: self.inner.gate.is_active(),
            has_built_in_translator: self.inner.strategy.has_built_in(),
            processed_nodes: self.inner.processed.borrow().len(),
        }
    }

    /// 替换目标选择器并翻译新范围内的内容
    pub async fn update_selectors<S: AsRef<str>>(
        &self,
        selectors: &[S],
    ) -> TranslationResult<PassSummary> {
        let parsed = SelectorSet::parse(selectors)?;
        tracing::info!("目标选择器已更新: {:?}", parsed.sources());
        self.inner.scanner.borrow_mut().set_selectors(parsed);
        Ok(self.translate_page().await)
    }

    /// 监听选项页广播的设置变化
    pub fn listen(&self, mut messages: broadcast::Receiver<ContentMessage>) {
        let weak = Rc::downgrade(&self.inner);
        let task = tokio::task::spawn_local(async move {
            loop {
                let message = match messages.recv().await {
                    Ok(message) => message,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("设置消息积压，丢弃 {} 条", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let Some(translator) = Self::from_weak(&weak) else {
                    break;
                };
                match message {
                    ContentMessage::UpdateSelectors { selectors } => {
                        if let Err(e) = translator.update_selectors(&selectors).await {
                            tracing::warn!("更新选择器失败: {}", e);
                        }
                    }
                }
            }
        });
        self.inner.tasks.borrow_mut().push(task);
    }

    /// 立即保存缓存
    pub async fn flush(&self) -> StorageResult<bool> {
        self.inner.cache.flush().await
    }

    /// 断开观察者、停止重扫描并取消待执行的缓存保存
    pub fn destroy(&self) {
        if self.lifecycle() == Lifecycle::Unloading {
            return;
        }
        self.inner.lifecycle.set(Lifecycle::Unloading);

        for task in self.inner.tasks.borrow_mut().drain(..) {
            task.abort();
        }
        self.inner.cache.cancel_pending_save();
        tracing::info!("页面翻译器已销毁");
    }

    fn unprocessed_text_nodes(&self) -> Vec<Handle> {
        let document = self.inner.page.document();
        let nodes = self.inner.scanner.borrow().collect_target_text_nodes(&document);
        let processed = self.inner.processed.borrow();
        nodes.into_iter().filter(|n| !processed.contains(n)).collect()
    }

    fn spawn_observer(&self, mut mutations: UnboundedReceiver<MutationRecord>) {
        let weak = Rc::downgrade(&self.inner);
        let task = tokio::task::spawn_local(async move {
            while let Some(first) = mutations.recv().await {
                let mut records = vec![first];
                while let Ok(more) = mutations.try_recv() {
                    records.push(more);
                }

                let Some(translator) = Self::from_weak(&weak) else {
                    break;
                };
                translator.handle_mutations(records).await;
            }
        });
        self.inner.tasks.borrow_mut().push(task);
    }

    fn spawn_rescan(&self) {
        let weak = Rc::downgrade(&self.inner);
        let interval = self.inner.config.rescan_interval();
        let max_rescans = self.inner.config.max_rescans;

        let task = tokio::task::spawn_local(async move {
            for cycle in 1..=max_rescans {
                tokio::time::sleep(interval).await;
                let Some(translator) = Self::from_weak(&weak) else {
                    return;
                };

                let outcome = translator.rescan(cycle == max_rescans).await;
                if outcome.found > 0 {
                    tracing::info!(
                        "重扫描 {}/{}: 发现 {} 个未处理节点, 翻译 {} 个",
                        cycle,
                        max_rescans,
                        outcome.found,
                        outcome.translated
                    );
                }
            }
            tracing::info!("周期性重扫描结束");
        });
        self.inner.tasks.borrow_mut().push(task);
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(30).collect();
    if text.chars().count() > 30 {
        preview.push_str("...");
    }
    preview
}
