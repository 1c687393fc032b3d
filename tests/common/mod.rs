// 集成测试公共模块
//
// 提供桩翻译器、失败的存储、HTML 夹具和页面翻译器的组装

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use markup5ever_rcdom::Handle;

use seobrein_translator::parsers::html::{find_nodes, get_node_attr, get_text};
use seobrein_translator::parsers::{Page, SelectorSet};
use seobrein_translator::translation::error::{RemoteError, StorageError, StorageResult};
use seobrein_translator::translation::{
    BackgroundWorker, CounterStore, DomScanner, MemoryStorage, PageTranslator, PersistentCache,
    RelayHandle, StorageArea, Translate, TranslatorConfig, TranslatorStrategy,
};

/// 单个帖子
pub const POST_HTML: &str = r#"<!DOCTYPE html>
<html><head><title>Forum</title></head>
<body>
  <div id="feed">
    <div class="post__body">Dit is een test</div>
  </div>
</body></html>"#;

/// 五个段落的帖子，目标元素内没有空白文本节点
pub const FIVE_PARAGRAPHS_HTML: &str = concat!(
    r#"<!DOCTYPE html><html><body><div id="feed"><div class="post__body">"#,
    "<p>Dit is een test</p>",
    "<p>Wij hebben de website bijgewerkt</p>",
    "<p>Het weer is mooi vandaag</p>",
    "<p>Ik ga naar huis</p>",
    "<p>Zij werken aan een nieuw project</p>",
    "</div></div></body></html>"
);

/// 混合内容：英文、过短文本、不可见内容和目标之外的文本
pub const MIXED_HTML: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="post__body">
    <p>This is already written in English and it should stay</p>
    <p>Ja</p>
    <p>Goedemorgen allemaal</p>
    <script>var tekst = "niet vertalen";</script>
    <p style="display: none">Verborgen tekst hier</p>
  </div>
  <div class="sidebar">Buiten het bereik</div>
</body></html>"#;

/// 记录调用的桩翻译器
#[derive(Default)]
pub struct StubTranslator {
    dictionary: HashMap<String, String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: &str, translated: &str) -> Self {
        self.dictionary
            .insert(source.to_string(), translated.to_string());
        self
    }

    pub fn failing_on(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == text).count()
    }
}

#[async_trait]
impl Translate for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(text.to_string());

        if self.failing.contains(text) {
            return Err(RemoteError::Status(500));
        }
        Ok(self
            .dictionary
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("EN: {}", text)))
    }
}

/// 所有操作都失败的存储
pub struct FailingStorage;

#[async_trait]
impl StorageArea for FailingStorage {
    async fn get(&self, _key: &str) -> StorageResult<Option<Value>> {
        Err(StorageError::Io("disk unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: Value) -> StorageResult<()> {
        Err(StorageError::Io("disk unavailable".to_string()))
    }

    async fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Io("disk unavailable".to_string()))
    }
}

/// 测试用配置：关闭定时重扫描，缩短批次延迟
pub fn test_config() -> TranslatorConfig {
    TranslatorConfig {
        batch_delay_ms: 1,
        rescan_enabled: false,
        ..Default::default()
    }
}

/// 后台中继与存储
pub struct Harness {
    pub storage: Arc<dyn StorageArea>,
    pub remote: Arc<StubTranslator>,
    pub counters: Arc<CounterStore>,
    pub relay: RelayHandle,
}

impl Harness {
    pub async fn new(remote: StubTranslator) -> Self {
        Self::with_storage(remote, Arc::new(MemoryStorage::new())).await
    }

    pub async fn with_storage(remote: StubTranslator, storage: Arc<dyn StorageArea>) -> Self {
        let remote = Arc::new(remote);
        let counters = Arc::new(CounterStore::new(storage.clone()));
        let (relay, _task) =
            BackgroundWorker::new(remote.clone(), counters.clone(), storage.clone())
                .spawn()
                .await;

        Self {
            storage,
            remote,
            counters,
            relay,
        }
    }

    pub fn cache(&self, config: &TranslatorConfig) -> Arc<PersistentCache> {
        Arc::new(PersistentCache::new(
            self.storage.clone(),
            config.cache_capacity,
            config.cache_save_debounce(),
        ))
    }

    /// 为一次“页面加载”组装翻译器
    pub fn translator(&self, html: &str, config: TranslatorConfig) -> PageTranslator {
        let page = Rc::new(Page::parse(html).expect("fixture should parse"));
        let cache = self.cache(&config);
        PageTranslator::new(page, config, cache, TranslatorStrategy::relay(self.relay.clone()))
            .expect("translator should build")
    }
}

/// 目标元素中非空白的文本（已去除首尾空白）
pub fn target_texts(translator: &PageTranslator) -> Vec<String> {
    let selectors =
        SelectorSet::parse(&translator.config().selectors).expect("selectors should parse");
    DomScanner::new(selectors)
        .collect_target_text_nodes(&translator.page().document())
        .iter()
        .filter_map(get_text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// 轮询等待条件成立
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// 按 id 查找 div 元素
pub fn div_by_id(page: &Page, id: &str) -> Handle {
    find_nodes(&page.document(), &["div"])
        .into_iter()
        .find(|node| get_node_attr(node, "id").as_deref() == Some(id))
        .expect("fixture should contain the div")
}
