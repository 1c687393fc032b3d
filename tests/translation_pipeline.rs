//! 翻译管道集成测试
//!
//! 测试从页面扫描到写回 DOM 的端到端流程

use tokio::task::LocalSet;

use seobrein_translator::parsers::html::{get_text, MutationRecord};
use seobrein_translator::translation::config::constants;
use seobrein_translator::translation::{DomScanner, Lifecycle, TranslatorConfig};
use seobrein_translator::SelectorSet;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{
    target_texts, test_config, Harness, StubTranslator, FIVE_PARAGRAPHS_HTML, MIXED_HTML,
    POST_HTML,
};

/// 测试单个帖子的完整翻译流程
#[tokio::test]
async fn test_post_body_is_translated_end_to_end() {
    let harness = Harness::new(StubTranslator::new().with("Dit is een test", "This is a test")).await;
    let translator = harness.translator(POST_HTML, test_config());

    let summary = LocalSet::new().run_until(translator.start()).await;

    assert_eq!(summary.text_nodes, 1);
    assert_eq!(summary.translated, 1);
    assert_eq!(target_texts(&translator), vec!["This is a test"]);
    assert_eq!(
        translator.cache().get("Dit is een test").as_deref(),
        Some("This is a test")
    );
    assert_eq!(harness.counters.snapshot().api, 1);
    assert_eq!(harness.counters.snapshot().cache, 0);
    assert_eq!(translator.lifecycle(), Lifecycle::Steady);

    let html = translator.page().to_html().expect("page should serialize");
    assert!(html.contains(r#"<div class="post__body">This is a test</div>"#));
}

/// 测试过短文本和英文文本不会发送翻译请求
#[tokio::test]
async fn test_short_and_english_text_are_skipped() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(MIXED_HTML, test_config());

    let summary = LocalSet::new().run_until(translator.start()).await;

    assert_eq!(harness.remote.calls(), vec!["Goedemorgen allemaal"]);
    assert_eq!(summary.translated, 1);

    let texts = target_texts(&translator);
    assert!(texts.contains(&"This is already written in English and it should stay".to_string()));
    assert!(texts.contains(&"Ja".to_string()));
    assert!(texts.contains(&"EN: Goedemorgen allemaal".to_string()));

    // 跳过的节点同样被记录为已处理
    let html = translator.page().to_html().expect("page should serialize");
    assert!(html.contains("Buiten het bereik"));
    assert!(html.contains(r#"var tekst = "niet vertalen";"#));
    assert!(html.contains("Verborgen tekst hier"));
}

/// 测试短于最小长度的文本被标记为已处理但不翻译
#[tokio::test]
async fn test_short_text_is_marked_processed_without_call() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(
        r#"<div class="post__body"><p>Ok</p></div>"#,
        test_config(),
    );

    let nodes = DomScanner::new(SelectorSet::parse(&["div.post__body"]).unwrap())
        .collect_target_text_nodes(&translator.page().document());
    assert_eq!(nodes.len(), 1);

    assert!(!translator.translate_text_node(&nodes[0]).await);
    assert!(translator.is_processed(&nodes[0]));
    assert_eq!(harness.remote.call_count(), 0);
}

/// 测试同一文本第二次翻译命中缓存
#[tokio::test]
async fn test_repeated_text_uses_cache() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(POST_HTML, test_config());

    let first = translator.translate_text("Goedenavond").await.unwrap();
    let second = translator.translate_text("Goedenavond").await.unwrap();

    assert_eq!(first, "EN: Goedenavond");
    assert_eq!(second, first);
    assert_eq!(harness.remote.calls_for("Goedenavond"), 1);

    let counters = harness.counters.snapshot();
    assert_eq!(counters.api, 1);
    assert_eq!(counters.cache, 1);
}

/// 测试空白文本直接返回空串
#[tokio::test]
async fn test_blank_text_returns_empty() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(POST_HTML, test_config());

    assert_eq!(translator.translate_text("   ").await.unwrap(), "");
    assert_eq!(harness.remote.call_count(), 0);
}

/// 测试批次中单个失败不影响其他节点
#[tokio::test]
async fn test_batch_continues_after_single_failure() {
    let harness = Harness::new(StubTranslator::new().failing_on("Het weer is mooi vandaag")).await;
    let translator = harness.translator(FIVE_PARAGRAPHS_HTML, test_config());

    let nodes = DomScanner::new(SelectorSet::parse(&["div.post__body"]).unwrap())
        .collect_target_text_nodes(&translator.page().document())
        .into_iter()
        .filter(|n| get_text(n).map_or(false, |t| !t.trim().is_empty()))
        .collect::<Vec<_>>();
    assert_eq!(nodes.len(), 5);

    let results = translator.process_batch(&nodes).await;
    assert_eq!(results.iter().filter(|ok| **ok).count(), 4);
    assert!(nodes.iter().all(|n| translator.is_processed(n)));

    let texts = target_texts(&translator);
    assert!(texts.contains(&"Het weer is mooi vandaag".to_string()));
    assert!(texts.contains(&"EN: Ik ga naar huis".to_string()));
    assert!(translator.cache().get("Het weer is mooi vandaag").is_none());
}

/// 测试已处理节点不会再次发送
#[tokio::test]
async fn test_processed_nodes_are_never_resent() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(FIVE_PARAGRAPHS_HTML, test_config());

    let first = translator.translate_page().await;
    let second = translator.translate_page().await;

    assert_eq!(first.translated, 5);
    assert_eq!(second.text_nodes, 0);
    assert_eq!(second.translated, 0);
    assert_eq!(harness.remote.call_count(), 5);
}

/// 测试批次大小和每次最多批次数
#[tokio::test]
async fn test_pass_respects_batch_limits() {
    let harness = Harness::new(StubTranslator::new()).await;
    let config = TranslatorConfig {
        batch_size: 2,
        max_batches_per_pass: Some(2),
        ..test_config()
    };
    let translator = harness.translator(FIVE_PARAGRAPHS_HTML, config);

    let summary = translator.translate_page().await;

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.translated, 4);
    assert_eq!(harness.remote.call_count(), 4);

    // 剩余节点留给下一次
    let rest = translator.translate_page().await;
    assert_eq!(rest.text_nodes, 1);
    assert_eq!(rest.translated, 1);
}

/// 测试整页翻译不可重入
#[tokio::test]
async fn test_concurrent_pass_is_skipped() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(POST_HTML, test_config());

    let (first, second) = tokio::join!(translator.translate_page(), translator.translate_page());

    assert!(!first.skipped);
    assert!(second.skipped);
    assert_eq!(first.translated, 1);
    assert_eq!(harness.remote.call_count(), 1);
}

/// 测试新页面加载时命中持久化缓存
#[tokio::test]
async fn test_cached_translation_survives_page_reload() {
    let harness = Harness::new(StubTranslator::new().with("Dit is een test", "This is a test")).await;

    let first = harness.translator(POST_HTML, test_config());
    LocalSet::new().run_until(first.start()).await;
    assert!(first.flush().await.unwrap());
    first.destroy();

    let second = harness.translator(POST_HTML, test_config());
    let summary = LocalSet::new().run_until(second.start()).await;

    assert_eq!(summary.translated, 1);
    assert_eq!(target_texts(&second), vec!["This is a test"]);
    assert_eq!(harness.remote.call_count(), 1);

    let counters = harness.counters.snapshot();
    assert_eq!(counters.api, 1);
    assert_eq!(counters.cache, 1);
}

/// 测试强制重新翻译清空缓存和已处理记录
#[tokio::test]
async fn test_force_retranslate_starts_over() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(
        r#"<div class="post__body"><p>Goedemorgen allemaal</p></div>"#,
        test_config(),
    );

    translator.translate_page().await;
    assert_eq!(translator.processed_count(), 1);
    assert_eq!(translator.cache().len(), 1);

    // 已写回的译文再次被当作原文发送
    let summary = translator.force_retranslate().await;
    assert_eq!(summary.text_nodes, 1);
    assert_eq!(summary.translated, 1);
    assert_eq!(
        harness.remote.calls(),
        vec!["Goedemorgen allemaal", "EN: Goedemorgen allemaal"]
    );
    assert!(translator.cache().get("Goedemorgen allemaal").is_none());
}

/// 测试调试统计
#[tokio::test]
async fn test_stats_report_page_state() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(FIVE_PARAGRAPHS_HTML, test_config());

    translator.translate_page().await;
    let stats = translator.get_stats();

    assert_eq!(stats.target_elements, 1);
    assert_eq!(stats.target_selectors, vec!["div.post__body"]);
    assert_eq!(stats.cache_size, 5);
    assert_eq!(stats.processed_nodes, stats.total_text_nodes);
    assert!(!stats.is_translating);
    assert!(!stats.has_built_in_translator);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["cacheSize"], 5);
    assert_eq!(json["targetSelectors"][0], "div.post__body");
}

/// 测试更换选择器后翻译新范围
#[tokio::test]
async fn test_update_selectors_translates_new_scope() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(MIXED_HTML, test_config());

    translator.translate_page().await;
    assert_eq!(harness.remote.calls_for("Buiten het bereik"), 0);

    let summary = translator
        .update_selectors(&["div.sidebar", "div.post__body"])
        .await
        .unwrap();
    assert_eq!(summary.translated, 1);
    assert_eq!(harness.remote.calls_for("Buiten het bereik"), 1);
    assert_eq!(
        translator.get_stats().target_selectors,
        vec!["div.sidebar", "div.post__body"]
    );

    assert!(translator.update_selectors(&["div..broken"]).await.is_err());
    assert_eq!(translator.get_stats().target_elements, 2);
}

/// 测试未附着到文档的新增节点被忽略
#[tokio::test]
async fn test_detached_additions_are_ignored() {
    let harness = Harness::new(StubTranslator::new()).await;
    let translator = harness.translator(POST_HTML, test_config());

    let detached = seobrein_translator::Page::parse(
        r#"<div class="post__body">Losse tekst zonder pagina</div>"#,
    )
    .unwrap();
    let record = MutationRecord {
        target: detached.body(),
        added_nodes: vec![detached.body()],
        removed_nodes: Vec::new(),
    };

    assert!(translator.handle_mutations(vec![record]).await.is_empty());
    assert_eq!(harness.remote.call_count(), 0);
}

/// 测试默认选择器常量
#[test]
fn test_default_selectors() {
    assert_eq!(constants::DEFAULT_SELECTORS, &["div.post__body"]);
    assert_eq!(test_config().selectors, vec!["div.post__body"]);
}
