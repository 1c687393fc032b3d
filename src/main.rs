//! 命令行入口
//!
//! 读取本地文件或 URL，翻译目标元素中的荷兰语文本，输出翻译后的 HTML。

use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;

use seobrein_translator::env::{core::LogLevel, EnvVar};
use seobrein_translator::parsers::Page;
use seobrein_translator::translation::error::helpers::log_error;
use seobrein_translator::translation::{
    BackgroundWorker, ConfigManager, CounterStore, JsonFileStorage, PageTranslator,
    PersistentCache, RemoteTranslatorClient, StorageArea, TranslationError, TranslationResult,
    TranslatorConfig, TranslatorStrategy,
};

/// SEO Brein 页面翻译器
#[derive(Parser, Debug)]
#[command(name = "seobrein-translator")]
#[command(about = "Translate Dutch forum content to English")]
#[command(version)]
struct Cli {
    /// 本地 HTML 文件路径或 http(s) 地址
    input: String,

    /// 输出文件，缺省写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 目标选择器，可重复；指定后替换配置中的选择器
    #[arg(short, long = "selector")]
    selectors: Vec<String>,

    /// 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 持久化存储目录
    #[arg(long)]
    storage_dir: Option<String>,

    /// 初次翻译后的重扫描次数
    #[arg(long, default_value_t = 0)]
    rescans: usize,

    /// 以 JSON 输出页面统计
    #[arg(long)]
    stats: bool,

    /// 开始前清空翻译缓存
    #[arg(long)]
    clear_cache: bool,

    /// 开始前重置翻译计数器
    #[arg(long)]
    reset_counters: bool,
}

fn init_logging() {
    let level = LogLevel::get()
        .ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> TranslationResult<TranslatorConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?.into_config(),
        None => ConfigManager::new()?.into_config(),
    };

    if !cli.selectors.is_empty() {
        config.selectors = cli.selectors.clone();
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage_dir = dir.clone();
    }
    // 重扫描由命令行按次数显式驱动
    config.rescan_enabled = false;
    config.max_rescans = cli.rescans;

    config.validate()?;
    Ok(config)
}

/// 读取输入，返回内容和声明的字符集
async fn read_input(input: &str, config: &TranslatorConfig) -> TranslationResult<(Vec<u8>, String)> {
    if input.starts_with("http://") || input.starts_with("https://") {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TranslationError::ScanError(format!("创建 HTTP 客户端失败: {}", e)))?;

        let response = client
            .get(input)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TranslationError::ScanError(format!("下载页面失败: {}", e)))?;

        let charset = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split("charset=").nth(1))
            .map(|charset| charset.trim_matches(|c| c == '"' || c == ' ').to_string())
            .unwrap_or_default();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TranslationError::ScanError(format!("读取页面失败: {}", e)))?;
        Ok((bytes.to_vec(), charset))
    } else {
        let bytes = tokio::fs::read(input)
            .await
            .map_err(|e| TranslationError::ScanError(format!("读取文件 {} 失败: {}", input, e)))?;
        Ok((bytes, String::new()))
    }
}

async fn run(cli: Cli) -> TranslationResult<()> {
    let config = load_config(&cli)?;
    let storage_dir = config.storage_path();
    tracing::info!("存储目录: {}", storage_dir.display());

    let storage: Arc<dyn StorageArea> = Arc::new(JsonFileStorage::in_dir(&storage_dir, "local"));
    let client = Arc::new(RemoteTranslatorClient::from_config(&config)?);
    let counters = Arc::new(CounterStore::new(storage.clone()));
    let (relay, worker) = BackgroundWorker::new(client, counters, storage.clone())
        .spawn()
        .await;

    if cli.reset_counters {
        relay.reset_counters().await?;
    }

    let cache = Arc::new(PersistentCache::new(
        storage.clone(),
        config.cache_capacity,
        config.cache_save_debounce(),
    ));
    if cli.clear_cache {
        cache.clear().await;
        tracing::info!("翻译缓存已清空");
    }

    let (bytes, charset) = read_input(&cli.input, &config).await?;
    let page = Rc::new(
        Page::from_bytes(&bytes, &charset)
            .map_err(|e| TranslationError::ScanError(format!("解析页面失败: {}", e)))?,
    );

    let rescans = config.max_rescans;
    let interval = config.rescan_interval();
    let strategy = TranslatorStrategy::relay(relay.clone());
    let translator = PageTranslator::new(page.clone(), config, cache, strategy)?;

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let summary = translator.start().await;
            tracing::info!("初次翻译: {} 个节点已翻译", summary.translated);

            for cycle in 1..=rescans {
                tokio::time::sleep(interval).await;
                let outcome = translator.rescan(cycle == rescans).await;
                tracing::info!(
                    "重扫描 {}/{}: 发现 {} 个, 翻译 {} 个",
                    cycle,
                    rescans,
                    outcome.found,
                    outcome.translated
                );
            }
        })
        .await;

    if let Err(e) = translator.flush().await {
        tracing::warn!("保存翻译缓存失败: {}", e);
    }

    if cli.stats {
        let stats = serde_json::to_string_pretty(&translator.get_stats())?;
        println!("{}", stats);
    }
    translator.destroy();

    let html = page
        .serialize()
        .map_err(|e| TranslationError::ScanError(format!("序列化页面失败: {}", e)))?;
    match &cli.output {
        Some(path) => tokio::fs::write(path, &html)
            .await
            .map_err(|e| TranslationError::ScanError(format!("写入 {} 失败: {}", path.display(), e)))?,
        None if !cli.stats => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&html)
                .and_then(|_| stdout.flush())
                .map_err(|e| TranslationError::ScanError(format!("写入标准输出失败: {}", e)))?;
        }
        None => {}
    }

    if let Some(counters) = relay.log_counts().await? {
        tracing::info!("翻译来源: 接口 {} 次, 缓存 {} 次", counters.api, counters.cache);
    }

    drop(translator);
    drop(local);
    drop(relay);
    if let Err(e) = worker.await {
        tracing::debug!("后台任务结束异常: {}", e);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenv::dotenv().ok();
    init_logging();

    if let Err(e) = run(cli).await {
        log_error(&e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
