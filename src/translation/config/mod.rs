//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

pub use manager::{ConfigManager, OverflowPolicy, TranslatorConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 20;
    pub const BATCH_DELAY: Duration = Duration::from_millis(50);

    // 文本过滤相关
    pub const MIN_TEXT_LENGTH: usize = 3;
    pub const ENGLISH_RATIO_THRESHOLD: f64 = 0.3;

    // 默认接口设置
    pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
    pub const DEFAULT_CLIENT: &str = "gtx";
    pub const DEFAULT_SOURCE_LANG: &str = "auto";
    pub const DEFAULT_TARGET_LANG: &str = "en";
    pub const DEFAULT_USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    // 缓存设置
    pub const DEFAULT_CACHE_CAPACITY: usize = 2000;
    pub const CACHE_SAVE_DEBOUNCE: Duration = Duration::from_millis(2000);

    // 周期性重扫描
    pub const RESCAN_INTERVAL: Duration = Duration::from_secs(5);
    pub const MAX_RESCANS: usize = 6;

    // 默认目标选择器
    pub const DEFAULT_SELECTORS: &[&str] = &["div.post__body"];

    // 跳过的父元素
    pub const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe"];

    // 持久化键名
    pub const CACHE_STORAGE_KEY: &str = "translationCache";
    pub const COUNTERS_STORAGE_KEY: &str = "translationCounters";
    pub const SELECTORS_STORAGE_KEY: &str = "selectorsToTranslate";

    pub const DEFAULT_STORAGE_DIR: &str = "~/.local/share/seobrein-translator";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "seobrein-translator.toml",
        ".seobrein-translator.toml",
        "seobrein-translator.json",
        "~/.config/seobrein-translator/config.toml",
        "/etc/seobrein-translator/config.toml",
    ];
}
