//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::parsers::selector::SelectorSet;

/// 重扫描溢出策略
///
/// 一次重扫描只翻译一个批次，剩余的未处理节点按此策略处置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// 留到下一轮重扫描，最后一轮结束后放弃剩余节点
    #[default]
    Defer,
    /// 立即将剩余节点标记为已处理
    Abandon,
}

/// 翻译器配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    // 接口配置
    pub endpoint: String,
    pub client: String,
    pub source_lang: String,
    pub target_lang: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,

    // 扫描范围
    pub selectors: Vec<String>,
    pub min_text_length: usize,

    // 批次配置
    pub batch_size: usize,
    /// 单次整页翻译最多处理的批次数，`None` 表示全部
    pub max_batches_per_pass: Option<usize>,
    pub batch_delay_ms: u64,

    // 缓存配置
    pub cache_capacity: usize,
    pub cache_save_debounce_ms: u64,

    // 重扫描配置
    pub rescan_enabled: bool,
    pub rescan_interval_ms: u64,
    pub max_rescans: usize,
    pub rescan_overflow: OverflowPolicy,

    pub storage_dir: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_ENDPOINT.to_string(),
            client: constants::DEFAULT_CLIENT.to_string(),
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),

            selectors: constants::DEFAULT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_text_length: constants::MIN_TEXT_LENGTH,

            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_batches_per_pass: None,
            batch_delay_ms: constants::BATCH_DELAY.as_millis() as u64,

            cache_capacity: constants::DEFAULT_CACHE_CAPACITY,
            cache_save_debounce_ms: constants::CACHE_SAVE_DEBOUNCE.as_millis() as u64,

            rescan_enabled: true,
            rescan_interval_ms: constants::RESCAN_INTERVAL.as_millis() as u64,
            max_rescans: constants::MAX_RESCANS,
            rescan_overflow: OverflowPolicy::default(),

            storage_dir: constants::DEFAULT_STORAGE_DIR.to_string(),
        }
    }
}

impl TranslatorConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.batch_size == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.max_batches_per_pass == Some(0) {
            return Err(TranslationError::ConfigError(
                "单次最大批次数不能为0".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(TranslationError::ConfigError("缓存容量不能为0".to_string()));
        }

        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.selectors.is_empty() {
            return Err(TranslationError::ConfigError(
                "至少需要一个目标选择器".to_string(),
            ));
        }

        url::Url::parse(&self.endpoint).map_err(|e| {
            TranslationError::ConfigError(format!("无效的接口地址 '{}': {}", self.endpoint, e))
        })?;

        SelectorSet::parse(&self.selectors)?;

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, core, rescan, translation, EnvVar};

        fn apply<T>(value: Option<crate::env::EnvResult<T>>, slot: &mut T) {
            match value {
                Some(Ok(value)) => *slot = value,
                Some(Err(e)) => tracing::warn!("忽略无效的环境变量: {}", e),
                None => {}
            }
        }

        apply(translation::Endpoint::get_explicit(), &mut self.endpoint);
        apply(translation::SourceLang::get_explicit(), &mut self.source_lang);
        apply(translation::TargetLang::get_explicit(), &mut self.target_lang);
        apply(translation::BatchSize::get_explicit(), &mut self.batch_size);

        let mut timeout = self.request_timeout();
        apply(translation::RequestTimeout::get_explicit(), &mut timeout);
        self.request_timeout_secs = timeout.as_secs();

        apply(cache::Capacity::get_explicit(), &mut self.cache_capacity);

        let mut debounce = self.cache_save_debounce();
        apply(cache::SaveDebounce::get_explicit(), &mut debounce);
        self.cache_save_debounce_ms = debounce.as_millis() as u64;

        apply(rescan::Enabled::get_explicit(), &mut self.rescan_enabled);
        apply(rescan::MaxCycles::get_explicit(), &mut self.max_rescans);
        apply(core::StorageDir::get_explicit(), &mut self.storage_dir);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn cache_save_debounce(&self) -> Duration {
        Duration::from_millis(self.cache_save_debounce_ms)
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    /// 展开后的存储目录
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage_dir).as_ref())
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslatorConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    pub fn into_config(self) -> TranslatorConfig {
        self.config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<TranslatorConfig> {
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(Path::new(expanded_path.as_ref()));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslatorConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &Path) -> TranslationResult<TranslatorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let content = toml::to_string_pretty(&TranslatorConfig::default())
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
