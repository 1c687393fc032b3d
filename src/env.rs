//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量管理。每个变量是一个零大小类型，
//! 通过 `EnvVar` 特性声明名称、默认值与解析规则。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回值
    fn get_explicit() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "SEOBREIN_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 持久化存储目录
    pub struct StorageDir;
    impl EnvVar<String> for StorageDir {
        const NAME: &'static str = "SEOBREIN_STORAGE_DIR";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Directory holding persisted cache, counters and settings";

        fn parse(value: &str) -> EnvResult<String> {
            let dir = value.trim();
            if dir.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Directory cannot be empty".to_string(),
                });
            }
            Ok(dir.to_string())
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译接口地址
    pub struct Endpoint;
    impl EnvVar<String> for Endpoint {
        const NAME: &'static str = "SEOBREIN_TRANSLATE_ENDPOINT";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Endpoint must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "SEOBREIN_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language hint ('auto' for detection)";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang == "auto" || lang.len() == 2 {
                Ok(lang)
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 'auto' or 2 characters (ISO 639-1)"
                        .to_string(),
                })
            }
        }
    }

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "SEOBREIN_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language (ISO 639-1 code)";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if lang.len() != 2 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language code must be 2 characters (ISO 639-1)".to_string(),
                });
            }
            Ok(lang)
        }
    }

    /// 批次大小
    pub struct BatchSize;
    impl EnvVar<usize> for BatchSize {
        const NAME: &'static str = "SEOBREIN_BATCH_SIZE";
        const DEFAULT: Option<usize> = Some(20);
        const DESCRIPTION: &'static str = "Text nodes per translation batch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 500)
        }
    }

    /// 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "SEOBREIN_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(10));
        const DESCRIPTION: &'static str = "Translation request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存容量
    pub struct Capacity;
    impl EnvVar<usize> for Capacity {
        const NAME: &'static str = "SEOBREIN_CACHE_CAPACITY";
        const DEFAULT: Option<usize> = Some(2000);
        const DESCRIPTION: &'static str = "Translation cache size (number of entries)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1_000_000)
        }
    }

    /// 缓存写回防抖间隔
    pub struct SaveDebounce;
    impl EnvVar<Duration> for SaveDebounce {
        const NAME: &'static str = "SEOBREIN_CACHE_SAVE_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(2000));
        const DESCRIPTION: &'static str = "Quiet period before a dirty cache is persisted";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_positive_usize(value, Self::NAME, 1, 600_000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }
}

fn parse_bool(value: &str, name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            variable: name.to_string(),
            message: format!("Invalid boolean '{}'", value),
        }),
    }
}

fn parse_positive_usize(value: &str, name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let parsed: usize = value.trim().parse().map_err(|_| EnvError {
        variable: name.to_string(),
        message: "Must be a valid positive integer".to_string(),
    })?;

    if parsed < min || parsed > max {
        return Err(EnvError {
            variable: name.to_string(),
            message: format!("Value must be between {} and {}", min, max),
        });
    }

    Ok(parsed)
}

/// 重扫描相关环境变量
pub mod rescan {
    use super::*;

    /// 启用周期性重扫描
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "SEOBREIN_RESCAN_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Enable periodic rescans after the initial pass";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 最大重扫描次数
    pub struct MaxCycles;
    impl EnvVar<usize> for MaxCycles {
        const NAME: &'static str = "SEOBREIN_MAX_RESCANS";
        const DEFAULT: Option<usize> = Some(6);
        const DESCRIPTION: &'static str = "Number of periodic rescans";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1000)
        }
    }
}
