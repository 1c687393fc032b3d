//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。节点级别的失败在编排器内部被吸收，
//! 这里的类型主要用于日志记录和选项页面的错误展示。

use std::fmt;

use thiserror::Error;

/// 远程翻译接口错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 非成功状态码
    #[error("Translation API error: {0}")]
    Status(u16),

    /// 响应格式无法解析
    #[error("Invalid response format from translation service: {0}")]
    InvalidResponse(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => RemoteError::Status(status.as_u16()),
            None => RemoteError::Network(error.to_string()),
        }
    }
}

/// 持久化存储错误
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("存储读写失败: {0}")]
    Io(String),

    #[error("存储数据序列化失败: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialization(error.to_string())
    }
}

/// 选择器解析错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("无效的选择器 '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

/// 后台中继错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    #[error("后台通道已关闭")]
    Closed,

    #[error("后台未返回响应")]
    NoReply,
}

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// DOM访问错误
    #[error("DOM扫描错误: {0}")]
    ScanError(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// 后台返回的错误消息
    #[error("翻译服务错误: {0}")]
    ServiceError(String),
}

impl TranslationError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::ScanError(_) => ErrorSeverity::Error,
            TranslationError::Remote(RemoteError::InvalidInput(_)) => ErrorSeverity::Info,
            TranslationError::Remote(_) => ErrorSeverity::Warning,
            TranslationError::Storage(_) => ErrorSeverity::Warning,
            TranslationError::Selector(_) => ErrorSeverity::Error,
            TranslationError::Relay(_) => ErrorSeverity::Error,
            TranslationError::ServiceError(_) => ErrorSeverity::Warning,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        match self {
            TranslationError::ConfigError(msg) => {
                TranslationError::ConfigError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::ScanError(msg) => {
                TranslationError::ScanError(format!("{} (上下文: {})", msg, context))
            }
            TranslationError::ServiceError(msg) => {
                TranslationError::ServiceError(format!("{} (上下文: {})", msg, context))
            }
            other => other,
        }
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::Storage(StorageError::from(error))
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

pub type StorageResult<T> = Result<T, StorageError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }
}
