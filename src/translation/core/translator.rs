//! 翻译策略
//!
//! 初始化时选定一次：只走后台中继，或先用进程内引擎、失败时回退到中继。

use std::sync::Arc;

use crate::translation::error::TranslationResult;
use crate::translation::remote::{RelayHandle, Translate};

pub enum TranslatorStrategy {
    /// 所有请求都经后台中继发送
    Relay(RelayHandle),
    /// 进程内引擎优先，出错时回退到中继
    BuiltIn {
        engine: Arc<dyn Translate>,
        fallback: RelayHandle,
    },
}

impl TranslatorStrategy {
    pub fn relay(handle: RelayHandle) -> Self {
        TranslatorStrategy::Relay(handle)
    }

    pub fn built_in(engine: Arc<dyn Translate>, fallback: RelayHandle) -> Self {
        TranslatorStrategy::BuiltIn { engine, fallback }
    }

    /// 后台中继句柄，计数等消息总是经由它发送
    pub fn relay_handle(&self) -> &RelayHandle {
        match self {
            TranslatorStrategy::Relay(handle) => handle,
            TranslatorStrategy::BuiltIn { fallback, .. } => fallback,
        }
    }

    pub fn has_built_in(&self) -> bool {
        matches!(self, TranslatorStrategy::BuiltIn { .. })
    }

    pub async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationResult<String> {
        match self {
            TranslatorStrategy::Relay(handle) => {
                handle.send_translation_request(text, source, target).await
            }
            TranslatorStrategy::BuiltIn { engine, fallback } => {
                match engine.translate(text, source, target).await {
                    Ok(translated) => Ok(translated),
                    Err(e) => {
                        tracing::warn!("内置翻译失败，改用后台翻译: {}", e);
                        fallback.send_translation_request(text, source, target).await
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TranslatorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslatorStrategy::Relay(_) => f.write_str("TranslatorStrategy::Relay"),
            TranslatorStrategy::BuiltIn { .. } => f.write_str("TranslatorStrategy::BuiltIn"),
        }
    }
}
