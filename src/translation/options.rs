//! 选项页
//!
//! 读取和保存目标选择器，保存后向所有订阅的页面广播；
//! 并提供一次 `nl -> en` 的测试翻译，结果用于行内展示。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::parsers::selector::SelectorSet;
use crate::translation::config::constants;
use crate::translation::error::TranslationResult;
use crate::translation::remote::{Message, RelayHandle};
use crate::translation::storage::StorageArea;

/// 测试翻译使用的荷兰语短句
pub const TEST_PHRASE: &str = "Hallo, dit is een test";

/// 发往页面的设置消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ContentMessage {
    UpdateSelectors { selectors: Vec<String> },
}

/// 测试翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Success { source: String, translated: String },
    Failed(String),
    Empty,
}

impl TestOutcome {
    /// 选项页上显示的状态文本
    pub fn status_message(&self) -> String {
        match self {
            TestOutcome::Success { source, translated } => format!(
                "Translation test successful! \"{}\" → \"{}\"",
                source, translated
            ),
            TestOutcome::Failed(error) => format!("Translation test failed: {}", error),
            TestOutcome::Empty => "Translation test returned empty result".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Success { .. })
    }
}

pub struct OptionsPage {
    storage: Arc<dyn StorageArea>,
    relay: RelayHandle,
    broadcaster: broadcast::Sender<ContentMessage>,
}

impl OptionsPage {
    pub fn new(storage: Arc<dyn StorageArea>, relay: RelayHandle) -> Self {
        let (broadcaster, _) = broadcast::channel(16);
        Self {
            storage,
            relay,
            broadcaster,
        }
    }

    /// 订阅设置变化
    pub fn subscribe(&self) -> broadcast::Receiver<ContentMessage> {
        self.broadcaster.subscribe()
    }

    /// 读取保存的选择器，缺失或损坏时返回默认值
    pub async fn load(&self) -> Vec<String> {
        let defaults = || {
            constants::DEFAULT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        };

        match self.storage.get(constants::SELECTORS_STORAGE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<String>>(value) {
                Ok(selectors) if !selectors.is_empty() => selectors,
                Ok(_) => defaults(),
                Err(e) => {
                    tracing::warn!("选择器设置格式错误，使用默认值: {}", e);
                    defaults()
                }
            },
            Ok(None) => defaults(),
            Err(e) => {
                tracing::warn!("读取选择器设置失败: {}", e);
                defaults()
            }
        }
    }

    /// 校验并保存选择器，然后广播给已打开的页面
    ///
    /// 返回收到广播的页面数。
    pub async fn save_selectors<S: AsRef<str>>(&self, selectors: &[S]) -> TranslationResult<usize> {
        let selectors: Vec<String> = selectors
            .iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        SelectorSet::parse(&selectors)?;
        if selectors.is_empty() {
            return Err(crate::translation::error::helpers::config_error(
                "至少需要一个目标选择器",
            ));
        }

        self.storage
            .set(
                constants::SELECTORS_STORAGE_KEY,
                Value::from(selectors.clone()),
            )
            .await?;
        tracing::info!("选择器已保存: {:?}", selectors);

        // 没有订阅者时发送失败，这不是错误
        let receivers = self
            .broadcaster
            .send(ContentMessage::UpdateSelectors { selectors })
            .unwrap_or(0);
        Ok(receivers)
    }

    /// 发送一次测试翻译
    pub async fn test_translation(&self) -> TestOutcome {
        self.test_translation_of(TEST_PHRASE).await
    }

    pub async fn test_translation_of(&self, text: &str) -> TestOutcome {
        let message = Message::Translate {
            text: text.to_string(),
            source: "nl".to_string(),
            target: "en".to_string(),
        };

        match self.relay.send(message).await {
            Ok(reply) => match (reply.error, reply.translated_text) {
                (Some(error), _) => TestOutcome::Failed(error),
                (None, Some(translated)) if !translated.is_empty() => TestOutcome::Success {
                    source: text.to_string(),
                    translated,
                },
                (None, _) => TestOutcome::Empty,
            },
            Err(e) => TestOutcome::Failed(e.to_string()),
        }
    }
}
