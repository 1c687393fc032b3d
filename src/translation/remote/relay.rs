//! 后台中继
//!
//! 页面侧只通过消息与后台工作任务通信。后台持有远程客户端、计数器和本地存储，
//! 每条消息在独立任务中处理，同一批次的请求因此可以并发执行。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::client::Translate;
use crate::translation::config::constants;
use crate::translation::error::{RelayError, TranslationError, TranslationResult};
use crate::translation::storage::{CounterStore, StorageArea, TranslationCounters};

fn default_source() -> String {
    constants::DEFAULT_SOURCE_LANG.to_string()
}

fn default_target() -> String {
    constants::DEFAULT_TARGET_LANG.to_string()
}

/// 页面发往后台的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    Translate {
        text: String,
        #[serde(default = "default_source")]
        source: String,
        #[serde(default = "default_target")]
        target: String,
    },
    ResetCounters,
    LogCounts,
    IncrementCacheCount,
    ClearCache,
}

/// 后台的响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub translated_text: Option<String>,
    pub error: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<TranslationCounters>,
}

impl Reply {
    pub fn translated(text: String) -> Self {
        Self {
            translated_text: Some(text),
            success: true,
            ..Default::default()
        }
    }

    pub fn failed<E: ToString>(error: E) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn with_counters(mut self, counters: TranslationCounters) -> Self {
        self.counters = Some(counters);
        self
    }
}

type Envelope = (Message, oneshot::Sender<Reply>);

/// 页面侧持有的中继句柄
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl RelayHandle {
    /// 发送消息并等待响应
    pub async fn send(&self, message: Message) -> Result<Reply, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((message, reply_tx))
            .map_err(|_| RelayError::Closed)?;
        reply_rx.await.map_err(|_| RelayError::NoReply)
    }

    /// 请求翻译，后台返回的错误转为 `ServiceError`
    pub async fn send_translation_request(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> TranslationResult<String> {
        let reply = self
            .send(Message::Translate {
                text: text.to_string(),
                source: source.to_string(),
                target: target.to_string(),
            })
            .await?;

        match (reply.translated_text, reply.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(TranslationError::ServiceError(error)),
            (None, None) => Err(TranslationError::ServiceError("后台未返回译文".to_string())),
        }
    }

    pub async fn increment_cache_count(&self) -> Result<Reply, RelayError> {
        self.send(Message::IncrementCacheCount).await
    }

    pub async fn reset_counters(&self) -> Result<Reply, RelayError> {
        self.send(Message::ResetCounters).await
    }

    pub async fn log_counts(&self) -> Result<Option<TranslationCounters>, RelayError> {
        Ok(self.send(Message::LogCounts).await?.counters)
    }

    pub async fn clear_cache(&self) -> Result<Reply, RelayError> {
        self.send(Message::ClearCache).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 后台工作任务
#[derive(Clone)]
pub struct BackgroundWorker {
    translator: Arc<dyn Translate>,
    counters: Arc<CounterStore>,
    storage: Arc<dyn StorageArea>,
}

impl BackgroundWorker {
    pub fn new(
        translator: Arc<dyn Translate>,
        counters: Arc<CounterStore>,
        storage: Arc<dyn StorageArea>,
    ) -> Self {
        Self {
            translator,
            counters,
            storage,
        }
    }

    pub fn counters(&self) -> &Arc<CounterStore> {
        &self.counters
    }

    /// 加载计数器并启动消息循环
    ///
    /// 所有 `RelayHandle` 被丢弃后循环结束。
    pub async fn spawn(self) -> (RelayHandle, JoinHandle<()>) {
        self.counters.load().await;

        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let task = tokio::spawn(async move {
            while let Some((message, reply_tx)) = rx.recv().await {
                let worker = self.clone();
                tokio::spawn(async move {
                    let reply = worker.handle(message).await;
                    // 页面侧可能已放弃等待
                    let _ = reply_tx.send(reply);
                });
            }
            tracing::debug!("后台中继已关闭");
        });

        (RelayHandle { tx }, task)
    }

    /// 处理单条消息
    pub async fn handle(&self, message: Message) -> Reply {
        match message {
            Message::Translate {
                text,
                source,
                target,
            } => {
                if text.trim().is_empty() {
                    return Reply::failed("No text provided");
                }

                tracing::debug!("后台处理翻译请求: {}", text);
                match self.translator.translate(&text, &source, &target).await {
                    Ok(translated) => {
                        self.counters.increment_api().await;
                        Reply::translated(translated)
                    }
                    Err(e) => {
                        tracing::warn!("远程翻译失败: {}", e);
                        Reply::failed(e)
                    }
                }
            }
            Message::ResetCounters => {
                self.counters.reset().await;
                tracing::info!("翻译计数器已重置");
                Reply::ok().with_counters(self.counters.snapshot())
            }
            Message::LogCounts => {
                let counters = self.counters.snapshot();
                tracing::info!("翻译来源统计: 接口 {} 次, 缓存 {} 次", counters.api, counters.cache);
                Reply::ok().with_counters(counters)
            }
            Message::IncrementCacheCount => {
                let counters = self.counters.increment_cache().await;
                Reply::ok().with_counters(counters)
            }
            Message::ClearCache => {
                if let Err(e) = self.storage.remove(constants::CACHE_STORAGE_KEY).await {
                    tracing::warn!("清除持久化缓存失败: {}", e);
                }
                Reply::ok()
            }
        }
    }
}
