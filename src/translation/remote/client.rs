//! 远程翻译客户端
//!
//! 向翻译接口发送 GET 请求，并从嵌套数组形式的 JSON 响应中取出译文。
//! 客户端本身不重试、不限流、不缓存。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::translation::config::{constants, TranslatorConfig};
use crate::translation::error::RemoteError;

/// 文本翻译能力
#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<String, RemoteError>;
}

/// 基于 reqwest 的远程翻译客户端
#[derive(Debug, Clone)]
pub struct RemoteTranslatorClient {
    http: reqwest::Client,
    endpoint: String,
    client_type: String,
}

impl RemoteTranslatorClient {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            client_type: constants::DEFAULT_CLIENT.to_string(),
        })
    }

    pub fn from_config(config: &TranslatorConfig) -> Result<Self, RemoteError> {
        let mut client = Self::new(
            &config.endpoint,
            &config.user_agent,
            config.request_timeout(),
        )?;
        client.client_type = config.client.clone();
        Ok(client)
    }
}

#[async_trait]
impl Translate for RemoteTranslatorClient {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, RemoteError> {
        if text.trim().is_empty() {
            return Err(RemoteError::InvalidInput("文本为空".to_string()));
        }

        tracing::debug!("请求远程翻译: {} 字符 ({} -> {})", text.len(), source, target);

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", self.client_type.as_str()),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

/// 解析翻译接口响应
///
/// 译文位于 `[0][i][0]`；长文本会被拆成多段，按顺序拼接。
pub fn parse_response(body: &str) -> Result<String, RemoteError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .filter(|segments| !segments.is_empty())
        .ok_or_else(|| RemoteError::InvalidResponse("缺少译文数组".to_string()))?;

    let mut translated = String::new();
    for (index, segment) in segments.iter().enumerate() {
        match segment.get(0).and_then(Value::as_str) {
            Some(part) => translated.push_str(part),
            None if index == 0 => {
                return Err(RemoteError::InvalidResponse("首段译文不是字符串".to_string()))
            }
            // 音译等附加段没有文本
            None => {}
        }
    }

    if translated.is_empty() {
        return Err(RemoteError::InvalidResponse("译文为空".to_string()));
    }

    Ok(translated)
}
