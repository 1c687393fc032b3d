//! 远程翻译
//!
//! `client` 负责 HTTP 调用，`relay` 提供页面与后台之间的消息通道。

pub mod client;
pub mod relay;

pub use client::{parse_response, RemoteTranslatorClient, Translate};
pub use relay::{BackgroundWorker, Message, RelayHandle, Reply};
