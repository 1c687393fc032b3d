//! 键值存储区域
//!
//! 对持久化存储的最小抽象：按键读写 JSON 值。缓存、计数器和设置都通过它落盘。

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::translation::error::{StorageError, StorageResult};

/// 持久化键值存储
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// 内存存储，进程退出后丢失
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的键
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        // 持锁期间不会 panic，中毒时沿用内部数据
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StorageArea for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// 单文件 JSON 存储
///
/// 整个区域保存为一个 JSON 对象。写入先落到临时文件再重命名。
pub struct JsonFileStorage {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 在目录下打开名为 `<area>.json` 的存储区域
    pub fn in_dir<P: AsRef<Path>>(dir: P, area: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", area)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> StorageResult<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(map) => Ok(map),
                _ => Err(StorageError::Serialization(format!(
                    "{} 不是 JSON 对象",
                    self.path.display()
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, map: Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(&Value::Object(map))?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageArea for JsonFileStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(map).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_all().await?;
        if map.remove(key).is_some() {
            self.write_all(map).await?;
        }
        Ok(())
    }
}
