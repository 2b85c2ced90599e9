//! 客户端本地持久化。
//!
//! 编辑器会话把代码缓冲区与偏好写入这里；写入失败只影响持久性，
//! 不影响会话本身。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::StoreError;

/// 简单的字符串键值存储能力，由宿主注入到编辑器会话。
pub trait ClientStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Permanent("client store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryClientStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStore for MemoryClientStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// 以单个 JSON 文件保存全部键值的存储。
#[derive(Debug)]
pub struct JsonFileClientStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileClientStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 存放在 `dir` 下的 `editor-state.json`。
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("editor-state.json"))
    }

    /// 平台本地数据目录下的默认位置。
    pub fn default_location() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::in_dir(dir.join("codelab")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Permanent(format!("corrupt client store: {e}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(StoreError::Transient(err.to_string())),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Transient(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Permanent(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| StoreError::Transient(e.to_string()))?;
        debug!(path = %self.path.display(), entries = entries.len(), "client store saved");
        Ok(())
    }
}

impl ClientStore for JsonFileClientStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
