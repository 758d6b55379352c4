use crate::domain::ports::{SettingKey, SettingValue, SettingsStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// A durable settings store backed by a single JSON file.
///
/// The whole map is rewritten on every `set`/`remove`, which is plenty for a
/// store that is only touched at load and at state transitions. Last-write-wins
/// is the only guarantee. A missing or unparseable file reads as empty.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Arc<RwLock<HashMap<SettingKey, SettingValue>>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading any existing contents.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "settings file corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: Arc::new(RwLock::new(values)),
        })
    }

    fn flush(&self, values: &HashMap<SettingKey, SettingValue>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(values)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let values = self.values.read().await;
        Ok(values.get(&key).copied())
    }

    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key, value);
        self.flush(&values)
    }

    async fn remove(&self, key: SettingKey) -> Result<()> {
        let mut values = self.values.write().await;
        values.remove(&key);
        self.flush(&values)
    }
}
