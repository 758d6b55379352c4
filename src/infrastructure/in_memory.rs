use crate::domain::ports::{SettingKey, SettingValue, SettingsStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory settings store.
///
/// Uses `Arc<RwLock<HashMap>>` to allow shared concurrent access. Ideal for
/// tests and for running the engine without a backing file.
#[derive(Default, Clone)]
pub struct InMemorySettingsStore {
    values: Arc<RwLock<HashMap<SettingKey, SettingValue>>>,
}

impl InMemorySettingsStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let values = self.values.read().await;
        Ok(values.get(&key).copied())
    }

    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: SettingKey) -> Result<()> {
        let mut values = self.values.write().await;
        values.remove(&key);
        Ok(())
    }
}
