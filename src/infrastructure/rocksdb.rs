use crate::domain::ports::{SettingKey, SettingValue, SettingsStore};
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for the persisted settings scalars.
pub const CF_SETTINGS: &str = "settings";

/// A persistent settings store using RocksDB.
///
/// Each setting is one key under the "settings" column family, with the value
/// serialized as JSON. This struct is thread-safe (`Clone` shares the
/// underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_settings = ColumnFamilyDescriptor::new(CF_SETTINGS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_settings])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_SETTINGS)
            .ok_or_else(|| WatchError::Store("Settings column family not found".to_string()))
    }
}

#[async_trait]
impl SettingsStore for RocksDbStore {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, key.as_str())? {
            // Corrupt bytes are treated as absent rather than fatal.
            Some(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
            None => Ok(None),
        }
    }

    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let cf = self.cf()?;
        let bytes = serde_json::to_vec(&value)?;
        self.db.put_cf(cf, key.as_str(), bytes)?;
        Ok(())
    }

    async fn remove(&self, key: SettingKey) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, key.as_str())?;
        Ok(())
    }
}
