use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Names of the persisted scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    Wage,
    Currency,
    Period,
    Earned,
    StartDate,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::Wage,
        SettingKey::Currency,
        SettingKey::Period,
        SettingKey::Earned,
        SettingKey::StartDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Wage => "Wage",
            SettingKey::Currency => "Currency",
            SettingKey::Period => "Period",
            SettingKey::Earned => "Earned",
            SettingKey::StartDate => "StartDate",
        }
    }
}

/// A persisted scalar. Timestamps are stored as fractional epoch seconds so
/// every backend deals in plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Number(f64),
    Timestamp(f64),
}

impl SettingValue {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        SettingValue::Timestamp(ts.timestamp_millis() as f64 / 1_000.0)
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            SettingValue::Timestamp(epoch) if epoch.is_finite() => {
                DateTime::from_timestamp_millis((epoch * 1_000.0).round() as i64)
            }
            _ => None,
        }
    }
}

/// The durable key-value contract the engine persists through.
///
/// Last-write-wins is the only guarantee; the store is consulted at load and
/// at state transitions, never on the tick cadence. Missing or corrupt values
/// are reported as absent, and the typed accessors default accordingly.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: SettingKey) -> Result<Option<SettingValue>>;
    async fn set(&self, key: SettingKey, value: SettingValue) -> Result<()>;
    async fn remove(&self, key: SettingKey) -> Result<()>;

    /// Numeric accessor; absent or mistyped values read as 0.
    async fn get_number(&self, key: SettingKey) -> Result<f64> {
        Ok(match self.get(key).await? {
            Some(SettingValue::Number(n)) if n.is_finite() => n,
            _ => 0.0,
        })
    }

    /// Timestamp accessor; absent or mistyped values read as `None`.
    async fn get_timestamp(&self, key: SettingKey) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get(key).await?.and_then(|v| v.as_timestamp()))
    }

    async fn set_number(&self, key: SettingKey, value: f64) -> Result<()> {
        self.set(key, SettingValue::Number(value)).await
    }

    async fn set_timestamp(&self, key: SettingKey, value: DateTime<Utc>) -> Result<()> {
        self.set(key, SettingValue::from_timestamp(value)).await
    }
}

pub type SettingsStoreBox = Box<dyn SettingsStore>;
