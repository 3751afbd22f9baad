use async_trait::async_trait;
use serde::Deserialize;
use std::{env, path::PathBuf};
use tokio::fs;
use tracing::error;

/// Key-value lookup backing the settings that are not in the environment.
#[async_trait]
pub trait SettingStore: Send + Sync {
    async fn lookup(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct SettingRecord {
    name: String,
    value: serde_json::Value,
}

/// Settings kept as a JSON array of `{"name": ..., "value": ...}` records.
/// The file is re-read on every lookup.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingStore for JsonFileStore {
    async fn lookup(&self, name: &str) -> Option<String> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                error!("failed to read settings file: {err}");
                return None;
            }
        };

        let records: Vec<SettingRecord> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(err) => {
                error!("failed to parse settings file: {err}");
                return None;
            }
        };

        records
            .into_iter()
            .find(|record| record.name == name)
            .and_then(|record| match record.value {
                serde_json::Value::String(value) => Some(value),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
    }
}

pub fn resolve_settings_path() -> PathBuf {
    if let Ok(path) = env::var("SETTINGS_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from("data/settings.json")
}
