// shoplist/src/persistence.rs

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{error::StorageError, item::Item, storage::KeyValueStore};

/// Key the list lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "shopping_list";

/// Stores the item list as a JSON array under a single key.
pub struct ListPersistence {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    // one write in flight at a time
    write_lock: Mutex<()>,
}

impl ListPersistence {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { backend, key: key.into(), write_lock: Mutex::new(()) }
    }

    pub fn key(&self) -> &str { &self.key }

    /// `Ok(None)` when nothing is stored or the stored value is not a JSON array
    /// of items; corrupted data is never fatal. `Err` only for backend read failures.
    pub async fn load(&self) -> Result<Option<Vec<Item>>, StorageError> {
        let Some(raw) = self.backend.get(&self.key).await? else {
            debug!(key = %self.key, "no saved list");
            return Ok(None);
        };
        let items = decode(&raw);
        match &items {
            Some(items) => info!(key = %self.key, count = items.len(), "loaded saved list"),
            None => warn!(key = %self.key, "saved list is corrupted, ignoring it"),
        }
        Ok(items)
    }

    pub async fn save(&self, items: &[Item]) -> Result<(), StorageError> {
        let json = serde_json::to_string(items).map_err(|e| StorageError::write(&self.key, e))?;
        let _guard = self.write_lock.lock().await;
        self.backend.set(&self.key, &json).await?;
        debug!(key = %self.key, count = items.len(), "saved list");
        Ok(())
    }

    /// Removes the stored entry entirely.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.backend.remove(&self.key).await?;
        info!(key = %self.key, "cleared saved list");
        Ok(())
    }
}

fn decode(raw: &str) -> Option<Vec<Item>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    if !value.is_array() { return None; }
    serde_json::from_value(value).ok()
}
