//! Process-local token store.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{StorageError, TokenStore};

/// In-memory [`TokenStore`]. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing items, e.g. a token left by a previous run.
    #[must_use]
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let items = items
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { items: RwLock::new(items) }
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
