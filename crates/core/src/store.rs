//! Item create, read and delete on top of a [`SearchEngine`]

use crate::engine::{DeleteOutcome, SearchEngine};
use crate::types::{IndexReceipt, Item};
use crate::{ItemSearchError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Single-document operations against the item index
#[derive(Clone)]
pub struct ItemStore {
    engine: Arc<dyn SearchEngine>,
}

impl std::fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemStore")
            .field("index", &self.engine.index_name())
            .finish()
    }
}

impl ItemStore {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    pub fn index_name(&self) -> &str {
        self.engine.index_name()
    }

    /// Validate a raw request body and write it as a full document.
    ///
    /// Any previous document with the same id is replaced. The write is
    /// visible to reads and searches once this returns.
    ///
    /// # Errors
    ///
    /// `Validation` when a required field is missing or a value has the wrong
    /// type; `Engine` when the write itself fails.
    pub async fn create_or_replace(&self, body: Value) -> Result<IndexReceipt> {
        let item = Item::from_request(body)?;
        debug!(id = %item.id, index = %self.index_name(), "Indexing item");

        let receipt = self.engine.put(&item).await?;
        info!(id = %receipt.id, index = %receipt.index, "Item indexed");
        Ok(receipt)
    }

    /// Fetch an item by id
    pub async fn get(&self, id: &str) -> Result<Item> {
        debug!(id = id, index = %self.index_name(), "Fetching item");

        self.engine
            .get(id)
            .await?
            .ok_or_else(|| ItemSearchError::not_found(format!("item {}", id)))
    }

    /// Delete an item after confirming that it exists
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.engine.exists(id).await? {
            debug!(id = id, "Delete requested for unknown item");
            return Err(ItemSearchError::not_found(format!("item {}", id)));
        }

        match self.engine.delete(id).await? {
            DeleteOutcome::Deleted => {
                info!(id = id, index = %self.index_name(), "Item deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => {
                warn!(id = id, "Item disappeared between existence check and delete");
                Err(ItemSearchError::not_found(format!("item {}", id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn store() -> (Arc<InMemoryEngine>, ItemStore) {
        let engine = Arc::new(InMemoryEngine::new("items"));
        let store = ItemStore::new(engine.clone());
        (engine, store)
    }

    #[tokio::test]
    async fn test_create_fills_defaults() {
        let (_, store) = store();
        let receipt = store
            .create_or_replace(json!({"id": 42, "name": "Bagel Hut", "suggest_input": ["bagel"]}))
            .await
            .unwrap();

        assert_eq!(receipt.id, "42");
        assert_eq!(receipt.index, "items");

        let item = store.get("42").await.unwrap();
        assert_eq!(item.description, "");
        assert!(item.tags.is_empty());
        assert!(item.metadata.is_empty());
        assert!(item.address.is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites_whole_document() {
        let (_, store) = store();
        store
            .create_or_replace(json!({
                "id": "a",
                "name": "Old",
                "suggest_input": ["old"],
                "tags": ["one"]
            }))
            .await
            .unwrap();
        store
            .create_or_replace(json!({"id": "a", "name": "New", "suggest_input": ["new"]}))
            .await
            .unwrap();

        let item = store.get("a").await.unwrap();
        assert_eq!(item.name, "New");
        assert!(item.tags.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_body_never_reaches_engine() {
        let (engine, store) = store();
        let err = store
            .create_or_replace(json!({"name": "No Id", "suggest_input": []}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Missing required field: id");
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let (_, store) = store();
        assert_matches!(
            store.get("missing").await,
            Err(ItemSearchError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_delete_checks_existence_first() {
        let (engine, store) = store();
        assert_matches!(
            store.delete("ghost").await,
            Err(ItemSearchError::NotFound { .. })
        );
        // only the existence check ran
        assert_eq!(engine.call_count(), 1);
    }
}
