//! Per-conversation session key storage.
//!
//! Single source of truth for "do I already have this conversation's key".
//! `cc_session` MUST consult this before ever minting a new key — a second
//! mint for a conversation that already has one desynchronizes participants.
//!
//! Reads hit an in-process mirror first and fall back to the database,
//! refilling the mirror on the way out. Writes go to both, last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use cc_crypto::SessionKey;

use crate::{db::Store, error::StoreError};

/// Thread-safe session key store.  Clone to share across tasks.
#[derive(Clone)]
pub struct SessionKeyStore {
    store: Store,
    mirror: Arc<RwLock<HashMap<String, SessionKey>>>,
}

impl SessionKeyStore {
    pub fn new(store: Store) -> Self {
        Self { store, mirror: Arc::new(RwLock::new(HashMap::new())) }
    }

    fn storage_key(conversation_id: &str) -> String {
        format!("shared_key_{conversation_id}")
    }

    /// The session key for `conversation_id`, if known locally.
    pub async fn get(&self, conversation_id: &str) -> Result<Option<SessionKey>, StoreError> {
        if let Some(key) = self.mirror.read().await.get(conversation_id) {
            return Ok(Some(key.clone()));
        }

        match self.store.kv_get(&Self::storage_key(conversation_id)).await? {
            Some(b64) => {
                let key = SessionKey::from_b64(&b64)?;
                self.mirror
                    .write()
                    .await
                    .insert(conversation_id.to_string(), key.clone());
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    /// Persist the key durably and update the mirror.  Idempotent.
    pub async fn put(&self, conversation_id: &str, key: SessionKey) -> Result<(), StoreError> {
        self.store
            .kv_put(&Self::storage_key(conversation_id), &key.to_b64())
            .await?;
        self.mirror
            .write()
            .await
            .insert(conversation_id.to_string(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let sessions = SessionKeyStore::new(Store::open_in_memory().await.unwrap());

        assert!(sessions.get("c1").await.unwrap().is_none());

        let key = SessionKey::generate();
        sessions.put("c1", key.clone()).await.unwrap();
        assert_eq!(sessions.get("c1").await.unwrap(), Some(key));
    }

    #[tokio::test]
    async fn falls_back_to_durable_storage() {
        let store = Store::open_in_memory().await.unwrap();
        let key = SessionKey::generate();

        // Write through one handle, read through a fresh one (empty mirror).
        SessionKeyStore::new(store.clone()).put("c1", key.clone()).await.unwrap();
        let cold = SessionKeyStore::new(store);
        assert_eq!(cold.get("c1").await.unwrap(), Some(key));
    }

    #[tokio::test]
    async fn put_is_last_write_wins() {
        let sessions = SessionKeyStore::new(Store::open_in_memory().await.unwrap());

        let first = SessionKey::generate();
        let second = SessionKey::generate();
        sessions.put("c1", first).await.unwrap();
        sessions.put("c1", second.clone()).await.unwrap();
        assert_eq!(sessions.get("c1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn keys_are_scoped_per_conversation() {
        let sessions = SessionKeyStore::new(Store::open_in_memory().await.unwrap());

        let k1 = SessionKey::generate();
        let k2 = SessionKey::generate();
        sessions.put("c1", k1.clone()).await.unwrap();
        sessions.put("c2", k2.clone()).await.unwrap();
        assert_eq!(sessions.get("c1").await.unwrap(), Some(k1));
        assert_eq!(sessions.get("c2").await.unwrap(), Some(k2));
    }
}
