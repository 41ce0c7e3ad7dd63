//! Long-term identity keypair storage.
//!
//! One X25519 keypair per user, created lazily on first use and returned
//! unchanged forever after. There is deliberately no regeneration path:
//! other participants wrap session keys under this public key, so replacing
//! it would orphan every wrapped key already in the directory.

use serde::{Deserialize, Serialize};

use cc_crypto::IdentityKeyPair;

use crate::{db::Store, error::StoreError};

/// At-rest JSON blob under `crypto_keys_{user_id}`.
/// Field names match the wire/storage format of the surrounding app.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredKeyPair {
    public_key: String,
    secret_key: String,
}

#[derive(Clone)]
pub struct IdentityKeyStore {
    store: Store,
}

impl IdentityKeyStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn storage_key(user_id: &str) -> String {
        format!("crypto_keys_{user_id}")
    }

    /// The stored pair for `user_id`, if one exists.
    pub async fn get(&self, user_id: &str) -> Result<Option<IdentityKeyPair>, StoreError> {
        match self.store.kv_get(&Self::storage_key(user_id)).await? {
            Some(json) => {
                let stored: StoredKeyPair = serde_json::from_str(&json)?;
                let pair = IdentityKeyPair::from_secret_b64(&stored.secret_key)?;
                Ok(Some(pair))
            }
            None => Ok(None),
        }
    }

    /// Return the stored pair, generating and persisting one if absent.
    /// Repeated calls return identical key material.
    pub async fn get_or_create(&self, user_id: &str) -> Result<IdentityKeyPair, StoreError> {
        if let Some(pair) = self.get(user_id).await? {
            return Ok(pair);
        }

        let pair = IdentityKeyPair::generate();
        let stored = StoredKeyPair {
            public_key: pair.public_b64(),
            secret_key: pair.secret_b64(),
        };
        self.store
            .kv_put(&Self::storage_key(user_id), &serde_json::to_string(&stored)?)
            .await?;

        tracing::info!(
            target: "cc_store",
            event = "identity_created",
            user_id = %user_id
        );
        Ok(pair)
    }
}
