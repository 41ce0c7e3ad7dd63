//! Server-side key directory.
//!
//! The directory maps user id → identity public key, and
//! (conversation id, recipient) → wrapped session key. It is the only
//! network surface the crypto layer touches; everything else it does is
//! local. Consumed through the `KeyDirectory` trait so the establishment
//! protocol can be driven by any transport (HTTP in production, an
//! in-process map in tests).
//!
//! Endpoints (bearer-token authenticated, JSON bodies):
//!   GET /keys/public/{userId}        → { "publicKey": b64 }
//!   PUT /keys/public                 ← { "publicKey": b64 }
//!   GET /keys/shared/{conversationId} → { "encryptedKey"?: b64, "isEncrypted"?: bool }
//!       (scoped to the caller; absent encryptedKey = no wrapped key yet)
//!   PUT /keys/shared/{conversationId} ← { "encryptedKey": b64, "userId": recipient }

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

// ── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Fetch a user's published identity public key (base64). `None` if the
    /// user has never published one.
    async fn fetch_public_key(&self, user_id: &str) -> Result<Option<String>, DirectoryError>;

    /// Publish the caller's identity public key.  Idempotent.
    async fn publish_public_key(&self, public_key_b64: &str) -> Result<(), DirectoryError>;

    /// Fetch the wrapped session key stored for *the caller* on this
    /// conversation. `None` means no key has been distributed to the caller
    /// yet (the mint path is then legitimate).
    async fn fetch_wrapped_key(
        &self,
        conversation_id: &str,
    ) -> Result<Option<String>, DirectoryError>;

    /// Publish a wrapped session key for one recipient of a conversation.
    async fn publish_wrapped_key(
        &self,
        conversation_id: &str,
        recipient_id: &str,
        wrapped_b64: &str,
    ) -> Result<(), DirectoryError>;
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyBody {
    public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedKeyResponse {
    encrypted_key: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    is_encrypted: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SharedKeyBody<'a> {
    encrypted_key: &'a str,
    /// Recipient the wrapped key is addressed to.
    user_id: &'a str,
}

// ── HTTP implementation ──────────────────────────────────────────────────────

/// `KeyDirectory` over the REST backend.  The bearer token is a given
/// credential — issuance and refresh live in the auth layer, not here.
pub struct HttpKeyDirectory {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpKeyDirectory {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl KeyDirectory for HttpKeyDirectory {
    async fn fetch_public_key(&self, user_id: &str) -> Result<Option<String>, DirectoryError> {
        let endpoint = format!("{}/keys/public/{}", self.base_url, user_id);
        let resp = self
            .client
            .get(&endpoint)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(DirectoryError::BadStatus { status: resp.status().as_u16(), endpoint });
        }
        let body: PublicKeyBody = resp.json().await?;
        Ok(Some(body.public_key))
    }

    async fn publish_public_key(&self, public_key_b64: &str) -> Result<(), DirectoryError> {
        let endpoint = format!("{}/keys/public", self.base_url);
        let resp = self
            .client
            .put(&endpoint)
            .bearer_auth(&self.access_token)
            .json(&PublicKeyBody { public_key: public_key_b64.to_string() })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DirectoryError::BadStatus { status: resp.status().as_u16(), endpoint });
        }
        Ok(())
    }

    async fn fetch_wrapped_key(
        &self,
        conversation_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        let endpoint = format!("{}/keys/shared/{}", self.base_url, conversation_id);
        let resp = self
            .client
            .get(&endpoint)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(DirectoryError::BadStatus { status: resp.status().as_u16(), endpoint });
        }
        let body: SharedKeyResponse = resp.json().await?;
        Ok(body.encrypted_key)
    }

    async fn publish_wrapped_key(
        &self,
        conversation_id: &str,
        recipient_id: &str,
        wrapped_b64: &str,
    ) -> Result<(), DirectoryError> {
        let endpoint = format!("{}/keys/shared/{}", self.base_url, conversation_id);
        let resp = self
            .client
            .put(&endpoint)
            .bearer_auth(&self.access_token)
            .json(&SharedKeyBody { encrypted_key: wrapped_b64, user_id: recipient_id })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DirectoryError::BadStatus { status: resp.status().as_u16(), endpoint });
        }
        Ok(())
    }
}
