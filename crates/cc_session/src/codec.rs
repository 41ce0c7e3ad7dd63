//! Transparent message encryption at the send/receive boundary.
//!
//! # Missing-key policy
//!
//! When no session key is available (establishment never ran, or failed
//! upstream), the inherited behavior is FAIL-OPEN: outgoing messages are
//! sent as plaintext with a logged warning, and incoming payloads that
//! cannot be decrypted are surfaced as-is so the UI renders a placeholder
//! instead of crashing. That is an availability-over-confidentiality
//! policy decision, so it is an explicit constructor parameter rather than
//! a hardcoded default buried in the error handling. `FailClosed` turns
//! both conditions into errors.
//!
//! Message send/receive never panics on crypto errors in either mode.

use cc_crypto::{secretbox, EncryptedPayload};
use cc_store::SessionKeyStore;

use crate::error::CodecError;

/// What to do when a conversation has no session key (or a payload cannot
/// be decrypted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Pass the message through unprotected, with a warning. Inherited
    /// default.
    #[default]
    FailOpen,
    /// Refuse to send/surface the message.
    FailClosed,
}

pub struct MessageCodec {
    sessions: SessionKeyStore,
    policy: MissingKeyPolicy,
}

impl MessageCodec {
    pub fn new(sessions: SessionKeyStore, policy: MissingKeyPolicy) -> Self {
        Self { sessions, policy }
    }

    /// Encrypt an outgoing message body. Returns the base64 payload, or —
    /// under `FailOpen` — the plaintext unchanged when no key is available.
    pub async fn encrypt_outgoing(
        &self,
        plaintext: &str,
        conversation_id: &str,
    ) -> Result<String, CodecError> {
        let Some(key) = self.sessions.get(conversation_id).await? else {
            return match self.policy {
                MissingKeyPolicy::FailOpen => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "encrypt_fail_open",
                        reason = "no_session_key",
                        conversation_id = %conversation_id
                    );
                    Ok(plaintext.to_string())
                }
                MissingKeyPolicy::FailClosed => Err(CodecError::NoSessionKey {
                    conversation_id: conversation_id.to_string(),
                }),
            };
        };

        match secretbox::seal(plaintext.as_bytes(), &key) {
            Ok(payload) => Ok(payload.to_b64()),
            Err(source) => match self.policy {
                MissingKeyPolicy::FailOpen => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "encrypt_fail_open",
                        reason = "seal_failed",
                        conversation_id = %conversation_id,
                        error = %source
                    );
                    Ok(plaintext.to_string())
                }
                MissingKeyPolicy::FailClosed => Err(CodecError::EncryptFailed {
                    conversation_id: conversation_id.to_string(),
                    source,
                }),
            },
        }
    }

    /// Decrypt an incoming message body. Under `FailOpen`, anything that
    /// doesn't decrypt (no key, not a payload, bad tag, non-UTF-8 result)
    /// comes back unchanged — it may be a plaintext from a fail-open sender,
    /// or an unreadable blob the UI shows a placeholder for.
    pub async fn decrypt_incoming(
        &self,
        payload: &str,
        conversation_id: &str,
    ) -> Result<String, CodecError> {
        let Some(key) = self.sessions.get(conversation_id).await? else {
            return match self.policy {
                MissingKeyPolicy::FailOpen => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "decrypt_fail_open",
                        reason = "no_session_key",
                        conversation_id = %conversation_id
                    );
                    Ok(payload.to_string())
                }
                MissingKeyPolicy::FailClosed => Err(CodecError::NoSessionKey {
                    conversation_id: conversation_id.to_string(),
                }),
            };
        };

        let decrypted = EncryptedPayload::from_b64(payload)
            .and_then(|p| secretbox::open(&p, &key))
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
            });

        match decrypted {
            Ok(plaintext) => Ok(plaintext),
            Err(reason) => match self.policy {
                MissingKeyPolicy::FailOpen => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "decrypt_fail_open",
                        reason = %reason,
                        conversation_id = %conversation_id
                    );
                    Ok(payload.to_string())
                }
                MissingKeyPolicy::FailClosed => Err(CodecError::DecryptFailed {
                    conversation_id: conversation_id.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_crypto::SessionKey;
    use cc_store::Store;

    async fn store_with_key(conversation_id: &str) -> (SessionKeyStore, SessionKey) {
        let sessions = SessionKeyStore::new(Store::open_in_memory().await.unwrap());
        let key = SessionKey::generate();
        sessions.put(conversation_id, key.clone()).await.unwrap();
        (sessions, key)
    }

    #[tokio::test]
    async fn roundtrip_with_established_key() {
        let (sessions, _) = store_with_key("c1").await;
        let codec = MessageCodec::new(sessions, MissingKeyPolicy::FailOpen);

        let wire = codec.encrypt_outgoing("hello", "c1").await.unwrap();
        assert_ne!(wire, "hello");
        assert_eq!(codec.decrypt_incoming(&wire, "c1").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn fail_open_returns_plaintext_when_no_key() {
        let sessions = SessionKeyStore::new(Store::open_in_memory().await.unwrap());
        let codec = MessageCodec::new(sessions, MissingKeyPolicy::FailOpen);

        assert_eq!(codec.encrypt_outgoing("hello", "c1").await.unwrap(), "hello");
        assert_eq!(codec.decrypt_incoming("hello", "c1").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn fail_closed_errors_when_no_key() {
        let sessions = SessionKeyStore::new(Store::open_in_memory().await.unwrap());
        let codec = MessageCodec::new(sessions, MissingKeyPolicy::FailClosed);

        let err = codec.encrypt_outgoing("hello", "c1").await.unwrap_err();
        assert!(matches!(err, CodecError::NoSessionKey { .. }));
        let err = codec.decrypt_incoming("blob", "c1").await.unwrap_err();
        assert!(matches!(err, CodecError::NoSessionKey { .. }));
    }

    #[tokio::test]
    async fn undecryptable_payload_surfaces_as_is() {
        let (sessions, _) = store_with_key("c1").await;
        let codec = MessageCodec::new(sessions, MissingKeyPolicy::FailOpen);

        // Plaintext from a fail-open sender: not valid base64 payload bytes.
        assert_eq!(
            codec.decrypt_incoming("plain old text", "c1").await.unwrap(),
            "plain old text"
        );
    }

    #[tokio::test]
    async fn wrong_key_payload_surfaces_as_is_or_errors() {
        let (other_sessions, _) = store_with_key("c1").await;
        let other = MessageCodec::new(other_sessions, MissingKeyPolicy::FailOpen);
        let wire = other.encrypt_outgoing("secret", "c1").await.unwrap();

        let (sessions, _) = store_with_key("c1").await; // different key
        let open = MessageCodec::new(sessions.clone(), MissingKeyPolicy::FailOpen);
        assert_eq!(open.decrypt_incoming(&wire, "c1").await.unwrap(), wire);

        let closed = MessageCodec::new(sessions, MissingKeyPolicy::FailClosed);
        let err = closed.decrypt_incoming(&wire, "c1").await.unwrap_err();
        assert!(matches!(err, CodecError::DecryptFailed { .. }));
    }

    #[tokio::test]
    async fn default_policy_is_fail_open() {
        assert_eq!(MissingKeyPolicy::default(), MissingKeyPolicy::FailOpen);
    }
}
