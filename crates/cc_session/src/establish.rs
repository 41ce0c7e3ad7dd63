//! Session-key establishment protocol.
//!
//! # Protocol (per conversation)
//!
//! `ensure` tries three sources in order, stopping at the first that yields
//! a key:
//!
//! 1. **Local cache** — `SessionKeyStore` already holds the key. Common
//!    path for every message after the first.
//! 2. **Directory recovery** — another participant minted the key and left
//!    a wrapped copy for us. We identify the counterpart (first participant
//!    that isn't us — a 2-party assumption), fetch their public key, and
//!    unwrap. An unwrap failure is TERMINAL: a key exists for the other
//!    participants, so minting a replacement would desynchronize the
//!    conversation.
//! 3. **Mint and distribute** — nobody has distributed a key to us, so we
//!    mint one. The key is persisted locally BEFORE any network call, so a
//!    failure mid-distribution never loses it. Distribution is then
//!    best-effort per recipient: an unreachable participant is skipped with
//!    a warning, not a failure — they will mint-or-fail on their own next
//!    `ensure`.
//!
//! # Reentrancy
//!
//! Two concurrent `ensure` calls for one conversation must not both reach
//! the mint branch, or two divergent keys could be distributed. Each
//! conversation has an in-flight lock; late callers wait, then hit the
//! local-cache step and converge on the first caller's key.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use cc_crypto::{sealed, PublicKeyBytes, SessionKey, WrappedSessionKey};
use cc_store::{IdentityKeyStore, SessionKeyStore};

use crate::{directory::KeyDirectory, error::EstablishError};

pub struct SessionEstablishment {
    identity: IdentityKeyStore,
    sessions: SessionKeyStore,
    directory: Arc<dyn KeyDirectory>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionEstablishment {
    pub fn new(
        identity: IdentityKeyStore,
        sessions: SessionKeyStore,
        directory: Arc<dyn KeyDirectory>,
    ) -> Self {
        Self { identity, sessions, directory, in_flight: Mutex::new(HashMap::new()) }
    }

    /// Create the local identity pair if absent and publish its public half
    /// to the directory. Call once per login; safe to repeat.
    pub async fn register_identity(&self, self_id: &str) -> Result<(), EstablishError> {
        let pair = self.identity.get_or_create(self_id).await?;
        self.directory.publish_public_key(&pair.public_b64()).await?;
        tracing::info!(
            target: "cc_session",
            event = "identity_published",
            user_id = %self_id
        );
        Ok(())
    }

    /// Make sure `SessionKeyStore` holds the session key for
    /// `conversation_id`, recovering or minting it as needed.
    ///
    /// Must complete before the first `MessageCodec` call for the
    /// conversation — await it, don't fire-and-forget.
    pub async fn ensure(
        &self,
        conversation_id: &str,
        participant_ids: &[String],
        self_id: &str,
    ) -> Result<(), EstablishError> {
        // Per-conversation guard: concurrent callers serialize here, and
        // every caller after the first resolves via the cache check below.
        let guard = {
            let mut map = self.in_flight.lock().await;
            map.entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _held = guard.lock().await;

        // ── 1. Local cache ───────────────────────────────────────────────
        if self.sessions.get(conversation_id).await?.is_some() {
            tracing::debug!(
                target: "cc_session",
                event = "session_established",
                source = "local_cache",
                conversation_id = %conversation_id
            );
            return Ok(());
        }

        // ── 2. Directory recovery ────────────────────────────────────────
        if let Some(wrapped_b64) = self.directory.fetch_wrapped_key(conversation_id).await? {
            let key = self
                .recover_from_directory(conversation_id, participant_ids, self_id, &wrapped_b64)
                .await?;
            self.sessions.put(conversation_id, key).await?;
            tracing::info!(
                target: "cc_session",
                event = "session_established",
                source = "directory",
                conversation_id = %conversation_id
            );
            return Ok(());
        }

        // ── 3. Mint and distribute ───────────────────────────────────────
        self.mint_and_distribute(conversation_id, participant_ids, self_id)
            .await
    }

    /// Unwrap the directory's record for us using the counterpart's public
    /// key. Any failure here is terminal for `ensure` — no fallback to
    /// minting, since a key already exists for other participants.
    async fn recover_from_directory(
        &self,
        conversation_id: &str,
        participant_ids: &[String],
        self_id: &str,
        wrapped_b64: &str,
    ) -> Result<SessionKey, EstablishError> {
        // First participant that isn't us. Assumes the relevant sender is
        // the single counterpart of a 2-party conversation.
        let counterpart = participant_ids
            .iter()
            .find(|p| p.as_str() != self_id)
            .ok_or_else(|| EstablishError::NoCounterpart {
                conversation_id: conversation_id.to_string(),
            })?;

        let counterpart_pub_b64 = self
            .directory
            .fetch_public_key(counterpart)
            .await?
            .ok_or_else(|| EstablishError::MissingCounterpartKey { user_id: counterpart.clone() })?;

        let me = self.identity.get_or_create(self_id).await?;

        let unwrap = || -> Result<SessionKey, cc_crypto::CryptoError> {
            let wrapped = WrappedSessionKey::from_b64(wrapped_b64)?;
            let counterpart_pub = PublicKeyBytes::from_b64(&counterpart_pub_b64)?;
            sealed::unwrap_session_key(&wrapped, &counterpart_pub, &me)
        };

        unwrap().map_err(|source| {
            tracing::error!(
                target: "cc_session",
                event = "unwrap_failed",
                conversation_id = %conversation_id,
                counterpart = %counterpart,
                error = %source
            );
            EstablishError::UnwrapFailed { conversation_id: conversation_id.to_string(), source }
        })
    }

    /// Mint a fresh key, persist it locally, then wrap it for every other
    /// participant. Local persistence happens before any remote call and is
    /// never rolled back. Partial distribution is tolerated.
    async fn mint_and_distribute(
        &self,
        conversation_id: &str,
        participant_ids: &[String],
        self_id: &str,
    ) -> Result<(), EstablishError> {
        let key = SessionKey::generate();
        self.sessions.put(conversation_id, key.clone()).await?;
        tracing::info!(
            target: "cc_session",
            event = "mint_session_key",
            conversation_id = %conversation_id,
            participants = participant_ids.len()
        );

        let me = self.identity.get_or_create(self_id).await?;

        for recipient in participant_ids.iter().filter(|p| p.as_str() != self_id) {
            let recipient_pub_b64 = match self.directory.fetch_public_key(recipient).await {
                Ok(Some(b64)) => b64,
                Ok(None) => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "distribute_skip_participant",
                        reason = "no_public_key",
                        conversation_id = %conversation_id,
                        recipient = %recipient
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "distribute_skip_participant",
                        reason = "public_key_fetch_failed",
                        conversation_id = %conversation_id,
                        recipient = %recipient,
                        error = %e
                    );
                    continue;
                }
            };

            let wrapped = match PublicKeyBytes::from_b64(&recipient_pub_b64)
                .and_then(|pub_key| sealed::wrap_session_key(&key, &pub_key, &me))
            {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!(
                        target: "cc_session",
                        event = "distribute_skip_participant",
                        reason = "wrap_failed",
                        conversation_id = %conversation_id,
                        recipient = %recipient,
                        error = %e
                    );
                    continue;
                }
            };

            if let Err(e) = self
                .directory
                .publish_wrapped_key(conversation_id, recipient, &wrapped.to_b64())
                .await
            {
                tracing::warn!(
                    target: "cc_session",
                    event = "distribute_skip_participant",
                    reason = "publish_failed",
                    conversation_id = %conversation_id,
                    recipient = %recipient,
                    error = %e
                );
                continue;
            }

            tracing::debug!(
                target: "cc_session",
                event = "distributed_wrapped_key",
                conversation_id = %conversation_id,
                recipient = %recipient
            );
        }

        tracing::info!(
            target: "cc_session",
            event = "session_established",
            source = "mint",
            conversation_id = %conversation_id
        );
        Ok(())
    }
}
