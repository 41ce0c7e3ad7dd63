//! In-process `KeyDirectory` for protocol tests: shared state across
//! participants, per-caller handles (the wrapped-key fetch is caller-scoped,
//! like the bearer-authenticated HTTP endpoint), write counters, and
//! failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cc_store::{IdentityKeyStore, SessionKeyStore, Store};

use crate::directory::KeyDirectory;
use crate::error::DirectoryError;
use crate::establish::SessionEstablishment;

#[derive(Default)]
struct MockState {
    public_keys: Mutex<HashMap<String, String>>,
    wrapped: Mutex<HashMap<(String, String), String>>,
    wrapped_publishes: Mutex<HashMap<String, usize>>,
    writes: AtomicUsize,
    failing_public: Mutex<HashSet<String>>,
}

#[derive(Clone)]
pub(crate) struct MockDirectory {
    state: Arc<MockState>,
    caller: String,
}

impl MockDirectory {
    pub(crate) fn new() -> Self {
        Self { state: Arc::new(MockState::default()), caller: String::new() }
    }

    /// A handle over the same directory state, acting as `user`.
    pub(crate) fn as_user(&self, user: &str) -> Self {
        Self { state: Arc::clone(&self.state), caller: user.to_string() }
    }

    pub(crate) fn set_public_key(&self, user: &str, b64: &str) {
        self.state
            .public_keys
            .lock()
            .unwrap()
            .insert(user.to_string(), b64.to_string());
    }

    pub(crate) fn public_key_for(&self, user: &str) -> Option<String> {
        self.state.public_keys.lock().unwrap().get(user).cloned()
    }

    pub(crate) fn set_wrapped_key(&self, conversation_id: &str, recipient: &str, b64: &str) {
        self.state
            .wrapped
            .lock()
            .unwrap()
            .insert((conversation_id.to_string(), recipient.to_string()), b64.to_string());
    }

    pub(crate) fn wrapped_key_for(&self, conversation_id: &str, recipient: &str) -> Option<String> {
        self.state
            .wrapped
            .lock()
            .unwrap()
            .get(&(conversation_id.to_string(), recipient.to_string()))
            .cloned()
    }

    /// Total number of directory writes (public + wrapped publishes).
    pub(crate) fn write_count(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// Number of wrapped-key publishes seen for one conversation.
    pub(crate) fn wrapped_publish_count(&self, conversation_id: &str) -> usize {
        self.state
            .wrapped_publishes
            .lock()
            .unwrap()
            .get(conversation_id)
            .copied()
            .unwrap_or(0)
    }

    /// Make every public-key fetch for `user` fail with an HTTP-ish error.
    pub(crate) fn fail_public_key_fetch(&self, user: &str) {
        self.state
            .failing_public
            .lock()
            .unwrap()
            .insert(user.to_string());
    }
}

#[async_trait]
impl KeyDirectory for MockDirectory {
    async fn fetch_public_key(&self, user_id: &str) -> Result<Option<String>, DirectoryError> {
        if self.state.failing_public.lock().unwrap().contains(user_id) {
            return Err(DirectoryError::BadStatus {
                status: 500,
                endpoint: format!("/keys/public/{user_id}"),
            });
        }
        Ok(self.state.public_keys.lock().unwrap().get(user_id).cloned())
    }

    async fn publish_public_key(&self, public_key_b64: &str) -> Result<(), DirectoryError> {
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .public_keys
            .lock()
            .unwrap()
            .insert(self.caller.clone(), public_key_b64.to_string());
        Ok(())
    }

    async fn fetch_wrapped_key(
        &self,
        conversation_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        Ok(self
            .state
            .wrapped
            .lock()
            .unwrap()
            .get(&(conversation_id.to_string(), self.caller.clone()))
            .cloned())
    }

    async fn publish_wrapped_key(
        &self,
        conversation_id: &str,
        recipient_id: &str,
        wrapped_b64: &str,
    ) -> Result<(), DirectoryError> {
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        *self
            .state
            .wrapped_publishes
            .lock()
            .unwrap()
            .entry(conversation_id.to_string())
            .or_insert(0) += 1;
        self.state.wrapped.lock().unwrap().insert(
            (conversation_id.to_string(), recipient_id.to_string()),
            wrapped_b64.to_string(),
        );
        Ok(())
    }
}

/// One client's worth of wiring: fresh in-memory store, session store, and
/// an establishment handle acting as `user` against the shared directory.
pub(crate) async fn client(
    dir: &MockDirectory,
    user: &str,
) -> (SessionEstablishment, SessionKeyStore) {
    let store = Store::open_in_memory().await.expect("in-memory store");
    let sessions = SessionKeyStore::new(store.clone());
    let identity = IdentityKeyStore::new(store);
    let est = SessionEstablishment::new(identity, sessions.clone(), Arc::new(dir.as_user(user)));
    (est, sessions)
}
