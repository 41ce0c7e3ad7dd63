//! cc_store — Durable local key storage for Campus Channel
//!
//! Client-side state the crypto layer persists between runs:
//! - the user's long-term identity keypair (`crypto_keys_{user_id}`)
//! - one symmetric session key per conversation (`shared_key_{conversation_id}`)
//!
//! Backed by SQLite via sqlx (one `kv` table, migrations run on open).
//! Session keys additionally live in an in-process mirror so the hot path
//! (every message after the first) never touches the database.
//!
//! Secret values are stored base64-encoded. The database file is expected
//! to live in the client's private data directory; at-rest encryption of
//! the file itself is out of scope here.

pub mod db;
pub mod error;
pub mod identity;
pub mod session;

pub use db::Store;
pub use error::StoreError;
pub use identity::IdentityKeyStore;
pub use session::SessionKeyStore;
