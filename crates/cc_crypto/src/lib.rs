//! cc_crypto — Campus Channel cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Expected failures (tampered ciphertext, wrong key, bad base64) are
//!   error values, never panics — callers at the message boundary decide
//!   whether to fail open or closed.
//!
//! # Module layout
//! - `keys`      — X25519 identity keypairs + per-conversation session keys
//! - `secretbox` — XChaCha20-Poly1305 message encryption under a session key
//! - `sealed`    — session-key wrapping for one recipient (DH + HKDF + AEAD)
//! - `error`     — unified error type

pub mod error;
pub mod keys;
pub mod sealed;
pub mod secretbox;

pub use error::CryptoError;
pub use keys::{IdentityKeyPair, PublicKeyBytes, SessionKey};
pub use sealed::{unwrap_session_key, wrap_session_key, WrappedSessionKey};
pub use secretbox::EncryptedPayload;
