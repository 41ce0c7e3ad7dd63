//! cc_session — Session-key establishment and transparent message encryption
//!
//! The protocol layer between the messaging feature and the crypto
//! primitives. Responsibilities:
//!
//! - `directory` — the server-side key directory (user id → public key,
//!   conversation id → per-recipient wrapped session key), as a trait plus
//!   the HTTP implementation.
//! - `establish` — `SessionEstablishment::ensure`: recover or mint-and-
//!   distribute the symmetric session key for a conversation. Guarded
//!   against concurrent double-minting.
//! - `codec` — `MessageCodec`: encrypt outgoing / decrypt incoming message
//!   bodies under the conversation's session key, with an explicit
//!   fail-open/fail-closed policy for the missing-key case.
//!
//! Callers must `ensure` a conversation (await it, not fire-and-forget)
//! before the first encrypt/decrypt that depends on it.

pub mod codec;
pub mod directory;
pub mod error;
pub mod establish;

pub use codec::{MessageCodec, MissingKeyPolicy};
pub use directory::{HttpKeyDirectory, KeyDirectory};
pub use error::{CodecError, DirectoryError, EstablishError};
pub use establish::SessionEstablishment;

#[cfg(test)]
pub(crate) mod testutil;
