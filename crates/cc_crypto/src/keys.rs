//! Key material for the messaging layer.
//!
//! Each *user* has one long-term X25519 `IdentityKeyPair`, used only to
//! wrap/unwrap session keys — never to encrypt message bodies directly.
//! Each *conversation* has one symmetric `SessionKey` shared by all its
//! participants; message bodies are encrypted under it via `secretbox`.
//!
//! Lifecycle (NON-NEGOTIABLE)
//! --------------------------
//! - An identity pair is created lazily on first use and never regenerated
//!   while present. There is no rotation path in the current protocol.
//! - A session key, once established for a conversation, is final: a second
//!   mint would desynchronize the participants. `cc_session` enforces the
//!   mint-only-when-absent rule; this module just produces key material.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

// ── Newtype wrappers ──────────────────────────────────────────────────────────

/// 32-byte X25519 public key, base64url-encoded on the wire and at rest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes(pub [u8; 32]);

impl PublicKeyBytes {
    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidKey(format!("Public key must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }
}

// ── Identity keypair ──────────────────────────────────────────────────────────

/// Long-term per-user X25519 keypair.  Drop clears the secret half.
#[derive(ZeroizeOnDrop)]
pub struct IdentityKeyPair {
    #[zeroize(skip)]
    pub public: PublicKeyBytes,
    secret_bytes: [u8; 32],
}

impl IdentityKeyPair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKeyBytes(*X25519Public::from(&secret).as_bytes());
        Self { public, secret_bytes: secret.to_bytes() }
    }

    /// Reconstruct a keypair from its stored secret half.
    /// The public half is re-derived, so a stored public key that no longer
    /// matches the secret is simply ignored.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("Identity secret must be 32 bytes, got {}", bytes.len()))
        })?;
        let secret = StaticSecret::from(arr);
        let public = PublicKeyBytes(*X25519Public::from(&secret).as_bytes());
        Ok(Self { public, secret_bytes: arr })
    }

    pub fn from_secret_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret_bytes
    }

    pub fn public_b64(&self) -> String {
        self.public.to_b64()
    }

    pub fn secret_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.secret_bytes)
    }
}

// ── Session key ───────────────────────────────────────────────────────────────

/// 32-byte symmetric key scoped to exactly one conversation.
/// Zeroized on drop.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    /// Mint a fresh random session key.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("Session key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    // Never print key material
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
