//! Authenticated symmetric encryption of message bodies.
//!
//! Uses XChaCha20-Poly1305 (192-bit nonce).
//! Key: 32 bytes.  Nonce: 24 bytes (random, fresh per call).  Tag: 16 bytes.
//!
//! Payload wire format:
//!   [ nonce (24 bytes) | ciphertext + tag ]
//! base64url (no padding) when carried as a message body.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    XChaCha20Poly1305,
};
use zeroize::Zeroizing;

use crate::{error::CryptoError, keys::SessionKey};

/// XChaCha20-Poly1305 nonce length, prepended to every payload.
pub const NONCE_LEN: usize = 24;

/// An encrypted message body: `nonce || ciphertext+tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload(Vec<u8>);

impl EncryptedPayload {
    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        // Anything shorter than nonce + tag cannot be a valid payload.
        if bytes.len() < NONCE_LEN + 16 {
            return Err(CryptoError::PayloadTooShort { got: bytes.len(), need: NONCE_LEN + 16 });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypt `plaintext` under a session key, prepending a random 24-byte nonce.
/// A fresh nonce is generated per call — nonce reuse under one key breaks
/// confidentiality.
pub fn seal(plaintext: &[u8], key: &SessionKey) -> Result<EncryptedPayload, CryptoError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::AeadEncrypt)?;

    let nonce = XChaCha20Poly1305::generate_nonce(&mut AeadOsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::AeadEncrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(EncryptedPayload(out))
}

/// Decrypt a payload (nonce || ciphertext+tag).
/// Returns an error on authentication failure — tampered bytes or the wrong
/// key never yield a corrupted-but-accepted plaintext.
pub fn open(payload: &EncryptedPayload, key: &SessionKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let (nonce_bytes, ct) = payload.0.split_at(NONCE_LEN);
    let nonce = chacha20poly1305::XNonce::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::AeadDecrypt)?;

    let plaintext = cipher
        .decrypt(nonce, ct)
        .map_err(|_| CryptoError::AeadDecrypt)?;

    Ok(Zeroizing::new(plaintext))
}
