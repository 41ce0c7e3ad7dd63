//! Session-key wrapping for one recipient.
//!
//! A conversation's session key is transmitted to a participant by sealing
//! it under `(recipient_public, sender_secret)`:
//!
//!   shared  = X25519(sender_secret, recipient_public)
//!   wrapkey = HKDF-SHA256(ikm = shared, info = "cc-key-wrap-v1")
//!   wrapped = [ nonce (24) | XChaCha20-Poly1305(wrapkey, session_key) ]
//!
//! The DH is commutative, so the recipient unwraps with
//! `(sender_public, recipient_secret)`. Only the two DH parties can produce
//! a valid authentication tag, which gives the recipient sender authenticity
//! as well as tamper detection.
//!
//! References:
//!   - RFC 7748 (X25519): <https://datatracker.ietf.org/doc/html/rfc7748>
//!   - RFC 5869 (HKDF):   <https://datatracker.ietf.org/doc/html/rfc5869>

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    keys::{IdentityKeyPair, PublicKeyBytes, SessionKey},
    secretbox::{self, EncryptedPayload, NONCE_LEN},
};

const WRAP_INFO: &[u8] = b"cc-key-wrap-v1";

/// A session key sealed for one specific recipient: `nonce || ciphertext+tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedSessionKey(Vec<u8>);

impl WrappedSessionKey {
    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        if bytes.len() < NONCE_LEN + 16 {
            return Err(CryptoError::PayloadTooShort { got: bytes.len(), need: NONCE_LEN + 16 });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Derive the symmetric wrapping key for a (secret, public) DH pair.
fn wrap_key_for(secret_bytes: &[u8; 32], public: &PublicKeyBytes) -> Result<SessionKey, CryptoError> {
    let secret = StaticSecret::from(*secret_bytes);
    let their_public = X25519Public::from(public.0);
    let shared = secret.diffie_hellman(&their_public);

    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(WRAP_INFO, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let out = SessionKey::from_bytes(&key);
    key.zeroize();
    out
}

/// Seal `session_key` for the holder of `recipient_public`.
/// Fresh nonce per call.
pub fn wrap_session_key(
    session_key: &SessionKey,
    recipient_public: &PublicKeyBytes,
    sender: &IdentityKeyPair,
) -> Result<WrappedSessionKey, CryptoError> {
    let wrap_key = wrap_key_for(sender.secret_bytes(), recipient_public)?;
    let sealed = secretbox::seal(session_key.as_bytes(), &wrap_key)?;
    Ok(WrappedSessionKey(sealed.as_bytes().to_vec()))
}

/// Unseal a wrapped session key received from the holder of `sender_public`.
/// Fails on authentication mismatch — a wrapped key produced by a different
/// sender, or corrupted in the directory, is rejected rather than yielding
/// garbage key material.
pub fn unwrap_session_key(
    wrapped: &WrappedSessionKey,
    sender_public: &PublicKeyBytes,
    recipient: &IdentityKeyPair,
) -> Result<SessionKey, CryptoError> {
    let wrap_key = wrap_key_for(recipient.secret_bytes(), sender_public)?;
    let payload = EncryptedPayload::from_bytes(wrapped.0.clone())?;
    let plaintext = secretbox::open(&payload, &wrap_key)?;
    SessionKey::from_bytes(&plaintext)
}
