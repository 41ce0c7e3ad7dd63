use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch — possible tampering)")]
    AeadDecrypt,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Payload too short: {got} bytes, need at least {need}")]
    PayloadTooShort { got: usize, need: usize },

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
