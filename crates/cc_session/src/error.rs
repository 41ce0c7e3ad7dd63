use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Key directory returned {status} for {endpoint}")]
    BadStatus { status: u16, endpoint: String },
}

#[derive(Debug, Error)]
pub enum EstablishError {
    #[error("Store error: {0}")]
    Store(#[from] cc_store::StoreError),

    #[error("Key directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] cc_crypto::CryptoError),

    #[error("No counterpart in participant list for conversation {conversation_id}")]
    NoCounterpart { conversation_id: String },

    #[error("No public key published for counterpart {user_id}")]
    MissingCounterpartKey { user_id: String },

    #[error("Failed to unwrap directory session key for conversation {conversation_id}: {source}")]
    UnwrapFailed {
        conversation_id: String,
        #[source]
        source: cc_crypto::CryptoError,
    },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Store error: {0}")]
    Store(#[from] cc_store::StoreError),

    #[error("No session key established for conversation {conversation_id}")]
    NoSessionKey { conversation_id: String },

    #[error("Encryption failed for conversation {conversation_id}: {source}")]
    EncryptFailed {
        conversation_id: String,
        #[source]
        source: cc_crypto::CryptoError,
    },

    #[error("Payload for conversation {conversation_id} could not be decrypted")]
    DecryptFailed { conversation_id: String },
}
