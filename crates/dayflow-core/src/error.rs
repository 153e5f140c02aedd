//! Error types for the vault, the record store, the completion bridge and the write side.

use thiserror::Error;

/// Errors raised by the encryption service. Always surfaced to the immediate caller.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No user key is active (signed out, or never signed in).
    #[error("encryption key not set")]
    KeyNotSet,
    /// Imported key material is not exactly 32 bytes.
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    /// Blob or exported key is not valid base64.
    #[error("blob encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// Decoded blob is too short to hold a nonce.
    #[error("corrupt blob: {0} bytes is shorter than the nonce")]
    CorruptBlob(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    /// Tag verification failed: wrong key, tampered or truncated ciphertext.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    /// Payload could not be (de)serialized as JSON.
    #[error("payload serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a [`crate::RecordStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("record serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the external text-completion collaborator. Never reach the UI; the planner
/// falls back to an offline template.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No credential configured, or running offline.
    #[error("text completion unavailable")]
    Unavailable,
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response had no choices")]
    EmptyResponse,
}

/// Errors from sign-in / sign-out.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

/// Errors from the tracker's write operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("mood must be between 1 and 5, got {0}")]
    InvalidMood(u8),
}

/// Errors inside plan generation. Never returned by the planner's public API; they select
/// the offline fallback.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Model output is not a JSON object.
    #[error("malformed plan: {0}")]
    Malformed(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("plan serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
