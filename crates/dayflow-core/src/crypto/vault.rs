//! **Record Vault**: AES-256-GCM encryption for every sensitive payload DayFlow persists.
//!
//! ## Wire Format
//!
//! Each [`EncryptedBlob`] is base64 of `[12-byte nonce][ciphertext+16-byte tag]`.
//! The nonce is drawn from `OsRng` on every call, so encrypting the same text twice
//! never yields the same blob.
//!
//! ## Key Slot
//!
//! An [`EncryptionService`] owns one "current user key" slot: set on sign-in, cleared on
//! sign-out. The JSON helpers (`encrypt_user_data` / `decrypt_user_data`) use that slot and
//! fail with [`CryptoError::KeyNotSet`] before touching the cipher when it is empty.
//! Each call snapshots the key when it starts.
//!
//! Decrypted bytes live in a [`SecretBuf`] until they are deserialized.

use super::key::EncryptionKey;
use crate::error::CryptoError;
use crate::secure_memory::SecretBuf;
use aes_gcm::{
    aead::{Aead, AeadCore, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::RwLock;

/// AES-GCM nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// Opaque base64 blob stored in a record's `encrypted_data` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    /// Wraps an already-encoded blob (e.g. read back from storage).
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encryption service holding the active user key.
#[derive(Default)]
pub struct EncryptionService {
    active: RwLock<Option<EncryptionKey>>,
}

impl EncryptionService {
    /// Service with an empty key slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Service whose slot already holds `key`.
    pub fn with_key(key: EncryptionKey) -> Self {
        Self {
            active: RwLock::new(Some(key)),
        }
    }

    pub fn generate_key() -> EncryptionKey {
        EncryptionKey::generate()
    }

    pub fn export_key(key: &EncryptionKey) -> [u8; 32] {
        key.to_bytes()
    }

    pub fn import_key(raw: &[u8]) -> Result<EncryptionKey, CryptoError> {
        EncryptionKey::from_bytes(raw)
    }

    /// Sets (`Some`) or clears (`None`) the active key.
    pub fn set_user_key(&self, key: Option<EncryptionKey>) {
        let unlocked = key.is_some();
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = key;
        tracing::debug!(target: "dayflow::vault", unlocked, "user key slot updated");
    }

    /// True when a user key is active.
    pub fn has_key(&self) -> bool {
        self.active.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    fn active_key(&self) -> Result<EncryptionKey, CryptoError> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(CryptoError::KeyNotSet)
    }

    /// Encrypts UTF-8 text under `key` with a fresh nonce.
    pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<EncryptedBlob, CryptoError> {
        seal(plaintext.as_bytes(), key)
    }

    /// Decrypts a blob produced by [`Self::encrypt`]. Fails on a wrong key, tampering, or a
    /// blob shorter than the nonce.
    pub fn decrypt(blob: &EncryptedBlob, key: &EncryptionKey) -> Result<String, CryptoError> {
        let plain = open(blob, key)?;
        String::from_utf8(plain.as_slice().to_vec())
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }

    /// Serializes `value` as JSON and encrypts it under the active key.
    pub fn encrypt_user_data<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<EncryptedBlob, CryptoError> {
        let key = self.active_key()?;
        let json = SecretBuf::new(serde_json::to_vec(value)?);
        seal(json.as_slice(), &key)
    }

    /// Decrypts with the active key and deserializes the JSON payload.
    pub fn decrypt_user_data<T: DeserializeOwned>(
        &self,
        blob: &EncryptedBlob,
    ) -> Result<T, CryptoError> {
        let key = self.active_key()?;
        let plain = open(blob, &key)?;
        Ok(serde_json::from_slice(plain.as_slice())?)
    }
}

fn seal(plaintext: &[u8], key: &EncryptionKey) -> Result<EncryptedBlob, CryptoError> {
    let cipher = key.cipher()?;
    let nonce = Aes256Gcm::generate_nonce(OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(EncryptedBlob(STANDARD.encode(out)))
}

fn open(blob: &EncryptedBlob, key: &EncryptionKey) -> Result<SecretBuf, CryptoError> {
    let cipher = key.cipher()?;
    let raw = STANDARD.decode(blob.as_str())?;
    if raw.len() < NONCE_LEN {
        return Err(CryptoError::CorruptBlob(raw.len()));
    }
    let (nonce_bytes, ct) = raw.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ct)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    Ok(SecretBuf::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_key() -> EncryptionKey {
        let mut raw = [0u8; 32];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(7).wrapping_add(42);
        }
        EncryptionKey::from_bytes(&raw).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let blob = EncryptionService::encrypt("Finish project report", &key).unwrap();
        assert!(!blob.as_str().contains("Finish"));
        assert_eq!(
            EncryptionService::decrypt(&blob, &key).unwrap(),
            "Finish project report"
        );
    }

    #[test]
    fn same_plaintext_yields_distinct_blobs() {
        let key = test_key();
        let a = EncryptionService::encrypt("same", &key).unwrap();
        let b = EncryptionService::encrypt("same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let blob = EncryptionService::encrypt("secret", &test_key()).unwrap();
        let other = EncryptionKey::generate();
        assert!(matches!(
            EncryptionService::decrypt(&blob, &other),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn truncated_blob_detected() {
        let blob = EncryptedBlob::from_encoded(STANDARD.encode([1u8, 2, 3]));
        assert!(matches!(
            EncryptionService::decrypt(&blob, &test_key()),
            Err(CryptoError::CorruptBlob(3))
        ));
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let blob = EncryptedBlob::from_encoded("not base64 at all!");
        assert!(matches!(
            EncryptionService::decrypt(&blob, &test_key()),
            Err(CryptoError::Encoding(_))
        ));
    }

    #[test]
    fn user_data_requires_active_key() {
        let service = EncryptionService::new();
        assert!(matches!(
            service.encrypt_user_data(&json!({"title": "x"})),
            Err(CryptoError::KeyNotSet)
        ));
        let blob = EncryptionService::encrypt("{}", &test_key()).unwrap();
        assert!(matches!(
            service.decrypt_user_data::<serde_json::Value>(&blob),
            Err(CryptoError::KeyNotSet)
        ));
    }

    #[test]
    fn user_data_roundtrip_and_clear() {
        let service = EncryptionService::with_key(test_key());
        let value = json!({"mood": 4, "text": "felt focused", "tags": ["a", "b"]});
        let blob = service.encrypt_user_data(&value).unwrap();
        let back: serde_json::Value = service.decrypt_user_data(&blob).unwrap();
        assert_eq!(back, value);

        service.set_user_key(None);
        assert!(!service.has_key());
        assert!(service.decrypt_user_data::<serde_json::Value>(&blob).is_err());
    }

    #[test]
    fn imported_key_opens_existing_blobs() {
        let key = EncryptionService::generate_key();
        let imported = EncryptionService::import_key(&EncryptionService::export_key(&key)).unwrap();
        let blob = EncryptionService::encrypt("portable", &key).unwrap();
        assert_eq!(EncryptionService::decrypt(&blob, &imported).unwrap(), "portable");
    }
}
