//! Per-user AES-256 key handle.

use crate::error::CryptoError;
use crate::secure_memory::wipe;
use aes_gcm::{
    aead::{KeyInit, OsRng},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Raw key length (256 bits).
pub const KEY_LEN: usize = 32;

/// Symmetric key for one user identity. Bytes are wiped when the handle drops.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        Self { bytes }
    }

    /// Rebuilds a key from its raw export. Anything but 32 bytes is rejected.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_LEN] = raw
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(raw.len()))?;
        Ok(Self { bytes })
    }

    /// Raw portable form.
    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.bytes
    }

    /// Base64 text form kept on the user record.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut raw = STANDARD.decode(encoded.trim())?;
        let key = Self::from_bytes(&raw);
        wipe(&mut raw);
        key
    }

    pub(crate) fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.bytes)
            .map_err(|_| CryptoError::InvalidKeyLength(self.bytes.len()))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        wipe(&mut self.bytes);
    }
}
