//! Client-side encryption: key handles and the AES-256-GCM record vault.

mod key;
mod vault;

pub use key::{EncryptionKey, KEY_LEN};
pub use vault::{EncryptedBlob, EncryptionService, NONCE_LEN};
