//! Integration test: per-user AES-256-GCM vault.
//!
//! Verifies that:
//! 1. Text and JSON payloads round trip under the same key.
//! 2. Every encryption draws a fresh nonce.
//! 3. A single flipped ciphertext byte fails decryption.
//! 4. An exported key re-imported in a new service opens old blobs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use dayflow_core::{
    CryptoError, EncryptedBlob, EncryptionKey, EncryptionService, ReflectionPayload, NONCE_LEN,
};
use std::collections::HashSet;

#[test]
fn text_roundtrip() {
    let key = EncryptionService::generate_key();
    let plaintext = "Finish the quarterly report before lunch";
    let blob = EncryptionService::encrypt(plaintext, &key).expect("encrypt");
    assert!(!blob.as_str().contains("quarterly"));
    assert_eq!(EncryptionService::decrypt(&blob, &key).expect("decrypt"), plaintext);
}

#[test]
fn nonces_are_unique() {
    let key = EncryptionService::generate_key();
    let nonces: HashSet<Vec<u8>> = (0..64)
        .map(|_| {
            let blob = EncryptionService::encrypt("same input", &key).unwrap();
            STANDARD.decode(blob.as_str()).unwrap()[..NONCE_LEN].to_vec()
        })
        .collect();
    assert_eq!(nonces.len(), 64, "every encryption must use a fresh nonce");
}

#[test]
fn flipped_byte_fails_closed() {
    let key = EncryptionService::generate_key();
    let blob = EncryptionService::encrypt("Felt anxious about the move", &key).unwrap();
    let mut raw = STANDARD.decode(blob.as_str()).unwrap();
    let last = raw.len() - 1;
    raw[NONCE_LEN + 2] ^= 0x01;
    let tampered = EncryptedBlob::from_encoded(STANDARD.encode(&raw));
    assert!(matches!(
        EncryptionService::decrypt(&tampered, &key),
        Err(CryptoError::DecryptionFailed(_))
    ));

    raw[NONCE_LEN + 2] ^= 0x01;
    raw[last] ^= 0x80;
    let tampered_tag = EncryptedBlob::from_encoded(STANDARD.encode(&raw));
    assert!(EncryptionService::decrypt(&tampered_tag, &key).is_err());
}

#[test]
fn exported_key_opens_payloads_in_new_session() {
    let key = EncryptionService::generate_key();
    let exported = EncryptionService::export_key(&key);
    let first = EncryptionService::with_key(key);
    let payload = ReflectionPayload {
        mood: 4,
        text: "Productive morning, tired evening".to_string(),
    };
    let blob = first.encrypt_user_data(&payload).unwrap();

    let second = EncryptionService::new();
    assert!(matches!(
        second.decrypt_user_data::<ReflectionPayload>(&blob),
        Err(CryptoError::KeyNotSet)
    ));
    second.set_user_key(Some(EncryptionService::import_key(&exported).unwrap()));
    assert_eq!(second.decrypt_user_data::<ReflectionPayload>(&blob).unwrap(), payload);

    let other = EncryptionService::with_key(EncryptionKey::generate());
    assert!(other.decrypt_user_data::<ReflectionPayload>(&blob).is_err());
}

#[test]
fn import_rejects_wrong_length() {
    assert!(matches!(
        EncryptionService::import_key(&[0u8; 16]),
        Err(CryptoError::InvalidKeyLength(16))
    ));
}
