//! Sign-in / sign-out: binds a user's key to the shared [`EncryptionService`].
//!
//! A first sign-in generates a fresh key and stores its base64 export on the user record.
//! Later sign-ins import that key again, so data written in one session opens in the next.

use crate::crypto::{EncryptionKey, EncryptionService};
use crate::error::SessionError;
use crate::records::User;
use crate::store::{get_record, put_record, query_all, RecordStore, USER_PROFILE_KEY};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Optional profile fields supplied by the identity provider.
#[derive(Debug, Clone, Default)]
pub struct SignInProfile {
    pub email: Option<String>,
    pub name: Option<String>,
}

pub struct SessionManager {
    store: Arc<dyn RecordStore>,
    vault: Arc<EncryptionService>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn RecordStore>, vault: Arc<EncryptionService>) -> Self {
        Self { store, vault }
    }

    /// Finds or creates the user for `external_id` and activates their key.
    pub async fn sign_in(
        &self,
        external_id: &str,
        profile: SignInProfile,
    ) -> Result<User, SessionError> {
        let existing = query_all::<User, _>(self.store.as_ref(), |u| u.external_id == external_id)
            .await?
            .into_iter()
            .next();

        let user = match existing {
            Some(user) => {
                let key = EncryptionKey::from_base64(&user.encoded_key)?;
                self.vault.set_user_key(Some(key));
                tracing::info!(target: "dayflow::session", user = %user.id, "signed in");
                user
            }
            None => {
                let key = EncryptionService::generate_key();
                let user = User {
                    id: Uuid::new_v4().to_string(),
                    external_id: external_id.to_string(),
                    encoded_key: key.to_base64(),
                    email: profile.email,
                    name: profile.name,
                    created_at: Utc::now(),
                };
                put_record(self.store.as_ref(), &user).await?;
                self.vault.set_user_key(Some(key));
                tracing::info!(target: "dayflow::session", user = %user.id, "new user registered");
                user
            }
        };
        Ok(user)
    }

    /// Re-activates the key of a known user id.
    pub async fn restore(&self, user_id: &str) -> Result<User, SessionError> {
        let user = get_record::<User>(self.store.as_ref(), user_id, USER_PROFILE_KEY)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(user_id.to_string()))?;
        self.vault
            .set_user_key(Some(EncryptionKey::from_base64(&user.encoded_key)?));
        tracing::debug!(target: "dayflow::session", user = %user.id, "session restored");
        Ok(user)
    }

    /// Clears the active key; encrypt/decrypt fail with `KeyNotSet` until the next sign-in.
    pub fn sign_out(&self) {
        self.vault.set_user_key(None);
        tracing::info!(target: "dayflow::session", "signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use crate::store::MemoryRecordStore;

    fn manager() -> (SessionManager, Arc<EncryptionService>) {
        let vault = Arc::new(EncryptionService::new());
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        (SessionManager::new(store, vault.clone()), vault)
    }

    #[tokio::test]
    async fn sign_in_twice_reuses_key() {
        let (sessions, vault) = manager();
        let profile = SignInProfile {
            email: Some("a@example.com".to_string()),
            name: None,
        };
        let first = sessions.sign_in("oauth|1", profile.clone()).await.unwrap();
        let blob = vault.encrypt_user_data("persisted").unwrap();

        sessions.sign_out();
        assert!(!vault.has_key());
        assert!(matches!(
            vault.decrypt_user_data::<String>(&blob),
            Err(CryptoError::KeyNotSet)
        ));

        let second = sessions.sign_in("oauth|1", profile).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(vault.decrypt_user_data::<String>(&blob).unwrap(), "persisted");
    }

    #[tokio::test]
    async fn distinct_identities_get_distinct_keys() {
        let (sessions, _) = manager();
        let a = sessions.sign_in("a", SignInProfile::default()).await.unwrap();
        let b = sessions.sign_in("b", SignInProfile::default()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.encoded_key, b.encoded_key);
    }

    #[tokio::test]
    async fn restore_unknown_user_fails() {
        let (sessions, vault) = manager();
        let user = sessions.sign_in("a", SignInProfile::default()).await.unwrap();
        sessions.sign_out();
        sessions.restore(&user.id).await.unwrap();
        assert!(vault.has_key());
        assert!(matches!(
            sessions.restore("missing").await,
            Err(SessionError::UnknownUser(_))
        ));
    }
}
