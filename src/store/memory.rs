use std::collections::HashMap;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, NewUser, StoreError, StoreResult, User};
use async_trait::async_trait;

/// In-memory credential store for tests.
///
/// `create` holds the write lock across its duplicate scan and the insert,
/// so concurrent registrations of the same username resolve exactly like the
/// database-backed store: one winner, one `Conflict`.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag on an existing user. Test support only; the
    /// public trait has no mutation beyond `touch_last_login`.
    #[cfg(test)]
    pub async fn set_active(&self, id: Uuid, is_active: bool) {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.is_active = is_active;
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn exists_username(&self, username: &str) -> StoreResult<bool> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn exists_email(&self, email: &str) -> StoreResult<bool> {
        let folded = email.to_lowercase();
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.email == folded))
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&new_user.username))
        {
            return Err(StoreError::Conflict { field: "username" });
        }
        let email = new_user.email.to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict { field: "email" });
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email,
            password_digest: new_user.password_digest,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            last_login_at: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id) {
            user.last_login_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_digest: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn create_and_find_folds_username_case() {
        let store = MemoryCredentialStore::new();
        let created = store
            .create(new_user("Alice", "alice@example.com"))
            .await
            .expect("create");
        assert_eq!(created.username, "Alice");
        assert!(created.is_active);
        assert!(created.last_login_at.is_none());

        let found = store.find_by_username("ALICE").await.expect("lookup");
        assert_eq!(found.map(|u| u.id), Some(created.id));
        assert!(store.exists_username("aLiCe").await.unwrap());
        assert!(store.exists_email("Alice@Example.com").await.unwrap());
    }

    #[tokio::test]
    async fn create_normalizes_email_to_lowercase() {
        let store = MemoryCredentialStore::new();
        let created = store
            .create(new_user("bob", "Bob@Example.COM"))
            .await
            .expect("create");
        assert_eq!(created.email, "bob@example.com");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_regardless_of_case() {
        let store = MemoryCredentialStore::new();
        store
            .create(new_user("carol", "carol@example.com"))
            .await
            .expect("create");
        let err = store
            .create(new_user("CAROL", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "username" }));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryCredentialStore::new();
        store
            .create(new_user("dave", "dave@example.com"))
            .await
            .expect("create");
        let err = store
            .create(new_user("dave2", "dave@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "email" }));
    }

    #[tokio::test]
    async fn concurrent_registration_race_has_one_winner() {
        let store = Arc::new(MemoryCredentialStore::new());
        let (a, b) = (Arc::clone(&store), Arc::clone(&store));
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.create(new_user("erin", "erin@example.com")).await }),
            tokio::spawn(async move { b.create(new_user("erin", "erin2@example.com")).await }),
        );
        let results = [ra.unwrap(), rb.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict { field: "username" })))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(store.users.read().await.len(), 1);
    }

    #[tokio::test]
    async fn touch_last_login_sets_timestamp() {
        let store = MemoryCredentialStore::new();
        let user = store
            .create(new_user("frank", "frank@example.com"))
            .await
            .expect("create");
        store.touch_last_login(user.id).await.expect("touch");
        let reloaded = store.find_by_id(user.id).await.expect("find").unwrap();
        assert!(reloaded.last_login_at.is_some());
    }
}
