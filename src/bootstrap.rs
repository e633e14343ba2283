use tracing::warn;

use crate::auth::password::hash_password;
use crate::store::{CredentialStore, NewUser, StoreError};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

/// Seed the well-known admin account for fresh demo installs. Returns whether
/// a row was actually inserted.
pub async fn seed_default_admin(store: &dyn CredentialStore) -> anyhow::Result<bool> {
    if store.exists_username(DEFAULT_ADMIN_USERNAME).await? {
        return Ok(false);
    }

    let digest = hash_password(DEFAULT_ADMIN_PASSWORD)?;
    match store
        .create(NewUser {
            username: DEFAULT_ADMIN_USERNAME.into(),
            email: DEFAULT_ADMIN_EMAIL.into(),
            password_digest: digest,
        })
        .await
    {
        Ok(user) => {
            warn!(user_id = %user.id, "seeded default admin account with a well-known password; change it");
            Ok(true)
        }
        // Another instance seeded it between our check and the insert.
        Err(StoreError::Conflict { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
