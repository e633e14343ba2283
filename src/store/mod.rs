use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;
mod user;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;
pub use user::{NewUser, User};

/// Errors surfaced by credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique value is already taken. `field` names the offending column.
    #[error("{field} already taken")]
    Conflict { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for user credentials.
///
/// Username lookups fold case; the stored casing is whatever the user
/// registered with. `create` is the authoritative uniqueness check: the
/// earlier form-level lookups are advisory only, and a concurrent insert
/// losing the race gets `StoreError::Conflict`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn exists_username(&self, username: &str) -> StoreResult<bool>;

    async fn exists_email(&self, email: &str) -> StoreResult<bool>;

    /// Insert a new user, re-checking uniqueness atomically with the insert.
    async fn create(&self, new_user: NewUser) -> StoreResult<User>;

    /// Record a successful authentication.
    async fn touch_last_login(&self, id: Uuid) -> StoreResult<()>;
}
