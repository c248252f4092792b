//! Token persistence gateway.
//!
//! DESIGN
//! ======
//! The session core only needs a tiny async key-value capability
//! (`get_item`/`set_item`/`remove_item`) over two logical keys. Anything that
//! can hold strings across restarts can implement [`TokenStore`]; the crate
//! ships a JSON-file store for the CLI and an in-memory store for tests and
//! throwaway sessions.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

/// Key holding the bearer token issued by `POST /auth/login`.
pub const TOKEN_KEY: &str = "userToken";
/// Key holding the email of the last successful login.
pub const EMAIL_KEY: &str = "userEmail";

/// Errors produced by a [`TokenStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not hold a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Corrupt(String),
}

/// Durable string key-value storage.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key succeeds.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Remove both the token and the email, attempting each even if the first
/// removal fails. Returns the first failure.
///
/// # Errors
///
/// Returns the first storage error encountered.
pub async fn remove_token_and_email(store: &dyn TokenStore) -> Result<(), StorageError> {
    let token = store.remove_item(TOKEN_KEY).await;
    let email = store.remove_item(EMAIL_KEY).await;
    token.and(email)
}
