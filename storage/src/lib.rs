//! The storage contract of the identity provider.
//!
//! Protocol handlers, connectors and administrative tooling only ever see the [`Storage`]
//! trait and the entities in [`model`]. Concrete backends live in other crates and must pass
//! the `conformance` suite unmodified.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

pub mod error;
pub mod model;

pub use error::{Error, StorageErrorKind};
pub use model::{
    AuthCode, AuthRequest, Claims, Client, JsonWebKey, Keys, RefreshToken, VerificationKey,
};

/// A pure function from the current value of an entity to its replacement.
///
/// Returning an error aborts the surrounding update, and the error is handed back to the
/// caller of the update unchanged. This is how conditional updates are expressed.
pub type Updater<T> = Box<dyn FnOnce(T) -> Result<T, Error> + Send>;

/// Generates a fresh random identifier suitable for any entity.
pub fn new_id() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Every operation the identity service may perform against persisted state.
///
/// All `get_*`, `update_*` and `delete_*` operations report a missing identifier as
/// [`Error::not_found`]. Implementations must be safe to call concurrently.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_auth_request(&self, auth_request: AuthRequest) -> Result<(), Error>;
    async fn create_auth_code(&self, auth_code: AuthCode) -> Result<(), Error>;
    async fn create_refresh(&self, refresh_token: RefreshToken) -> Result<(), Error>;
    async fn create_client(&self, client: Client) -> Result<(), Error>;

    async fn get_auth_request(&self, id: &str) -> Result<AuthRequest, Error>;
    async fn get_auth_code(&self, id: &str) -> Result<AuthCode, Error>;
    async fn get_refresh(&self, id: &str) -> Result<RefreshToken, Error>;
    async fn get_client(&self, id: &str) -> Result<Client, Error>;
    async fn get_keys(&self) -> Result<Keys, Error>;

    /// Order is whatever the backend returns. No rows is an empty `Vec`, not an error.
    async fn list_clients(&self) -> Result<Vec<Client>, Error>;
    async fn list_refresh_tokens(&self) -> Result<Vec<RefreshToken>, Error>;

    async fn delete_auth_request(&self, id: &str) -> Result<(), Error>;
    async fn delete_auth_code(&self, id: &str) -> Result<(), Error>;
    async fn delete_client(&self, id: &str) -> Result<(), Error>;
    async fn delete_refresh(&self, id: &str) -> Result<(), Error>;

    /// Atomically replaces an auth request with the updater's result.
    async fn update_auth_request(
        &self,
        id: &str,
        updater: Updater<AuthRequest>,
    ) -> Result<(), Error>;

    /// Atomically replaces a client with the updater's result.
    async fn update_client(&self, id: &str, updater: Updater<Client>) -> Result<(), Error>;

    /// Atomically replaces the keys. The first call receives `Keys::default()`.
    async fn update_keys(&self, updater: Updater<Keys>) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_id_is_url_safe_and_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert_eq!(id.len(), 22);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn jwk_serializes_with_standard_member_names() {
        let key = JsonWebKey {
            key_id: "k1".to_string(),
            algorithm: "RS256".to_string(),
            key_use: "sig".to_string(),
            key: vec![1, 2, 3],
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["kid"], "k1");
        assert_eq!(json["alg"], "RS256");
        assert_eq!(json["use"], "sig");
    }
}
