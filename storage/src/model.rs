//! Entities persisted by a [`crate::Storage`] backend.
//!
//! All entities are plain values. Mutation is always "fetch the current value, produce a new
//! one, replace"; relationships between entities are by identifier only.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity claims resolved by a connector once the user has authenticated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub email_verified: bool,
}

/// One in-flight authorization transaction.
///
/// `claims`, `connector_id` and `connector_data` stay empty until the user authenticates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthRequest {
    pub id: String,
    pub client_id: String,
    pub response_types: Vec<String>,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub nonce: String,
    pub state: String,
    pub force_approval_prompt: bool,
    pub logged_in: bool,
    pub claims: Claims,
    pub connector_id: String,
    pub connector_data: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

/// A one-time code exchanged for tokens. Deleting it after the exchange is the caller's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthCode {
    pub id: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub nonce: String,
    pub claims: Claims,
    pub connector_id: String,
    pub connector_data: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

/// A long-lived refresh token. There is no expiry; revocation is deletion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshToken {
    /// The token value itself, which doubles as its identifier.
    pub id: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub nonce: String,
    pub claims: Claims,
    pub connector_id: String,
    pub connector_data: Vec<u8>,
}

/// An OAuth client registration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub secret: String,
    pub redirect_uris: Vec<String>,
    /// Clients allowed to mint tokens on behalf of this one.
    pub trusted_peers: Vec<String>,
    /// Public clients cannot keep a secret.
    pub public: bool,
    pub name: String,
    pub logo_url: String,
}

/// Key material in JSON Web Key form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(rename = "kid")]
    pub key_id: String,
    #[serde(rename = "alg")]
    pub algorithm: String,
    #[serde(rename = "use")]
    pub key_use: String,
    /// DER encoded key.
    pub key: Vec<u8>,
}

/// A public key kept around after rotation so that tokens it signed still verify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub public_key: JsonWebKey,
    pub expiry: DateTime<Utc>,
}

/// The process-wide signing and verification keys. Exactly one of these is ever stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keys {
    pub signing_key: Option<JsonWebKey>,
    pub signing_key_pub: Option<JsonWebKey>,
    pub verification_keys: Vec<VerificationKey>,
    pub next_rotation: DateTime<Utc>,
}
