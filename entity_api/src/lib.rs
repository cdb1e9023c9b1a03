//! Relational implementation of the `storage::Storage` contract on top of sea-orm.
//!
//! One module per table holds that table's statements as free functions taking any
//! `ConnectionTrait`, so they run equally against the pool or inside a transaction. The
//! [`SqlStorage`] handle ties them together behind the contract.
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use storage::{AuthCode, AuthRequest, Client, Error, Keys, RefreshToken, Storage, Updater};

pub use entity::{auth_codes, auth_requests, clients, refresh_tokens, Id};

pub mod auth_code;
pub mod auth_request;
pub mod client;
pub mod keys;
pub mod refresh_token;

pub(crate) mod codec;
pub(crate) mod connection;
pub(crate) mod error;
pub(crate) mod mutate;
pub(crate) mod query;

/// A storage backend over a pooled sea-orm connection. Cheap to clone.
///
/// The schema must already be migrated; see `service::open_storage`.
#[derive(Clone, Debug)]
pub struct SqlStorage {
    database_connection: Arc<DatabaseConnection>,
}

impl SqlStorage {
    pub fn new(database_connection: DatabaseConnection) -> Self {
        Self {
            database_connection: Arc::new(database_connection),
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}

#[async_trait]
impl Storage for SqlStorage {
    async fn create_auth_request(&self, auth_request: AuthRequest) -> Result<(), Error> {
        auth_request::create(self.db_conn_ref(), auth_request).await
    }

    async fn create_auth_code(&self, auth_code: AuthCode) -> Result<(), Error> {
        auth_code::create(self.db_conn_ref(), auth_code).await
    }

    async fn create_refresh(&self, refresh_token: RefreshToken) -> Result<(), Error> {
        refresh_token::create(self.db_conn_ref(), refresh_token).await
    }

    async fn create_client(&self, client: Client) -> Result<(), Error> {
        client::create(self.db_conn_ref(), client).await
    }

    async fn get_auth_request(&self, id: &str) -> Result<AuthRequest, Error> {
        auth_request::find_by_id(self.db_conn_ref(), id).await
    }

    async fn get_auth_code(&self, id: &str) -> Result<AuthCode, Error> {
        auth_code::find_by_id(self.db_conn_ref(), id).await
    }

    async fn get_refresh(&self, id: &str) -> Result<RefreshToken, Error> {
        refresh_token::find_by_id(self.db_conn_ref(), id).await
    }

    async fn get_client(&self, id: &str) -> Result<Client, Error> {
        client::find_by_id(self.db_conn_ref(), id).await
    }

    async fn get_keys(&self) -> Result<Keys, Error> {
        keys::find(self.db_conn_ref()).await
    }

    async fn list_clients(&self) -> Result<Vec<Client>, Error> {
        client::find_all(self.db_conn_ref()).await
    }

    async fn list_refresh_tokens(&self) -> Result<Vec<RefreshToken>, Error> {
        refresh_token::find_all(self.db_conn_ref()).await
    }

    async fn delete_auth_request(&self, id: &str) -> Result<(), Error> {
        auth_request::delete(self.db_conn_ref(), id).await
    }

    async fn delete_auth_code(&self, id: &str) -> Result<(), Error> {
        auth_code::delete(self.db_conn_ref(), id).await
    }

    async fn delete_client(&self, id: &str) -> Result<(), Error> {
        client::delete(self.db_conn_ref(), id).await
    }

    async fn delete_refresh(&self, id: &str) -> Result<(), Error> {
        refresh_token::delete(self.db_conn_ref(), id).await
    }

    async fn update_auth_request(
        &self,
        id: &str,
        updater: Updater<AuthRequest>,
    ) -> Result<(), Error> {
        mutate::update(self.db_conn_ref(), id, updater).await
    }

    async fn update_client(&self, id: &str, updater: Updater<Client>) -> Result<(), Error> {
        mutate::update(self.db_conn_ref(), id, updater).await
    }

    async fn update_keys(&self, updater: Updater<Keys>) -> Result<(), Error> {
        keys::update(self.db_conn_ref(), updater).await
    }
}
