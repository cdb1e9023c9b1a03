use crate::Id;
use sea_orm::entity::prelude::*;

/// Refresh tokens carry no expiry; revocation deletes the row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Id,
    pub client_id: String,
    pub scopes: Vec<u8>,
    pub nonce: String,
    pub claims_user_id: String,
    pub claims_username: String,
    pub claims_email: String,
    pub claims_email_verified: bool,
    pub connector_id: String,
    pub connector_data: Vec<u8>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
