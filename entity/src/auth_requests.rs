use crate::Id;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Id,
    pub client_id: String,
    pub response_types: Vec<u8>,
    pub scopes: Vec<u8>,
    pub redirect_uri: String,
    pub nonce: String,
    pub state: String,
    pub force_approval_prompt: bool,
    pub logged_in: bool,
    pub claims_user_id: String,
    pub claims_username: String,
    pub claims_email: String,
    pub claims_email_verified: bool,
    pub connector_id: String,
    pub connector_data: Vec<u8>,
    pub expiry: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
