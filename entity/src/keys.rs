use crate::Id;
use sea_orm::entity::prelude::*;

/// Singleton table: the only row has `id == KEYS_ROW_ID`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Id,
    pub verification_keys: Vec<u8>,
    pub signing_key: Vec<u8>,
    pub signing_key_pub: Vec<u8>,
    pub next_rotation: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
