use super::codec::{decode, encode};
use super::error::DbResultExt;
use super::mutate::Mutable;
use super::query;
use async_trait::async_trait;
use entity::clients::{ActiveModel, Column, Entity, Model};
use log::debug;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{NotSet, Set},
    DatabaseTransaction,
};
use storage::{Client, Error};

pub async fn create(db: &impl ConnectionTrait, client: Client) -> Result<(), Error> {
    debug!("Creating client {} ({})", client.id, client.name);

    Entity::insert(into_active_model(&client)?)
        .exec_without_returning(db)
        .await
        .write_context("insert client")?;
    Ok(())
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: &str) -> Result<Client, Error> {
    from_model(query::find_by_id::<Entity, _>(db, id).await?)
}

pub async fn find_all(db: &impl ConnectionTrait) -> Result<Vec<Client>, Error> {
    query::find_all::<Entity, _>(db)
        .await?
        .into_iter()
        .map(from_model)
        .collect()
}

pub async fn delete(db: &impl ConnectionTrait, id: &str) -> Result<(), Error> {
    query::delete_by_id::<Entity, _>(db, id).await
}

#[async_trait]
impl Mutable for Client {
    const TABLE: &'static str = "client";

    async fn fetch_for_update(txn: &DatabaseTransaction, id: &str) -> Result<Self, Error> {
        from_model(query::find_by_id_for_update::<Entity>(txn, id).await?)
    }

    async fn replace(txn: &DatabaseTransaction, id: &str, value: Self) -> Result<(), Error> {
        let mut active_model = into_active_model(&value)?;
        active_model.id = NotSet;

        Entity::update_many()
            .set(active_model)
            .filter(Column::Id.eq(id))
            .exec(txn)
            .await
            .write_context("update client")?;
        Ok(())
    }
}

fn into_active_model(client: &Client) -> Result<ActiveModel, Error> {
    Ok(ActiveModel {
        id: Set(client.id.clone()),
        secret: Set(client.secret.clone()),
        redirect_uris: Set(encode(&client.redirect_uris, "client.redirect_uris")?),
        trusted_peers: Set(encode(&client.trusted_peers, "client.trusted_peers")?),
        public: Set(client.public),
        name: Set(client.name.clone()),
        logo_url: Set(client.logo_url.clone()),
    })
}

fn from_model(model: Model) -> Result<Client, Error> {
    Ok(Client {
        redirect_uris: decode(&model.redirect_uris, "client.redirect_uris")?,
        trusted_peers: decode(&model.trusted_peers, "client.trusted_peers")?,
        id: model.id,
        secret: model.secret,
        public: model.public,
        name: model.name,
        logo_url: model.logo_url,
    })
}
