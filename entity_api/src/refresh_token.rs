use super::codec::{decode, encode};
use super::error::DbResultExt;
use super::query;
use entity::refresh_tokens::{ActiveModel, Entity, Model};
use log::debug;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use storage::{Claims, Error, RefreshToken};

pub async fn create(db: &impl ConnectionTrait, refresh_token: RefreshToken) -> Result<(), Error> {
    debug!(
        "Creating refresh token for client_id: {}, user_id: {}",
        refresh_token.client_id, refresh_token.claims.user_id
    );

    Entity::insert(into_active_model(&refresh_token)?)
        .exec_without_returning(db)
        .await
        .write_context("insert refresh_token")?;
    Ok(())
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: &str) -> Result<RefreshToken, Error> {
    from_model(query::find_by_id::<Entity, _>(db, id).await?)
}

pub async fn find_all(db: &impl ConnectionTrait) -> Result<Vec<RefreshToken>, Error> {
    query::find_all::<Entity, _>(db)
        .await?
        .into_iter()
        .map(from_model)
        .collect()
}

pub async fn delete(db: &impl ConnectionTrait, id: &str) -> Result<(), Error> {
    query::delete_by_id::<Entity, _>(db, id).await
}

fn into_active_model(refresh_token: &RefreshToken) -> Result<ActiveModel, Error> {
    Ok(ActiveModel {
        id: Set(refresh_token.id.clone()),
        client_id: Set(refresh_token.client_id.clone()),
        scopes: Set(encode(&refresh_token.scopes, "refresh_token.scopes")?),
        nonce: Set(refresh_token.nonce.clone()),
        claims_user_id: Set(refresh_token.claims.user_id.clone()),
        claims_username: Set(refresh_token.claims.username.clone()),
        claims_email: Set(refresh_token.claims.email.clone()),
        claims_email_verified: Set(refresh_token.claims.email_verified),
        connector_id: Set(refresh_token.connector_id.clone()),
        connector_data: Set(refresh_token.connector_data.clone()),
    })
}

fn from_model(model: Model) -> Result<RefreshToken, Error> {
    Ok(RefreshToken {
        scopes: decode(&model.scopes, "refresh_token.scopes")?,
        id: model.id,
        client_id: model.client_id,
        nonce: model.nonce,
        claims: Claims {
            user_id: model.claims_user_id,
            username: model.claims_username,
            email: model.claims_email,
            email_verified: model.claims_email_verified,
        },
        connector_id: model.connector_id,
        connector_data: model.connector_data,
    })
}
