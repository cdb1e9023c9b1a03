use super::codec::{decode, encode};
use super::error::DbResultExt;
use super::mutate::Mutable;
use super::query;
use async_trait::async_trait;
use entity::auth_requests::{ActiveModel, Column, Entity, Model};
use log::debug;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{NotSet, Set},
    DatabaseTransaction,
};
use storage::{AuthRequest, Claims, Error};

pub async fn create(db: &impl ConnectionTrait, auth_request: AuthRequest) -> Result<(), Error> {
    debug!(
        "Creating auth request {} for client_id: {}",
        auth_request.id, auth_request.client_id
    );

    Entity::insert(into_active_model(&auth_request)?)
        .exec_without_returning(db)
        .await
        .write_context("insert auth_request")?;
    Ok(())
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: &str) -> Result<AuthRequest, Error> {
    from_model(query::find_by_id::<Entity, _>(db, id).await?)
}

pub async fn delete(db: &impl ConnectionTrait, id: &str) -> Result<(), Error> {
    query::delete_by_id::<Entity, _>(db, id).await
}

#[async_trait]
impl Mutable for AuthRequest {
    const TABLE: &'static str = "auth_request";

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
            .write_context("update auth_request")?;
        Ok(())
    }
}

fn into_active_model(auth_request: &AuthRequest) -> Result<ActiveModel, Error> {
    Ok(ActiveModel {
        id: Set(auth_request.id.clone()),
        client_id: Set(auth_request.client_id.clone()),
        response_types: Set(encode(
            &auth_request.response_types,
            "auth_request.response_types",
        )?),
        scopes: Set(encode(&auth_request.scopes, "auth_request.scopes")?),
        redirect_uri: Set(auth_request.redirect_uri.clone()),
        nonce: Set(auth_request.nonce.clone()),
        state: Set(auth_request.state.clone()),
        force_approval_prompt: Set(auth_request.force_approval_prompt),
        logged_in: Set(auth_request.logged_in),
        claims_user_id: Set(auth_request.claims.user_id.clone()),
        claims_username: Set(auth_request.claims.username.clone()),
        claims_email: Set(auth_request.claims.email.clone()),
        claims_email_verified: Set(auth_request.claims.email_verified),
        connector_id: Set(auth_request.connector_id.clone()),
        connector_data: Set(auth_request.connector_data.clone()),
        expiry: Set(auth_request.expiry),
    })
}

fn from_model(model: Model) -> Result<AuthRequest, Error> {
    Ok(AuthRequest {
        response_types: decode(&model.response_types, "auth_request.response_types")?,
        scopes: decode(&model.scopes, "auth_request.scopes")?,
        id: model.id,
        client_id: model.client_id,
        redirect_uri: model.redirect_uri,
        nonce: model.nonce,
        state: model.state,
        force_approval_prompt: model.force_approval_prompt,
        logged_in: model.logged_in,
        claims: Claims {
            user_id: model.claims_user_id,
            username: model.claims_username,
            email: model.claims_email,
            email_verified: model.claims_email_verified,
        },
        connector_id: model.connector_id,
        connector_data: model.connector_data,
        expiry: model.expiry,
    })
}
