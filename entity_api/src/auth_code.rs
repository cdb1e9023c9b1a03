use super::codec::{decode, encode};
use super::error::DbResultExt;
use super::query;
use entity::auth_codes::{ActiveModel, Entity, Model};
use log::debug;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use storage::{AuthCode, Claims, Error};

pub async fn create(db: &impl ConnectionTrait, auth_code: AuthCode) -> Result<(), Error> {
    debug!(
        "Creating auth code {} for client_id: {}",
        auth_code.id, auth_code.client_id
    );

    Entity::insert(into_active_model(&auth_code)?)
        .exec_without_returning(db)
        .await
        .write_context("insert auth_code")?;
    Ok(())
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: &str) -> Result<AuthCode, Error> {
    from_model(query::find_by_id::<Entity, _>(db, id).await?)
}

pub async fn delete(db: &impl ConnectionTrait, id: &str) -> Result<(), Error> {
    query::delete_by_id::<Entity, _>(db, id).await
}

fn into_active_model(auth_code: &AuthCode) -> Result<ActiveModel, Error> {
    Ok(ActiveModel {
        id: Set(auth_code.id.clone()),
        client_id: Set(auth_code.client_id.clone()),
        scopes: Set(encode(&auth_code.scopes, "auth_code.scopes")?),
        nonce: Set(auth_code.nonce.clone()),
        claims_user_id: Set(auth_code.claims.user_id.clone()),
        claims_username: Set(auth_code.claims.username.clone()),
        claims_email: Set(auth_code.claims.email.clone()),
        claims_email_verified: Set(auth_code.claims.email_verified),
        connector_id: Set(auth_code.connector_id.clone()),
        connector_data: Set(auth_code.connector_data.clone()),
        expiry: Set(auth_code.expiry),
    })
}

fn from_model(model: Model) -> Result<AuthCode, Error> {
    Ok(AuthCode {
        scopes: decode(&model.scopes, "auth_code.scopes")?,
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
        expiry: model.expiry,
    })
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use storage::StorageErrorKind;

    fn row(scopes: &[u8]) -> Model {
        Model {
            id: "code1".to_string(),
            client_id: "client1".to_string(),
            scopes: scopes.to_vec(),
            nonce: "n".to_string(),
            claims_user_id: "u1".to_string(),
            claims_username: "jane".to_string(),
            claims_email: "jane@example.com".to_string(),
            claims_email_verified: true,
            connector_id: "ldap".to_string(),
            connector_data: vec![],
            expiry: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn find_by_id_decodes_the_stored_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(br#"["openid","email"]"#)]])
            .into_connection();

        let code = find_by_id(&db, "code1").await.unwrap();
        assert_eq!(code.scopes, vec!["openid", "email"]);
        assert_eq!(code.claims.username, "jane");
        assert!(code.claims.email_verified);
    }

    #[tokio::test]
    async fn find_by_id_reports_malformed_scopes_as_decode_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(b"openid email")]])
            .into_connection();

        let err = find_by_id(&db, "code1").await.unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Decode("auth_code.scopes".to_string())
        );
    }
}
