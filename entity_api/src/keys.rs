//! The keys singleton. Its single row is created by the first update, never by a create.
use super::codec::{decode, encode};
use super::connection::exec_tx;
use super::error::DbResultExt;
use super::query;
use entity::keys::{ActiveModel, Entity, Model};
use entity::KEYS_ROW_ID;
use log::debug;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DatabaseConnection, DatabaseTransaction};
use storage::{Error, Keys, Updater};

/// Reads the stored keys. `NotFound` until the first [`update`].
pub async fn find(db: &impl ConnectionTrait) -> Result<Keys, Error> {
    from_model(query::find_by_id::<Entity, _>(db, KEYS_ROW_ID).await?)
}

/// Replaces the keys with `updater(current)`, atomically.
///
/// On the very first call there is no row yet; the updater receives `Keys::default()` and its
/// result is inserted. Two racing first calls cannot both insert: the loser fails on the
/// primary key and reports a write error.
pub async fn update(db: &DatabaseConnection, updater: Updater<Keys>) -> Result<(), Error> {
    debug!("Updating keys");

    exec_tx(db, move |txn| {
        Box::pin(async move {
            let existing = find_for_update(txn).await?;
            let first_write = existing.is_none();
            let next = updater(existing.unwrap_or_default())?;
            let active_model = into_active_model(&next)?;

            if first_write {
                Entity::insert(active_model)
                    .exec_without_returning(txn)
                    .await
                    .write_context("insert keys")?;
            } else {
                Entity::update(active_model)
                    .exec(txn)
                    .await
                    .write_context("update keys")?;
            }
            Ok(())
        })
    })
    .await
}

async fn find_for_update(txn: &DatabaseTransaction) -> Result<Option<Keys>, Error> {
    match query::find_by_id_for_update::<Entity>(txn, KEYS_ROW_ID).await {
        Ok(model) => Ok(Some(from_model(model)?)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

fn into_active_model(keys: &Keys) -> Result<ActiveModel, Error> {
    Ok(ActiveModel {
        id: Set(KEYS_ROW_ID.to_string()),
        verification_keys: Set(encode(&keys.verification_keys, "keys.verification_keys")?),
        signing_key: Set(encode(&keys.signing_key, "keys.signing_key")?),
        signing_key_pub: Set(encode(&keys.signing_key_pub, "keys.signing_key_pub")?),
        next_rotation: Set(keys.next_rotation),
    })
}

fn from_model(model: Model) -> Result<Keys, Error> {
    Ok(Keys {
        verification_keys: decode(&model.verification_keys, "keys.verification_keys")?,
        signing_key: decode(&model.signing_key, "keys.signing_key")?,
        signing_key_pub: decode(&model.signing_key_pub, "keys.signing_key_pub")?,
        next_rotation: model.next_rotation,
    })
}
