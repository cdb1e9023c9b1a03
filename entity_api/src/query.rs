//! Statements shared by every entity table, keyed on the text primary key.
use crate::error::DbResultExt;
use log::debug;
use sea_orm::{ConnectionTrait, DatabaseTransaction, EntityTrait, PrimaryKeyTrait, QuerySelect};
use storage::Error;

/// Selects a single row by identifier. A missing row is [`Error::not_found`].
pub(crate) async fn find_by_id<E, C>(db: &C, id: &str) -> Result<E::Model, Error>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    let entity = E::default();
    E::find_by_id(id.to_owned())
        .one(db)
        .await
        .read_context(&format!("select {}", entity.table_name()))?
        .ok_or_else(Error::not_found)
}

/// Like [`find_by_id`], but the row stays locked against concurrent writers until `txn` ends.
///
/// Backends without row locks (SQLite) rely on the transaction's own isolation instead.
pub(crate) async fn find_by_id_for_update<E>(
    txn: &DatabaseTransaction,
    id: &str,
) -> Result<E::Model, Error>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    let entity = E::default();
    E::find_by_id(id.to_owned())
        .lock_exclusive()
        .one(txn)
        .await
        .read_context(&format!("select {} for update", entity.table_name()))?
        .ok_or_else(Error::not_found)
}

/// Every row of a table, in whatever order the backend returns them.
pub(crate) async fn find_all<E, C>(db: &C) -> Result<Vec<E::Model>, Error>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let entity = E::default();
    E::find()
        .all(db)
        .await
        .read_context(&format!("select {}", entity.table_name()))
}

/// Deletes a row by identifier. Zero affected rows is [`Error::not_found`].
pub(crate) async fn delete_by_id<E, C>(db: &C, id: &str) -> Result<(), Error>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    let entity = E::default();
    debug!("Deleting {} {id}", entity.table_name());

    let result = E::delete_by_id(id.to_owned())
        .exec(db)
        .await
        .write_context(&format!("delete {}", entity.table_name()))?;

    if result.rows_affected == 0 {
        return Err(Error::not_found());
    }
    Ok(())
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use entity::clients;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr};
    use storage::StorageErrorKind;

    #[tokio::test]
    async fn delete_by_id_reports_missing_rows_as_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = delete_by_id::<clients::Entity, _>(&db, "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_by_id_succeeds_when_a_row_is_removed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        assert!(delete_by_id::<clients::Entity, _>(&db, "c1").await.is_ok());
    }

    #[tokio::test]
    async fn find_by_id_reports_empty_result_as_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<clients::Model>::new()])
            .into_connection();

        let err = find_by_id::<clients::Entity, _>(&db, "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn find_all_wraps_query_failures() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Query(RuntimeErr::Internal(
                "relation \"client\" does not exist".to_string(),
            ))])
            .into_connection();

        let err = find_all::<clients::Entity, _>(&db).await.unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Query("select client".to_string())
        );
    }
}
