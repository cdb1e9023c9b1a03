//! Translation of sea-orm errors into the storage error taxonomy.
//!
//! Raw `DbErr` values never leave this crate on their own; they are kept as the `source` of a
//! `storage::Error` whose kind names the failing operation.
use sea_orm::error::DbErr;
use storage::{Error, StorageErrorKind};

/// Annotates a failed sea-orm call with the operation it was part of.
pub(crate) trait DbResultExt<T> {
    /// For selects. Failures become `Query`, or `Decode` when a row could not be read.
    fn read_context(self, context: &str) -> Result<T, Error>;
    /// For inserts, updates, deletes and transaction control. Failures become `Write`.
    fn write_context(self, context: &str) -> Result<T, Error>;
}

impl<T> DbResultExt<T> for Result<T, DbErr> {
    fn read_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|err| from_db_err(err, context, false))
    }

    fn write_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|err| from_db_err(err, context, true))
    }
}

pub(crate) fn from_db_err(err: DbErr, context: &str, write: bool) -> Error {
    let context = context.to_string();
    let error_kind = match err {
        DbErr::RecordNotFound(_) => return Error::not_found(),
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StorageErrorKind::Connection(context),
        DbErr::Type(_) | DbErr::Json(_) | DbErr::TryIntoErr { .. } => {
            StorageErrorKind::Decode(context)
        }
        _ if write => StorageErrorKind::Write(context),
        _ => StorageErrorKind::Query(context),
    };
    Error::with_source(error_kind, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnAcquireErr, RuntimeErr};

    fn exec_err() -> DbErr {
        DbErr::Exec(RuntimeErr::Internal("UNIQUE constraint failed".to_string()))
    }

    #[test]
    fn record_not_found_is_normalized_to_the_sentinel() {
        let err = from_db_err(
            DbErr::RecordNotFound("client".to_string()),
            "select client",
            false,
        );
        assert!(err.is_not_found());
        assert!(err.source.is_none());
    }

    #[test]
    fn connection_failures_are_reported_as_connection_errors() {
        let err = Err::<(), _>(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout))
            .write_context("insert client")
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Connection("insert client".to_string())
        );
        assert!(err.source.is_some());
    }

    #[test]
    fn write_failures_keep_their_context() {
        let err = Err::<(), _>(exec_err())
            .write_context("insert client")
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Write("insert client".to_string())
        );
    }

    #[test]
    fn read_failures_are_query_errors() {
        let err = Err::<(), _>(DbErr::Query(RuntimeErr::Internal("boom".to_string())))
            .read_context("select keys")
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Query("select keys".to_string())
        );
    }

    #[test]
    fn type_errors_are_decode_errors() {
        let err = Err::<(), _>(DbErr::Type("expected bool".to_string()))
            .read_context("select auth_code")
            .unwrap_err();
        assert!(err.is_integrity_fault());
    }
}
