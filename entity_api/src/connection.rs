//! Unit-of-work helper over the connection abstraction.
//!
//! Every repository function takes `&impl ConnectionTrait`, which both the pooled
//! `DatabaseConnection` and an open `DatabaseTransaction` implement, so the same statements
//! run either directly against the pool or inside a transaction.
use crate::error::DbResultExt;
use log::warn;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use storage::Error;

pub(crate) type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'c>>;

/// Runs `unit` inside a new transaction.
///
/// Commits when `unit` succeeds. Otherwise rolls back and returns `unit`'s error unchanged; a
/// rollback failure is only logged. If the future is dropped or panics midway the transaction
/// is rolled back when it goes out of scope.
pub(crate) async fn exec_tx<T, F>(db: &DatabaseConnection, unit: F) -> Result<T, Error>
where
    T: Send,
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
{
    let txn = db.begin().await.write_context("begin transaction")?;

    match unit(&txn).await {
        Ok(value) => {
            txn.commit().await.write_context("commit transaction")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!("Failed to roll back transaction after \"{err}\": {rollback_err}");
            }
            Err(err)
        }
    }
}
