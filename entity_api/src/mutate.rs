//! The transactional read-modify-write primitive behind every `update_*` operation.
use crate::connection::exec_tx;
use async_trait::async_trait;
use log::debug;
use sea_orm::{DatabaseConnection, DatabaseTransaction};
use storage::{Error, Updater};

/// An entity that can be replaced in place under a row lock.
#[async_trait]
pub(crate) trait Mutable: Sized + Send + 'static {
    /// Table name, for logging.
    const TABLE: &'static str;

    /// Reads the current value and locks its row until `txn` ends.
    async fn fetch_for_update(txn: &DatabaseTransaction, id: &str) -> Result<Self, Error>;

    /// Overwrites every column of the row identified by `id` except the identifier itself.
    async fn replace(txn: &DatabaseTransaction, id: &str, value: Self) -> Result<(), Error>;
}

/// Replaces the entity identified by `id` with `updater(current)`, atomically.
///
/// Within one transaction: the current row is locked and read, the updater runs, and its
/// result is written back. A missing row is `NotFound` and the updater is never called. An
/// updater error is returned unchanged and nothing is written. Two concurrent updates of the
/// same row are serialized, so neither one's write is lost.
pub(crate) async fn update<M: Mutable>(
    db: &DatabaseConnection,
    id: &str,
    updater: Updater<M>,
) -> Result<(), Error> {
    debug!("Updating {} {id}", M::TABLE);

    let id = id.to_owned();
    exec_tx(db, move |txn| {
        Box::pin(async move {
            let current = M::fetch_for_update(txn, &id).await?;
            let next = updater(current)?;
            M::replace(txn, &id, next).await
        })
    })
    .await
}
