//! Schema migrations for the identity storage tables.
//!
//! Each step is a sea-orm-migration [`MigrationTrait`]; its version is its 1-based position
//! in [`Migrator::migrations`]. Applied versions are recorded in the `migrations` table.
pub use sea_orm_migration::prelude::*;

use chrono::Utc;
use log::{debug, info, warn};
use sea_orm_migration::sea_orm::{DatabaseConnection, TransactionTrait};

mod m20261001_000001_create_auth_tables;
mod m20261001_000002_create_client_table;
mod m20261001_000003_create_keys_table;

#[derive(DeriveIden)]
enum Migrations {
    Table,
    Num,
    At,
}

pub struct Migrator;

impl Migrator {
    /// The migration ladder. Append only: never reorder or remove an entry.
    pub fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_auth_tables::Migration),
            Box::new(m20261001_000002_create_client_table::Migration),
            Box::new(m20261001_000003_create_keys_table::Migration),
        ]
    }

    /// Brings the schema up to the latest known version and returns how many steps ran.
    ///
    /// Every step runs in its own transaction together with the insert that records it, so a
    /// failing step leaves the schema at the previous version. A database that is already at
    /// or past the latest known version is left untouched.
    pub async fn up(db: &DatabaseConnection) -> Result<usize, DbErr> {
        let backend = db.get_database_backend();

        SchemaManager::new(db)
            .create_table(
                Table::create()
                    .table(Migrations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Migrations::Num).big_integer().not_null())
                    .col(ColumnDef::new(Migrations::At).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        let current = Self::current_version(db).await?;
        let migrations = Self::migrations();
        let latest = migrations.len() as i64;

        if current > latest {
            warn!("Schema is at version {current}, newer than the latest known version {latest}; skipping migrations");
            return Ok(0);
        }

        let mut applied = 0;
        for (num, migration) in (1..).zip(migrations.iter()) {
            if num <= current {
                continue;
            }
            debug!("Applying migration {num} ({})", migration.name());

            let txn = db.begin().await?;
            migration
                .up(&SchemaManager::new(&txn))
                .await
                .map_err(|e| {
                    DbErr::Migration(format!("migration {num} ({}): {e}", migration.name()))
                })?;

            let record = Query::insert()
                .into_table(Migrations::Table)
                .columns([Migrations::Num, Migrations::At])
                .values([num.into(), Utc::now().timestamp().into()])
                .map_err(|e| DbErr::Migration(format!("record migration {num}: {e}")))?
                .to_owned();
            txn.execute(backend.build(&record)).await?;
            txn.commit().await?;

            applied += 1;
        }

        if applied > 0 {
            info!("Applied {applied} migration(s), schema is at version {latest}");
        }
        Ok(applied)
    }

    /// The highest recorded version, or 0 for a database that was never migrated.
    pub async fn current_version<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
        let select = Query::select()
            .expr_as(Func::max(Expr::col(Migrations::Num)), Alias::new("num"))
            .from(Migrations::Table)
            .to_owned();

        let row = db.query_one(db.get_database_backend().build(&select)).await?;
        match row {
            Some(row) => Ok(row.try_get::<Option<i64>>("", "num")?.unwrap_or(0)),
            None => Ok(0),
        }
    }
}
