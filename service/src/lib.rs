use config::{PoolConfig, StorageConfig};
use entity_api::SqlStorage;
use log::info;
use migration::Migrator;
use sea_orm::{ConnectOptions, Database};
use storage::{Error, StorageErrorKind};
use tokio::time::Duration;

pub mod config;
pub mod logging;

/// Connections of an in-memory SQLite store are never recycled; closing the last one would
/// discard the database.
const KEEP_ALIVE: Duration = Duration::from_secs(u32::MAX as u64);

/// Builds the sea-orm connection options for `storage`.
pub fn connect_options(storage: &StorageConfig, pool: &PoolConfig) -> Result<ConnectOptions, Error> {
    let mut opt = ConnectOptions::new(storage.url()?);
    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(pool.acquire_timeout)
        .idle_timeout(pool.idle_timeout)
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    match storage {
        StorageConfig::Sqlite(sqlite) if sqlite.is_memory() => {
            // An in-memory database cannot coordinate locks across connections
            opt.max_connections(1)
                .min_connections(1)
                .idle_timeout(KEEP_ALIVE)
                .max_lifetime(KEEP_ALIVE);
        }
        StorageConfig::Postgres(postgres) => {
            if let Some(timeout) = postgres.connection_timeout() {
                opt.connect_timeout(timeout);
            }
        }
        StorageConfig::Sqlite(_) => {}
    }

    Ok(opt)
}

/// Connects to the configured backend and brings its schema up to date.
///
/// A storage is only returned once every pending migration has been applied.
pub async fn open_storage(storage: &StorageConfig, pool: &PoolConfig) -> Result<SqlStorage, Error> {
    let opt = connect_options(storage, pool)?;
    info!(
        "Opening {} storage: max_connections={}, min_connections={}, acquire_timeout={}s, idle_timeout={}s",
        storage.backend(),
        opt.get_max_connections().unwrap_or(pool.max_connections),
        opt.get_min_connections().unwrap_or(pool.min_connections),
        pool.acquire_timeout.as_secs(),
        pool.idle_timeout.as_secs(),
    );

    let db = Database::connect(opt).await.map_err(|e| {
        Error::with_source(
            StorageErrorKind::Connection(format!("connect to {} storage", storage.backend())),
            e,
        )
    })?;

    let applied = Migrator::up(&db).await.map_err(|e| {
        Error::with_source(
            StorageErrorKind::Migration("failed to perform migrations".to_string()),
            e,
        )
    })?;
    info!(
        "Storage schema is up to date ({applied} migration(s) applied, version {})",
        Migrator::migrations().len()
    );

    Ok(SqlStorage::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Postgres, Sqlite, SQLITE_MEMORY};
    use storage::Storage;

    fn memory() -> StorageConfig {
        StorageConfig::Sqlite(Sqlite {
            file: SQLITE_MEMORY.to_string(),
        })
    }

    #[test]
    fn in_memory_sqlite_is_capped_at_one_connection() {
        let pool = PoolConfig {
            max_connections: 20,
            min_connections: 5,
            ..PoolConfig::default()
        };
        let opt = connect_options(&memory(), &pool).unwrap();
        assert_eq!(opt.get_max_connections(), Some(1));
        assert_eq!(opt.get_min_connections(), Some(1));
        assert_eq!(opt.get_max_lifetime(), Some(KEEP_ALIVE));
    }

    #[test]
    fn file_sqlite_uses_the_configured_pool() {
        let storage = StorageConfig::Sqlite(Sqlite {
            file: "dex.db".to_string(),
        });
        let opt = connect_options(&storage, &PoolConfig::default()).unwrap();
        assert_eq!(opt.get_max_connections(), Some(10));
        assert_eq!(opt.get_url(), "sqlite://dex.db?mode=rwc");
    }

    #[test]
    fn postgres_connection_timeout_is_applied() {
        let storage = StorageConfig::Postgres(Postgres {
            database: "dex".to_string(),
            connection_timeout_secs: Some(3),
            ..Postgres::default()
        });
        let opt = connect_options(&storage, &PoolConfig::default()).unwrap();
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn invalid_backend_config_fails_before_connecting() {
        let storage = StorageConfig::Postgres(Postgres::default());
        let err = connect_options(&storage, &PoolConfig::default()).unwrap_err();
        assert!(matches!(err.error_kind, StorageErrorKind::Config(_)));
    }

    #[tokio::test]
    async fn open_storage_returns_a_migrated_backend() {
        let storage = open_storage(&memory(), &PoolConfig::default())
            .await
            .unwrap();

        assert!(storage.list_clients().await.unwrap().is_empty());
        assert_eq!(
            Migrator::current_version(storage.db_conn_ref())
                .await
                .unwrap(),
            Migrator::migrations().len() as i64
        );
    }

    #[tokio::test]
    async fn sqlite_file_name_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id%41p a?b.db");
        let storage = StorageConfig::Sqlite(Sqlite {
            file: path.to_string_lossy().into_owned(),
        });

        let storage = open_storage(&storage, &PoolConfig::default())
            .await
            .unwrap();
        assert!(storage.list_clients().await.unwrap().is_empty());

        assert!(path.exists());
        assert!(!dir.path().join("idAp a?b.db").exists());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connection_error() {
        let storage = StorageConfig::Sqlite(Sqlite {
            file: "/nonexistent-directory/dex.db".to_string(),
        });
        let pool = PoolConfig {
            acquire_timeout: Duration::from_secs(1),
            ..PoolConfig::default()
        };
        let err = open_storage(&storage, &pool).await.unwrap_err();
        assert!(matches!(err.error_kind, StorageErrorKind::Connection(_)));
    }
}
