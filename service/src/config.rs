use clap::builder::TypedValueParser as _;
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use log::LevelFilter;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use storage::{Error, StorageErrorKind};
use url::Url;

/// The SQLite file name that selects an ephemeral, in-memory store.
pub const SQLITE_MEMORY: &str = ":memory:";

const DEFAULT_POSTGRES_HOST: &str = "localhost";

/// Bytes of a file path the SQLite driver would otherwise read as URL syntax. It
/// percent-decodes the path before opening it.
const SQLITE_PATH: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'?').add(b'#');

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Sqlite,
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Which relational backend to store identity data in
    #[arg(long, env, value_enum, default_value_t = StorageBackend::Sqlite)]
    pub storage_backend: StorageBackend,

    /// Path of the SQLite database file. `:memory:` keeps everything in memory and is only
    /// suitable for tests and ephemeral deployments.
    #[arg(long, env, default_value = SQLITE_MEMORY)]
    sqlite_file: String,

    /// Name of the PostgreSQL database
    #[arg(long, env, default_value = "dex")]
    postgres_database: String,

    /// PostgreSQL user to connect as
    #[arg(long, env, default_value = "postgres")]
    postgres_user: String,

    /// Password of the PostgreSQL user
    #[arg(long, env)]
    postgres_password: Option<String>,

    /// PostgreSQL server, as `host` or `host:port`
    #[arg(long, env, default_value = DEFAULT_POSTGRES_HOST)]
    postgres_host: String,

    /// CA certificate used to verify the server. Enables full certificate verification.
    #[arg(long, env)]
    postgres_ssl_ca_file: Option<String>,

    /// Client certificate for mutual TLS
    #[arg(long, env)]
    postgres_ssl_cert_file: Option<String>,

    /// Private key of the client certificate
    #[arg(long, env)]
    postgres_ssl_key_file: Option<String>,

    /// Timeout in seconds for establishing a new PostgreSQL connection
    #[arg(long, env)]
    postgres_connection_timeout_secs: Option<u64>,

    /// Maximum number of database connections in the pool
    #[arg(long, env, default_value_t = 10)]
    pub db_max_connections: u32,

    /// Minimum number of idle database connections to maintain
    #[arg(long, env, default_value_t = 1)]
    pub db_min_connections: u32,

    /// Timeout in seconds for acquiring a connection from the pool
    #[arg(long, env, default_value_t = 8)]
    pub db_acquire_timeout_secs: u64,

    /// Seconds before an idle connection is closed
    #[arg(long, env, default_value_t = 600)]
    pub db_idle_timeout_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// The configuration of the selected backend.
    pub fn storage(&self) -> StorageConfig {
        match self.storage_backend {
            StorageBackend::Sqlite => StorageConfig::Sqlite(Sqlite {
                file: self.sqlite_file.clone(),
            }),
            StorageBackend::Postgres => StorageConfig::Postgres(Postgres {
                database: self.postgres_database.clone(),
                user: self.postgres_user.clone(),
                password: self.postgres_password.clone().unwrap_or_default(),
                host: self.postgres_host.clone(),
                ssl_ca_file: self.postgres_ssl_ca_file.clone(),
                ssl_cert_file: self.postgres_ssl_cert_file.clone(),
                ssl_key_file: self.postgres_ssl_key_file.clone(),
                connection_timeout_secs: self.postgres_connection_timeout_secs,
            }),
        }
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.db_max_connections,
            min_connections: self.db_min_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
            idle_timeout: Duration::from_secs(self.db_idle_timeout_secs),
        }
    }
}

/// Options of one backend kind.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum StorageConfig {
    Sqlite(Sqlite),
    Postgres(Postgres),
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        match self {
            StorageConfig::Sqlite(_) => StorageBackend::Sqlite,
            StorageConfig::Postgres(_) => StorageBackend::Postgres,
        }
    }

    /// The connection URL handed to sea-orm.
    pub fn url(&self) -> Result<String, Error> {
        match self {
            StorageConfig::Sqlite(sqlite) => Ok(sqlite.url()),
            StorageConfig::Postgres(postgres) => postgres.url(),
        }
    }
}

/// A file-backed SQLite store.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Sqlite {
    pub file: String,
}

impl Sqlite {
    /// An in-memory store lives and dies with its single connection.
    pub fn is_memory(&self) -> bool {
        self.file == SQLITE_MEMORY
    }

    pub fn url(&self) -> String {
        if self.is_memory() {
            "sqlite::memory:".to_string()
        } else {
            // mode=rwc creates the file on first open
            format!(
                "sqlite://{}?mode=rwc",
                utf8_percent_encode(&self.file, SQLITE_PATH)
            )
        }
    }
}

/// A PostgreSQL server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Postgres {
    pub database: String,
    pub user: String,
    pub password: String,
    /// `host` or `host:port`. IPv6 addresses must be bracketed.
    pub host: String,

    pub ssl_ca_file: Option<String>,
    pub ssl_cert_file: Option<String>,
    pub ssl_key_file: Option<String>,

    pub connection_timeout_secs: Option<u64>,
}

impl Postgres {
    pub fn url(&self) -> Result<String, Error> {
        if self.database.is_empty() {
            return Err(config_error("postgres database name is required"));
        }
        let (host, port) = self.host_and_port()?;

        let mut url = Url::parse("postgres://localhost")
            .map_err(|e| Error::with_source(config_kind("postgres url"), e))?;
        url.set_host(Some(host))
            .map_err(|e| Error::with_source(config_kind("postgres host"), e))?;
        url.set_port(port)
            .map_err(|_| config_error("postgres port"))?;
        if !self.user.is_empty() {
            url.set_username(&self.user)
                .map_err(|_| config_error("postgres user"))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| config_error("postgres password"))?;
        }
        url.set_path(&self.database);

        {
            let mut query = url.query_pairs_mut();
            match &self.ssl_ca_file {
                Some(ca_file) => {
                    query.append_pair("sslmode", "verify-full");
                    query.append_pair("sslrootcert", ca_file);
                }
                None => {
                    query.append_pair("sslmode", "prefer");
                }
            }
            if let Some(cert_file) = &self.ssl_cert_file {
                query.append_pair("sslcert", cert_file);
            }
            if let Some(key_file) = &self.ssl_key_file {
                query.append_pair("sslkey", key_file);
            }
        }

        Ok(url.into())
    }

    pub fn connection_timeout(&self) -> Option<Duration> {
        self.connection_timeout_secs.map(Duration::from_secs)
    }

    fn host_and_port(&self) -> Result<(&str, Option<u16>), Error> {
        let host = if self.host.is_empty() {
            DEFAULT_POSTGRES_HOST
        } else {
            self.host.as_str()
        };

        match host.rsplit_once(':') {
            // "[::1]" splits inside the brackets and has no port
            Some((_, port)) if port.ends_with(']') => Ok((host, None)),
            Some((name, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| Error::with_source(config_kind("postgres port"), e))?;
                Ok((name, Some(port)))
            }
            None => Ok((host, None)),
        }
    }
}

/// Connection pool sizing, shared by every backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(8),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

fn config_kind(context: &str) -> StorageErrorKind {
    StorageErrorKind::Config(context.to_string())
}

fn config_error(context: &str) -> Error {
    Error::new(config_kind(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres() -> Postgres {
        Postgres {
            database: "dex".to_string(),
            user: "dex".to_string(),
            password: "s3cr3t".to_string(),
            host: "db.example.com:5433".to_string(),
            ..Postgres::default()
        }
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn sqlite_memory_url() {
        let sqlite = Sqlite {
            file: SQLITE_MEMORY.to_string(),
        };
        assert!(sqlite.is_memory());
        assert_eq!(sqlite.url(), "sqlite::memory:");
    }

    #[test]
    fn sqlite_file_url_creates_missing_files() {
        let sqlite = Sqlite {
            file: "/var/lib/dex/dex.db".to_string(),
        };
        assert!(!sqlite.is_memory());
        assert_eq!(sqlite.url(), "sqlite:///var/lib/dex/dex.db?mode=rwc");
    }

    #[test]
    fn sqlite_file_url_escapes_url_syntax_in_the_path() {
        let sqlite = Sqlite {
            file: "/tmp/id%41p dir/a?b#c.db".to_string(),
        };
        assert_eq!(
            sqlite.url(),
            "sqlite:///tmp/id%2541p%20dir/a%3Fb%23c.db?mode=rwc"
        );
    }

    #[test]
    fn postgres_url_without_tls_material_prefers_ssl() {
        let url = Url::parse(&postgres().url().unwrap()).unwrap();
        assert_eq!(url.scheme(), "postgres");
        assert_eq!(url.username(), "dex");
        assert_eq!(url.password(), Some("s3cr3t"));
        assert_eq!(url.host_str(), Some("db.example.com"));
        assert_eq!(url.port(), Some(5433));
        assert_eq!(url.path(), "/dex");
        assert_eq!(
            query_pairs(&url),
            vec![("sslmode".to_string(), "prefer".to_string())]
        );
    }

    #[test]
    fn postgres_url_with_ca_file_verifies_the_server() {
        let config = Postgres {
            ssl_ca_file: Some("/etc/dex/ca.pem".to_string()),
            ssl_cert_file: Some("/etc/dex/client.pem".to_string()),
            ssl_key_file: Some("/etc/dex/client.key".to_string()),
            ..postgres()
        };
        let url = Url::parse(&config.url().unwrap()).unwrap();
        assert_eq!(
            query_pairs(&url),
            vec![
                ("sslmode".to_string(), "verify-full".to_string()),
                ("sslrootcert".to_string(), "/etc/dex/ca.pem".to_string()),
                ("sslcert".to_string(), "/etc/dex/client.pem".to_string()),
                ("sslkey".to_string(), "/etc/dex/client.key".to_string()),
            ]
        );
    }

    #[test]
    fn postgres_credentials_are_percent_encoded() {
        let config = Postgres {
            password: "p@ss word/:".to_string(),
            ..postgres()
        };
        let raw = config.url().unwrap();
        assert!(!raw.contains("p@ss"));
        let url = Url::parse(&raw).unwrap();
        assert_eq!(url.host_str(), Some("db.example.com"));
        assert_eq!(url.password(), Some("p%40ss%20word%2F%3A"));
    }

    #[test]
    fn postgres_host_defaults_to_localhost_without_port() {
        let config = Postgres {
            host: String::new(),
            ..postgres()
        };
        let url = Url::parse(&config.url().unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), None);
    }

    #[test]
    fn postgres_ipv6_host_keeps_its_brackets() {
        let config = Postgres {
            host: "[::1]:5432".to_string(),
            ..postgres()
        };
        let url = Url::parse(&config.url().unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
        assert_eq!(url.port(), Some(5432));
    }

    #[test]
    fn postgres_invalid_port_is_a_config_error() {
        let config = Postgres {
            host: "db.example.com:http".to_string(),
            ..postgres()
        };
        let err = config.url().unwrap_err();
        assert_eq!(
            err.error_kind,
            StorageErrorKind::Config("postgres port".to_string())
        );
    }

    #[test]
    fn postgres_requires_a_database_name() {
        let config = Postgres {
            database: String::new(),
            ..postgres()
        };
        assert!(matches!(
            config.url().unwrap_err().error_kind,
            StorageErrorKind::Config(_)
        ));
    }

    #[test]
    fn storage_config_deserializes_from_a_config_file() {
        let config: StorageConfig = serde_json::from_str(
            r#"{"type": "postgres", "config": {"database": "dex", "host": "db:5432", "connection_timeout_secs": 5}}"#,
        )
        .unwrap();
        let StorageConfig::Postgres(postgres) = config else {
            panic!("expected a postgres config");
        };
        assert_eq!(postgres.database, "dex");
        assert_eq!(postgres.connection_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(postgres.ssl_ca_file, None);

        let config: StorageConfig =
            serde_json::from_str(r#"{"type": "sqlite", "config": {"file": ":memory:"}}"#).unwrap();
        assert_eq!(config.backend(), StorageBackend::Sqlite);
    }

    #[test]
    fn cli_flags_select_the_backend() {
        let config = Config::try_parse_from([
            "migrate_db",
            "--storage-backend",
            "postgres",
            "--postgres-database",
            "identity",
            "--postgres-host",
            "db:6543",
            "--postgres-connection-timeout-secs",
            "3",
            "--db-max-connections",
            "4",
        ])
        .unwrap();

        let StorageConfig::Postgres(postgres) = config.storage() else {
            panic!("expected a postgres config");
        };
        assert_eq!(postgres.database, "identity");
        assert_eq!(postgres.host, "db:6543");
        assert_eq!(postgres.connection_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.pool().max_connections, 4);
    }

    #[test]
    fn cli_defaults_to_in_memory_sqlite() {
        let config = Config::try_parse_from(["migrate_db"]).unwrap();
        assert_eq!(
            config.storage(),
            StorageConfig::Sqlite(Sqlite {
                file: SQLITE_MEMORY.to_string()
            })
        );
        assert_eq!(config.log_level_filter, LevelFilter::Info);
    }
}
