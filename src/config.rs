//! Configuration loaded from `tether.toml`.
//!
//! ```toml
//! dialect = "sqlite"
//!
//! [ledger]
//! table = "deferred_bindings"
//! prefix = ""
//! slave_key = "integer"
//!
//! [session]
//! max_key_length = 255
//! ```
//!
//! Every key is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use tether_core::{Dialect, TetherError};

#[cfg(feature = "rusqlite")]
use crate::ledger::SqliteLedger;
use crate::{
    deferred::ResolveContext,
    ledger::{DEFAULT_TABLE, LedgerTable, SlaveKeyType},
    session::{SessionKey, SessionScope},
};

pub const CONFIG_FILE: &str = "tether.toml";

/// Length of a key minted by [`SessionKey::generate`]; shorter limits would
/// reject generated keys.
const GENERATED_KEY_LEN: usize = 32;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub table: String,
    /// Prefix of every table name on the connection, the ledger included.
    pub prefix: String,
    pub slave_key: SlaveKeyType,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.into(),
            prefix: String::new(),
            slave_key: SlaveKeyType::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub max_key_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_key_length: SessionKey::DEFAULT_MAX_LEN,
        }
    }
}

impl Config {
    /// Load from default config file
    pub fn load() -> Result<Self, Error> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from specific path
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.into())
            } else {
                Error::Io(path.into(), e)
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| Error::Parse(path.into(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Parse(PathBuf::from(CONFIG_FILE), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        let table = self.ledger.table.trim();
        if table.is_empty() || table != self.ledger.table {
            return Err(Error::Invalid(format!(
                "ledger table name {:?} must be a non-empty identifier",
                self.ledger.table
            )));
        }

        if self.session.max_key_length < GENERATED_KEY_LEN {
            return Err(Error::Invalid(format!(
                "session max_key_length {} is below the {GENERATED_KEY_LEN} bytes of a generated key",
                self.session.max_key_length
            )));
        }

        Ok(())
    }

    /// The ledger table with the prefix applied.
    pub fn ledger_table(&self) -> LedgerTable {
        LedgerTable::prefixed(&self.ledger.prefix, &self.ledger.table)
            .with_slave_key(self.ledger.slave_key)
    }

    pub fn session_scope(&self) -> SessionScope {
        SessionScope::new(self.session.max_key_length)
    }

    /// Everything a resolution needs, with the same prefix on the ledger and
    /// on relation tables. The dialect is pinned, so resolving with values of
    /// another database fails.
    pub fn resolve_context(&self) -> ResolveContext {
        ResolveContext::new(self.ledger_table())
            .with_prefix(self.ledger.prefix.clone())
            .with_session_scope(self.session_scope())
            .with_dialect(self.dialect)
    }

    /// Ledger DDL for the configured dialect.
    pub fn create_table_sql(&self) -> Vec<String> {
        self.ledger_table().create_table_sql(self.dialect)
    }

    /// Opens the ledger on a SQLite connection, creating its table when
    /// missing. Fails unless the configured dialect is SQLite.
    #[cfg(feature = "rusqlite")]
    pub fn sqlite_ledger(&self, conn: ::rusqlite::Connection) -> tether_core::Result<SqliteLedger> {
        if self.dialect != Dialect::SQLite {
            return Err(TetherError::Configuration(format!(
                "a SQLite ledger cannot serve dialect {}",
                self.dialect.as_str()
            )));
        }

        let ledger = SqliteLedger::new(conn, self.ledger_table())
            .with_session_scope(self.session_scope());
        ledger.create_table()?;
        Ok(ledger)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<Error> for TetherError {
    fn from(err: Error) -> Self {
        TetherError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.dialect, Dialect::SQLite);
        assert_eq!(cfg.ledger_table().name(), "deferred_bindings");
        assert_eq!(cfg.ledger_table().slave_key(), SlaveKeyType::Integer);
        assert_eq!(cfg.session_scope().max_key_length(), 255);
    }

    #[test]
    fn full_file() {
        let cfg = Config::from_toml_str(
            r#"
            dialect = "postgres"
            [ledger]
            table = "pending_links"
            prefix = "app_"
            slave_key = "text"
            [session]
            max_key_length = 64
        "#,
        )
        .unwrap();

        assert_eq!(cfg.dialect, Dialect::PostgreSQL);
        let ctx = cfg.resolve_context();
        assert_eq!(ctx.ledger().name(), "app_pending_links");
        assert_eq!(ctx.ledger().slave_key(), SlaveKeyType::Text);
        assert_eq!(ctx.prefix(), "app_");
        assert_eq!(ctx.sessions().max_key_length(), 64);
    }

    #[test]
    fn dialect_drives_ledger_ddl() {
        let pg = Config::from_toml_str("dialect = \"postgresql\"").unwrap();
        let ddl = pg.create_table_sql();
        assert!(ddl[0].contains(r#""id" BIGSERIAL PRIMARY KEY"#));
        assert_eq!(pg.resolve_context().dialect(), Some(Dialect::PostgreSQL));

        let lite = Config::from_toml_str("").unwrap().create_table_sql();
        assert!(lite[0].contains("AUTOINCREMENT"));
    }

    #[cfg(feature = "rusqlite")]
    #[test]
    fn sqlite_ledger_requires_sqlite_dialect() {
        let conn = || ::rusqlite::Connection::open_in_memory().unwrap();

        let mysql = Config::from_toml_str("dialect = \"mysql\"").unwrap();
        assert!(matches!(
            mysql.sqlite_ledger(conn()),
            Err(TetherError::Configuration(_))
        ));

        let cfg = Config::from_toml_str("[session]\nmax_key_length = 40").unwrap();
        let ledger = cfg.sqlite_ledger(conn()).unwrap();
        assert_eq!(ledger.sessions().max_key_length(), 40);
        assert_eq!(ledger.table().name(), "deferred_bindings");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::from_toml_str("[ledger]\ntable = \"\""),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[session]\nmax_key_length = 8"),
            Err(Error::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("dialect = \"oracle\""),
            Err(Error::Parse(..))
        ));
        assert!(matches!(
            Config::from_toml_str("[ledger]\ncolour = \"blue\""),
            Err(Error::Parse(..))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ledger]\nprefix = \"t_\"").unwrap();

        let cfg = Config::load_from(file.path()).unwrap();
        assert_eq!(cfg.ledger_table().name(), "t_deferred_bindings");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(TetherError::from(err), TetherError::Configuration(_)));
    }
}
