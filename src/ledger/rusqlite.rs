//! Ledger storage on a rusqlite connection.

use ::rusqlite::{Connection, Row};
use tether_core::{Dialect, Result, TetherError, tether_trace_ledger};
use tether_sqlite::SQLiteValue;

use super::{BindingIntent, LedgerEntry, LedgerStore, LedgerTable, SlaveId};
use crate::{
    exec,
    session::{SessionKey, SessionScope},
};

/// A [`LedgerStore`] backed by a SQLite table.
///
/// Ids come from `INTEGER PRIMARY KEY AUTOINCREMENT`, so they are strictly
/// increasing for the life of the database file, purges included.
#[derive(Debug)]
pub struct SqliteLedger {
    conn: Connection,
    table: LedgerTable,
    sessions: SessionScope,
}

impl SqliteLedger {
    /// Wraps a connection. The ledger table is expected to exist; see
    /// [`SqliteLedger::create_table`].
    pub fn new(conn: Connection, table: LedgerTable) -> Self {
        Self {
            conn,
            table,
            sessions: SessionScope::default(),
        }
    }

    /// Session keys longer than the scope allows are refused on every write
    /// and read, matching what resolution accepts.
    pub fn with_session_scope(mut self, sessions: SessionScope) -> Self {
        self.sessions = sessions;
        self
    }

    /// An in-memory database with the default ledger table created.
    pub fn open_in_memory() -> Result<Self> {
        let ledger = Self::new(Connection::open_in_memory()?, LedgerTable::default());
        ledger.create_table()?;
        Ok(ledger)
    }

    /// Creates the ledger table and its index if they do not exist.
    pub fn create_table(&self) -> Result<()> {
        for statement in self.table.create_table_sql(Dialect::SQLite) {
            self.conn.execute(&statement, [])?;
        }
        Ok(())
    }

    /// The underlying connection, for running resolved queries against the
    /// same database.
    #[inline]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    #[inline]
    pub fn table(&self) -> &LedgerTable {
        &self.table
    }

    #[inline]
    pub fn sessions(&self) -> &SessionScope {
        &self.sessions
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl LedgerStore for SqliteLedger {
    fn append(&self, intent: BindingIntent) -> Result<LedgerEntry> {
        self.sessions.check(intent.session_key.as_str())?;
        let inserted = exec::execute(&self.conn, &self.table.insert::<SQLiteValue>(&intent))?;
        if inserted != 1 {
            return Err(TetherError::Storage(format!(
                "ledger insert affected {inserted} rows"
            )));
        }

        let id = self.conn.last_insert_rowid();
        tether_trace_ledger!("append", intent.session_key, 1);
        Ok(LedgerEntry::from_intent(id, intent))
    }

    fn purge(&self, session_key: &SessionKey) -> Result<usize> {
        self.sessions.check(session_key.as_str())?;
        let removed = exec::execute(
            &self.conn,
            &self.table.delete_session::<SQLiteValue>(session_key),
        )?;
        tether_trace_ledger!("purge", session_key, removed);
        Ok(removed)
    }

    fn entries(&self, session_key: &SessionKey) -> Result<Vec<LedgerEntry>> {
        self.sessions.check(session_key.as_str())?;
        exec::all(
            &self.conn,
            &self.table.select_session::<SQLiteValue>(session_key),
        )
    }
}

impl TryFrom<&Row<'_>> for LedgerEntry {
    type Error = TetherError;

    fn try_from(row: &Row<'_>) -> Result<Self> {
        let slave_id: SQLiteValue<'static> = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            master_type: row.get(1)?,
            master_field: row.get(2)?,
            slave_id: SlaveId::try_from(slave_id)?,
            session_key: row.get(4)?,
            is_bind: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> SessionKey {
        SessionKey::new(raw).unwrap()
    }

    #[test]
    fn ids_strictly_increase() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let s = key("s1");

        let first = ledger.bind("Post", "tags", 1, &s).unwrap();
        let second = ledger.unbind("Post", "tags", 1, &s).unwrap();
        let third = ledger.bind("Post", "tags", 1, &s).unwrap();

        assert!(first.id < second.id);
        assert!(second.id < third.id);
        assert!(!second.is_bind);
    }

    #[test]
    fn duplicate_binds_are_kept() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let s = key("s1");

        ledger.bind("Post", "tags", 4, &s).unwrap();
        ledger.bind("Post", "tags", 4, &s).unwrap();

        assert_eq!(ledger.entries(&s).unwrap().len(), 2);
    }

    #[test]
    fn entries_round_trip_in_order() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let s = key("s1");

        let bound = ledger.bind("Post", "tags", 9, &s).unwrap();
        let unbound = ledger.unbind("Post", "tags", "uuid-1", &s).unwrap();
        ledger.bind("Post", "tags", 9, &key("other")).unwrap();

        assert_eq!(ledger.entries(&s).unwrap(), vec![bound, unbound]);
    }

    #[test]
    fn purge_removes_only_one_session() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let a = key("a");
        let b = key("b");

        ledger.bind("Post", "tags", 1, &a).unwrap();
        ledger.unbind("Post", "tags", 2, &a).unwrap();
        ledger.bind("Post", "tags", 1, &b).unwrap();

        assert_eq!(ledger.purge(&a).unwrap(), 2);
        assert!(ledger.entries(&a).unwrap().is_empty());
        assert_eq!(ledger.entries(&b).unwrap().len(), 1);
        assert_eq!(ledger.purge(&a).unwrap(), 0);
    }

    #[test]
    fn ids_keep_increasing_after_purge() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let s = key("s1");

        let before = ledger.bind("Post", "tags", 1, &s).unwrap();
        ledger.purge(&s).unwrap();
        let after = ledger.bind("Post", "tags", 1, &s).unwrap();

        assert!(after.id > before.id);
    }

    #[test]
    fn session_scope_applies_to_writes_and_reads() {
        let ledger = SqliteLedger::open_in_memory()
            .unwrap()
            .with_session_scope(SessionScope::new(40));
        let long = key(&"k".repeat(60));

        let err = ledger.bind("Post", "tags", 1, &long).unwrap_err();
        assert!(matches!(err, TetherError::Configuration(_)));
        assert!(ledger.entries(&long).is_err());
        assert!(ledger.purge(&long).is_err());

        let fits = key(&"k".repeat(40));
        ledger.bind("Post", "tags", 1, &fits).unwrap();
        assert_eq!(ledger.entries(&fits).unwrap().len(), 1);
    }

    #[test]
    fn missing_table_is_a_storage_error() {
        let ledger = SqliteLedger::new(Connection::open_in_memory().unwrap(), LedgerTable::default());
        let err = ledger.bind("Post", "tags", 1, &key("s1")).unwrap_err();
        assert!(err.is_storage());
    }
}
