use ::rusqlite::{Connection, Row};
use tether_core::{Result, TetherError, ToSQL};
use tether_sqlite::SQLiteValue;

use super::DeferredQuery;
use crate::{exec, ledger::SlaveId};

impl<'a> DeferredQuery<'a, SQLiteValue<'a>> {
    /// Runs the query and maps every related row.
    pub fn all<T>(&self, conn: &Connection) -> Result<Vec<T>>
    where
        T: for<'r> TryFrom<&'r Row<'r>>,
        for<'r> <T as TryFrom<&'r Row<'r>>>::Error: Into<TetherError>,
    {
        exec::all(conn, &self.query.to_sql())
    }

    /// Number of rows in the effective set, ignoring pagination.
    pub fn count(&self, conn: &Connection) -> Result<usize> {
        exec::count(conn, &self.count_query().to_sql())
    }

    /// Keys of the related rows, in query order.
    pub fn slave_ids(&self, conn: &Connection) -> Result<Vec<SlaveId>> {
        exec::all(conn, &self.slave_id_query().to_sql())
    }
}

impl TryFrom<&Row<'_>> for SlaveId {
    type Error = TetherError;

    fn try_from(row: &Row<'_>) -> Result<Self> {
        let value: SQLiteValue<'static> = row.get(0)?;
        SlaveId::try_from(value)
    }
}
