//! rusqlite execution of composed SQL.

use rusqlite::{Connection, Row, params_from_iter};
use tether_core::{Result, SQL, TetherError, tether_trace_query};
use tether_sqlite::SQLiteValue;

/// Runs a statement and returns the number of affected rows.
pub(crate) fn execute(conn: &Connection, sql: &SQL<'_, SQLiteValue<'_>>) -> Result<usize> {
    let (sql_str, params) = sql.build();
    tether_trace_query!(&sql_str, params.len());

    Ok(conn.execute(&sql_str, params_from_iter(params))?)
}

/// Runs a query and maps every row.
pub(crate) fn all<T>(conn: &Connection, sql: &SQL<'_, SQLiteValue<'_>>) -> Result<Vec<T>>
where
    T: for<'r> TryFrom<&'r Row<'r>>,
    for<'r> <T as TryFrom<&'r Row<'r>>>::Error: Into<TetherError>,
{
    let (sql_str, params) = sql.build();
    tether_trace_query!(&sql_str, params.len());

    let mut stmt = conn.prepare(&sql_str)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok(T::try_from(row).map_err(Into::into))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row??);
    }

    Ok(results)
}

/// Runs a `SELECT COUNT(*)` style query.
pub(crate) fn count(conn: &Connection, sql: &SQL<'_, SQLiteValue<'_>>) -> Result<usize> {
    let (sql_str, params) = sql.build();
    tether_trace_query!(&sql_str, params.len());

    let count: i64 = conn.query_row(&sql_str, params_from_iter(params), |row| row.get(0))?;
    usize::try_from(count).map_err(|e| TetherError::Mapping(format!("row count {count}: {e}")))
}
