//! rusqlite bindings for [`SQLiteValue`].

#[cfg(feature = "rusqlite")]
use super::SQLiteValue;
#[cfg(feature = "rusqlite")]
use std::borrow::Cow;

#[cfg(feature = "rusqlite")]
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, Value, ValueRef};

#[cfg(feature = "rusqlite")]
impl<'a> rusqlite::ToSql for SQLiteValue<'a> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SQLiteValue::Null => Ok(ToSqlOutput::Owned(Value::Null)),
            SQLiteValue::Integer(i) => Ok(ToSqlOutput::Owned(Value::Integer(*i))),
            SQLiteValue::Real(f) => Ok(ToSqlOutput::Owned(Value::Real(*f))),
            SQLiteValue::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            SQLiteValue::Blob(b) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(b.as_ref()))),
        }
    }
}

#[cfg(feature = "rusqlite")]
impl<'a> FromSql for SQLiteValue<'a> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let result = match value {
            ValueRef::Null => SQLiteValue::Null,
            ValueRef::Integer(i) => SQLiteValue::Integer(i),
            ValueRef::Real(r) => SQLiteValue::Real(r),
            ValueRef::Text(items) => {
                SQLiteValue::Text(Cow::Owned(String::from_utf8_lossy(items).into_owned()))
            }
            ValueRef::Blob(items) => SQLiteValue::Blob(Cow::Owned(items.to_vec())),
        };
        Ok(result)
    }
}

#[cfg(feature = "rusqlite")]
impl<'a> From<Value> for SQLiteValue<'a> {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SQLiteValue::Null,
            Value::Integer(i) => SQLiteValue::Integer(i),
            Value::Real(r) => SQLiteValue::Real(r),
            Value::Text(s) => SQLiteValue::Text(s.into()),
            Value::Blob(b) => SQLiteValue::Blob(b.into()),
        }
    }
}

#[cfg(all(test, feature = "rusqlite"))]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn binds_and_reads_back_through_rusqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let value: SQLiteValue<'static> = conn
            .query_row("SELECT ?1 || '!'", [SQLiteValue::from("hi")], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value.as_str(), Some("hi!"));
    }
}
