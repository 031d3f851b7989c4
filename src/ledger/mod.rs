//! The deferred-binding ledger.
//!
//! An append-only log of staged attach/detach intents. Entries are never
//! updated in place; the id order of the entries is the only record of which
//! intent came last.
//!
//! [`LedgerTable`] renders the SQL the resolver needs against the ledger, for
//! any dialect. [`LedgerStore`] is the storage side: appending and purging.

#[cfg(feature = "rusqlite")]
pub mod rusqlite;

use std::{borrow::Cow, fmt, iter};

use serde::Deserialize;
use tether_core::{
    Dialect, OrderBy, Result, SQL, SQLParam, SelectBuilder, TetherError, ToSQL, Token,
    expressions::{
        coalesce,
        conditions::{and, eq, gt},
        max,
    },
};
use tether_sqlite::SQLiteValue;

use crate::session::SessionKey;

#[cfg(feature = "rusqlite")]
pub use self::rusqlite::SqliteLedger;

/// Default name of the ledger table.
pub const DEFAULT_TABLE: &str = "deferred_bindings";

pub(crate) const ID: &str = "id";
pub(crate) const MASTER_TYPE: &str = "master_type";
pub(crate) const MASTER_FIELD: &str = "master_field";
pub(crate) const SLAVE_ID: &str = "slave_id";
pub(crate) const SESSION_KEY: &str = "session_key";
pub(crate) const IS_BIND: &str = "is_bind";

const COLUMNS: [&str; 6] = [ID, MASTER_TYPE, MASTER_FIELD, SLAVE_ID, SESSION_KEY, IS_BIND];

/// Alias of the ledger in the unbind subquery.
const UNBIND_ALIAS: &str = "deferred_unbind";
/// Alias of the ledger in the correlated last-bind lookup.
const REBIND_ALIAS: &str = "deferred_rebind";

/// Parameter types the ledger SQL can be rendered with.
pub trait LedgerParam<'a>:
    SQLParam + From<&'a str> + From<String> + From<i64> + From<bool> + 'a
{
}

impl<'a, T> LedgerParam<'a> for T where
    T: SQLParam + From<&'a str> + From<String> + From<i64> + From<bool> + 'a
{
}

/// Binds a text value, borrowing it when the source is borrowed.
pub(crate) fn text<'a, V: LedgerParam<'a>>(value: &Cow<'a, str>) -> SQL<'a, V> {
    match value {
        Cow::Borrowed(s) => SQL::value(V::from(*s)),
        Cow::Owned(s) => SQL::value(V::from(s.clone())),
    }
}

/// Primary key of a related (slave) record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlaveId {
    Integer(i64),
    Text(String),
}

impl SlaveId {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SlaveId::Integer(id) => Some(*id),
            SlaveId::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SlaveId::Integer(_) => None,
            SlaveId::Text(id) => Some(id),
        }
    }

    fn to_param<'a, V: LedgerParam<'a>>(&'a self) -> SQL<'a, V> {
        match self {
            SlaveId::Integer(id) => SQL::value(V::from(*id)),
            SlaveId::Text(id) => SQL::value(V::from(id.as_str())),
        }
    }
}

impl fmt::Display for SlaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlaveId::Integer(id) => write!(f, "{id}"),
            SlaveId::Text(id) => f.write_str(id),
        }
    }
}

macro_rules! slave_id_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SlaveId {
                fn from(value: $ty) -> Self {
                    SlaveId::Integer(i64::from(value))
                }
            }
        )*
    };
}

slave_id_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<&str> for SlaveId {
    fn from(value: &str) -> Self {
        SlaveId::Text(value.to_owned())
    }
}

impl From<String> for SlaveId {
    fn from(value: String) -> Self {
        SlaveId::Text(value)
    }
}

impl<'a> TryFrom<SQLiteValue<'a>> for SlaveId {
    type Error = TetherError;

    fn try_from(value: SQLiteValue<'a>) -> Result<Self> {
        match value {
            SQLiteValue::Integer(id) => Ok(SlaveId::Integer(id)),
            SQLiteValue::Text(id) => Ok(SlaveId::Text(id.into_owned())),
            other => Err(TetherError::Mapping(format!(
                "slave id must be INTEGER or TEXT, got {other:?}"
            ))),
        }
    }
}

/// Storage type of the ledger's `slave_id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlaveKeyType {
    #[default]
    Integer,
    Text,
}

impl SlaveKeyType {
    const fn column_type(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (SlaveKeyType::Integer, Dialect::SQLite) => "INTEGER",
            (SlaveKeyType::Integer, Dialect::PostgreSQL | Dialect::MySQL) => "BIGINT",
            (SlaveKeyType::Text, Dialect::SQLite) => "TEXT",
            (SlaveKeyType::Text, Dialect::PostgreSQL | Dialect::MySQL) => "VARCHAR(255)",
        }
    }
}

/// A staged intent that has not been appended yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingIntent {
    pub master_type: String,
    pub master_field: String,
    pub slave_id: SlaveId,
    pub session_key: SessionKey,
    pub is_bind: bool,
}

impl BindingIntent {
    /// An attach intent.
    pub fn bind(
        master_type: impl Into<String>,
        master_field: impl Into<String>,
        slave_id: impl Into<SlaveId>,
        session_key: &SessionKey,
    ) -> Self {
        Self {
            master_type: master_type.into(),
            master_field: master_field.into(),
            slave_id: slave_id.into(),
            session_key: session_key.clone(),
            is_bind: true,
        }
    }

    /// A detach intent.
    pub fn unbind(
        master_type: impl Into<String>,
        master_field: impl Into<String>,
        slave_id: impl Into<SlaveId>,
        session_key: &SessionKey,
    ) -> Self {
        Self {
            is_bind: false,
            ..Self::bind(master_type, master_field, slave_id, session_key)
        }
    }
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub master_type: String,
    pub master_field: String,
    pub slave_id: SlaveId,
    pub session_key: String,
    pub is_bind: bool,
}

impl LedgerEntry {
    /// The entry an intent became once the store assigned it `id`.
    pub fn from_intent(id: i64, intent: BindingIntent) -> Self {
        Self {
            id,
            master_type: intent.master_type,
            master_field: intent.master_field,
            slave_id: intent.slave_id,
            session_key: intent.session_key.into_inner(),
            is_bind: intent.is_bind,
        }
    }
}

/// The (master type, relation, session) triple a lookup is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerScope<'a> {
    pub master_type: Cow<'a, str>,
    pub master_field: Cow<'a, str>,
    pub session_key: Cow<'a, str>,
}

impl<'a> LedgerScope<'a> {
    pub fn new(
        master_type: impl Into<Cow<'a, str>>,
        master_field: impl Into<Cow<'a, str>>,
        session_key: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            master_type: master_type.into(),
            master_field: master_field.into(),
            session_key: session_key.into(),
        }
    }
}

/// Name and layout of the ledger table, and the SQL run against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTable {
    name: String,
    slave_key: SlaveKeyType,
}

impl Default for LedgerTable {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE)
    }
}

impl LedgerTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slave_key: SlaveKeyType::default(),
        }
    }

    /// A ledger table whose name carries the connection's table prefix.
    pub fn prefixed(prefix: &str, name: &str) -> Self {
        Self::new(format!("{prefix}{name}"))
    }

    pub fn with_slave_key(mut self, slave_key: SlaveKeyType) -> Self {
        self.slave_key = slave_key;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn slave_key(&self) -> SlaveKeyType {
        self.slave_key
    }

    /// DDL creating the ledger table and its lookup index.
    ///
    /// Identifiers are double-quoted like every other statement; MySQL needs
    /// `ANSI_QUOTES` for them.
    pub fn create_table_sql(&self, dialect: Dialect) -> Vec<String> {
        let table = quote(&self.name);
        let index = quote(&format!("{}_lookup_idx", self.name));
        let lookup = [MASTER_TYPE, MASTER_FIELD, SESSION_KEY]
            .map(quote)
            .join(", ");

        let (id, text, flag) = match dialect {
            Dialect::SQLite => ("INTEGER PRIMARY KEY AUTOINCREMENT", "TEXT", "INTEGER"),
            Dialect::PostgreSQL => ("BIGSERIAL PRIMARY KEY", "VARCHAR(255)", "BOOLEAN"),
            Dialect::MySQL => ("BIGINT AUTO_INCREMENT PRIMARY KEY", "VARCHAR(255)", "BOOLEAN"),
        };

        let mut columns = vec![
            format!("{} {id}", quote(ID)),
            format!("{} {text} NOT NULL", quote(MASTER_TYPE)),
            format!("{} {text} NOT NULL", quote(MASTER_FIELD)),
            format!(
                "{} {} NOT NULL",
                quote(SLAVE_ID),
                self.slave_key.column_type(dialect)
            ),
            format!("{} {text} NOT NULL", quote(SESSION_KEY)),
            format!("{} {flag} NOT NULL", quote(IS_BIND)),
        ];

        match dialect {
            Dialect::MySQL => {
                columns.push(format!("INDEX {index} ({lookup})"));
                vec![format!(
                    "CREATE TABLE IF NOT EXISTS {table} ({})",
                    columns.join(", ")
                )]
            }
            Dialect::SQLite | Dialect::PostgreSQL => vec![
                format!("CREATE TABLE IF NOT EXISTS {table} ({})", columns.join(", ")),
                format!("CREATE INDEX IF NOT EXISTS {index} ON {table} ({lookup})"),
            ],
        }
    }

    /// `SELECT slave_id ...` of every bind intent in `scope`.
    pub fn bound_slave_ids<'a, V: LedgerParam<'a>>(&self, scope: &LedgerScope<'a>) -> SQL<'a, V> {
        let conditions = self
            .scope_conditions(None, scope)
            .chain(iter::once(eq(SQL::ident(IS_BIND), SQL::value(V::from(true)))));

        SelectBuilder::new(SQL::ident(SLAVE_ID))
            .from(self.name.clone())
            .r#where(and(conditions))
            .into_sql()
    }

    /// `SELECT slave_id ...` of every unbind intent in `scope` that was not
    /// undone by a later bind of the same slave.
    ///
    /// An unbind counts only when its id is strictly greater than the largest
    /// bind id for that slave, or when the slave has no bind at all.
    pub fn unbound_slave_ids<'a, V: LedgerParam<'a>>(
        &self,
        scope: &LedgerScope<'a>,
    ) -> SQL<'a, V> {
        let last_bind = SelectBuilder::new(max(SQL::qualified(REBIND_ALIAS, ID)))
            .from_as(self.name.clone(), REBIND_ALIAS)
            .r#where(and(
                iter::once(eq(
                    SQL::qualified(REBIND_ALIAS, SLAVE_ID),
                    SQL::qualified(UNBIND_ALIAS, SLAVE_ID),
                ))
                .chain(self.scope_conditions(Some(REBIND_ALIAS), scope))
                .chain(iter::once(eq(
                    SQL::qualified(REBIND_ALIAS, IS_BIND),
                    SQL::value(V::from(true)),
                ))),
            ));

        let conditions = self
            .scope_conditions(Some(UNBIND_ALIAS), scope)
            .chain([
                eq(
                    SQL::qualified(UNBIND_ALIAS, IS_BIND),
                    SQL::value(V::from(false)),
                ),
                gt(
                    SQL::qualified(UNBIND_ALIAS, ID),
                    coalesce(last_bind.into_sql(), SQL::number(0)),
                ),
            ]);

        SelectBuilder::new(SQL::qualified(UNBIND_ALIAS, SLAVE_ID))
            .from_as(self.name.clone(), UNBIND_ALIAS)
            .r#where(and(conditions))
            .into_sql()
    }

    /// `INSERT` of one intent. The id is left to the database.
    pub fn insert<'a, V: LedgerParam<'a>>(&self, intent: &'a BindingIntent) -> SQL<'a, V> {
        let values = [
            SQL::value(V::from(intent.master_type.as_str())),
            SQL::value(V::from(intent.master_field.as_str())),
            intent.slave_id.to_param(),
            SQL::value(V::from(intent.session_key.as_str())),
            SQL::value(V::from(intent.is_bind)),
        ];

        SQL::from_iter([Token::INSERT, Token::INTO])
            .append(SQL::ident(self.name.clone()))
            .append(SQL::ident_list(COLUMNS[1..].iter().copied()).parens())
            .push(Token::VALUES)
            .append(SQL::join(values, Token::COMMA).parens())
    }

    /// `DELETE` of every entry of one session.
    pub fn delete_session<'a, V: LedgerParam<'a>>(&self, session_key: &'a SessionKey) -> SQL<'a, V> {
        SQL::from_iter([Token::DELETE, Token::FROM])
            .append(SQL::ident(self.name.clone()))
            .push(Token::WHERE)
            .append(eq(
                SQL::ident(SESSION_KEY),
                SQL::value(V::from(session_key.as_str())),
            ))
    }

    /// Every entry of one session, oldest first.
    pub fn select_session<'a, V: LedgerParam<'a>>(&self, session_key: &'a SessionKey) -> SQL<'a, V> {
        SelectBuilder::new(SQL::ident_list(COLUMNS))
            .from(self.name.clone())
            .r#where(eq(
                SQL::ident(SESSION_KEY),
                SQL::value(V::from(session_key.as_str())),
            ))
            .order_by(SQL::ident(ID), OrderBy::Asc)
            .into_sql()
    }

    fn scope_conditions<'a, V: LedgerParam<'a>>(
        &self,
        alias: Option<&'static str>,
        scope: &LedgerScope<'a>,
    ) -> impl Iterator<Item = SQL<'a, V>> {
        let column = move |name: &'static str| -> SQL<'a, V> {
            match alias {
                Some(alias) => SQL::qualified(alias, name),
                None => SQL::ident(name),
            }
        };

        [
            eq(column(MASTER_TYPE), text(&scope.master_type)),
            eq(column(MASTER_FIELD), text(&scope.master_field)),
            eq(column(SESSION_KEY), text(&scope.session_key)),
        ]
        .into_iter()
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Persistent home of the ledger.
pub trait LedgerStore {
    /// Appends one intent and returns it with its assigned id.
    ///
    /// Intents are not deduplicated: binding the same slave twice appends two
    /// entries.
    fn append(&self, intent: BindingIntent) -> Result<LedgerEntry>;

    /// Deletes every entry of a session and returns how many were removed.
    fn purge(&self, session_key: &SessionKey) -> Result<usize>;

    /// The entries of one session in id order.
    fn entries(&self, session_key: &SessionKey) -> Result<Vec<LedgerEntry>>;

    fn bind(
        &self,
        master_type: &str,
        master_field: &str,
        slave_id: impl Into<SlaveId>,
        session_key: &SessionKey,
    ) -> Result<LedgerEntry>
    where
        Self: Sized,
    {
        self.append(BindingIntent::bind(
            master_type,
            master_field,
            slave_id,
            session_key,
        ))
    }

    fn unbind(
        &self,
        master_type: &str,
        master_field: &str,
        slave_id: impl Into<SlaveId>,
        session_key: &SessionKey,
    ) -> Result<LedgerEntry>
    where
        Self: Sized,
    {
        self.append(BindingIntent::unbind(
            master_type,
            master_field,
            slave_id,
            session_key,
        ))
    }
}
