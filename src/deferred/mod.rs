//! Composition of the effective relation query.
//!
//! A related row is part of the effective set when it is related in storage
//! or bound in the ledger, and it has not been unbound since its last bind:
//!
//! ```text
//! (base OR slave.key IN bound) AND slave.key NOT IN unbound AND <global scopes>
//! ```
//!
//! For a master that has not been saved the base predicate is dropped and
//! only the ledger decides membership. Nothing here touches the database;
//! the returned [`DeferredQuery`] is executed, narrowed or counted by the
//! caller.

#[cfg(feature = "rusqlite")]
mod rusqlite;

use std::borrow::Cow;

use tether_core::{
    Dialect, OrderBy, Result, SQL, SQLParam, SelectBuilder, TetherError, ToSQL,
    expressions::conditions::{in_subquery, not_in_subquery, or},
    tether_trace_query,
};

use crate::{
    ledger::{LedgerParam, LedgerScope, LedgerTable},
    relation::{MasterRecord, RelationDescriptor, base_predicate, orphan_mode},
    session::{SessionKey, SessionScope},
};

/// Explicit inputs of a resolution that do not come from the relation.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    ledger: LedgerTable,
    prefix: String,
    sessions: SessionScope,
    dialect: Option<Dialect>,
}

impl ResolveContext {
    pub fn new(ledger: LedgerTable) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    /// Prefix prepended to the slave and pivot table names of every relation.
    /// The ledger table keeps the name it was built with.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_session_scope(mut self, sessions: SessionScope) -> Self {
        self.sessions = sessions;
        self
    }

    /// Pins the dialect; resolving with values of another dialect fails.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    #[inline]
    pub fn dialect(&self) -> Option<Dialect> {
        self.dialect
    }

    #[inline]
    pub fn ledger(&self) -> &LedgerTable {
        &self.ledger
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    pub fn sessions(&self) -> &SessionScope {
        &self.sessions
    }

    /// A relation table name with the prefix applied.
    pub fn table<'a>(&self, name: &Cow<'a, str>) -> Cow<'a, str> {
        if self.prefix.is_empty() {
            name.clone()
        } else {
            Cow::Owned(format!("{}{name}", self.prefix))
        }
    }
}

/// The effective relation as a query over the slave table.
#[derive(Debug, Clone)]
pub struct DeferredQuery<'a, V: SQLParam> {
    query: SelectBuilder<'a, V>,
    slave_key: SQL<'a, V>,
    orphan_mode: bool,
    session_key: SessionKey,
}

impl<'a, V: SQLParam + 'a> DeferredQuery<'a, V> {
    /// `SELECT slave.* ...` of the effective set.
    #[inline]
    pub fn query(&self) -> &SelectBuilder<'a, V> {
        &self.query
    }

    pub fn into_query(self) -> SelectBuilder<'a, V> {
        self.query
    }

    /// True when no pivot columns are available on the result rows.
    #[inline]
    pub fn orphan_mode(&self) -> bool {
        self.orphan_mode
    }

    /// The session the ledger was read for.
    #[inline]
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// The qualified slave key column, `"slave"."key"`.
    #[inline]
    pub fn slave_key(&self) -> &SQL<'a, V> {
        &self.slave_key
    }

    /// Narrows the set further.
    pub fn r#where(mut self, condition: impl ToSQL<'a, V>) -> Self {
        self.query = self.query.r#where(condition);
        self
    }

    pub fn order_by(mut self, expr: impl ToSQL<'a, V>, direction: OrderBy) -> Self {
        self.query = self.query.order_by(expr, direction);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    /// `SELECT COUNT(*)` over the same set.
    pub fn count_query(&self) -> SelectBuilder<'a, V> {
        self.query.count()
    }

    /// Selects only the slave keys, keeping ordering and pagination.
    pub fn slave_id_query(&self) -> SelectBuilder<'a, V> {
        self.query.clone().columns(self.slave_key.clone())
    }
}

impl<'a, V: SQLParam + 'a> ToSQL<'a, V> for DeferredQuery<'a, V> {
    fn to_sql(&self) -> SQL<'a, V> {
        self.query.to_sql()
    }
}

/// Builds the query of the records currently related to `master` through
/// `descriptor`, staged intents of the session included.
///
/// `session_key` falls back to the key associated with `master`. Errors are
/// raised before any SQL is returned. A missing session key, an incomplete
/// descriptor or a value type of another dialect than the one pinned on `ctx`
/// is a configuration error; a relation kind that cannot carry deferred
/// bindings is unsupported.
pub fn resolve_effective_relation<'a, V: LedgerParam<'a>>(
    ctx: &ResolveContext,
    descriptor: &RelationDescriptor<'a, V>,
    master: &MasterRecord<'a, V>,
    relation_field: &'a str,
    session_key: Option<&str>,
) -> Result<DeferredQuery<'a, V>> {
    if let Some(dialect) = ctx.dialect()
        && dialect != V::DIALECT
    {
        return Err(TetherError::Configuration(format!(
            "context is configured for {} but the query values are {}",
            dialect.as_str(),
            V::DIALECT.as_str()
        )));
    }
    let session = ctx.sessions().resolve(session_key, master)?;
    let base = base_predicate(ctx, descriptor, master)?;

    let slave = ctx.table(&descriptor.slave.table);
    let slave_key = SQL::qualified(slave.clone(), descriptor.slave.key.clone());

    let scope = LedgerScope::new(
        master.type_name_cow().clone(),
        relation_field,
        session.as_str().to_owned(),
    );
    let bound = in_subquery(slave_key.clone(), ctx.ledger().bound_slave_ids(&scope));
    let unbound = not_in_subquery(slave_key.clone(), ctx.ledger().unbound_slave_ids(&scope));

    let membership = match base {
        Some(base) => or([base, bound]),
        None => bound,
    };

    let query = descriptor.global_scopes.iter().fold(
        SelectBuilder::new(SQL::all_columns(slave.clone()))
            .from(slave)
            .r#where(membership)
            .r#where(unbound),
        |query, scope| query.r#where(scope.condition.clone()),
    );

    #[cfg(feature = "tracing")]
    {
        let rendered = query.to_sql();
        tether_trace_query!(rendered.sql(), rendered.param_count());
    }

    Ok(DeferredQuery {
        query,
        slave_key,
        orphan_mode: orphan_mode(descriptor.kind),
        session_key: session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{Morph, PivotTable, TableRef};
    use tether_core::{TetherError, expressions::conditions::eq};
    use tether_sqlite::SQLiteValue;

    type Descriptor = RelationDescriptor<'static, SQLiteValue<'static>>;
    type Master = MasterRecord<'static, SQLiteValue<'static>>;

    fn tags() -> Descriptor {
        Descriptor::belongs_to_many(
            TableRef::new("posts", "id"),
            TableRef::new("tags", "id"),
            PivotTable::new("post_tag", "post_id", "tag_id"),
        )
    }

    const BOUND: &str = r#""tags"."id" IN (SELECT "slave_id" FROM "deferred_bindings" WHERE ("master_type" = ? AND "master_field" = ? AND "session_key" = ? AND "is_bind" = ?))"#;

    #[test]
    fn unsaved_master_reads_only_the_ledger() {
        let query = resolve_effective_relation(
            &ResolveContext::default(),
            &tags(),
            &Master::new("Post"),
            "tags",
            Some("s1"),
        )
        .unwrap();

        let sql = query.to_sql().sql();
        assert!(sql.starts_with(&format!(r#"SELECT "tags".* FROM "tags" WHERE ({BOUND} AND "tags"."id" NOT IN (SELECT"#)));
        assert!(!sql.contains("EXISTS"));
        assert!(query.orphan_mode());
        assert_eq!(query.session_key().as_str(), "s1");
    }

    #[test]
    fn saved_master_ors_base_with_bound() {
        let query = resolve_effective_relation(
            &ResolveContext::default(),
            &tags(),
            &Master::persisted("Post", 1),
            "tags",
            Some("s1"),
        )
        .unwrap();

        let sql = query.to_sql().sql();
        assert!(sql.starts_with(r#"SELECT "tags".* FROM "tags" WHERE ((EXISTS (SELECT 1 FROM "post_tag""#));
        assert!(sql.contains(&format!(r#") OR {BOUND}) AND "tags"."id" NOT IN"#)));
        // base key, bound lookup, unbind lookup with its correlated rebind lookup
        assert_eq!(query.to_sql().param_count(), 1 + 4 + 8);
    }

    #[test]
    fn global_scopes_are_anded_last() {
        let descriptor = tags().global_scope(
            "visible",
            eq(
                SQL::qualified("tags", "hidden"),
                SQL::value(SQLiteValue::from(false)),
            ),
        );
        let query = resolve_effective_relation(
            &ResolveContext::default(),
            &descriptor,
            &Master::new("Post"),
            "tags",
            Some("s1"),
        )
        .unwrap();

        assert!(query.to_sql().sql().ends_with(r#"AND "tags"."hidden" = ?)"#));
    }

    #[test]
    fn session_key_falls_back_to_master() {
        let query = resolve_effective_relation(
            &ResolveContext::default(),
            &tags(),
            &Master::new("Post").with_session_key("draft-7"),
            "tags",
            None,
        )
        .unwrap();
        assert_eq!(query.session_key().as_str(), "draft-7");
    }

    #[test]
    fn missing_session_key_fails_before_composing() {
        let err = resolve_effective_relation(
            &ResolveContext::default(),
            &tags(),
            &Master::new("Post"),
            "tags",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TetherError::Configuration(_)));
    }

    #[test]
    fn pinned_dialect_must_match_value_type() {
        let resolve = |ctx: ResolveContext| {
            resolve_effective_relation(&ctx, &tags(), &Master::new("Post"), "tags", Some("s1"))
        };

        let err = resolve(ResolveContext::default().with_dialect(Dialect::PostgreSQL)).unwrap_err();
        assert!(matches!(err, TetherError::Configuration(_)));
        assert!(resolve(ResolveContext::default().with_dialect(Dialect::SQLite)).is_ok());
    }

    #[test]
    fn unresolved_morph_fails_even_for_unsaved_master() {
        let descriptor = Descriptor::morph_to_many(
            TableRef::new("posts", "id"),
            TableRef::new("tags", "id"),
            PivotTable::new("taggables", "taggable_id", "tag_id"),
            Morph::unresolved("taggable_type"),
        );
        let err = resolve_effective_relation(
            &ResolveContext::default(),
            &descriptor,
            &Master::new("Post"),
            "tags",
            Some("s1"),
        )
        .unwrap_err();
        assert!(matches!(err, TetherError::Configuration(_)));
    }

    #[test]
    fn narrowing_and_counting() {
        let query = resolve_effective_relation(
            &ResolveContext::default(),
            &tags(),
            &Master::new("Post"),
            "tags",
            Some("s1"),
        )
        .unwrap()
        .order_by(SQL::qualified("tags", "name"), OrderBy::Asc)
        .limit(5);

        assert!(query.to_sql().sql().ends_with(r#"ORDER BY "tags"."name" ASC LIMIT 5"#));
        assert!(query.count_query().to_sql().sql().starts_with("SELECT COUNT(*) FROM"));
        assert!(
            query
                .slave_id_query()
                .to_sql()
                .sql()
                .starts_with(r#"SELECT "tags"."id" FROM "tags""#)
        );
    }
}
