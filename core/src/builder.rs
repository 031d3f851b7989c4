//! Composable SELECT builder.
//!
//! `SelectBuilder` keeps each clause separately so that callers can keep
//! narrowing a query (extra filters, ordering, pagination, counting) after it
//! has been handed to them.

use std::borrow::Cow;

use crate::{
    expressions::{conditions::and, count_all},
    sql::{SQL, Token},
    traits::{SQLParam, ToSQL},
};

/// Sort direction for ORDER BY clauses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Asc,
    Desc,
}

impl<'a, V: SQLParam + 'a> ToSQL<'a, V> for OrderBy {
    fn to_sql(&self) -> SQL<'a, V> {
        match self {
            OrderBy::Asc => SQL::token(Token::ASC),
            OrderBy::Desc => SQL::token(Token::DESC),
        }
    }
}

/// Represents an ORDER BY clause in a query.
#[derive(Debug, Clone)]
pub struct OrderByClause<'a, V: SQLParam> {
    /// The expression to order by.
    pub expr: SQL<'a, V>,
    /// The direction to sort (ASC or DESC).
    pub direction: OrderBy,
}

impl<'a, V: SQLParam> OrderByClause<'a, V> {
    /// Creates a new ORDER BY clause.
    pub const fn new(expr: SQL<'a, V>, direction: OrderBy) -> Self {
        Self { expr, direction }
    }
}

/// A SELECT statement under construction.
///
/// Filters added through [`SelectBuilder::r#where`] are combined with AND, so
/// a caller can only ever narrow the row set it was given.
#[derive(Debug, Clone)]
pub struct SelectBuilder<'a, V: SQLParam> {
    columns: SQL<'a, V>,
    from: SQL<'a, V>,
    filters: Vec<SQL<'a, V>>,
    order_by: Vec<OrderByClause<'a, V>>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl<'a, V: SQLParam + 'a> SelectBuilder<'a, V> {
    /// Starts a SELECT of the given column list.
    pub fn new(columns: impl ToSQL<'a, V>) -> Self {
        Self {
            columns: columns.into_sql(),
            from: SQL::empty(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Sets the source table.
    pub fn from(mut self, table: impl Into<Cow<'a, str>>) -> Self {
        self.from = SQL::ident(table);
        self
    }

    /// Sets an aliased source table: `FROM "table" AS "alias"`.
    pub fn from_as(
        mut self,
        table: impl Into<Cow<'a, str>>,
        alias: impl Into<Cow<'a, str>>,
    ) -> Self {
        self.from = SQL::ident(table).alias(alias);
        self
    }

    /// Adds a filter. Empty conditions are ignored.
    pub fn r#where(mut self, condition: impl ToSQL<'a, V>) -> Self {
        let condition = condition.into_sql();
        if !condition.is_empty() {
            self.filters.push(condition);
        }
        self
    }

    pub fn order_by(mut self, expr: impl ToSQL<'a, V>, direction: OrderBy) -> Self {
        self.order_by
            .push(OrderByClause::new(expr.into_sql(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The same row set reduced to `SELECT COUNT(*)`. Ordering and pagination
    /// are dropped since they do not change the count of the whole set.
    pub fn count(&self) -> Self {
        Self {
            columns: count_all(),
            from: self.from.clone(),
            filters: self.filters.clone(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Replaces the selected columns, keeping every clause.
    pub fn columns(mut self, columns: impl ToSQL<'a, V>) -> Self {
        self.columns = columns.into_sql();
        self
    }

    /// The combined filter, or empty SQL when there is none.
    pub fn filter(&self) -> SQL<'a, V> {
        and(self.filters.iter().cloned())
    }

    fn render(&self) -> SQL<'a, V> {
        let mut sql = SQL::with_capacity_chunks(self.columns.chunks.len() + 8);
        sql.push_mut(Token::SELECT);
        sql.append_mut(self.columns.clone());
        if !self.from.is_empty() {
            sql.push_mut(Token::FROM);
            sql.append_mut(self.from.clone());
        }

        let filter = self.filter();
        if !filter.is_empty() {
            sql.push_mut(Token::WHERE);
            sql.append_mut(filter);
        }

        if !self.order_by.is_empty() {
            sql.push_mut(Token::ORDER);
            sql.push_mut(Token::BY);
            let clauses = self
                .order_by
                .iter()
                .map(|clause| clause.expr.clone().append(clause.direction.to_sql()));
            sql.append_mut(SQL::join(clauses, Token::COMMA));
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_mut(Token::LIMIT);
                sql.append_mut(SQL::number(limit));
                if let Some(offset) = offset {
                    sql.push_mut(Token::OFFSET);
                    sql.append_mut(SQL::number(offset));
                }
            }
            (None, Some(offset)) => {
                if let Some(unbounded) = V::DIALECT.unbounded_limit() {
                    sql.push_mut(Token::LIMIT);
                    sql.append_mut(SQL::raw(unbounded));
                }
                sql.push_mut(Token::OFFSET);
                sql.append_mut(SQL::number(offset));
            }
            (None, None) => {}
        }

        sql
    }
}

impl<'a, V: SQLParam + 'a> ToSQL<'a, V> for SelectBuilder<'a, V> {
    fn to_sql(&self) -> SQL<'a, V> {
        self.render()
    }
}
