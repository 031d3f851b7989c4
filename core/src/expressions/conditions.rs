use crate::{
    sql::{SQL, Token},
    traits::{SQLParam, ToSQL},
};

/// Format a SQL comparison with the given operator
fn internal_format_sql_comparison<'a, V, L, R>(left: L, operator: Token, right: R) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    L: ToSQL<'a, V>,
    R: ToSQL<'a, V>,
{
    left.into_sql().push(operator).append(operand(right))
}

/// Subqueries used as scalar operands need their own parentheses.
fn operand<'a, V, T>(value: T) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    T: ToSQL<'a, V>,
{
    let sql = value.into_sql();
    if sql.is_subquery() { sql.parens() } else { sql }
}

/// Create an equality condition (=)
///
/// # Example
/// ```
/// # use tether_core::{SQL, Dialect, SQLParam, expressions::conditions::eq};
/// # #[derive(Debug, Clone)] struct V;
/// # impl SQLParam for V { const DIALECT: Dialect = Dialect::SQLite; }
/// let condition = eq(SQL::<V>::qualified("tags", "post_id"), SQL::value(V));
/// assert_eq!(condition.sql(), r#""tags"."post_id" = ?"#);
/// ```
pub fn eq<'a, V, L, R>(left: L, right: R) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    L: ToSQL<'a, V>,
    R: ToSQL<'a, V>,
{
    internal_format_sql_comparison(left, Token::EQ, right)
}

/// Create a not-equal condition (<>)
pub fn neq<'a, V, L, R>(left: L, right: R) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    L: ToSQL<'a, V>,
    R: ToSQL<'a, V>,
{
    internal_format_sql_comparison(left, Token::NE, right)
}

/// Create a greater-than condition (>)
pub fn gt<'a, V, L, R>(left: L, right: R) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    L: ToSQL<'a, V>,
    R: ToSQL<'a, V>,
{
    internal_format_sql_comparison(left, Token::GT, right)
}

/// Create an EXISTS condition with a subquery
///
/// # Example
/// ```
/// # use tether_core::{SQL, Dialect, SQLParam, Token, expressions::conditions::exists};
/// # #[derive(Debug, Clone)] struct V;
/// # impl SQLParam for V { const DIALECT: Dialect = Dialect::SQLite; }
/// let subquery = SQL::<V>::token(Token::SELECT).append(SQL::number(1));
/// assert_eq!(exists(subquery).sql(), "EXISTS (SELECT 1)");
/// ```
pub fn exists<'a, V, T>(subquery: T) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    T: ToSQL<'a, V>,
{
    SQL::token(Token::EXISTS).append(subquery.into_sql().parens())
}

/// Create an IN condition against a subquery: `left IN (SELECT ...)`
pub fn in_subquery<'a, V, L, S>(left: L, subquery: S) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    L: ToSQL<'a, V>,
    S: ToSQL<'a, V>,
{
    left.into_sql()
        .push(Token::IN)
        .append(subquery.into_sql().parens())
}

/// Create a NOT IN condition against a subquery: `left NOT IN (SELECT ...)`
pub fn not_in_subquery<'a, V, L, S>(left: L, subquery: S) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    L: ToSQL<'a, V>,
    S: ToSQL<'a, V>,
{
    left.into_sql()
        .push(Token::NOT)
        .push(Token::IN)
        .append(subquery.into_sql().parens())
}

/// Combine multiple conditions with AND
///
/// A single condition is returned unchanged; no conditions yield empty SQL.
pub fn and<'a, V, T>(conditions: T) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    T: IntoIterator<Item = SQL<'a, V>>,
{
    combine(conditions, Token::AND)
}

/// Combine multiple conditions with OR
///
/// # Example
/// ```
/// # use tether_core::{SQL, Dialect, SQLParam, expressions::conditions::{eq, or}};
/// # #[derive(Debug, Clone)] struct V;
/// # impl SQLParam for V { const DIALECT: Dialect = Dialect::SQLite; }
/// let condition = or([
///     eq(SQL::<V>::ident("role"), SQL::value(V)),
///     eq(SQL::ident("status"), SQL::value(V)),
/// ]);
/// assert_eq!(condition.sql(), r#"("role" = ? OR "status" = ?)"#);
/// ```
pub fn or<'a, V, T>(conditions: T) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    T: IntoIterator<Item = SQL<'a, V>>,
{
    combine(conditions, Token::OR)
}

fn combine<'a, V, T>(conditions: T, separator: Token) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    T: IntoIterator<Item = SQL<'a, V>>,
{
    let mut iter = conditions.into_iter().filter(|c| !c.is_empty());

    match iter.next() {
        None => SQL::empty(),
        Some(first) => {
            let Some(second) = iter.next() else {
                return first;
            };
            let all_conditions = std::iter::once(first)
                .chain(std::iter::once(second))
                .chain(iter);
            SQL::join(all_conditions, separator).parens()
        }
    }
}
