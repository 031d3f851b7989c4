//! SQL expressions: scalar functions here, boolean conditions in [`conditions`].

pub mod conditions;

use crate::{
    sql::{SQL, Token},
    traits::{SQLParam, ToSQL},
};

/// `COALESCE(expr, fallback)`
///
/// # Example
/// ```
/// # use tether_core::{SQL, Dialect, SQLParam, expressions::coalesce};
/// # #[derive(Debug, Clone)] struct V;
/// # impl SQLParam for V { const DIALECT: Dialect = Dialect::SQLite; }
/// let expr = coalesce(SQL::<V>::ident("total"), SQL::number(0));
/// assert_eq!(expr.sql(), r#"COALESCE("total", 0)"#);
/// ```
pub fn coalesce<'a, V, E, F>(expr: E, fallback: F) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    E: ToSQL<'a, V>,
    F: ToSQL<'a, V>,
{
    let expr = expr.into_sql();
    let expr = if expr.is_subquery() { expr.parens() } else { expr };
    SQL::func(
        "COALESCE",
        expr.push(Token::COMMA).append(fallback.into_sql()),
    )
}

/// `MAX(expr)`
pub fn max<'a, V, E>(expr: E) -> SQL<'a, V>
where
    V: SQLParam + 'a,
    E: ToSQL<'a, V>,
{
    SQL::func("MAX", expr.into_sql())
}

/// `COUNT(*)`
pub fn count_all<'a, V>() -> SQL<'a, V>
where
    V: SQLParam + 'a,
{
    SQL::func("COUNT", SQL::token(Token::STAR))
}
