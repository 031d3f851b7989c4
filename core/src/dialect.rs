//! SQL dialect identification and placeholder rendering.

use core::fmt::Write;

/// SQL dialect for database-specific behavior
///
/// Each dialect has different placeholder syntax and slightly different
/// pagination rules. Identifiers are always double-quoted.
///
/// # Examples
///
/// ```
/// use tether_core::Dialect;
///
/// assert!(Dialect::PostgreSQL.uses_numbered_placeholders());
/// assert!(!Dialect::SQLite.uses_numbered_placeholders());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// SQLite - uses `?` positional placeholders
    #[default]
    SQLite,

    /// PostgreSQL - uses `$1, $2, ...` numbered placeholders
    #[cfg_attr(feature = "serde", serde(alias = "postgres"))]
    PostgreSQL,

    /// MySQL - uses `?` positional placeholders
    MySQL,
}

impl Dialect {
    /// Returns `true` if this dialect uses numbered placeholders (`$1, $2, ...`)
    #[inline]
    #[must_use]
    pub const fn uses_numbered_placeholders(&self) -> bool {
        matches!(self, Dialect::PostgreSQL)
    }

    /// Parse a dialect from a string (case-insensitive)
    ///
    /// ```
    /// use tether_core::Dialect;
    ///
    /// assert_eq!(Dialect::parse("sqlite"), Some(Dialect::SQLite));
    /// assert_eq!(Dialect::parse("pg"), Some(Dialect::PostgreSQL));
    /// assert_eq!(Dialect::parse("unknown"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("sqlite") || s.eq_ignore_ascii_case("libsql") {
            Some(Dialect::SQLite)
        } else if s.eq_ignore_ascii_case("postgresql")
            || s.eq_ignore_ascii_case("postgres")
            || s.eq_ignore_ascii_case("pg")
        {
            Some(Dialect::PostgreSQL)
        } else if s.eq_ignore_ascii_case("mysql") {
            Some(Dialect::MySQL)
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Dialect::SQLite => "sqlite",
            Dialect::PostgreSQL => "postgresql",
            Dialect::MySQL => "mysql",
        }
    }

    /// The `LIMIT` value that means "no limit", for dialects that cannot
    /// express `OFFSET` on its own.
    #[inline]
    pub const fn unbounded_limit(&self) -> Option<&'static str> {
        match self {
            Dialect::SQLite => Some("-1"),
            Dialect::MySQL => Some("18446744073709551615"),
            Dialect::PostgreSQL => None,
        }
    }
}

impl core::fmt::Display for Dialect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes the placeholder for a 1-based parameter index.
#[inline]
pub(crate) fn write_placeholder(dialect: Dialect, index: usize, buf: &mut impl Write) {
    if dialect.uses_numbered_placeholders() {
        let _ = write!(buf, "${index}");
    } else {
        let _ = buf.write_char('?');
    }
}
