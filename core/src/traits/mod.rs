//! Core traits for SQL generation.

mod param;
mod to_sql;

pub use param::*;
pub use to_sql::*;
