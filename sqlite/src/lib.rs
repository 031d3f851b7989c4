//! SQLite values for tether
//!
//! This crate provides the SQLite parameter type used by the deferred binding
//! engine and its rusqlite bindings.

pub mod values;

pub use values::SQLiteValue;

/// SQL fragment specialised to SQLite parameters.
pub type SQLiteSQL<'a> = tether_core::SQL<'a, SQLiteValue<'a>>;
