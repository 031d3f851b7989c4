//! SQL fragment building shared by the tether crates.
//!
//! Fragments are flat lists of [`SQLChunk`]s. Parameter values stay attached to
//! the fragment they were created in and are rendered as dialect placeholders,
//! so composed queries can be executed by any driver that knows the dialect.

pub mod builder;
pub mod dialect;
pub mod error;
pub mod expressions;
pub mod param;
pub mod sql;
pub mod tracing;
pub mod traits;

pub use builder::{OrderBy, OrderByClause, SelectBuilder};
pub use dialect::Dialect;
pub use error::{Result, TetherError};
pub use param::Param;
pub use sql::{SQL, SQLChunk, Token};
pub use traits::*;
