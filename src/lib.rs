//! Deferred relation bindings.
//!
//! Stage "attach slave to master" and "detach slave from master" intents in a
//! ledger before the master is saved, then read the relation as it would look
//! with those intents applied.
//!
//! ```
//! use tether::prelude::*;
//! use tether_sqlite::SQLiteValue;
//!
//! let tags = RelationDescriptor::<SQLiteValue>::belongs_to_many(
//!     TableRef::new("posts", "id"),
//!     TableRef::new("tags", "id"),
//!     PivotTable::new("post_tag", "post_id", "tag_id"),
//! );
//! let post = MasterRecord::new("Post");
//! let session = SessionKey::generate();
//!
//! let query = resolve_effective_relation(
//!     &ResolveContext::default(),
//!     &tags,
//!     &post,
//!     "tags",
//!     Some(session.as_str()),
//! )?;
//! assert!(query.orphan_mode());
//! # Ok::<(), tether::TetherError>(())
//! ```

pub mod config;
pub mod deferred;
#[cfg(feature = "rusqlite")]
mod exec;
pub mod ledger;
pub mod relation;
pub mod session;

pub use deferred::{DeferredQuery, ResolveContext, resolve_effective_relation};
pub use ledger::{BindingIntent, LedgerEntry, LedgerStore, LedgerTable, SlaveId};
#[cfg(feature = "rusqlite")]
pub use ledger::SqliteLedger;
pub use relation::{MasterRecord, RelationDescriptor, RelationKind, base_predicate, orphan_mode};
pub use session::{SessionKey, SessionScope};
pub use tether_core::{Result, TetherError};

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::deferred::{DeferredQuery, ResolveContext, resolve_effective_relation};
    pub use crate::ledger::{
        BindingIntent, LedgerEntry, LedgerScope, LedgerStore, LedgerTable, SlaveId, SlaveKeyType,
    };
    #[cfg(feature = "rusqlite")]
    pub use crate::ledger::SqliteLedger;
    pub use crate::relation::{
        GlobalScope, MasterRecord, Morph, PivotTable, RelationDescriptor, RelationKind, TableRef,
    };
    pub use crate::session::{SessionKey, SessionScope};
    pub use tether_core::{OrderBy, Result, SQL, TetherError, ToSQL, expressions::conditions::*};
}
