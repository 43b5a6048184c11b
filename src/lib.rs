//! # Trellis
//!
//! Storage-agnostic conditions, casts and relations for a SQL row store and a
//! document store.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use trellis::prelude::*;
//! use trellis::memory::MemoryCollection;
//!
//! # fn main() -> trellis::Result<()> {
//! let user_roles: Rc<dyn Mapper> =
//!     Rc::new(MemoryCollection::new("user_roles").unique(["user_id", "role_id"]));
//! let roles = ManyToManyPivot::new(user_roles, "user_id", "role_id");
//!
//! let host = Key::from(1);
//! roles.sync_by_keys(&host, SyncList::from([2, 3]), true, LockLevel::None)?;
//! let changes = roles.sync_by_keys(&host, SyncList::from([3, 4]), true, LockLevel::None)?;
//!
//! assert_eq!(changes.attached, vec![Key::from(4)]);
//! assert_eq!(changes.detached, vec![Key::from(2)]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! | Backend  | Mapper             | Feature Flag |
//! |----------|--------------------|--------------|
//! | Document | `MemoryCollection` | default      |
//! | SQL      | `SqliteMapper`     | `rusqlite`   |

pub mod config;
pub mod memory;
#[cfg(feature = "rusqlite")]
pub mod rusqlite;

// =============================================================================
// Root-level exports
// =============================================================================

pub use trellis_core::{
    All, Attachment, Attributes, CastManager, CastPipeline, Caster, ChangeSet, CommandUnit,
    Condition, Document, Fetch, Key, ManyToManyPivot, Mapper, NoCast, Operator, Payload, Query,
    Record, Related, Relation, RelationHandler, RelationKind, RelationLoader, RelationPivot,
    ResolverRegistry, Result, SqlFragment, SyncList, TrellisError, Value, Writer,
};
pub use trellis_core::{cast, resolve};
pub use trellis_types::{Backend, BackendParseError, LockLevel};

pub use config::{ConfigError, EntityConfig, TrellisConfig};

/// Prelude module for commonly used types
pub mod prelude {
    pub use trellis_core::{
        All, Attachment, Attributes, CastManager, CastPipeline, ChangeSet, Condition, Key,
        ManyToManyPivot, Mapper, NoCast, Record, Related, Relation, RelationHandler,
        RelationLoader, RelationPivot, ResolverRegistry, SyncList, TrellisError, Value,
    };
    pub use trellis_types::prelude::*;
}
