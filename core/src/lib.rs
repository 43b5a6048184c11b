//! Core of trellis: condition resolution, casts, relation loading and pivot
//! synchronization over heterogeneous backends.

pub mod cast;
pub mod command;
pub mod condition;
pub mod error;
pub mod instruction;
pub mod mapper;
pub mod record;
pub mod relation;
pub mod resolve;
pub mod tracing;
pub mod value;
pub mod writer;

// Re-export key types and traits
pub use cast::{CastManager, CastPipeline, Caster, NoCast};
pub use command::{CommandUnit, Payload, SqlFragment};
pub use condition::{Condition, Operator};
pub use error::{Result, TrellisError};
pub use instruction::All;
pub use mapper::{Fetch, Mapper, Query};
pub use record::{Record, Related};
pub use relation::{
    Attachment, ChangeSet, ManyToManyPivot, Relation, RelationHandler, RelationKind,
    RelationLoader, RelationPivot, SyncList,
};
pub use resolve::ResolverRegistry;
pub use value::{Attributes, Document, Key, Value};
pub use writer::Writer;

pub use trellis_types::{Backend, LockLevel};
