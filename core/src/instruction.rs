//! Selection executors.

use smallvec::SmallVec;
use trellis_types::LockLevel;

use crate::condition::Condition;
use crate::error::Result;
use crate::mapper::Mapper;
use crate::record::Record;
use crate::relation::{RelationHandler, RelationLoader};

/// Loads every record matching a set of conditions, then its relations.
#[derive(Default)]
pub struct All {
    conditions: SmallVec<[Condition; 4]>,
    projection: Vec<String>,
    lock: LockLevel,
    relations: RelationLoader,
}

impl All {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Restricts the loaded attributes. Keys used by relations must be part
    /// of the projection.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn lock(mut self, lock: LockLevel) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn with(mut self, relation: impl RelationHandler + 'static) -> Self {
        self.relations = self.relations.with(relation);
        self
    }

    pub fn relations(&self) -> &RelationLoader {
        &self.relations
    }

    pub fn execute(&self, mapper: &dyn Mapper) -> Result<Vec<Record>> {
        let query = self
            .conditions
            .iter()
            .cloned()
            .fold(mapper.query(), |query, condition| query.apply(condition))
            .lock(self.lock);

        let projection: Vec<&str> = self.projection.iter().map(String::as_str).collect();
        let records = query
            .all(&projection)?
            .into_iter()
            .map(Record::new)
            .collect();

        self.relations.load(records)
    }
}
