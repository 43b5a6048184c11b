//! The storage contract and the condition builder bound to it.
//!
//! A [`Mapper`] executes resolved [`CommandUnit`]s against one backend. Code
//! above it never builds payloads by hand: it goes through [`Query`], which
//! resolves conditions with the mapper's registry and cast pipeline, casts
//! written attributes in and fetched attributes out.

use smallvec::SmallVec;
use trellis_types::{Backend, LockLevel};

use crate::cast::{CastPipeline, NoCast};
use crate::command::CommandUnit;
use crate::condition::Condition;
use crate::error::Result;
use crate::resolve::ResolverRegistry;
use crate::value::{Attributes, Value};
use crate::writer::Writer;

/// Parameters of one read.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fetch<'a> {
    /// Rows to match; `None` matches every row.
    pub filter: Option<&'a CommandUnit>,
    /// Attributes to return; empty returns all of them.
    pub projection: &'a [&'a str],
    pub lock: LockLevel,
    pub limit: Option<usize>,
}

/// Storage for one entity type on one backend.
pub trait Mapper {
    fn backend(&self) -> Backend;

    /// Name of the primary-key attribute.
    fn primary_key(&self) -> &str;

    fn registry(&self) -> &ResolverRegistry {
        ResolverRegistry::global()
    }

    fn casts(&self) -> &dyn CastPipeline {
        &NoCast
    }

    fn writer(&self) -> Writer {
        Writer::new(self.backend())
    }

    /// A fresh condition builder; implementations return `Query::new(self)`.
    fn query(&self) -> Query<'_>;

    /// Reads the rows matching `fetch.filter`, in storage form.
    fn fetch(&self, fetch: Fetch<'_>) -> Result<Vec<Attributes>>;

    /// Stores one row and returns it as stored, primary key included.
    fn insert(&self, attributes: Attributes) -> Result<Attributes>;

    /// Overwrites `attributes` on the matching rows; returns the affected count.
    fn update(&self, filter: Option<&CommandUnit>, attributes: Attributes) -> Result<u64>;

    /// Deletes the matching rows; returns the affected count.
    fn delete(&self, filter: Option<&CommandUnit>) -> Result<u64>;
}

/// Condition builder bound to one mapper.
///
/// Conditions added to a query are combined with `must`.
pub struct Query<'m> {
    mapper: &'m dyn Mapper,
    conditions: SmallVec<[Condition; 4]>,
    lock: LockLevel,
    limit: Option<usize>,
}

impl<'m> Query<'m> {
    pub fn new(mapper: &'m dyn Mapper) -> Self {
        Self {
            mapper,
            conditions: SmallVec::new(),
            lock: LockLevel::None,
            limit: None,
        }
    }

    #[must_use]
    pub fn equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let condition = self.mapper.writer().equal(field, value);
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn in_array<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let condition = self.mapper.writer().in_array(field, values);
        self.conditions.push(condition);
        self
    }

    /// Adds an arbitrary condition.
    #[must_use]
    pub fn apply(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Lock level of the reads this query performs.
    #[must_use]
    pub fn lock(mut self, lock: LockLevel) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compiles the accumulated conditions, or `None` when there are none.
    pub fn filter(&self) -> Result<Option<CommandUnit>> {
        let condition = match self.conditions.as_slice() {
            [] => return Ok(None),
            [single] => single.clone(),
            many => self.mapper.writer().must(many.iter().cloned()),
        };
        self.mapper
            .writer()
            .compile(&condition, self.mapper.registry(), self.mapper.casts())
            .map(Some)
    }

    /// The first matching row, or `None` when nothing matches.
    pub fn first(self) -> Result<Option<Attributes>> {
        let mut rows = self.limit(1).read(&[])?;
        Ok(rows.pop())
    }

    /// Every matching row, restricted to `projection` (all attributes when
    /// empty).
    pub fn all(self, projection: &[&str]) -> Result<Vec<Attributes>> {
        self.read(projection)
    }

    /// Inserts a row and returns it as stored, cast back to domain values.
    pub fn create(self, attributes: Attributes) -> Result<Attributes> {
        let backend = self.mapper.backend();
        let casts = self.mapper.casts();
        let stored = self
            .mapper
            .insert(casts.cast_attributes_in(attributes, backend)?)?;
        casts.cast_attributes_out(stored, backend)
    }

    /// Writes `attributes` to every matching row.
    pub fn update(self, attributes: Attributes) -> Result<u64> {
        let filter = self.filter()?;
        let attributes = self
            .mapper
            .casts()
            .cast_attributes_in(attributes, self.mapper.backend())?;
        self.mapper.update(filter.as_ref(), attributes)
    }

    pub fn delete(self) -> Result<u64> {
        let filter = self.filter()?;
        self.mapper.delete(filter.as_ref())
    }

    fn read(&self, projection: &[&str]) -> Result<Vec<Attributes>> {
        let filter = self.filter()?;
        let rows = self.mapper.fetch(Fetch {
            filter: filter.as_ref(),
            projection,
            lock: self.lock,
            limit: self.limit,
        })?;

        let backend = self.mapper.backend();
        let casts = self.mapper.casts();
        rows.into_iter()
            .map(|row| casts.cast_attributes_out(row, backend))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::cast::CastManager;
    use chrono::NaiveDate;

    /// Records every call instead of storing anything.
    struct Recorder {
        casts: CastManager,
        fetches: RefCell<Vec<(Option<CommandUnit>, Vec<String>, LockLevel, Option<usize>)>>,
        writes: RefCell<Vec<Attributes>>,
        rows: Vec<Attributes>,
    }

    impl Recorder {
        fn new(rows: Vec<Attributes>) -> Self {
            Self {
                casts: CastManager::builder()
                    .attribute("born_on", "date")
                    .build()
                    .unwrap(),
                fetches: RefCell::new(Vec::new()),
                writes: RefCell::new(Vec::new()),
                rows,
            }
        }
    }

    impl Mapper for Recorder {
        fn backend(&self) -> Backend {
            Backend::Sql
        }

        fn primary_key(&self) -> &str {
            "id"
        }

        fn casts(&self) -> &dyn CastPipeline {
            &self.casts
        }

        fn query(&self) -> Query<'_> {
            Query::new(self)
        }

        fn fetch(&self, fetch: Fetch<'_>) -> Result<Vec<Attributes>> {
            self.fetches.borrow_mut().push((
                fetch.filter.cloned(),
                fetch.projection.iter().map(|s| s.to_string()).collect(),
                fetch.lock,
                fetch.limit,
            ));
            Ok(self.rows.clone())
        }

        fn insert(&self, attributes: Attributes) -> Result<Attributes> {
            self.writes.borrow_mut().push(attributes.clone());
            Ok(attributes)
        }

        fn update(&self, _filter: Option<&CommandUnit>, attributes: Attributes) -> Result<u64> {
            self.writes.borrow_mut().push(attributes);
            Ok(1)
        }

        fn delete(&self, filter: Option<&CommandUnit>) -> Result<u64> {
            Ok(u64::from(filter.is_some()))
        }
    }

    fn born(y: i32, m: u32, d: u32) -> Value {
        Value::from(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_conditions_combine_with_must() {
        let mapper = Recorder::new(Vec::new());
        let filter = mapper
            .query()
            .equal("team_id", 3)
            .in_array("id", [1, 2])
            .filter()
            .unwrap()
            .unwrap();
        assert_eq!(filter.to_string(), "(\"team_id\" = ?) AND (\"id\" IN (?, ?))");

        assert!(mapper.query().filter().unwrap().is_none());
    }

    #[test]
    fn test_reads_thread_lock_and_limit() {
        let mapper = Recorder::new(vec![Attributes::new()]);
        let row = mapper
            .query()
            .equal("id", 1)
            .lock(LockLevel::Exclusive)
            .first()
            .unwrap();
        assert!(row.is_some());

        let fetches = mapper.fetches.borrow();
        let (filter, projection, lock, limit) = &fetches[0];
        assert!(filter.is_some());
        assert!(projection.is_empty());
        assert_eq!(*lock, LockLevel::Exclusive);
        assert_eq!(*limit, Some(1));
    }

    #[test]
    fn test_first_on_no_rows_is_none() {
        let mapper = Recorder::new(Vec::new());
        assert_eq!(mapper.query().first().unwrap(), None);
    }

    #[test]
    fn test_writes_cast_in_and_reads_cast_out() {
        let mapper = Recorder::new(vec![Attributes::from([(
            "born_on".to_owned(),
            Value::from("1990-05-17"),
        )])]);

        let created = mapper
            .query()
            .create(Attributes::from([("born_on".to_owned(), born(1990, 5, 17))]))
            .unwrap();
        assert_eq!(
            mapper.writes.borrow()[0]["born_on"],
            Value::from("1990-05-17")
        );
        assert_eq!(created["born_on"], born(1990, 5, 17));

        let rows = mapper.query().all(&["born_on"]).unwrap();
        assert_eq!(rows[0]["born_on"], born(1990, 5, 17));
        assert_eq!(mapper.fetches.borrow()[0].1, vec!["born_on".to_owned()]);
    }

    #[test]
    fn test_conditions_cast_operands() {
        let mapper = Recorder::new(Vec::new());
        let filter = mapper
            .query()
            .equal("born_on", born(2000, 1, 2))
            .filter()
            .unwrap()
            .unwrap();
        assert_eq!(filter.sql().unwrap().params, vec![Value::from("2000-01-02")]);
    }
}
