//! In-memory document store.
//!
//! [`MemoryCollection`] executes document command units the way a document
//! database would: `{field: {$op: operand}}` matchers combined implicitly,
//! plus `$and` and `$or` lists. It assigns integer primary keys and enforces
//! declared unique attribute sets, which makes it a complete [`Mapper`] for
//! tests and embedded use.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use trellis_core::cast::{CastManager, CastPipeline};
use trellis_core::mapper::{Fetch, Mapper, Query};
use trellis_core::{
    Attributes, CommandUnit, Document, Result, TrellisError, Value, trellis_trace_execute,
};
use trellis_types::{Backend, LockLevel};

use crate::config::{ConfigError, EntityConfig};

static NULL: Value = Value::Null;

/// A named collection of documents held in memory.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    primary_key: String,
    unique: Vec<Vec<String>>,
    casts: CastManager,
    rows: RefCell<Vec<Attributes>>,
    next_id: Cell<i64>,
    last_lock: Cell<LockLevel>,
    fetches: Cell<usize>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_owned(),
            unique: Vec::new(),
            casts: CastManager::default(),
            rows: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            last_lock: Cell::new(LockLevel::None),
            fetches: Cell::new(0),
        }
    }

    /// Builds a collection from a document-backend entity declaration.
    pub fn from_config(config: &EntityConfig) -> std::result::Result<Self, ConfigError> {
        config.expect_backend(Backend::Document)?;
        let mut collection = Self::new(config.storage.as_str())
            .with_primary_key(config.primary_key.as_str())
            .with_casts(config.cast_manager()?);
        for attributes in &config.unique {
            collection = collection.unique(attributes.iter().map(String::as_str));
        }
        Ok(collection)
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Declares a set of attributes whose combined values must be unique.
    #[must_use]
    pub fn unique<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique
            .push(attributes.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_casts(mut self, casts: CastManager) -> Self {
        self.casts = casts;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of every stored document, in insertion order.
    pub fn rows(&self) -> Vec<Attributes> {
        self.rows.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Lock level of the most recent fetch.
    pub fn last_lock(&self) -> LockLevel {
        self.last_lock.get()
    }

    /// Number of fetches executed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    fn filter_document<'a>(filter: Option<&'a CommandUnit>) -> Result<Option<&'a Document>> {
        filter.map(CommandUnit::document).transpose()
    }

    fn selected(row: &Attributes, filter: Option<&Document>) -> Result<bool> {
        match filter {
            Some(filter) => matches(row, filter),
            None => Ok(true),
        }
    }

    /// Fails when `candidate` collides with a row other than `skip` on the
    /// primary key or any unique set.
    fn check_unique(
        &self,
        rows: &[Attributes],
        candidate: &Attributes,
        skip: Option<usize>,
    ) -> Result<()> {
        let primary = std::slice::from_ref(&self.primary_key);
        let sets = std::iter::once(primary).chain(self.unique.iter().map(Vec::as_slice));

        for set in sets {
            let values: Vec<&Value> = set
                .iter()
                .map(|attribute| candidate.get(attribute).unwrap_or(&NULL))
                .collect();
            if values.iter().any(|value| value.is_null()) {
                continue;
            }

            let collides = rows.iter().enumerate().any(|(index, row)| {
                Some(index) != skip
                    && set.iter().zip(&values).all(|(attribute, value)| {
                        row.get(attribute)
                            .is_some_and(|stored| equals(stored, value))
                    })
            });
            if collides {
                return Err(TrellisError::ConstraintViolation(format!(
                    "duplicate ({}) in collection `{}`",
                    set.join(", "),
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl Mapper for MemoryCollection {
    fn backend(&self) -> Backend {
        Backend::Document
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn casts(&self) -> &dyn CastPipeline {
        &self.casts
    }

    fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    fn fetch(&self, fetch: Fetch<'_>) -> Result<Vec<Attributes>> {
        let filter = Self::filter_document(fetch.filter)?;
        trellis_trace_execute!("memory", "fetch", self.name);

        self.last_lock.set(fetch.lock);
        self.fetches.set(self.fetches.get() + 1);

        let rows = self.rows.borrow();
        let mut found = Vec::new();
        for row in rows.iter() {
            if fetch.limit.is_some_and(|limit| found.len() >= limit) {
                break;
            }
            if !Self::selected(row, filter)? {
                continue;
            }
            let row = if fetch.projection.is_empty() {
                row.clone()
            } else {
                row.iter()
                    .filter(|(name, _)| fetch.projection.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            };
            found.push(row);
        }
        Ok(found)
    }

    fn insert(&self, mut attributes: Attributes) -> Result<Attributes> {
        trellis_trace_execute!("memory", "insert", self.name);

        let id = match attributes.get(&self.primary_key) {
            None | Some(Value::Null) => {
                let id = self.next_id.get();
                attributes.insert(self.primary_key.clone(), Value::Integer(id));
                id
            }
            Some(value) => value.as_i64().unwrap_or(0),
        };

        let mut rows = self.rows.borrow_mut();
        self.check_unique(&rows, &attributes, None)?;
        self.next_id.set(self.next_id.get().max(id.saturating_add(1)));
        rows.push(attributes.clone());
        Ok(attributes)
    }

    fn update(&self, filter: Option<&CommandUnit>, attributes: Attributes) -> Result<u64> {
        let filter = Self::filter_document(filter)?;
        trellis_trace_execute!("memory", "update", self.name);

        let mut rows = self.rows.borrow_mut();
        let mut selected = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if Self::selected(row, filter)? {
                selected.push(index);
            }
        }

        // Uniqueness holds for the state after every selected row changed,
        // so updated rows are checked against each other too.
        let mut staged = rows.clone();
        for &index in &selected {
            staged[index].extend(attributes.clone());
        }
        for &index in &selected {
            self.check_unique(&staged, &staged[index], Some(index))?;
        }

        *rows = staged;
        Ok(selected.len() as u64)
    }

    fn delete(&self, filter: Option<&CommandUnit>) -> Result<u64> {
        let filter = Self::filter_document(filter)?;
        trellis_trace_execute!("memory", "delete", self.name);

        let mut rows = self.rows.borrow_mut();
        let selected = rows
            .iter()
            .map(|row| Self::selected(row, filter))
            .collect::<Result<Vec<bool>>>()?;

        let mut flags = selected.iter();
        rows.retain(|_| !flags.next().copied().unwrap_or(false));
        Ok(selected.iter().filter(|&&removed| removed).count() as u64)
    }
}

//------------------------------------------------------------------------------
// Matching
//------------------------------------------------------------------------------

/// Evaluates a filter document against one stored document.
pub fn matches(row: &Attributes, filter: &Document) -> Result<bool> {
    for (key, predicate) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for document in documents(key, predicate)? {
                    if !matches(row, document)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for document in documents(key, predicate)? {
                    if matches(row, document)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            field => field_matches(row.get(field).unwrap_or(&NULL), predicate)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn documents<'a>(operator: &str, predicate: &'a Value) -> Result<Vec<&'a Document>> {
    let invalid = || TrellisError::Execution(format!("`{operator}` expects a list of documents"));
    predicate
        .as_list()
        .ok_or_else(invalid)?
        .iter()
        .map(|value| value.as_document().ok_or_else(invalid))
        .collect()
}

fn field_matches(value: &Value, predicate: &Value) -> Result<bool> {
    let Value::Document(operators) = predicate else {
        return Ok(equals(value, predicate));
    };

    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => value.compare(operand) == Some(Ordering::Greater),
            "$gte" => matches!(
                value.compare(operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            "$lt" => value.compare(operand) == Some(Ordering::Less),
            "$lte" => matches!(
                value.compare(operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            "$in" => operand_list(operator, operand)?
                .iter()
                .any(|candidate| equals(value, candidate)),
            "$nin" => !operand_list(operator, operand)?
                .iter()
                .any(|candidate| equals(value, candidate)),
            other => {
                return Err(TrellisError::Execution(format!(
                    "unsupported query operator `{other}`"
                )));
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn operand_list<'a>(operator: &str, operand: &'a Value) -> Result<&'a [Value]> {
    operand
        .as_list()
        .ok_or_else(|| TrellisError::Execution(format!("`{operator}` expects a list")))
}

fn equals(left: &Value, right: &Value) -> bool {
    left.compare(right) == Some(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Condition, ResolverRegistry, cast::NoCast};

    fn row(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    fn filter(condition: Condition) -> CommandUnit {
        ResolverRegistry::global()
            .resolve(Backend::Document, &condition, &NoCast)
            .unwrap()
    }

    #[test]
    fn test_matches_operators() {
        let document = row(&[("age", Value::Integer(30)), ("name", Value::from("Ada"))]);
        let cases = [
            (Condition::equal("age", 30), true),
            (Condition::not_equal("age", 30), false),
            (Condition::greater_than("age", 29), true),
            (Condition::greater_than_or_equal("age", 30), true),
            (Condition::less_than("age", 30), false),
            (Condition::less_than_or_equal("age", 30), true),
            (Condition::in_array("name", ["Ada", "Grace"]), true),
            (Condition::not_in_array("name", ["Ada"]), false),
            (Condition::is_null("deleted_at"), true),
            (Condition::is_null("name"), false),
            (
                Condition::must([Condition::greater_than("age", 18), Condition::less_than("age", 65)]),
                true,
            ),
            (
                Condition::should([Condition::equal("name", "Grace"), Condition::equal("age", 30)]),
                true,
            ),
            (Condition::should([]), false),
            (Condition::must([]), true),
        ];

        for (condition, expected) in cases {
            let unit = filter(condition.clone());
            assert_eq!(
                matches(&document, unit.document().unwrap()).unwrap(),
                expected,
                "{condition:?}"
            );
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let collection = MemoryCollection::new("things");
        let first = collection.insert(row(&[("name", Value::from("a"))])).unwrap();
        let second = collection.insert(row(&[("name", Value::from("b"))])).unwrap();
        assert_eq!(first["id"], Value::Integer(1));
        assert_eq!(second["id"], Value::Integer(2));

        collection.insert(row(&[("id", Value::Integer(10))])).unwrap();
        let next = collection.insert(Attributes::new()).unwrap();
        assert_eq!(next["id"], Value::Integer(11));
    }

    #[test]
    fn test_multi_row_update_cannot_create_duplicates() {
        let collection = MemoryCollection::new("links").unique(["user_id", "role_id"]);
        for role in [1, 2] {
            collection
                .insert(row(&[("user_id", Value::Integer(1)), ("role_id", Value::Integer(role))]))
                .unwrap();
        }
        let before = collection.rows();

        assert!(matches!(
            collection.update(None, row(&[("role_id", Value::Integer(9))])),
            Err(TrellisError::ConstraintViolation(_))
        ));
        assert_eq!(collection.rows(), before);
    }

    #[test]
    fn test_multi_row_update_with_distinct_results() {
        let collection = MemoryCollection::new("links").unique(["user_id", "role_id"]);
        for user in [1, 2] {
            collection
                .insert(row(&[("user_id", Value::Integer(user)), ("role_id", Value::Integer(1))]))
                .unwrap();
        }
        assert_eq!(
            collection
                .update(None, row(&[("role_id", Value::Integer(9))]))
                .unwrap(),
            2
        );
        assert!(
            collection
                .rows()
                .iter()
                .all(|link| link["role_id"] == Value::Integer(9))
        );
    }

    #[test]
    fn test_explicit_max_id_does_not_overflow() {
        let collection = MemoryCollection::new("things");
        collection
            .insert(row(&[("id", Value::Integer(i64::MAX))]))
            .unwrap();
        assert!(matches!(
            collection.insert(Attributes::new()),
            Err(TrellisError::ConstraintViolation(_))
        ));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_unique_sets_are_enforced() {
        let collection = MemoryCollection::new("links").unique(["user_id", "role_id"]);
        let link = row(&[("user_id", Value::Integer(1)), ("role_id", Value::Integer(2))]);
        collection.insert(link.clone()).unwrap();
        assert!(matches!(
            collection.insert(link),
            Err(TrellisError::ConstraintViolation(_))
        ));
        assert!(matches!(
            collection.insert(row(&[("id", Value::Integer(1))])),
            Err(TrellisError::ConstraintViolation(_))
        ));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_update_and_delete_count_rows() {
        let collection = MemoryCollection::new("things");
        for n in 0..4 {
            collection.insert(row(&[("n", Value::Integer(n))])).unwrap();
        }

        let odd = filter(Condition::in_array("n", [1, 3]));
        let updated = collection
            .update(Some(&odd), row(&[("odd", Value::Bool(true))]))
            .unwrap();
        assert_eq!(updated, 2);

        let removed = collection.delete(Some(&odd)).unwrap();
        assert_eq!(removed, 2);
        assert!(collection.rows().iter().all(|row| !row.contains_key("odd")));
        assert_eq!(collection.delete(None).unwrap(), 2);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_sql_units_are_rejected() {
        let collection = MemoryCollection::new("things");
        let unit = ResolverRegistry::global()
            .resolve(Backend::Sql, &Condition::equal("a", 1), &NoCast)
            .unwrap();
        assert!(matches!(
            collection.delete(Some(&unit)),
            Err(TrellisError::BackendMismatch {
                expected: Backend::Document,
                found: Backend::Sql
            })
        ));
    }

    #[test]
    fn test_fetch_projects_and_records_lock() {
        let collection = MemoryCollection::new("things");
        collection
            .insert(row(&[("a", Value::Integer(1)), ("b", Value::Integer(2))]))
            .unwrap();

        let rows = collection
            .fetch(Fetch {
                projection: &["b"],
                lock: LockLevel::Shared,
                ..Fetch::default()
            })
            .unwrap();
        assert_eq!(rows, vec![row(&[("b", Value::Integer(2))])]);
        assert_eq!(collection.last_lock(), LockLevel::Shared);
        assert_eq!(collection.fetch_count(), 1);
    }
}
