//! Many-to-many link maintenance through a pivot mapper.
//!
//! A pivot row links one host key (the *main* key column) to one guest key
//! (the *attached* key column) and may carry extra attributes. Syncing diffs
//! the desired guest set against the stored links and issues the minimal
//! detach, attach and update writes; detaching always happens first.
//!
//! The pivot layer holds no locks and opens no transactions. Wrap a sync in a
//! caller-managed transaction and pass a locking [`LockLevel`] when the
//! read-then-write sequence has to be atomic.

use std::rc::Rc;

use hashbrown::{HashMap, HashSet};
use trellis_types::LockLevel;

use crate::error::{Result, TrellisError};
use crate::mapper::Mapper;
use crate::value::{Attributes, Key, Value};

/// Primitive operations on the links of one host.
pub trait RelationPivot {
    /// Reconciles the links of `host` with `desired`.
    ///
    /// With `detaching`, links missing from `desired` are removed; without it
    /// the call is additive only. Desired keys that are already linked and
    /// carry attributes have those attributes written to their pivot row.
    fn sync_by_keys(
        &self,
        host: &Key,
        desired: SyncList,
        detaching: bool,
        lock: LockLevel,
    ) -> Result<ChangeSet>;

    /// Links `guest` to `host`, or updates the existing link's attributes.
    fn attach_by_key(
        &self,
        host: &Key,
        guest: &Key,
        attributes: Attributes,
        lock: LockLevel,
    ) -> Result<Attachment>;

    /// Removes the links from `host` to each of `guests`.
    fn detach_by_keys(&self, host: &Key, guests: &[Key]) -> Result<u64>;

    /// Removes every link of `host`.
    fn detach_all(&self, host: &Key) -> Result<u64>;

    /// Guest keys currently linked to `host`.
    fn get_other_keys(&self, host: &Key) -> Result<Vec<Key>>;
}

/// Outcome of one sync call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub attached: Vec<Key>,
    pub detached: Vec<Key>,
    pub updated: Vec<Key>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty() && self.updated.is_empty()
    }
}

/// Outcome of [`RelationPivot::attach_by_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// A new pivot row was inserted.
    Created,
    /// The existing row's extra attributes were written.
    Updated,
    /// The link already existed and nothing was written.
    Unchanged,
}

//------------------------------------------------------------------------------
// SyncList
//------------------------------------------------------------------------------

/// Desired guest keys of a sync, each with the pivot attributes to store.
///
/// Keys keep the position of their first occurrence; a repeated key replaces
/// the attributes of the earlier one.
#[derive(Debug, Clone, Default)]
pub struct SyncList {
    entries: Vec<(Key, Attributes)>,
    positions: HashMap<Key, usize>,
}

impl SyncList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys without pivot attributes.
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        keys.into_iter()
            .map(|key| (key, Attributes::new()))
            .collect()
    }

    /// Keys paired with their pivot attributes.
    pub fn with_attributes<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Attributes)>,
        K: Into<Key>,
    {
        pairs.into_iter().collect()
    }

    pub fn push(&mut self, key: impl Into<Key>, attributes: Attributes) {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&position) => self.entries[position].1 = attributes,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, attributes));
            }
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Attributes)> {
        self.entries.iter().map(|(key, attributes)| (key, attributes))
    }
}

impl<K: Into<Key>> FromIterator<(K, Attributes)> for SyncList {
    fn from_iter<I: IntoIterator<Item = (K, Attributes)>>(iter: I) -> Self {
        let mut list = SyncList::new();
        for (key, attributes) in iter {
            list.push(key, attributes);
        }
        list
    }
}

impl<K: Into<Key>> From<Vec<K>> for SyncList {
    fn from(keys: Vec<K>) -> Self {
        SyncList::keys(keys)
    }
}

impl<K: Into<Key>, const N: usize> From<[K; N]> for SyncList {
    fn from(keys: [K; N]) -> Self {
        SyncList::keys(keys)
    }
}

impl IntoIterator for SyncList {
    type Item = (Key, Attributes);
    type IntoIter = std::vec::IntoIter<(Key, Attributes)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

//------------------------------------------------------------------------------
// ManyToManyPivot
//------------------------------------------------------------------------------

/// [`RelationPivot`] over a pivot mapper with a main and an attached key
/// column.
#[derive(Clone)]
pub struct ManyToManyPivot {
    pivot: Rc<dyn Mapper>,
    main_key: String,
    attached_key: String,
}

impl ManyToManyPivot {
    pub fn new(
        pivot: Rc<dyn Mapper>,
        main_key: impl Into<String>,
        attached_key: impl Into<String>,
    ) -> Self {
        Self {
            pivot,
            main_key: main_key.into(),
            attached_key: attached_key.into(),
        }
    }

    pub fn pivot(&self) -> &Rc<dyn Mapper> {
        &self.pivot
    }

    pub fn main_key(&self) -> &str {
        &self.main_key
    }

    pub fn attached_key(&self) -> &str {
        &self.attached_key
    }

    /// `(host, guest)` pairs of every link of `hosts`, read in one query.
    pub fn links(&self, hosts: &[Key]) -> Result<Vec<(Key, Key)>> {
        if hosts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .pivot
            .query()
            .in_array(self.main_key.as_str(), hosts)
            .all(&[self.main_key.as_str(), self.attached_key.as_str()])?;

        rows.iter()
            .map(|row| -> Result<(Key, Key)> {
                let host = self.read_key(row, &self.main_key)?;
                let guest = self.read_key(row, &self.attached_key)?;
                Ok((host, guest))
            })
            .collect()
    }

    /// Guest keys linked to `host`, read under `lock`, without duplicates.
    fn current_keys(&self, host: &Key, lock: LockLevel) -> Result<Vec<Key>> {
        let primary_key = self.pivot.primary_key();
        let rows = self
            .pivot
            .query()
            .equal(self.main_key.as_str(), host)
            .lock(lock)
            .all(&[primary_key, self.attached_key.as_str()])?;

        let mut seen = HashSet::with_capacity(rows.len());
        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let key = self.read_key(row, &self.attached_key)?;
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn read_key(&self, row: &Attributes, column: &str) -> Result<Key> {
        row.get(column)
            .ok_or_else(|| TrellisError::Mapping(format!("pivot row is missing `{column}`")))
            .and_then(Key::from_value)
    }

    fn insert_link(&self, host: &Key, guest: &Key, mut attributes: Attributes) -> Result<()> {
        attributes.insert(self.main_key.clone(), Value::from(host));
        attributes.insert(self.attached_key.clone(), Value::from(guest));
        self.pivot.query().create(attributes)?;
        Ok(())
    }

    fn update_link(&self, host: &Key, guest: &Key, attributes: Attributes) -> Result<u64> {
        self.pivot
            .query()
            .equal(self.main_key.as_str(), host)
            .equal(self.attached_key.as_str(), guest)
            .update(attributes)
    }
}

impl RelationPivot for ManyToManyPivot {
    fn sync_by_keys(
        &self,
        host: &Key,
        desired: SyncList,
        detaching: bool,
        lock: LockLevel,
    ) -> Result<ChangeSet> {
        let mut changes = ChangeSet::default();
        let current = self.current_keys(host, lock)?;

        if detaching {
            let to_detach: Vec<Key> = current
                .iter()
                .filter(|key| !desired.contains(key))
                .cloned()
                .collect();
            if !to_detach.is_empty() {
                self.detach_by_keys(host, &to_detach)?;
                changes.detached = to_detach;
            }
        }

        let current: HashSet<Key> = current.into_iter().collect();
        for (key, attributes) in desired {
            if !current.contains(&key) {
                self.insert_link(host, &key, attributes)?;
                changes.attached.push(key);
            } else if !attributes.is_empty() && self.update_link(host, &key, attributes)? > 0 {
                changes.updated.push(key);
            }
        }

        crate::trellis_trace_sync!(host, changes);

        Ok(changes)
    }

    fn attach_by_key(
        &self,
        host: &Key,
        guest: &Key,
        attributes: Attributes,
        lock: LockLevel,
    ) -> Result<Attachment> {
        let existing = self
            .pivot
            .query()
            .equal(self.main_key.as_str(), host)
            .equal(self.attached_key.as_str(), guest)
            .lock(lock)
            .first()?;

        let Some(row) = existing else {
            self.insert_link(host, guest, attributes)?;
            return Ok(Attachment::Created);
        };

        if attributes.is_empty() {
            return Ok(Attachment::Unchanged);
        }

        let primary_key = self.pivot.primary_key();
        let id = row.get(primary_key).cloned().ok_or_else(|| {
            TrellisError::Mapping(format!("pivot row is missing `{primary_key}`"))
        })?;
        let affected = self
            .pivot
            .query()
            .equal(primary_key, id)
            .update(attributes)?;

        Ok(if affected > 0 {
            Attachment::Updated
        } else {
            Attachment::Unchanged
        })
    }

    fn detach_by_keys(&self, host: &Key, guests: &[Key]) -> Result<u64> {
        if guests.is_empty() {
            return Ok(0);
        }
        self.pivot
            .query()
            .equal(self.main_key.as_str(), host)
            .in_array(self.attached_key.as_str(), guests)
            .delete()
    }

    fn detach_all(&self, host: &Key) -> Result<u64> {
        self.pivot
            .query()
            .equal(self.main_key.as_str(), host)
            .delete()
    }

    fn get_other_keys(&self, host: &Key) -> Result<Vec<Key>> {
        self.current_keys(host, LockLevel::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(text: &str) -> Attributes {
        Attributes::from([("note".to_owned(), Value::from(text))])
    }

    #[test]
    fn test_sync_list_keeps_first_position_and_last_attributes() {
        let list = SyncList::with_attributes([
            (3, Attributes::new()),
            (4, note("a")),
            (3, note("b")),
        ]);
        let entries: Vec<_> = list.into_iter().collect();
        assert_eq!(
            entries,
            vec![(Key::Int(3), note("b")), (Key::Int(4), note("a"))]
        );
    }

    #[test]
    fn test_sync_list_from_plain_keys() {
        let list = SyncList::from(vec!["a", "b", "a"]);
        assert_eq!(list.len(), 2);
        assert!(list.contains(&Key::from("b")));
        assert!(list.iter().all(|(_, attributes)| attributes.is_empty()));

        let list = SyncList::from([1, 2]);
        assert!(list.contains(&Key::Int(2)));
        assert!(!SyncList::new().contains(&Key::Int(2)));
    }

    #[test]
    fn test_change_set_is_empty() {
        assert!(ChangeSet::default().is_empty());
        let changes = ChangeSet {
            updated: vec![Key::Int(1)],
            ..ChangeSet::default()
        };
        assert!(!changes.is_empty());
    }
}
