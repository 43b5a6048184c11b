//! Relation loading.
//!
//! Every relation loads its related records for a whole batch of hosts with a
//! single `in` lookup, indexes them by foreign key and attaches them per host
//! under the relation's name.

pub mod pivot;

use std::rc::Rc;

use hashbrown::{HashMap, HashSet};

use crate::error::Result;
use crate::mapper::Mapper;
use crate::record::{Record, Related};
use crate::value::Key;

pub use pivot::{Attachment, ChangeSet, ManyToManyPivot, RelationPivot, SyncList};

/// Attaches related records to loaded hosts.
pub trait RelationHandler {
    /// Key the related records are stored under in [`Record::relations`].
    fn name(&self) -> &str;

    /// Returns `records` with this relation loaded on each of them.
    fn associate(&self, records: Vec<Record>) -> Result<Vec<Record>>;
}

/// Shape of a relation and the keys joining both sides.
#[derive(Clone)]
pub enum RelationKind {
    /// At most one related record whose `foreign_key` equals the host's
    /// `local_key`.
    HasOne {
        related: Rc<dyn Mapper>,
        foreign_key: String,
        local_key: String,
    },
    /// Every related record whose `foreign_key` equals the host's
    /// `local_key`.
    HasMany {
        related: Rc<dyn Mapper>,
        foreign_key: String,
        local_key: String,
    },
    /// Related records linked through pivot rows whose main key equals the
    /// host's `local_key` and whose attached key equals the related primary
    /// key.
    BelongsToMany {
        related: Rc<dyn Mapper>,
        pivot: ManyToManyPivot,
        local_key: String,
    },
}

/// A named relation of one host entity type.
#[derive(Clone)]
pub struct Relation {
    name: String,
    kind: RelationKind,
}

impl Relation {
    pub fn new(name: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn has_one(
        name: impl Into<String>,
        related: Rc<dyn Mapper>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            RelationKind::HasOne {
                related,
                foreign_key: foreign_key.into(),
                local_key: local_key.into(),
            },
        )
    }

    pub fn has_many(
        name: impl Into<String>,
        related: Rc<dyn Mapper>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            RelationKind::HasMany {
                related,
                foreign_key: foreign_key.into(),
                local_key: local_key.into(),
            },
        )
    }

    pub fn belongs_to_many(
        name: impl Into<String>,
        related: Rc<dyn Mapper>,
        pivot: ManyToManyPivot,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            RelationKind::BelongsToMany {
                related,
                pivot,
                local_key: local_key.into(),
            },
        )
    }

    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }
}

impl RelationHandler for Relation {
    fn name(&self) -> &str {
        &self.name
    }

    fn associate(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        match &self.kind {
            RelationKind::HasOne {
                related,
                foreign_key,
                local_key,
            } => {
                let index = load_grouped(related.as_ref(), foreign_key, local_key, &records)?;
                Ok(attach(records, &self.name, local_key, |key| {
                    let first = key
                        .and_then(|key| index.get(key))
                        .and_then(|group| group.first().cloned());
                    Related::One(first.map(Box::new))
                }))
            }
            RelationKind::HasMany {
                related,
                foreign_key,
                local_key,
            } => {
                let index = load_grouped(related.as_ref(), foreign_key, local_key, &records)?;
                Ok(attach(records, &self.name, local_key, |key| {
                    Related::Many(key.and_then(|key| index.get(key)).cloned().unwrap_or_default())
                }))
            }
            RelationKind::BelongsToMany {
                related,
                pivot,
                local_key,
            } => {
                let hosts = distinct_keys(&records, local_key);
                let links = pivot.links(&hosts)?;

                let guests = distinct(links.iter().map(|(_, guest)| guest.clone()));
                let guest_index = if guests.is_empty() {
                    HashMap::new()
                } else {
                    let primary_key = related.primary_key();
                    related
                        .query()
                        .in_array(primary_key, &guests)
                        .all(&[])?
                        .into_iter()
                        .filter_map(|row| {
                            let record = Record::new(row);
                            record.key(primary_key).map(|key| (key, record))
                        })
                        .collect::<HashMap<Key, Record>>()
                };

                let mut grouped: HashMap<Key, Vec<Record>> = HashMap::new();
                for (host, guest) in links {
                    if let Some(record) = guest_index.get(&guest) {
                        grouped.entry(host).or_default().push(record.clone());
                    }
                }

                Ok(attach(records, &self.name, local_key, |key| {
                    Related::Many(key.and_then(|key| grouped.get(key)).cloned().unwrap_or_default())
                }))
            }
        }
    }
}

/// Distinct non-null values of `attribute`, in first-seen order.
fn distinct_keys(records: &[Record], attribute: &str) -> Vec<Key> {
    distinct(records.iter().filter_map(|record| record.key(attribute)))
}

fn distinct(keys: impl Iterator<Item = Key>) -> Vec<Key> {
    let mut seen = HashSet::new();
    keys.filter(|key| seen.insert(key.clone())).collect()
}

/// Related records of every host, fetched with one `in` lookup and grouped by
/// `foreign_key`. Issues no lookup when no host has a key.
fn load_grouped(
    related: &dyn Mapper,
    foreign_key: &str,
    local_key: &str,
    records: &[Record],
) -> Result<HashMap<Key, Vec<Record>>> {
    let keys = distinct_keys(records, local_key);
    let mut index: HashMap<Key, Vec<Record>> = HashMap::new();
    if keys.is_empty() {
        return Ok(index);
    }

    for row in related.query().in_array(foreign_key, &keys).all(&[])? {
        let record = Record::new(row);
        if let Some(key) = record.key(foreign_key) {
            index.entry(key).or_default().push(record);
        }
    }
    Ok(index)
}

fn attach(
    records: Vec<Record>,
    name: &str,
    local_key: &str,
    mut related_for: impl FnMut(Option<&Key>) -> Related,
) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            let key = record.key(local_key);
            let related = related_for(key.as_ref());
            record.set_relation(name, related);
            record
        })
        .collect()
}

//------------------------------------------------------------------------------
// RelationLoader
//------------------------------------------------------------------------------

/// Named relations loaded together onto a batch of records.
#[derive(Default)]
pub struct RelationLoader {
    relations: Vec<Box<dyn RelationHandler>>,
}

impl RelationLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, relation: impl RelationHandler + 'static) -> Self {
        self.relations.push(Box::new(relation));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.iter().map(|relation| relation.name())
    }

    /// Runs every relation over `records`, in registration order.
    pub fn load(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        self.relations
            .iter()
            .try_fold(records, |records, relation| relation.associate(records))
    }
}
