//! Loaded entities and their associated relations.

use std::collections::BTreeMap;

use crate::value::{Attributes, Key, Value};

/// Relation data attached to a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// To-one relation; `None` marks an absent related record.
    One(Option<Box<Record>>),
    /// To-many relation, possibly empty.
    Many(Vec<Record>),
}

impl Related {
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Related::One(record) => record.as_deref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[Record] {
        match self {
            Related::Many(records) => records,
            Related::One(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub attributes: Attributes,
    pub relations: BTreeMap<String, Related>,
}

impl Record {
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            relations: BTreeMap::new(),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// The non-null key stored under `attribute`, if any.
    pub fn key(&self, attribute: &str) -> Option<Key> {
        self.get(attribute)
            .and_then(|value| Key::from_nullable(value).ok().flatten())
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn set_relation(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }
}

impl From<Attributes> for Record {
    fn from(attributes: Attributes) -> Self {
        Record::new(attributes)
    }
}
