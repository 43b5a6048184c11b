#![allow(dead_code)]

use std::rc::Rc;

use trellis::memory::MemoryCollection;
use trellis::prelude::*;

/// Builds an attribute map from `(name, value)` pairs.
pub fn attributes(pairs: &[(&str, Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect()
}

pub fn keys(values: &[i64]) -> Vec<Key> {
    values.iter().copied().map(Key::from).collect()
}

pub fn sorted(mut keys: Vec<Key>) -> Vec<Key> {
    keys.sort();
    keys
}

/// A `user_roles` pivot collection, unique on (user_id, role_id).
pub fn user_roles() -> (Rc<MemoryCollection>, ManyToManyPivot) {
    let store = Rc::new(MemoryCollection::new("user_roles").unique(["user_id", "role_id"]));
    let mapper: Rc<dyn Mapper> = store.clone();
    (store, ManyToManyPivot::new(mapper, "user_id", "role_id"))
}

/// Inserts `rows` into a fresh collection named `name`.
pub fn collection(name: &str, rows: Vec<Attributes>) -> Rc<MemoryCollection> {
    let store = Rc::new(MemoryCollection::new(name));
    for row in rows {
        store.insert(row).expect("seed row");
    }
    store
}
