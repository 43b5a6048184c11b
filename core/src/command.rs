//! Backend-tagged compiled conditions.

use std::fmt;

use trellis_types::Backend;

use crate::error::{Result, TrellisError};
use crate::value::{Document, Value};

/// Parameterized predicate fragment for the row store.
///
/// `sql` uses positional `?` placeholders; `params` holds the bound values in
/// placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment without bound values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Joins fragments with `separator`, wrapping each one in parentheses and
    /// concatenating bindings in order.
    pub fn join(fragments: Vec<SqlFragment>, separator: &str) -> Self {
        let mut sql = String::new();
        let mut params = Vec::new();
        for (index, fragment) in fragments.into_iter().enumerate() {
            if index > 0 {
                sql.push_str(separator);
            }
            sql.push('(');
            sql.push_str(&fragment.sql);
            sql.push(')');
            params.extend(fragment.params);
        }
        Self { sql, params }
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Backend-native payload of a [`CommandUnit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Sql(SqlFragment),
    Document(Document),
}

impl Payload {
    #[inline]
    pub const fn backend(&self) -> Backend {
        match self {
            Payload::Sql(_) => Backend::Sql,
            Payload::Document(_) => Backend::Document,
        }
    }
}

/// A condition compiled for exactly one backend.
///
/// The backend tag is derived from the payload, so a unit can never claim one
/// backend while carrying another backend's payload. Execution layers read the
/// payload through [`CommandUnit::sql`] or [`CommandUnit::document`], which
/// refuse units compiled for a different backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandUnit {
    payload: Payload,
}

impl CommandUnit {
    pub const fn new(payload: Payload) -> Self {
        Self { payload }
    }

    #[inline]
    pub const fn backend(&self) -> Backend {
        self.payload.backend()
    }

    #[inline]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The row-store fragment, or `BackendMismatch`.
    pub fn sql(&self) -> Result<&SqlFragment> {
        match &self.payload {
            Payload::Sql(fragment) => Ok(fragment),
            Payload::Document(_) => Err(TrellisError::BackendMismatch {
                expected: Backend::Sql,
                found: Backend::Document,
            }),
        }
    }

    /// The document-store operator document, or `BackendMismatch`.
    pub fn document(&self) -> Result<&Document> {
        match &self.payload {
            Payload::Document(document) => Ok(document),
            Payload::Sql(_) => Err(TrellisError::BackendMismatch {
                expected: Backend::Document,
                found: Backend::Sql,
            }),
        }
    }
}

impl fmt::Display for CommandUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Sql(fragment) => write!(f, "{fragment}"),
            Payload::Document(document) => {
                write!(f, "{}", Value::Document(document.clone()).to_json())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_wraps_and_merges_params() {
        let joined = SqlFragment::join(
            vec![
                SqlFragment::new("\"a\" = ?", vec![Value::Integer(1)]),
                SqlFragment::new("\"b\" <= ?", vec![Value::Integer(2)]),
            ],
            " AND ",
        );
        assert_eq!(joined.sql, "(\"a\" = ?) AND (\"b\" <= ?)");
        assert_eq!(joined.params, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_unit_refuses_foreign_backend() {
        let unit = CommandUnit::new(Payload::Sql(SqlFragment::raw("1 = 1")));
        assert_eq!(unit.backend(), Backend::Sql);
        assert!(unit.sql().is_ok());
        assert!(matches!(
            unit.document(),
            Err(TrellisError::BackendMismatch {
                expected: Backend::Document,
                found: Backend::Sql
            })
        ));
    }
}
