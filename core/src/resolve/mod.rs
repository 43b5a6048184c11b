//! Condition resolution.
//!
//! The [`ResolverRegistry`] compiles a [`Condition`] into a [`CommandUnit`]
//! for one backend. Every (operator, backend) pair has exactly one resolver
//! function. Resolvers for the row store return a [`SqlFragment`], resolvers
//! for the document store return a [`Document`], so a resolver registered for
//! one backend cannot produce the other backend's payload.
//!
//! ```
//! use trellis_core::cast::NoCast;
//! use trellis_core::resolve::ResolverRegistry;
//! use trellis_core::Condition;
//! use trellis_types::Backend;
//!
//! let condition = Condition::less_than_or_equal("age", 30);
//! let unit = ResolverRegistry::global().resolve(Backend::Document, &condition, &NoCast)?;
//! assert_eq!(unit.to_string(), r#"{"age":{"$lte":30}}"#);
//! # Ok::<(), trellis_core::TrellisError>(())
//! ```

pub mod document;
pub mod sql;

use std::sync::OnceLock;

use hashbrown::HashMap;
use trellis_types::Backend;

use crate::cast::CastPipeline;
use crate::command::{CommandUnit, Payload, SqlFragment};
use crate::condition::{Condition, Operator};
use crate::error::{Result, TrellisError};
use crate::value::{Document, Value};

/// Row-store resolver for one operator.
pub type SqlResolver = fn(&Condition, &Resolution<'_>) -> Result<SqlFragment>;

/// Document-store resolver for one operator.
pub type DocumentResolver = fn(&Condition, &Resolution<'_>) -> Result<Document>;

/// State of one `resolve` call, handed to every resolver it reaches.
pub struct Resolution<'a> {
    registry: &'a ResolverRegistry,
    casts: &'a dyn CastPipeline,
    backend: Backend,
}

impl<'a> Resolution<'a> {
    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Casts a condition operand into the backend's native form.
    pub fn cast_in(&self, field: &str, value: &Value) -> Result<Value> {
        self.casts.cast_in(field, value.clone(), self.backend)
    }

    /// Casts every element of a list operand; a scalar counts as a
    /// one-element list.
    pub fn cast_each(&self, field: &str, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::List(values) => values
                .iter()
                .map(|value| self.cast_in(field, value))
                .collect(),
            scalar => Ok(vec![self.cast_in(field, scalar)?]),
        }
    }

    /// Resolves a nested condition for the row store.
    pub fn sql(&self, condition: &Condition) -> Result<SqlFragment> {
        let operator = condition.operator();
        let resolver = self
            .registry
            .sql
            .get(&operator)
            .ok_or(TrellisError::Resolution {
                operator,
                backend: Backend::Sql,
            })?;
        resolver(condition, self)
    }

    /// Resolves a nested condition for the document store.
    pub fn document(&self, condition: &Condition) -> Result<Document> {
        let operator = condition.operator();
        let resolver = self
            .registry
            .document
            .get(&operator)
            .ok_or(TrellisError::Resolution {
                operator,
                backend: Backend::Document,
            })?;
        resolver(condition, self)
    }
}

/// `(field, value)` of a field condition handed to a leaf resolver.
pub(crate) fn leaf(condition: &Condition) -> Result<(&str, &Value)> {
    condition.parameters().ok_or_else(|| {
        TrellisError::Mapping(format!(
            "`{}` resolver expects a field condition",
            condition.operator()
        ))
    })
}

/// Resolver functions keyed by operator, one table per backend.
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    sql: HashMap<Operator, SqlResolver>,
    document: HashMap<Operator, DocumentResolver>,
}

impl ResolverRegistry {
    /// A registry without any resolver.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in operator registered for every backend.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        sql::register(&mut registry);
        document::register(&mut registry);
        registry
    }

    /// Process-wide standard registry, built on first use.
    pub fn global() -> &'static ResolverRegistry {
        static GLOBAL: OnceLock<ResolverRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ResolverRegistry::standard)
    }

    /// Registers (or replaces) the row-store resolver of `operator`.
    pub fn register_sql(&mut self, operator: Operator, resolver: SqlResolver) -> &mut Self {
        self.sql.insert(operator, resolver);
        self
    }

    /// Registers (or replaces) the document-store resolver of `operator`.
    pub fn register_document(
        &mut self,
        operator: Operator,
        resolver: DocumentResolver,
    ) -> &mut Self {
        self.document.insert(operator, resolver);
        self
    }

    pub fn contains(&self, operator: Operator, backend: Backend) -> bool {
        match backend {
            Backend::Sql => self.sql.contains_key(&operator),
            Backend::Document => self.document.contains_key(&operator),
        }
    }

    /// Every (operator, backend) pair without a resolver.
    pub fn missing(&self) -> Vec<(Operator, Backend)> {
        Operator::ALL
            .into_iter()
            .flat_map(|operator| Backend::ALL.into_iter().map(move |backend| (operator, backend)))
            .filter(|(operator, backend)| !self.contains(*operator, *backend))
            .collect()
    }

    /// Fails with the first uncovered pair, if any.
    pub fn ensure_total(&self) -> Result<()> {
        match self.missing().first() {
            Some(&(operator, backend)) => Err(TrellisError::Resolution { operator, backend }),
            None => Ok(()),
        }
    }

    /// Compiles `condition` for `backend`, casting operands through `casts`.
    ///
    /// Pass [`NoCast`](crate::cast::NoCast) to resolve without casting.
    pub fn resolve(
        &self,
        backend: Backend,
        condition: &Condition,
        casts: &dyn CastPipeline,
    ) -> Result<CommandUnit> {
        let resolution = Resolution {
            registry: self,
            casts,
            backend,
        };

        let payload = match backend {
            Backend::Sql => Payload::Sql(resolution.sql(condition)?),
            Backend::Document => Payload::Document(resolution.document(condition)?),
        };
        let unit = CommandUnit::new(payload);

        crate::trellis_trace_command!(backend, unit);

        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{CastManager, NoCast};
    use chrono::NaiveDate;

    fn every_condition() -> Vec<Condition> {
        Operator::ALL
            .into_iter()
            .map(|operator| match operator {
                Operator::Equal => Condition::equal("a", 1),
                Operator::NotEqual => Condition::not_equal("a", 1),
                Operator::GreaterThan => Condition::greater_than("a", 1),
                Operator::GreaterThanOrEqual => Condition::greater_than_or_equal("a", 1),
                Operator::LessThan => Condition::less_than("a", 1),
                Operator::LessThanOrEqual => Condition::less_than_or_equal("a", 1),
                Operator::In => Condition::in_array("a", [1, 2]),
                Operator::NotIn => Condition::not_in_array("a", [1, 2]),
                Operator::IsNull => Condition::is_null("a"),
                Operator::Must => Condition::must([Condition::equal("a", 1)]),
                Operator::Should => Condition::should([Condition::equal("a", 1)]),
            })
            .collect()
    }

    #[test]
    fn test_standard_registry_is_total() {
        let registry = ResolverRegistry::standard();
        assert!(registry.missing().is_empty());
        assert!(registry.ensure_total().is_ok());

        for condition in every_condition() {
            for backend in Backend::ALL {
                let unit = registry.resolve(backend, &condition, &NoCast).unwrap();
                assert_eq!(unit.backend(), backend, "{}", condition.operator());
            }
        }
    }

    #[test]
    fn test_missing_resolver_fails_fast() {
        let mut registry = ResolverRegistry::empty();
        registry.register_sql(Operator::Equal, sql::equal);

        let condition = Condition::equal("a", 1);
        assert!(registry.resolve(Backend::Sql, &condition, &NoCast).is_ok());
        assert!(matches!(
            registry.resolve(Backend::Document, &condition, &NoCast),
            Err(TrellisError::Resolution {
                operator: Operator::Equal,
                backend: Backend::Document
            })
        ));
        assert!(registry.missing().contains(&(Operator::Must, Backend::Sql)));
        assert!(registry.ensure_total().is_err());
    }

    #[test]
    fn test_resolution_casts_operands() {
        let casts = CastManager::builder()
            .attribute("born_on", "date")
            .build()
            .unwrap();
        let born = NaiveDate::from_ymd_opt(2001, 9, 9)
            .unwrap()
            .and_hms_opt(1, 46, 40)
            .unwrap();
        let condition = Condition::less_than_or_equal("born_on", born);

        let unit = ResolverRegistry::global()
            .resolve(Backend::Document, &condition, &casts)
            .unwrap();
        let document = unit.document().unwrap();
        assert_eq!(
            document["born_on"].as_document().unwrap()["$lte"],
            Value::UtcDateTime(1_000_000_000_000 - 6_400_000)
        );

        let unit = ResolverRegistry::global()
            .resolve(Backend::Sql, &condition, &casts)
            .unwrap();
        let fragment = unit.sql().unwrap();
        assert_eq!(fragment.sql, "\"born_on\" <= ?");
        assert_eq!(fragment.params, vec![Value::from("2001-09-09")]);
    }

    #[test]
    fn test_resolution_leaves_condition_untouched() {
        let condition = Condition::must([
            Condition::equal("a", 1),
            Condition::in_array("b", ["x", "y"]),
        ]);
        let before = condition.clone();
        for backend in Backend::ALL {
            ResolverRegistry::global()
                .resolve(backend, &condition, &NoCast)
                .unwrap();
        }
        assert_eq!(condition, before);
    }
}
