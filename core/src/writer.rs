//! Condition constructors bound to one backend.

use trellis_types::Backend;

use crate::cast::CastPipeline;
use crate::command::CommandUnit;
use crate::condition::Condition;
use crate::error::Result;
use crate::resolve::ResolverRegistry;
use crate::value::{Attributes, Value};

/// Builds conditions for a mapper and compiles them for its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Writer {
    backend: Backend,
}

impl Writer {
    pub const fn new(backend: Backend) -> Self {
        Self { backend }
    }

    #[inline]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    pub fn equal(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::equal(field, value)
    }

    pub fn not_equal(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::not_equal(field, value)
    }

    pub fn greater_than(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::greater_than(field, value)
    }

    pub fn greater_than_or_equal(
        &self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Condition {
        Condition::greater_than_or_equal(field, value)
    }

    pub fn less_than(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::less_than(field, value)
    }

    pub fn less_than_or_equal(
        &self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Condition {
        Condition::less_than_or_equal(field, value)
    }

    pub fn in_array<I, V>(&self, field: impl Into<String>, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::in_array(field, values)
    }

    pub fn not_in_array<I, V>(&self, field: impl Into<String>, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::not_in_array(field, values)
    }

    pub fn is_null(&self, field: impl Into<String>) -> Condition {
        Condition::is_null(field)
    }

    pub fn must(&self, conditions: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::must(conditions)
    }

    pub fn should(&self, conditions: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::should(conditions)
    }

    /// Conjunction of one equality per attribute.
    pub fn matching(&self, attributes: &Attributes) -> Condition {
        self.must(
            attributes
                .iter()
                .map(|(field, value)| self.equal(field.as_str(), value.clone())),
        )
    }

    /// Resolves `condition` for this writer's backend.
    pub fn compile(
        &self,
        condition: &Condition,
        registry: &ResolverRegistry,
        casts: &dyn CastPipeline,
    ) -> Result<CommandUnit> {
        registry.resolve(self.backend, condition, casts)
    }
}
