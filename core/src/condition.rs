//! Storage-agnostic conditions.
//!
//! A [`Condition`] only says *what* must hold. Turning it into something a
//! backend can run is the job of [`crate::resolve::ResolverRegistry`].

use std::fmt;

use crate::value::Value;

/// Operator tag of a condition. Resolvers are registered per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    IsNull,
    /// Conjunction: every child must hold
    Must,
    /// Disjunction: at least one child must hold
    Should,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 11] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::Must,
        Operator::Should,
    ];

    /// Returns `true` for operators whose operands are nested conditions.
    #[inline]
    pub const fn is_group(self) -> bool {
        matches!(self, Operator::Must | Operator::Should)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::IsNull => "is_null",
            Operator::Must => "must",
            Operator::Should => "should",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable logical condition.
///
/// Field conditions carry one operand value (a [`Value::List`] for `in` and
/// `not_in`, [`Value::Null`] for `is_null`); group conditions carry child
/// conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Field {
        operator: Operator,
        field: String,
        value: Value,
    },
    Group {
        operator: Operator,
        children: Vec<Condition>,
    },
}

impl Condition {
    fn field(operator: Operator, field: impl Into<String>, value: Value) -> Self {
        Condition::Field {
            operator,
            field: field.into(),
            value,
        }
    }

    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(Operator::Equal, field, value.into())
    }

    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(Operator::NotEqual, field, value.into())
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(Operator::GreaterThan, field, value.into())
    }

    pub fn greater_than_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(Operator::GreaterThanOrEqual, field, value.into())
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(Operator::LessThan, field, value.into())
    }

    pub fn less_than_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(Operator::LessThanOrEqual, field, value.into())
    }

    pub fn in_array<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::field(Operator::In, field, Value::List(values))
    }

    pub fn not_in_array<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::field(Operator::NotIn, field, Value::List(values))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::field(Operator::IsNull, field, Value::Null)
    }

    pub fn must(children: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Group {
            operator: Operator::Must,
            children: children.into_iter().collect(),
        }
    }

    pub fn should(children: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Group {
            operator: Operator::Should,
            children: children.into_iter().collect(),
        }
    }

    #[inline]
    pub const fn operator(&self) -> Operator {
        match self {
            Condition::Field { operator, .. } | Condition::Group { operator, .. } => *operator,
        }
    }

    /// `(field, value)` of a field condition.
    pub fn parameters(&self) -> Option<(&str, &Value)> {
        match self {
            Condition::Field { field, value, .. } => Some((field.as_str(), value)),
            Condition::Group { .. } => None,
        }
    }

    /// Child conditions of a group condition; empty for field conditions.
    pub fn children(&self) -> &[Condition] {
        match self {
            Condition::Group { children, .. } => children,
            Condition::Field { .. } => &[],
        }
    }
}
