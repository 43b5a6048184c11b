//! Row-store resolvers: parameterized predicate fragments with `?` placeholders.

use super::{Resolution, ResolverRegistry, leaf};
use crate::command::SqlFragment;
use crate::condition::{Condition, Operator};
use crate::error::Result;
use crate::value::Value;

pub(crate) fn register(registry: &mut ResolverRegistry) {
    registry
        .register_sql(Operator::Equal, equal)
        .register_sql(Operator::NotEqual, not_equal)
        .register_sql(Operator::GreaterThan, greater_than)
        .register_sql(Operator::GreaterThanOrEqual, greater_than_or_equal)
        .register_sql(Operator::LessThan, less_than)
        .register_sql(Operator::LessThanOrEqual, less_than_or_equal)
        .register_sql(Operator::In, in_array)
        .register_sql(Operator::NotIn, not_in_array)
        .register_sql(Operator::IsNull, is_null)
        .register_sql(Operator::Must, must)
        .register_sql(Operator::Should, should);
}

/// Quotes an identifier, doubling embedded quotes.
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn comparison(
    condition: &Condition,
    resolution: &Resolution<'_>,
    operator: &str,
) -> Result<SqlFragment> {
    let (field, value) = leaf(condition)?;
    let value = resolution.cast_in(field, value)?;
    Ok(SqlFragment::new(
        format!("{} {operator} ?", quote(field)),
        vec![value],
    ))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub fn equal(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    let (field, value) = leaf(condition)?;
    match resolution.cast_in(field, value)? {
        Value::Null => Ok(SqlFragment::raw(format!("{} IS NULL", quote(field)))),
        value => Ok(SqlFragment::new(format!("{} = ?", quote(field)), vec![value])),
    }
}

pub fn not_equal(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    let (field, value) = leaf(condition)?;
    match resolution.cast_in(field, value)? {
        Value::Null => Ok(SqlFragment::raw(format!("{} IS NOT NULL", quote(field)))),
        value => Ok(SqlFragment::new(format!("{} <> ?", quote(field)), vec![value])),
    }
}

pub fn greater_than(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    comparison(condition, resolution, ">")
}

pub fn greater_than_or_equal(
    condition: &Condition,
    resolution: &Resolution<'_>,
) -> Result<SqlFragment> {
    comparison(condition, resolution, ">=")
}

pub fn less_than(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    comparison(condition, resolution, "<")
}

pub fn less_than_or_equal(
    condition: &Condition,
    resolution: &Resolution<'_>,
) -> Result<SqlFragment> {
    comparison(condition, resolution, "<=")
}

/// `"field" IN (?, ?)`; an empty list renders `IN (NULL)`, which matches nothing.
pub fn in_array(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    let (field, value) = leaf(condition)?;
    let values = resolution.cast_each(field, value)?;
    if values.is_empty() {
        return Ok(SqlFragment::raw(format!("{} IN (NULL)", quote(field))));
    }
    Ok(SqlFragment::new(
        format!("{} IN ({})", quote(field), placeholders(values.len())),
        values,
    ))
}

/// `"field" NOT IN (?, ?)`; an empty list matches everything.
pub fn not_in_array(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    let (field, value) = leaf(condition)?;
    let values = resolution.cast_each(field, value)?;
    if values.is_empty() {
        return Ok(SqlFragment::raw("1 = 1"));
    }
    Ok(SqlFragment::new(
        format!("{} NOT IN ({})", quote(field), placeholders(values.len())),
        values,
    ))
}

pub fn is_null(condition: &Condition, _resolution: &Resolution<'_>) -> Result<SqlFragment> {
    let (field, _) = leaf(condition)?;
    Ok(SqlFragment::raw(format!("{} IS NULL", quote(field))))
}

pub fn must(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    group(condition, resolution, " AND ", "1 = 1")
}

pub fn should(condition: &Condition, resolution: &Resolution<'_>) -> Result<SqlFragment> {
    group(condition, resolution, " OR ", "1 = 0")
}

fn group(
    condition: &Condition,
    resolution: &Resolution<'_>,
    separator: &str,
    when_empty: &str,
) -> Result<SqlFragment> {
    let children = condition.children();
    if children.is_empty() {
        return Ok(SqlFragment::raw(when_empty));
    }
    let fragments = children
        .iter()
        .map(|child| resolution.sql(child))
        .collect::<Result<Vec<_>>>()?;
    Ok(SqlFragment::join(fragments, separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::NoCast;
    use trellis_types::Backend;

    fn render(condition: Condition) -> SqlFragment {
        ResolverRegistry::global()
            .resolve(Backend::Sql, &condition, &NoCast)
            .unwrap()
            .sql()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            render(Condition::equal("name", "Ada")),
            SqlFragment::new("\"name\" = ?", vec![Value::from("Ada")])
        );
        assert_eq!(render(Condition::not_equal("id", 1)).sql, "\"id\" <> ?");
        assert_eq!(render(Condition::greater_than("id", 1)).sql, "\"id\" > ?");
        assert_eq!(
            render(Condition::greater_than_or_equal("id", 1)).sql,
            "\"id\" >= ?"
        );
        assert_eq!(render(Condition::less_than("id", 1)).sql, "\"id\" < ?");
        assert_eq!(
            render(Condition::less_than_or_equal("id", 1)).sql,
            "\"id\" <= ?"
        );
    }

    #[test]
    fn test_null_equality_uses_is_null() {
        assert_eq!(
            render(Condition::equal("deleted_at", Value::Null)),
            SqlFragment::raw("\"deleted_at\" IS NULL")
        );
        assert_eq!(
            render(Condition::not_equal("deleted_at", Value::Null)).sql,
            "\"deleted_at\" IS NOT NULL"
        );
        assert_eq!(render(Condition::is_null("x")).sql, "\"x\" IS NULL");
    }

    #[test]
    fn test_in_lists() {
        assert_eq!(
            render(Condition::in_array("id", [1, 2, 3])),
            SqlFragment::new(
                "\"id\" IN (?, ?, ?)",
                vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
            )
        );
        assert_eq!(
            render(Condition::in_array("id", Vec::<i64>::new())).sql,
            "\"id\" IN (NULL)"
        );
        assert_eq!(
            render(Condition::not_in_array("id", [4])).sql,
            "\"id\" NOT IN (?)"
        );
        assert_eq!(
            render(Condition::not_in_array("id", Vec::<i64>::new())).sql,
            "1 = 1"
        );
    }

    #[test]
    fn test_groups_merge_bindings() {
        let fragment = render(Condition::must([
            Condition::equal("user_id", 1),
            Condition::should([
                Condition::equal("role_id", 2),
                Condition::in_array("role_id", [3, 4]),
            ]),
        ]));
        assert_eq!(
            fragment.sql,
            "(\"user_id\" = ?) AND ((\"role_id\" = ?) OR (\"role_id\" IN (?, ?)))"
        );
        assert_eq!(
            fragment.params,
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4)
            ]
        );
        assert_eq!(render(Condition::must([])).sql, "1 = 1");
        assert_eq!(render(Condition::should([])).sql, "1 = 0");
    }

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(quote("odd\"name"), "\"odd\"\"name\"");
    }
}
