//! Document-store resolvers: operator sub-documents such as
//! `{field: {$lte: value}}`.

use std::collections::BTreeSet;

use super::{Resolution, ResolverRegistry, leaf};
use crate::condition::{Condition, Operator};
use crate::error::Result;
use crate::value::{Document, Value};

pub(crate) fn register(registry: &mut ResolverRegistry) {
    registry
        .register_document(Operator::Equal, equal)
        .register_document(Operator::NotEqual, not_equal)
        .register_document(Operator::GreaterThan, greater_than)
        .register_document(Operator::GreaterThanOrEqual, greater_than_or_equal)
        .register_document(Operator::LessThan, less_than)
        .register_document(Operator::LessThanOrEqual, less_than_or_equal)
        .register_document(Operator::In, in_array)
        .register_document(Operator::NotIn, not_in_array)
        .register_document(Operator::IsNull, is_null)
        .register_document(Operator::Must, must)
        .register_document(Operator::Should, should);
}

fn operator_document(field: &str, operator: &str, value: Value) -> Document {
    let mut inner = Document::new();
    inner.insert(operator.to_owned(), value);

    let mut document = Document::new();
    document.insert(field.to_owned(), Value::Document(inner));
    document
}

fn comparison(
    condition: &Condition,
    resolution: &Resolution<'_>,
    operator: &str,
) -> Result<Document> {
    let (field, value) = leaf(condition)?;
    let value = resolution.cast_in(field, value)?;
    Ok(operator_document(field, operator, value))
}

pub fn equal(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    comparison(condition, resolution, "$eq")
}

pub fn not_equal(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    comparison(condition, resolution, "$ne")
}

pub fn greater_than(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    comparison(condition, resolution, "$gt")
}

pub fn greater_than_or_equal(
    condition: &Condition,
    resolution: &Resolution<'_>,
) -> Result<Document> {
    comparison(condition, resolution, "$gte")
}

pub fn less_than(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    comparison(condition, resolution, "$lt")
}

pub fn less_than_or_equal(
    condition: &Condition,
    resolution: &Resolution<'_>,
) -> Result<Document> {
    comparison(condition, resolution, "$lte")
}

pub fn in_array(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    let (field, value) = leaf(condition)?;
    let values = resolution.cast_each(field, value)?;
    Ok(operator_document(field, "$in", Value::List(values)))
}

pub fn not_in_array(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    let (field, value) = leaf(condition)?;
    let values = resolution.cast_each(field, value)?;
    Ok(operator_document(field, "$nin", Value::List(values)))
}

pub fn is_null(condition: &Condition, _resolution: &Resolution<'_>) -> Result<Document> {
    let (field, _) = leaf(condition)?;
    Ok(operator_document(field, "$eq", Value::Null))
}

/// Children merge into one document. When two children constrain the same
/// top-level key the merge would lose one of them, so `$and` is used instead.
pub fn must(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    let documents = children(condition, resolution)?;

    let mut seen = BTreeSet::new();
    let overlapping = documents
        .iter()
        .flat_map(Document::keys)
        .any(|key| !seen.insert(key));

    if overlapping {
        let mut document = Document::new();
        document.insert("$and".to_owned(), into_list(documents));
        return Ok(document);
    }

    Ok(documents.into_iter().flatten().collect())
}

pub fn should(condition: &Condition, resolution: &Resolution<'_>) -> Result<Document> {
    let documents = children(condition, resolution)?;
    let mut document = Document::new();
    document.insert("$or".to_owned(), into_list(documents));
    Ok(document)
}

fn children(condition: &Condition, resolution: &Resolution<'_>) -> Result<Vec<Document>> {
    condition
        .children()
        .iter()
        .map(|child| resolution.document(child))
        .collect()
}

fn into_list(documents: Vec<Document>) -> Value {
    Value::List(documents.into_iter().map(Value::Document).collect())
}
