use chrono::NaiveDate;
use trellis::prelude::*;
use trellis::{Operator, Payload, SqlFragment};

mod common;

fn born_on_casts() -> CastManager {
    CastManager::builder()
        .attribute("born_on", "date")
        .build()
        .unwrap()
}

#[test]
fn test_same_condition_compiles_per_backend() {
    let condition = Condition::must([
        Condition::equal("user_id", 1),
        Condition::in_array("role_id", [2, 3]),
    ]);

    let sql = ResolverRegistry::global()
        .resolve(Backend::Sql, &condition, &NoCast)
        .unwrap();
    assert_eq!(
        sql.payload(),
        &Payload::Sql(SqlFragment::new(
            "(\"user_id\" = ?) AND (\"role_id\" IN (?, ?))",
            vec![Value::from(1), Value::from(2), Value::from(3)],
        ))
    );

    let document = ResolverRegistry::global()
        .resolve(Backend::Document, &condition, &NoCast)
        .unwrap();
    assert_eq!(
        document.to_string(),
        r#"{"role_id":{"$in":[2,3]},"user_id":{"$eq":1}}"#
    );
}

#[test]
fn test_date_condition_is_cast_per_backend() {
    let born = NaiveDate::from_ymd_opt(1990, 5, 17)
        .unwrap()
        .and_hms_opt(13, 45, 0)
        .unwrap();
    let condition = Condition::less_than_or_equal("born_on", born);
    let casts = born_on_casts();

    let sql = ResolverRegistry::global()
        .resolve(Backend::Sql, &condition, &casts)
        .unwrap();
    assert_eq!(sql.sql().unwrap().params, vec![Value::from("1990-05-17")]);

    let document = ResolverRegistry::global()
        .resolve(Backend::Document, &condition, &casts)
        .unwrap();
    assert_eq!(
        document.to_string(),
        r#"{"born_on":{"$lte":{"$date":642902400000}}}"#
    );

    let uncast = ResolverRegistry::global()
        .resolve(Backend::Document, &condition, &NoCast)
        .unwrap();
    assert_eq!(
        uncast.to_string(),
        r#"{"born_on":{"$lte":"1990-05-17T13:45:00"}}"#
    );
}

#[test]
fn test_in_list_elements_are_cast_individually() {
    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    let condition = Condition::in_array("born_on", [day(1), day(2)]);

    let unit = ResolverRegistry::global()
        .resolve(Backend::Sql, &condition, &born_on_casts())
        .unwrap();
    assert_eq!(
        unit.sql().unwrap(),
        &SqlFragment::new(
            "\"born_on\" IN (?, ?)",
            vec![Value::from("2024-03-01"), Value::from("2024-03-02")]
        )
    );
}

#[test]
fn test_units_refuse_the_other_backend() {
    let unit = ResolverRegistry::global()
        .resolve(Backend::Sql, &Condition::is_null("x"), &NoCast)
        .unwrap();
    assert!(matches!(
        unit.document(),
        Err(TrellisError::BackendMismatch {
            expected: Backend::Document,
            found: Backend::Sql
        })
    ));
}

#[test]
fn test_custom_operator_registration() {
    let mut registry = ResolverRegistry::standard();
    registry.register_sql(Operator::IsNull, |condition, _| {
        let field = condition.parameters().map_or("?", |(field, _)| field);
        Ok(SqlFragment::raw(format!("{field} ISNULL")))
    });

    let unit = registry
        .resolve(Backend::Sql, &Condition::is_null("deleted_at"), &NoCast)
        .unwrap();
    assert_eq!(unit.to_string(), "deleted_at ISNULL");
    assert!(registry.ensure_total().is_ok());
}
