use std::collections::BTreeMap;

use gadgets_store::{
    AppError, NamingScheme, SchemaMapping, Store,
    entity::{Category, EntityKind, Order, OrderDetail, order::ShippingDetails},
    mapping::TableMapping,
    normalize,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

fn pascal() -> SchemaMapping {
    SchemaMapping::preset(NamingScheme::PascalCase, "public")
}

fn shipping(email: &str) -> ShippingDetails {
    ShippingDetails {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        address: "12 Analytical Row".into(),
        city: "London".into(),
        state: "Greater London".into(),
        postal_code: "N1 9GU".into(),
        country: "United Kingdom".into(),
        phone: "+44 20 7946 0000".into(),
        email: email.into(),
    }
}

#[tokio::test]
async fn invalid_order_writes_nothing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = Store::new(db, SchemaMapping::default()).unwrap();

    let order = Order::new(normalize::now(), None, shipping(""));
    let details = [OrderDetail::new(0, 1, 1, dec!(9.99))];
    let err = store.place_order(&order, &details).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    assert!(store.into_connection().into_transaction_log().is_empty());
}

#[tokio::test]
async fn unstorable_amounts_are_rejected_before_writing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = Store::new(db, SchemaMapping::default()).unwrap();
    let order = Order::new(normalize::now(), None, shipping("ada@example.com"));

    let overflow = [OrderDetail::new(0, 1, 2, Decimal::MAX)];
    let err = store.place_order(&order, &overflow).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    let too_large = [
        OrderDetail::new(0, 1, 1, normalize::MAX_MONEY),
        OrderDetail::new(0, 2, 1, normalize::MAX_MONEY),
    ];
    let err = store.place_order(&order, &too_large).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");

    assert!(store.into_connection().into_transaction_log().is_empty());
}

#[tokio::test]
async fn order_without_details_is_rejected_before_writing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = Store::new(db, SchemaMapping::default()).unwrap();

    let order = Order::new(normalize::now(), None, shipping("ada@example.com"));
    let err = store.place_order(&order, &[]).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");
    assert!(store.into_connection().into_transaction_log().is_empty());
}

#[tokio::test]
async fn find_uses_mapped_identifiers() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![BTreeMap::from([
            ("category_id", Value::from(2i32)),
            ("name", Value::from("Laptops")),
            ("description", Value::from(Some("Latest Laptops in 2022".to_string()))),
        ])]])
        .into_connection();
    let store = Store::new(db, pascal()).unwrap();

    let category = store.categories().get(2).await.unwrap();
    assert_eq!(category.name, "Laptops");

    let log = store.into_connection().into_transaction_log();
    assert_eq!(log.len(), 1);
    let sql = &log[0].statements()[0].sql;
    assert!(sql.contains(r#""public"."Categories""#), "{sql}");
    assert!(sql.contains(r#""CategoryId" AS "category_id""#), "{sql}");
    assert!(sql.contains(r#""Description" AS "description""#), "{sql}");
}

#[tokio::test]
async fn create_reads_back_store_assigned_key() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![BTreeMap::from([("CategoryId", Value::from(6i32))])]])
        .into_connection();
    let store = Store::new(db, pascal()).unwrap();

    let created = store
        .categories()
        .create(&Category::new("Wearables", None))
        .await
        .unwrap();
    assert_eq!(created.category_id, 6);
    assert_eq!(created.name, "Wearables");

    let log = store.into_connection().into_transaction_log();
    let sql = &log[0].statements()[0].sql;
    assert!(sql.starts_with(r#"INSERT INTO "public"."Categories""#), "{sql}");
    assert!(sql.contains(r#"RETURNING "CategoryId""#), "{sql}");
    assert!(!sql.contains(r#"("CategoryId""#), "{sql}");
}

#[tokio::test]
async fn blank_category_name_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = Store::new(db, SchemaMapping::default()).unwrap();

    let err = store
        .categories()
        .create(&Category::new("   ", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn delete_of_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let store = Store::new(db, SchemaMapping::default()).unwrap();

    let err = store.products().delete(404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound), "{err:?}");
}

#[tokio::test]
async fn checkout_of_empty_cart_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
        .into_connection();
    let store = Store::new(db, SchemaMapping::default()).unwrap();

    let order = Order::new(normalize::now(), None, shipping("ada@example.com"));
    let err = store.checkout("cart-1", &order).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");
}

#[test]
fn store_refuses_invalid_mapping() {
    let mut mapping = SchemaMapping::default();
    mapping.set_table(
        EntityKind::Product,
        TableMapping {
            table: "categories".into(),
            columns: BTreeMap::new(),
        },
    );
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    assert!(matches!(Store::new(db, mapping), Err(AppError::Mapping(_))));
}
