//! Statement builders that resolve identifiers through the schema mapping.

use sea_orm::sea_query::{
    Alias, DeleteStatement, Expr, Func, InsertStatement, IntoTableRef, LockType, Order, Query,
    SelectStatement, SimpleExpr, TableRef, UpdateStatement,
};
use sea_orm::Value;

use super::params::ListQuery;
use crate::{
    entity::{EntityKind, FieldName, Record},
    error::AppResult,
    mapping::SchemaMapping,
};

pub(crate) fn table_ref(mapping: &SchemaMapping, kind: EntityKind) -> TableRef {
    (
        Alias::new(mapping.schema.as_str()),
        Alias::new(mapping.table(kind).table.as_str()),
    )
        .into_table_ref()
}

pub(crate) fn column<R: Record>(mapping: &SchemaMapping, field: R::Field) -> Alias {
    Alias::new(mapping.column(R::KIND, field.key()))
}

/// Selects every field aliased to its key, so rows decode independently of naming.
pub(crate) fn select<R: Record>(mapping: &SchemaMapping, query: &ListQuery<R::Field>) -> SelectStatement {
    let mut stmt = Query::select();
    for &field in <R::Field as FieldName>::ALL {
        stmt.expr_as(Expr::col(column::<R>(mapping, field)), Alias::new(field.key()));
    }
    stmt.from(table_ref(mapping, R::KIND));
    apply_filters::<R>(mapping, &mut stmt, query);

    if query.order.is_empty() {
        stmt.order_by(column::<R>(mapping, R::KEY), Order::Asc);
    }
    for &(field, order) in &query.order {
        stmt.order_by(column::<R>(mapping, field), order.into());
    }
    if let Some(limit) = query.limit {
        stmt.limit(limit);
    }
    if let Some(offset) = query.offset {
        stmt.offset(offset);
    }
    if query.for_update {
        stmt.lock(LockType::Update);
    }
    stmt
}

pub(crate) fn select_by_key<R: Record>(mapping: &SchemaMapping, key: i32) -> SelectStatement {
    let mut stmt = select::<R>(mapping, &ListQuery::new());
    stmt.and_where(Expr::col(column::<R>(mapping, R::KEY)).eq(key));
    stmt
}

pub(crate) fn count<R: Record>(mapping: &SchemaMapping, query: &ListQuery<R::Field>) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.expr_as(
        Func::count(Expr::col(column::<R>(mapping, R::KEY))),
        Alias::new("count"),
    )
    .from(table_ref(mapping, R::KIND));
    apply_filters::<R>(mapping, &mut stmt, query);
    stmt
}

fn apply_filters<R: Record>(
    mapping: &SchemaMapping,
    stmt: &mut SelectStatement,
    query: &ListQuery<R::Field>,
) {
    for (field, value) in &query.filters {
        stmt.and_where(Expr::col(column::<R>(mapping, *field)).eq(value.clone()));
    }
}

/// Insert of every non-key field, plus the key itself when `with_key` is set.
pub(crate) fn insert<R: Record>(
    mapping: &SchemaMapping,
    record: &R,
    with_key: bool,
) -> AppResult<InsertStatement> {
    let mut columns = Vec::new();
    let mut values: Vec<SimpleExpr> = Vec::new();
    if with_key {
        columns.push(column::<R>(mapping, R::KEY));
        values.push(Value::from(record.key()).into());
    }
    for (field, value) in record.values() {
        columns.push(column::<R>(mapping, field));
        values.push(value.into());
    }

    let mut stmt = Query::insert();
    stmt.into_table(table_ref(mapping, R::KIND))
        .columns(columns)
        .values(values)?;
    Ok(stmt)
}

pub(crate) fn update<R: Record>(mapping: &SchemaMapping, record: &R) -> UpdateStatement {
    let values: Vec<(Alias, SimpleExpr)> = record
        .values()
        .into_iter()
        .map(|(field, value)| (column::<R>(mapping, field), value.into()))
        .collect();
    let mut stmt = Query::update();
    stmt.table(table_ref(mapping, R::KIND))
        .values(values)
        .and_where(Expr::col(column::<R>(mapping, R::KEY)).eq(record.key()));
    stmt
}

pub(crate) fn update_where<R: Record>(
    mapping: &SchemaMapping,
    field: R::Field,
    value: Value,
    query: &ListQuery<R::Field>,
) -> UpdateStatement {
    let mut stmt = Query::update();
    stmt.table(table_ref(mapping, R::KIND))
        .value(column::<R>(mapping, field), value);
    for (filter, filter_value) in &query.filters {
        stmt.and_where(Expr::col(column::<R>(mapping, *filter)).eq(filter_value.clone()));
    }
    stmt
}

pub(crate) fn delete<R: Record>(mapping: &SchemaMapping, query: &ListQuery<R::Field>) -> DeleteStatement {
    let mut stmt = Query::delete();
    stmt.from_table(table_ref(mapping, R::KIND));
    for (field, value) in &query.filters {
        stmt.and_where(Expr::col(column::<R>(mapping, *field)).eq(value.clone()));
    }
    stmt
}

pub(crate) fn delete_by_key<R: Record>(mapping: &SchemaMapping, key: i32) -> DeleteStatement {
    let mut stmt = delete::<R>(mapping, &ListQuery::new());
    stmt.and_where(Expr::col(column::<R>(mapping, R::KEY)).eq(key));
    stmt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{Category, Product, product},
        mapping::NamingScheme,
        store::params::SortOrder,
    };
    use rust_decimal_macros::dec;
    use sea_orm::sea_query::PostgresQueryBuilder;

    fn pascal() -> SchemaMapping {
        SchemaMapping::preset(NamingScheme::PascalCase, "public")
    }

    #[test]
    fn select_aliases_mapped_columns_to_field_keys() {
        let sql = select::<Category>(&pascal(), &ListQuery::new()).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""CategoryId" AS "category_id""#), "{sql}");
        assert!(sql.contains(r#"FROM "public"."Categories""#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "CategoryId" ASC"#), "{sql}");
    }

    #[test]
    fn filters_and_paging_use_mapped_names() {
        let query = ListQuery::new()
            .filter(product::Field::CategoryId, 3)
            .order_by(product::Field::Price, SortOrder::Desc)
            .paginate(&crate::store::Pagination::new(2, 5));
        let sql = select::<Product>(&SchemaMapping::default(), &query).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"WHERE "category_id" = 3"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "price" DESC"#), "{sql}");
        assert!(sql.contains("LIMIT 5"), "{sql}");
        assert!(sql.contains("OFFSET 5"), "{sql}");
    }

    #[test]
    fn insert_omits_key_unless_requested() {
        let mapping = pascal();
        let mut keyboard = Product::new(5, "Keyboard", dec!(9.99), None);
        keyboard.product_id = 13;

        let sql = insert(&mapping, &keyboard, false).unwrap().to_string(PostgresQueryBuilder);
        assert!(!sql.contains(r#""ProductId""#), "{sql}");
        assert!(sql.contains(r#"INSERT INTO "public"."Products""#), "{sql}");

        let sql = insert(&mapping, &keyboard, true).unwrap().to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""ProductId""#), "{sql}");
        assert!(sql.contains("13"), "{sql}");
    }

    #[test]
    fn update_targets_key() {
        let mut audio = Category::new("Audio", None);
        audio.category_id = 4;
        let sql = update(&pascal(), &audio).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"UPDATE "public"."Categories""#), "{sql}");
        assert!(sql.contains(r#"WHERE "CategoryId" = 4"#), "{sql}");
    }
}
