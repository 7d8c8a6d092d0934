//! Idempotent schema provisioning and migrations between naming schemes.

use sea_orm::sea_query::{
    Alias, ColumnDef, ForeignKey, ForeignKeyAction, ForeignKeyCreateStatement, Index,
    IndexCreateStatement, PostgresQueryBuilder, Table, TableCreateStatement,
};
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use serde::Serialize;

use crate::{
    db::{qualified, quote_ident},
    entity::{ColumnKind, EntityKind},
    error::AppResult,
    mapping::SchemaMapping,
    store::query::table_ref,
};

/// Creates the schema, tables, foreign keys and foreign-key indexes that are missing.
pub async fn ensure_schema<C: ConnectionTrait>(db: &C, mapping: &SchemaMapping) -> AppResult<()> {
    for sql in schema_statements(mapping) {
        db.execute_unprepared(&sql).await?;
    }
    tracing::info!(schema = %mapping.schema, "schema ensured");
    Ok(())
}

/// The idempotent DDL [`ensure_schema`] runs, in execution order.
pub fn schema_statements(mapping: &SchemaMapping) -> Vec<String> {
    let mut statements = vec![format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        quote_ident(&mapping.schema)
    )];
    for kind in EntityKind::ALL {
        statements.push(create_table(mapping, kind).to_string(PostgresQueryBuilder));
        for index in foreign_key_indexes(mapping, kind) {
            statements.push(index.to_string(PostgresQueryBuilder));
        }
    }
    statements
}

pub(crate) fn create_table(mapping: &SchemaMapping, kind: EntityKind) -> TableCreateStatement {
    let table = mapping.table(kind);
    let mut stmt = Table::create();
    stmt.table(table_ref(mapping, kind)).if_not_exists();

    for (key, spec) in kind.columns() {
        let column = table.column(key);
        let mut def = ColumnDef::new(Alias::new(column));
        match spec.kind {
            ColumnKind::Serial => {
                def.integer().auto_increment().primary_key();
            }
            ColumnKind::Integer => {
                def.integer();
            }
            ColumnKind::Text => {
                def.text();
            }
            ColumnKind::VarChar(len) => {
                def.string_len(len);
            }
            ColumnKind::Money => {
                def.decimal_len(19, 4);
            }
            ColumnKind::Timestamp => {
                def.timestamp_with_time_zone();
            }
        }
        if spec.nullable {
            def.null();
        } else {
            def.not_null();
        }
        stmt.col(def);

        if let Some(target) = spec.references {
            stmt.foreign_key(&mut foreign_key(mapping, kind, key, target));
        }
    }
    stmt
}

fn foreign_key(
    mapping: &SchemaMapping,
    kind: EntityKind,
    key: &str,
    target: EntityKind,
) -> ForeignKeyCreateStatement {
    let table = mapping.table(kind);
    let column = table.column(key);
    ForeignKey::create()
        .name(format!("fk_{}_{}", table.table, column))
        .from(table_ref(mapping, kind), Alias::new(column))
        .to(
            table_ref(mapping, target),
            Alias::new(mapping.column(target, target.key_field())),
        )
        .on_delete(ForeignKeyAction::Restrict)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

fn foreign_key_indexes(mapping: &SchemaMapping, kind: EntityKind) -> Vec<IndexCreateStatement> {
    let table = mapping.table(kind);
    kind.columns()
        .into_iter()
        .filter(|(_, spec)| spec.references.is_some())
        .map(|(key, _)| {
            let column = table.column(key);
            Index::create()
                .if_not_exists()
                .name(format!("ix_{}_{}", table.table, column))
                .table(table_ref(mapping, kind))
                .col(Alias::new(column))
                .to_owned()
        })
        .collect()
}

#[derive(Debug, Clone)]
struct ColumnInfo {
    data_type: String,
    numeric_scale: Option<i32>,
}

async fn column_info<C: ConnectionTrait>(
    db: &C,
    schema: &str,
    table: &str,
    column: &str,
) -> AppResult<Option<ColumnInfo>> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT data_type::text AS data_type, numeric_scale::int4 AS numeric_scale
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
        "#,
        [schema.into(), table.into(), column.into()],
    );
    let Some(row) = db.query_one(stmt).await? else {
        return Ok(None);
    };
    Ok(Some(ColumnInfo {
        data_type: row.try_get("", "data_type")?,
        numeric_scale: row.try_get("", "numeric_scale")?,
    }))
}

async fn has_foreign_key<C: ConnectionTrait>(
    db: &C,
    schema: &str,
    table: &str,
    column: &str,
) -> AppResult<bool> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT 1 AS present
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON kcu.constraint_schema = tc.constraint_schema
         AND kcu.constraint_name = tc.constraint_name
        WHERE tc.constraint_type = 'FOREIGN KEY'
          AND tc.table_schema = $1 AND tc.table_name = $2 AND kcu.column_name = $3
        LIMIT 1
        "#,
        [schema.into(), table.into(), column.into()],
    );
    Ok(db.query_one(stmt).await?.is_some())
}

async fn table_exists<C: ConnectionTrait>(db: &C, schema: &str, table: &str) -> AppResult<bool> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT 1 AS present
        FROM information_schema.tables
        WHERE table_schema = $1 AND table_name = $2
        "#,
        [schema.into(), table.into()],
    );
    Ok(db.query_one(stmt).await?.is_some())
}

/// Brings money columns to numeric(19, 4), naive timestamps to `timestamptz`,
/// and adds foreign keys missing from tables created by older revisions.
///
/// Stored naive timestamps are interpreted as UTC. Already-current columns and
/// constraints are left alone, so this is safe to run on every start. Adding a
/// foreign key fails while orphaned rows exist.
pub async fn upgrade_column_types<C: ConnectionTrait>(
    db: &C,
    mapping: &SchemaMapping,
) -> AppResult<Vec<String>> {
    let mut applied = Vec::new();
    for kind in EntityKind::ALL {
        let table = mapping.table(kind);
        for (key, spec) in kind.columns() {
            let column = table.column(key);
            let Some(info) = column_info(db, &mapping.schema, &table.table, column).await? else {
                tracing::warn!(table = %table.table, column, "column missing, type upgrade skipped");
                continue;
            };
            let target = qualified(&mapping.schema, &table.table);
            let quoted = quote_ident(column);
            let sql = match spec.kind {
                ColumnKind::Money
                    if info.data_type != "numeric" || info.numeric_scale.unwrap_or(0) < 4 =>
                {
                    format!(
                        "ALTER TABLE {target} ALTER COLUMN {quoted} TYPE numeric(19, 4) USING {quoted}::numeric(19, 4)"
                    )
                }
                ColumnKind::Timestamp if info.data_type == "timestamp without time zone" => {
                    format!(
                        "ALTER TABLE {target} ALTER COLUMN {quoted} TYPE timestamptz USING {quoted} AT TIME ZONE 'UTC'"
                    )
                }
                _ => continue,
            };
            db.execute_unprepared(&sql).await?;
            tracing::info!(table = %table.table, column, from = %info.data_type, "column type upgraded");
            applied.push(sql);
        }

        for (key, spec) in kind.columns() {
            let Some(parent) = spec.references else {
                continue;
            };
            let column = table.column(key);
            if column_info(db, &mapping.schema, &table.table, column).await?.is_none()
                || has_foreign_key(db, &mapping.schema, &table.table, column).await?
            {
                continue;
            }
            let sql = foreign_key(mapping, kind, key, parent).to_string(PostgresQueryBuilder);
            db.execute_unprepared(&sql).await?;
            tracing::info!(table = %table.table, column, "foreign key added");
            applied.push(sql);
        }
    }
    Ok(applied)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MigrationStep {
    MoveSchema {
        entity: EntityKind,
        table: String,
        from: String,
        to: String,
    },
    RenameTable {
        entity: EntityKind,
        schema: String,
        from: String,
        to: String,
    },
    RenameColumn {
        entity: EntityKind,
        schema: String,
        table: String,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<MigrationStep>,
    pub skipped: Vec<MigrationStep>,
}

/// Ordered steps that turn tables laid out by `from` into tables laid out by `to`.
///
/// Per entity: move to the new schema under the old name, rename the table,
/// then rename its columns.
pub fn plan_migration(from: &SchemaMapping, to: &SchemaMapping) -> Vec<MigrationStep> {
    let mut steps = Vec::new();
    for kind in EntityKind::ALL {
        let old = from.table(kind);
        let new = to.table(kind);

        if from.schema != to.schema {
            steps.push(MigrationStep::MoveSchema {
                entity: kind,
                table: old.table.clone(),
                from: from.schema.clone(),
                to: to.schema.clone(),
            });
        }
        if old.table != new.table {
            steps.push(MigrationStep::RenameTable {
                entity: kind,
                schema: to.schema.clone(),
                from: old.table.clone(),
                to: new.table.clone(),
            });
        }
        for key in kind.field_keys() {
            let (old_col, new_col) = (old.column(key), new.column(key));
            if old_col != new_col {
                steps.push(MigrationStep::RenameColumn {
                    entity: kind,
                    schema: to.schema.clone(),
                    table: new.table.clone(),
                    from: old_col.to_string(),
                    to: new_col.to_string(),
                });
            }
        }
    }
    steps
}

/// Applies [`plan_migration`], skipping steps whose source is gone or whose target exists.
pub async fn migrate_mapping<C: ConnectionTrait>(
    db: &C,
    from: &SchemaMapping,
    to: &SchemaMapping,
) -> AppResult<MigrationReport> {
    let mut report = MigrationReport::default();
    let steps = plan_migration(from, to);
    if steps.is_empty() {
        return Ok(report);
    }

    db.execute_unprepared(&format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        quote_ident(&to.schema)
    ))
    .await?;

    for step in steps {
        let sql = match &step {
            MigrationStep::MoveSchema {
                table, from, to, ..
            } => (table_exists(db, from, table).await? && !table_exists(db, to, table).await?)
                .then(|| format!("ALTER TABLE {} SET SCHEMA {}", qualified(from, table), quote_ident(to))),
            MigrationStep::RenameTable {
                schema, from, to, ..
            } => (table_exists(db, schema, from).await? && !table_exists(db, schema, to).await?)
                .then(|| format!("ALTER TABLE {} RENAME TO {}", qualified(schema, from), quote_ident(to))),
            MigrationStep::RenameColumn {
                schema,
                table,
                from,
                to,
                ..
            } => (column_info(db, schema, table, from).await?.is_some()
                && column_info(db, schema, table, to).await?.is_none())
            .then(|| {
                format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    qualified(schema, table),
                    quote_ident(from),
                    quote_ident(to)
                )
            }),
        };

        match sql {
            Some(sql) => {
                db.execute_unprepared(&sql).await?;
                tracing::info!(?step, "migration step applied");
                report.applied.push(step);
            }
            None => {
                tracing::warn!(?step, "migration step skipped");
                report.skipped.push(step);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::NamingScheme;

    #[test]
    fn product_table_has_fixed_point_price_and_restricting_key() {
        let mapping = SchemaMapping::preset(NamingScheme::PascalCase, "public");
        let sql = create_table(&mapping, EntityKind::Product).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"CREATE TABLE IF NOT EXISTS "public"."Products""#), "{sql}");
        assert!(sql.contains("(19, 4)"), "{sql}");
        assert!(sql.contains(r#"REFERENCES "public"."Categories""#), "{sql}");
        assert!(sql.contains("ON DELETE RESTRICT"), "{sql}");
    }

    #[test]
    fn timestamps_carry_time_zone() {
        let sql = create_table(&SchemaMapping::default(), EntityKind::Order).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""order_date" timestamp with time zone NOT NULL"#), "{sql}");
        assert!(sql.contains(r#""username" text NULL"#), "{sql}");
    }

    #[test]
    fn only_reference_columns_get_indexes() {
        let mapping = SchemaMapping::default();
        assert_eq!(foreign_key_indexes(&mapping, EntityKind::Category).len(), 0);
        assert_eq!(foreign_key_indexes(&mapping, EntityKind::OrderDetail).len(), 2);
    }

    #[test]
    fn schema_statements_create_parents_first() {
        let statements = schema_statements(&SchemaMapping::preset(NamingScheme::PascalCase, "shop"));
        assert_eq!(statements[0], r#"CREATE SCHEMA IF NOT EXISTS "shop""#);
        assert!(statements.iter().all(|sql| sql.contains("IF NOT EXISTS")));

        let position = |needle: &str| {
            statements
                .iter()
                .position(|sql| sql.starts_with(&format!(r#"CREATE TABLE IF NOT EXISTS "shop"."{needle}""#)))
                .unwrap()
        };
        assert!(position("Categories") < position("Products"));
        assert!(position("Products") < position("Carts"));
        assert!(position("Orders") < position("OrderDetails"));
    }

    #[test]
    fn added_foreign_key_matches_table_definition() {
        let mapping = SchemaMapping::preset(NamingScheme::SnakeCase, "shop");
        let sql = foreign_key(&mapping, EntityKind::Cart, "product_id", EntityKind::Product)
            .to_string(PostgresQueryBuilder);
        assert!(sql.starts_with(r#"ALTER TABLE "shop"."carts""#), "{sql}");
        assert!(sql.contains(r#"ADD CONSTRAINT "fk_carts_product_id""#), "{sql}");
        assert!(sql.contains(r#"REFERENCES "shop"."products""#), "{sql}");
        assert!(sql.contains("ON DELETE RESTRICT"), "{sql}");
    }

    #[test]
    fn identical_mappings_need_no_steps() {
        let mapping = SchemaMapping::default();
        assert!(plan_migration(&mapping, &mapping).is_empty());
    }

    #[test]
    fn snake_to_pascal_plan_renames_tables_before_columns() {
        let from = SchemaMapping::default();
        let to = SchemaMapping::preset(NamingScheme::PascalCase, "bobsusedbookstore_dbo");
        let steps = plan_migration(&from, &to);

        let cart_steps: Vec<_> = steps
            .iter()
            .filter(|step| match step {
                MigrationStep::MoveSchema { entity, .. }
                | MigrationStep::RenameTable { entity, .. }
                | MigrationStep::RenameColumn { entity, .. } => *entity == EntityKind::Cart,
            })
            .collect();

        assert_eq!(
            cart_steps[0],
            &MigrationStep::MoveSchema {
                entity: EntityKind::Cart,
                table: "carts".into(),
                from: "public".into(),
                to: "bobsusedbookstore_dbo".into(),
            }
        );
        assert_eq!(
            cart_steps[1],
            &MigrationStep::RenameTable {
                entity: EntityKind::Cart,
                schema: "bobsusedbookstore_dbo".into(),
                from: "carts".into(),
                to: "Carts".into(),
            }
        );
        assert!(cart_steps[2..].iter().all(|step| matches!(
            step,
            MigrationStep::RenameColumn { table, .. } if table == "Carts"
        )));
        // move + rename + one per field
        assert_eq!(cart_steps.len(), 2 + EntityKind::Cart.field_keys().len());
    }
}
