//! Reference catalog and the one-shot "ensure schema and seed" startup step.

use std::collections::BTreeMap;

use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};
use serde::Serialize;

use crate::{
    db::qualified,
    entity::{Category, EntityKind, Product},
    error::{AppError, AppResult},
    mapping::SchemaMapping,
    schema,
    store::{ListQuery, Store},
};

/// Key of the transaction-scoped advisory lock serializing concurrent cold starts.
pub const SEED_LOCK_KEY: i64 = 0x4761_6467_6574_7331;

pub fn catalog_categories() -> Vec<Category> {
    [
        (1, "Mobile Phones", "Latest collection of Mobile Phones"),
        (2, "Laptops", "Latest Laptops in 2022"),
        (3, "Desktops", "Latest Desktops in 2022"),
        (4, "Audio", "Latest audio devices"),
        (5, "Accessories", "USB Cables, Mobile chargers and Keyboards etc"),
    ]
    .into_iter()
    .map(|(category_id, name, description)| Category {
        category_id,
        name: name.to_string(),
        description: Some(description.to_string()),
    })
    .collect()
}

pub fn catalog_products() -> Vec<Product> {
    [
        (1, 1, "Phone 12", dec!(699.00), "/Content/Images/Mobile/1.jpg"),
        (2, 1, "Phone 13 Pro", dec!(999.00), "/Content/Images/Mobile/2.jpg"),
        (3, 1, "Phone 13 Pro Max", dec!(1199.00), "/Content/Images/Mobile/3.jpg"),
        (4, 2, "XTS 13'", dec!(899.00), "/Content/Images/Laptop/1.jpg"),
        (5, 2, "PC 15.5'", dec!(479.00), "/Content/Images/Laptop/2.jpg"),
        (6, 2, "Notebook 14", dec!(169.00), "/Content/Images/Laptop/3.jpg"),
        (7, 3, "The IdeaCenter", dec!(539.00), "/Content/Images/placeholder.gif"),
        (8, 3, "COMP 22-df003w", dec!(389.00), "/Content/Images/placeholder.gif"),
        (9, 4, "Bluetooth Headphones Over Ear", dec!(28.00), "/Content/Images/Headphones/1.png"),
        (10, 4, "ZX Series ", dec!(10.00), "/Content/Images/Headphones/2.png"),
        (11, 5, "Wireless charger", dec!(9.99), "/Content/Images/placeholder.gif"),
        (12, 5, "Mousepad", dec!(2.99), "/Content/Images/placeholder.gif"),
        (13, 5, "Keyboard", dec!(9.99), "/Content/Images/placeholder.gif"),
    ]
    .into_iter()
    .map(|(product_id, category_id, name, price, art)| Product {
        product_id,
        category_id,
        name: name.to_string(),
        price,
        product_art_url: Some(art.to_string()),
    })
    .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    /// False when the store already held a catalog.
    pub seeded: bool,
    pub categories_inserted: u64,
    pub products_inserted: u64,
    pub column_upgrades: Vec<String>,
    /// Key the next store-assigned insert will receive, per collection.
    pub next_keys: BTreeMap<EntityKind, i64>,
}

/// Provisions the schema, seeds an empty store and repairs key sequences.
///
/// Safe to call from every replica on every start: the work runs under an
/// advisory lock, seeding happens only when no category exists, and sequence
/// repair only ever advances counters. Any error here must abort startup.
pub async fn ensure_schema_and_seed(store: &Store) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    let txn = store.begin().await?;
    advisory_lock(txn.connection()).await?;
    schema::ensure_schema(txn.connection(), txn.mapping()).await?;
    report.column_upgrades = schema::upgrade_column_types(txn.connection(), txn.mapping()).await?;

    if txn.categories().count(&ListQuery::new()).await? == 0 {
        for category in catalog_categories() {
            if txn.categories().create_if_absent(&category).await? {
                report.categories_inserted += 1;
            }
        }
        for product in catalog_products() {
            if txn.products().create_if_absent(&product).await? {
                report.products_inserted += 1;
            }
        }
        report.seeded = true;
    }
    txn.commit().await?;

    let txn = store.begin().await?;
    advisory_lock(txn.connection()).await?;
    for kind in EntityKind::ALL {
        let next = repair_sequence(txn.connection(), txn.mapping(), kind).await?;
        report.next_keys.insert(kind, next);
    }
    txn.commit().await?;

    tracing::info!(
        seeded = report.seeded,
        categories = report.categories_inserted,
        products = report.products_inserted,
        "store ready"
    );
    Ok(report)
}

async fn advisory_lock<C: ConnectionTrait>(db: &C) -> AppResult<()> {
    db.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock($1)",
        [SEED_LOCK_KEY.into()],
    ))
    .await?;
    Ok(())
}

/// Advances the key sequence of `kind` past the largest key present.
///
/// Returns the key the next store-assigned insert receives.
pub async fn repair_sequence<C: ConnectionTrait>(
    db: &C,
    mapping: &SchemaMapping,
    kind: EntityKind,
) -> AppResult<i64> {
    let table = mapping.table(kind);
    repair_sequence_inner(db, mapping, kind)
        .await
        .map_err(|source| AppError::SequenceRepair {
            table: table.table.clone(),
            source,
        })
}

async fn repair_sequence_inner<C: ConnectionTrait>(
    db: &C,
    mapping: &SchemaMapping,
    kind: EntityKind,
) -> Result<i64, DbErr> {
    let table = mapping.table(kind);
    let target = qualified(&mapping.schema, &table.table);
    let key_column = table.column(kind.key_field());

    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_get_serial_sequence($1, $2) AS seq",
            [target.clone().into(), key_column.into()],
        ))
        .await?;
    let sequence: Option<String> = match row {
        Some(row) => row.try_get("", "seq")?,
        None => None,
    };
    let sequence = sequence.ok_or_else(|| {
        DbErr::Custom(format!("{target}.{key_column} is not backed by a sequence"))
    })?;

    // `sequence` comes back from the server already quoted.
    let state = db
        .query_one(Statement::from_string(
            DbBackend::Postgres,
            format!("SELECT last_value, is_called FROM {sequence}"),
        ))
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(sequence.clone()))?;
    let last_value: i64 = state.try_get("", "last_value")?;
    let is_called: bool = state.try_get("", "is_called")?;
    let issued = if is_called { last_value } else { last_value - 1 };

    let max_key: i64 = db
        .query_one(Statement::from_string(
            DbBackend::Postgres,
            format!(
                "SELECT COALESCE(MAX({}), 0)::int8 AS max_key FROM {target}",
                crate::db::quote_ident(key_column)
            ),
        ))
        .await?
        .map(|row| row.try_get("", "max_key"))
        .transpose()?
        .unwrap_or(0);

    let floor = next_floor(issued, max_key);
    let stmt = if floor >= 1 {
        Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT setval($1::regclass, $2, true)",
            [sequence.clone().into(), floor.into()],
        )
    } else {
        Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT setval($1::regclass, 1, false)",
            [sequence.clone().into()],
        )
    };
    db.execute(stmt).await?;

    let next = floor.max(0) + 1;
    tracing::debug!(%sequence, max_key, next, "sequence repaired");
    Ok(next)
}

/// Highest value the sequence must be considered to have issued.
fn next_floor(issued: i64, max_key: i64) -> i64 {
    issued.max(max_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn reference_catalog_shape() {
        let categories = catalog_categories();
        let products = catalog_products();
        assert_eq!(categories.len(), 5);
        assert_eq!(products.len(), 13);
        assert_eq!(categories.iter().map(|c| c.category_id).max(), Some(5));
        assert_eq!(products.iter().map(|p| p.product_id).max(), Some(13));
    }

    #[test]
    fn every_product_belongs_to_a_seeded_category() {
        let categories: Vec<i32> = catalog_categories().iter().map(|c| c.category_id).collect();
        for product in catalog_products() {
            assert!(categories.contains(&product.category_id), "{}", product.name);
        }
    }

    #[test]
    fn reference_catalog_passes_validation() {
        assert!(catalog_categories().iter().all(|c| c.validate().is_ok()));
        assert!(catalog_products().iter().all(|p| p.validate().is_ok()));
    }

    #[test]
    fn sequence_never_moves_backwards() {
        // fresh sequence after explicit-key inserts
        assert_eq!(next_floor(0, 13), 13);
        // traffic already advanced past the seeded keys
        assert_eq!(next_floor(40, 13), 40);
        // empty table, untouched sequence
        assert_eq!(next_floor(0, 0), 0);
    }
}
