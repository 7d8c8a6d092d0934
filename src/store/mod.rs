//! The persistence context: mapped collections over one connection or transaction.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{
    config::AppConfig,
    db::create_orm_conn,
    entity::{Cart, Category, Order, OrderDetail, Product},
    error::AppResult,
    mapping::SchemaMapping,
};

pub mod checkout;
mod navigation;
pub mod params;
pub(crate) mod query;
pub mod repository;

pub use checkout::PlacedOrder;
pub use params::{ListQuery, Pagination, SortOrder};
pub use repository::Repository;

#[derive(Clone)]
pub struct Store<C = DatabaseConnection> {
    db: C,
    mapping: Arc<SchemaMapping>,
}

impl<C: ConnectionTrait> Store<C> {
    pub fn new(db: C, mapping: SchemaMapping) -> AppResult<Self> {
        mapping.validate()?;
        Ok(Self {
            db,
            mapping: Arc::new(mapping),
        })
    }

    pub fn mapping(&self) -> &SchemaMapping {
        &self.mapping
    }

    pub fn connection(&self) -> &C {
        &self.db
    }

    pub fn into_connection(self) -> C {
        self.db
    }

    pub fn categories(&self) -> Repository<'_, C, Category> {
        Repository::new(&self.db, &self.mapping)
    }

    pub fn products(&self) -> Repository<'_, C, Product> {
        Repository::new(&self.db, &self.mapping)
    }

    pub fn carts(&self) -> Repository<'_, C, Cart> {
        Repository::new(&self.db, &self.mapping)
    }

    pub fn orders(&self) -> Repository<'_, C, Order> {
        Repository::new(&self.db, &self.mapping)
    }

    pub fn order_details(&self) -> Repository<'_, C, OrderDetail> {
        Repository::new(&self.db, &self.mapping)
    }
}

impl Store<DatabaseConnection> {
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let mapping = config.mapping()?;
        let conn = create_orm_conn(config).await?;
        Self::new(conn, mapping)
    }

    pub async fn begin(&self) -> AppResult<Store<DatabaseTransaction>> {
        let txn = self.db.begin().await?;
        Ok(Store {
            db: txn,
            mapping: Arc::clone(&self.mapping),
        })
    }
}

impl Store<DatabaseTransaction> {
    pub async fn commit(self) -> AppResult<()> {
        self.db.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> AppResult<()> {
        self.db.rollback().await?;
        Ok(())
    }
}
