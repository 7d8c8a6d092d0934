use std::marker::PhantomData;

use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, StatementBuilder, Value};

use super::{params::ListQuery, query};
use crate::{
    entity::{FieldName, Record},
    error::{AppError, AppResult},
    mapping::SchemaMapping,
};

/// CRUD access to one mapped collection over a connection or transaction.
pub struct Repository<'a, C, R> {
    db: &'a C,
    mapping: &'a SchemaMapping,
    _record: PhantomData<fn() -> R>,
}

impl<'a, C, R> Repository<'a, C, R>
where
    C: ConnectionTrait,
    R: Record,
{
    pub(crate) fn new(db: &'a C, mapping: &'a SchemaMapping) -> Self {
        Self {
            db,
            mapping,
            _record: PhantomData,
        }
    }

    /// A repository over another collection sharing this connection.
    pub(crate) fn related<T: Record>(&self) -> Repository<'a, C, T> {
        Repository::new(self.db, self.mapping)
    }

    fn build<S: StatementBuilder>(&self, stmt: &S) -> sea_orm::Statement {
        self.db.get_database_backend().build(stmt)
    }

    /// Inserts with a store-assigned key and returns the stored record.
    pub async fn create(&self, record: &R) -> AppResult<R> {
        record.validate()?;
        let key_column = self.mapping.column(R::KIND, R::KEY.key()).to_string();
        let mut stmt = query::insert(self.mapping, record, false)?;
        stmt.returning_col(query::column::<R>(self.mapping, R::KEY));

        let row = self
            .db
            .query_one(self.build(&stmt))
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("insert returned no key")))?;
        let key: i32 = row.try_get("", &key_column)?;

        let mut stored = record.clone();
        stored.set_key(key);
        tracing::debug!(collection = R::KIND.collection(), key, "inserted");
        Ok(stored)
    }

    /// Inserts with the caller-assigned key.
    pub async fn create_with_key(&self, record: &R) -> AppResult<R> {
        record.validate()?;
        let stmt = query::insert(self.mapping, record, true)?;
        self.db.execute(self.build(&stmt)).await?;
        tracing::debug!(collection = R::KIND.collection(), key = record.key(), "inserted with key");
        Ok(record.clone())
    }

    /// Inserts with the caller-assigned key unless that key is taken; true when a row was written.
    pub(crate) async fn create_if_absent(&self, record: &R) -> AppResult<bool> {
        record.validate()?;
        let mut stmt = query::insert(self.mapping, record, true)?;
        stmt.on_conflict(
            OnConflict::column(query::column::<R>(self.mapping, R::KEY))
                .do_nothing()
                .to_owned(),
        );
        let result = self.db.execute(self.build(&stmt)).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, key: i32) -> AppResult<Option<R>> {
        let stmt = query::select_by_key::<R>(self.mapping, key);
        let record = R::find_by_statement(self.build(&stmt)).one(self.db).await?;
        Ok(record)
    }

    pub async fn get(&self, key: i32) -> AppResult<R> {
        self.find(key).await?.ok_or(AppError::NotFound)
    }

    pub async fn list(&self, query: &ListQuery<R::Field>) -> AppResult<Vec<R>> {
        let stmt = query::select::<R>(self.mapping, query);
        let records = R::find_by_statement(self.build(&stmt)).all(self.db).await?;
        Ok(records)
    }

    pub async fn all(&self) -> AppResult<Vec<R>> {
        self.list(&ListQuery::new()).await
    }

    /// Counts rows matching the filters; ordering and paging are ignored.
    pub async fn count(&self, query: &ListQuery<R::Field>) -> AppResult<u64> {
        let stmt = query::count::<R>(self.mapping, query);
        let count: i64 = match self.db.query_one(self.build(&stmt)).await? {
            Some(row) => row.try_get("", "count")?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    /// Rewrites every non-key field of the row with the record's key.
    pub async fn update(&self, record: &R) -> AppResult<R> {
        record.validate()?;
        let stmt = query::update(self.mapping, record);
        let result = self.db.execute(self.build(&stmt)).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        self.get(record.key()).await
    }

    /// Sets one field on every row matching the query's filters.
    pub(crate) async fn set_where(
        &self,
        field: R::Field,
        value: impl Into<Value>,
        query: &ListQuery<R::Field>,
    ) -> AppResult<u64> {
        let stmt = query::update_where::<R>(self.mapping, field, value.into(), query);
        let result = self.db.execute(self.build(&stmt)).await?;
        Ok(result.rows_affected())
    }

    /// Fails with `ReferentialIntegrity` while dependent rows exist.
    pub async fn delete(&self, key: i32) -> AppResult<()> {
        let stmt = query::delete_by_key::<R>(self.mapping, key);
        let result = self.db.execute(self.build(&stmt)).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        tracing::debug!(collection = R::KIND.collection(), key, "deleted");
        Ok(())
    }

    pub(crate) async fn delete_where(&self, query: &ListQuery<R::Field>) -> AppResult<u64> {
        let stmt = query::delete::<R>(self.mapping, query);
        let result = self.db.execute(self.build(&stmt)).await?;
        Ok(result.rows_affected())
    }
}
