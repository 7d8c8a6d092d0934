use std::borrow::Cow;

use sea_orm::{FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub mod cart;
pub mod category;
pub mod order;
pub mod order_detail;
pub mod product;

pub use cart::Cart;
pub use category::Category;
pub use order::Order;
pub use order_detail::OrderDetail;
pub use product::Product;

/// The five persisted collections, in foreign-key dependency order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Product,
    Cart,
    Order,
    OrderDetail,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Category,
        EntityKind::Product,
        EntityKind::Cart,
        EntityKind::Order,
        EntityKind::OrderDetail,
    ];

    /// Collection name; also the section name in mapping files.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
            EntityKind::Cart => "carts",
            EntityKind::Order => "orders",
            EntityKind::OrderDetail => "order_details",
        }
    }

    pub fn columns(self) -> Vec<(&'static str, ColumnSpec)> {
        match self {
            EntityKind::Category => specs::<category::Field>(),
            EntityKind::Product => specs::<product::Field>(),
            EntityKind::Cart => specs::<cart::Field>(),
            EntityKind::Order => specs::<order::Field>(),
            EntityKind::OrderDetail => specs::<order_detail::Field>(),
        }
    }

    pub fn field_keys(self) -> Vec<&'static str> {
        self.columns().into_iter().map(|(key, _)| key).collect()
    }

    pub fn key_field(self) -> &'static str {
        match self {
            EntityKind::Category => category::Field::CategoryId.key(),
            EntityKind::Product => product::Field::ProductId.key(),
            EntityKind::Cart => cart::Field::RecordId.key(),
            EntityKind::Order => order::Field::OrderId.key(),
            EntityKind::OrderDetail => order_detail::Field::OrderDetailId.key(),
        }
    }
}

fn specs<F: FieldName>() -> Vec<(&'static str, ColumnSpec)> {
    F::ALL.iter().map(|f| (f.key(), f.spec())).collect()
}

/// Physical shape of a persisted field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Store-assigned integer key.
    Serial,
    Integer,
    Text,
    VarChar(u32),
    /// Fixed-point currency, numeric(19, 4).
    Money,
    /// `timestamptz`, always written in UTC.
    Timestamp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub kind: ColumnKind,
    pub nullable: bool,
    pub references: Option<EntityKind>,
}

impl ColumnSpec {
    pub const fn key() -> Self {
        Self::required(ColumnKind::Serial)
    }

    pub const fn required(kind: ColumnKind) -> Self {
        Self {
            kind,
            nullable: false,
            references: None,
        }
    }

    pub const fn optional(kind: ColumnKind) -> Self {
        Self {
            kind,
            nullable: true,
            references: None,
        }
    }

    pub const fn reference(target: EntityKind) -> Self {
        Self {
            kind: ColumnKind::Integer,
            nullable: false,
            references: Some(target),
        }
    }
}

/// A persisted field of one record type, named by a stable snake_case key.
pub trait FieldName: Copy + Eq + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn key(self) -> &'static str;

    fn spec(self) -> ColumnSpec;
}

/// A record type mapped one-to-one onto a table row.
pub trait Record: FromQueryResult + Validate + Clone + Send + Sync + Sized {
    type Field: FieldName;

    const KIND: EntityKind;
    const KEY: Self::Field;

    fn key(&self) -> i32;

    fn set_key(&mut self, key: i32);

    /// Non-key field values, already normalized for writing.
    fn values(&self) -> Vec<(Self::Field, Value)>;
}

pub(crate) fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::from("is required"));
        return Err(err);
    }
    Ok(())
}
