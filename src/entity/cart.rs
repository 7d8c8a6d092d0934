use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ColumnKind, ColumnSpec, EntityKind, FieldName, Record, required};
use crate::normalize;

/// A pending line item of a shopper's cart.
///
/// `count` is stored as given; checkout rejects non-positive counts.
#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize, Deserialize, Validate)]
pub struct Cart {
    pub record_id: i32,
    #[validate(custom = "required")]
    pub cart_id: String,
    pub product_id: i32,
    pub count: i32,
    pub date_created: DateTime<Utc>,
}

impl Cart {
    pub fn new<Tz: TimeZone>(
        cart_id: impl Into<String>,
        product_id: i32,
        count: i32,
        date_created: DateTime<Tz>,
    ) -> Self {
        Self {
            record_id: 0,
            cart_id: cart_id.into(),
            product_id,
            count,
            date_created: normalize::utc(date_created),
        }
    }
}

/// Fresh opaque cart identifier for an anonymous shopper.
pub fn new_cart_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    RecordId,
    CartId,
    ProductId,
    Count,
    DateCreated,
}

impl FieldName for Field {
    const ALL: &'static [Self] = &[
        Field::RecordId,
        Field::CartId,
        Field::ProductId,
        Field::Count,
        Field::DateCreated,
    ];

    fn key(self) -> &'static str {
        match self {
            Field::RecordId => "record_id",
            Field::CartId => "cart_id",
            Field::ProductId => "product_id",
            Field::Count => "count",
            Field::DateCreated => "date_created",
        }
    }

    fn spec(self) -> ColumnSpec {
        match self {
            Field::RecordId => ColumnSpec::key(),
            Field::CartId => ColumnSpec::required(ColumnKind::Text),
            Field::ProductId => ColumnSpec::reference(EntityKind::Product),
            Field::Count => ColumnSpec::required(ColumnKind::Integer),
            Field::DateCreated => ColumnSpec::required(ColumnKind::Timestamp),
        }
    }
}

impl Record for Cart {
    type Field = Field;

    const KIND: EntityKind = EntityKind::Cart;
    const KEY: Field = Field::RecordId;

    fn key(&self) -> i32 {
        self.record_id
    }

    fn set_key(&mut self, key: i32) {
        self.record_id = key;
    }

    fn values(&self) -> Vec<(Field, Value)> {
        vec![
            (Field::CartId, self.cart_id.clone().into()),
            (Field::ProductId, self.product_id.into()),
            (Field::Count, self.count.into()),
            (Field::DateCreated, normalize::utc(self.date_created).into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn created_timestamp_is_stored_in_utc() {
        let pst = FixedOffset::west_opt(8 * 3600).unwrap();
        let local = pst.with_ymd_and_hms(2024, 12, 24, 18, 0, 0).unwrap();
        let cart = Cart::new("abc", 1, 1, local);
        assert_eq!(cart.date_created, Utc.with_ymd_and_hms(2024, 12, 25, 2, 0, 0).unwrap());
    }

    #[test]
    fn zero_count_is_accepted_at_write() {
        assert!(Cart::new("abc", 1, 0, Utc::now()).validate().is_ok());
    }

    #[test]
    fn cart_id_is_required() {
        assert!(Cart::new("", 1, 1, Utc::now()).validate().is_err());
    }

    #[test]
    fn generated_cart_ids_are_distinct() {
        assert_ne!(new_cart_id(), new_cart_id());
    }
}
