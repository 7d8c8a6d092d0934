use std::borrow::Cow;

use rust_decimal::Decimal;
use sea_orm::{FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{ColumnKind, ColumnSpec, EntityKind, FieldName, Record};
use crate::normalize;

/// Line item of a placed order. `unit_price` is the price at purchase time.
#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize, Deserialize, Validate)]
pub struct OrderDetail {
    pub order_detail_id: i32,
    pub order_id: i32,
    pub product_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "unit_price_storable")]
    pub unit_price: Decimal,
}

impl OrderDetail {
    pub fn new(order_id: i32, product_id: i32, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            order_detail_id: 0,
            order_id,
            product_id,
            quantity,
            unit_price,
        }
    }

    /// `None` when the product overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

fn unit_price_storable(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() || *price > normalize::MAX_MONEY {
        let mut err = ValidationError::new("range");
        err.message = Some(Cow::from("Unit price must be positive and fit numeric(19, 4)"));
        return Err(err);
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    OrderDetailId,
    OrderId,
    ProductId,
    Quantity,
    UnitPrice,
}

impl FieldName for Field {
    const ALL: &'static [Self] = &[
        Field::OrderDetailId,
        Field::OrderId,
        Field::ProductId,
        Field::Quantity,
        Field::UnitPrice,
    ];

    fn key(self) -> &'static str {
        match self {
            Field::OrderDetailId => "order_detail_id",
            Field::OrderId => "order_id",
            Field::ProductId => "product_id",
            Field::Quantity => "quantity",
            Field::UnitPrice => "unit_price",
        }
    }

    fn spec(self) -> ColumnSpec {
        match self {
            Field::OrderDetailId => ColumnSpec::key(),
            Field::OrderId => ColumnSpec::reference(EntityKind::Order),
            Field::ProductId => ColumnSpec::reference(EntityKind::Product),
            Field::Quantity => ColumnSpec::required(ColumnKind::Integer),
            Field::UnitPrice => ColumnSpec::required(ColumnKind::Money),
        }
    }
}

impl Record for OrderDetail {
    type Field = Field;

    const KIND: EntityKind = EntityKind::OrderDetail;
    const KEY: Field = Field::OrderDetailId;

    fn key(&self) -> i32 {
        self.order_detail_id
    }

    fn set_key(&mut self, key: i32) {
        self.order_detail_id = key;
    }

    fn values(&self) -> Vec<(Field, Value)> {
        vec![
            (Field::OrderId, self.order_id.into()),
            (Field::ProductId, self.product_id.into()),
            (Field::Quantity, self.quantity.into()),
            (Field::UnitPrice, normalize::money(self.unit_price).into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quantity_must_be_positive() {
        assert!(OrderDetail::new(1, 1, 1, dec!(9.99)).validate().is_ok());
        let err = OrderDetail::new(1, 1, 0, dec!(9.99)).validate().unwrap_err();
        assert!(err.field_errors().contains_key("quantity"));
        assert!(OrderDetail::new(1, 1, -3, dec!(9.99)).validate().is_err());
    }

    #[test]
    fn unit_price_must_be_positive_and_storable() {
        for price in [dec!(0), dec!(-1.50), normalize::MAX_MONEY + dec!(1), Decimal::MAX] {
            let err = OrderDetail::new(1, 1, 1, price).validate().unwrap_err();
            assert!(err.field_errors().contains_key("unit_price"), "{price}");
        }
    }

    #[test]
    fn line_total_reports_overflow() {
        assert_eq!(OrderDetail::new(1, 1, 3, dec!(2.99)).line_total(), Some(dec!(8.97)));
        assert_eq!(OrderDetail::new(1, 1, 2, Decimal::MAX).line_total(), None);
    }
}
