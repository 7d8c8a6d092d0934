use std::borrow::Cow;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{ColumnKind, ColumnSpec, EntityKind, FieldName, Record, required};
use crate::normalize;

pub const MIN_PRICE: Decimal = dec!(0.01);
pub const MAX_PRICE: Decimal = dec!(10000.00);

#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize, Deserialize, Validate)]
pub struct Product {
    pub product_id: i32,
    pub category_id: i32,
    #[validate(custom = "required", length(max = 255))]
    pub name: String,
    #[validate(custom = "price_in_range")]
    pub price: Decimal,
    #[validate(length(max = 1024))]
    pub product_art_url: Option<String>,
}

impl Product {
    pub fn new(
        category_id: i32,
        name: impl Into<String>,
        price: Decimal,
        product_art_url: Option<String>,
    ) -> Self {
        Self {
            product_id: 0,
            category_id,
            name: name.into(),
            price,
            product_art_url,
        }
    }
}

fn price_in_range(price: &Decimal) -> Result<(), ValidationError> {
    if *price < MIN_PRICE || *price > MAX_PRICE {
        let mut err = ValidationError::new("range");
        err.message = Some(Cow::from("Price must be between 0.01 and 10000.00"));
        return Err(err);
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    ProductId,
    CategoryId,
    Name,
    Price,
    ProductArtUrl,
}

impl FieldName for Field {
    const ALL: &'static [Self] = &[
        Field::ProductId,
        Field::CategoryId,
        Field::Name,
        Field::Price,
        Field::ProductArtUrl,
    ];

    fn key(self) -> &'static str {
        match self {
            Field::ProductId => "product_id",
            Field::CategoryId => "category_id",
            Field::Name => "name",
            Field::Price => "price",
            Field::ProductArtUrl => "product_art_url",
        }
    }

    fn spec(self) -> ColumnSpec {
        match self {
            Field::ProductId => ColumnSpec::key(),
            Field::CategoryId => ColumnSpec::reference(EntityKind::Category),
            Field::Name => ColumnSpec::required(ColumnKind::VarChar(255)),
            Field::Price => ColumnSpec::required(ColumnKind::Money),
            Field::ProductArtUrl => ColumnSpec::optional(ColumnKind::VarChar(1024)),
        }
    }
}

impl Record for Product {
    type Field = Field;

    const KIND: EntityKind = EntityKind::Product;
    const KEY: Field = Field::ProductId;

    fn key(&self) -> i32 {
        self.product_id
    }

    fn set_key(&mut self, key: i32) {
        self.product_id = key;
    }

    fn values(&self) -> Vec<(Field, Value)> {
        vec![
            (Field::CategoryId, self.category_id.into()),
            (Field::Name, self.name.clone().into()),
            (Field::Price, normalize::money(self.price).into()),
            (Field::ProductArtUrl, self.product_art_url.clone().into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: Decimal) -> Product {
        Product::new(1, "Keyboard", price, None)
    }

    #[test]
    fn price_bounds_are_inclusive() {
        assert!(product(dec!(0.01)).validate().is_ok());
        assert!(product(dec!(10000.00)).validate().is_ok());
        assert!(product(dec!(0.00)).validate().is_err());
        assert!(product(dec!(10000.01)).validate().is_err());
    }

    #[test]
    fn name_is_required_and_bounded() {
        let mut p = product(dec!(9.99));
        p.name = String::new();
        assert!(p.validate().unwrap_err().field_errors().contains_key("name"));

        p.name = "x".repeat(256);
        assert!(p.validate().is_err());

        p.name = "x".repeat(255);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn art_url_length_is_checked() {
        let mut p = product(dec!(9.99));
        p.product_art_url = Some(format!("/{}", "a".repeat(1024)));
        assert!(p.validate().unwrap_err().field_errors().contains_key("product_art_url"));
    }

    #[test]
    fn price_is_written_at_storage_scale() {
        let values = product(dec!(9.99)).values();
        let price = values
            .iter()
            .find(|(field, _)| *field == Field::Price)
            .map(|(_, value)| value.clone());
        assert_eq!(price, Some(Value::from(dec!(9.99))));
    }
}
