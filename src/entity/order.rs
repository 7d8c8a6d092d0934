use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ColumnKind, ColumnSpec, EntityKind, FieldName, Record, required};
use crate::normalize;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,4}$").expect("email pattern compiles")
});

/// Shopper contact and shipping fields of a checkout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize, Deserialize, Validate)]
pub struct Order {
    pub order_id: i32,
    pub order_date: DateTime<Utc>,
    pub username: Option<String>,
    #[validate(custom = "required", length(max = 160))]
    pub first_name: String,
    #[validate(custom = "required", length(max = 160))]
    pub last_name: String,
    #[validate(custom = "required", length(max = 70))]
    pub address: String,
    #[validate(custom = "required", length(max = 40))]
    pub city: String,
    #[validate(custom = "required", length(max = 40))]
    pub state: String,
    #[validate(custom = "required", length(max = 10))]
    pub postal_code: String,
    #[validate(custom = "required", length(max = 40))]
    pub country: String,
    #[validate(custom = "required", length(max = 24))]
    pub phone: String,
    #[validate(custom = "required", regex = "EMAIL_RE")]
    pub email: String,
    pub total: Decimal,
}

impl Order {
    pub fn new<Tz: TimeZone>(
        order_date: DateTime<Tz>,
        username: Option<String>,
        shipping: ShippingDetails,
    ) -> Self {
        Self {
            order_id: 0,
            order_date: normalize::utc(order_date),
            username,
            first_name: shipping.first_name,
            last_name: shipping.last_name,
            address: shipping.address,
            city: shipping.city,
            state: shipping.state,
            postal_code: shipping.postal_code,
            country: shipping.country,
            phone: shipping.phone,
            email: shipping.email,
            total: Decimal::ZERO,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    OrderId,
    OrderDate,
    Username,
    FirstName,
    LastName,
    Address,
    City,
    State,
    PostalCode,
    Country,
    Phone,
    Email,
    Total,
}

impl FieldName for Field {
    const ALL: &'static [Self] = &[
        Field::OrderId,
        Field::OrderDate,
        Field::Username,
        Field::FirstName,
        Field::LastName,
        Field::Address,
        Field::City,
        Field::State,
        Field::PostalCode,
        Field::Country,
        Field::Phone,
        Field::Email,
        Field::Total,
    ];

    fn key(self) -> &'static str {
        match self {
            Field::OrderId => "order_id",
            Field::OrderDate => "order_date",
            Field::Username => "username",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Address => "address",
            Field::City => "city",
            Field::State => "state",
            Field::PostalCode => "postal_code",
            Field::Country => "country",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Total => "total",
        }
    }

    fn spec(self) -> ColumnSpec {
        match self {
            Field::OrderId => ColumnSpec::key(),
            Field::OrderDate => ColumnSpec::required(ColumnKind::Timestamp),
            Field::Username => ColumnSpec::optional(ColumnKind::Text),
            Field::FirstName | Field::LastName => ColumnSpec::required(ColumnKind::VarChar(160)),
            Field::Address => ColumnSpec::required(ColumnKind::VarChar(70)),
            Field::City | Field::State | Field::Country => {
                ColumnSpec::required(ColumnKind::VarChar(40))
            }
            Field::PostalCode => ColumnSpec::required(ColumnKind::VarChar(10)),
            Field::Phone => ColumnSpec::required(ColumnKind::VarChar(24)),
            Field::Email => ColumnSpec::required(ColumnKind::Text),
            Field::Total => ColumnSpec::required(ColumnKind::Money),
        }
    }
}

impl Record for Order {
    type Field = Field;

    const KIND: EntityKind = EntityKind::Order;
    const KEY: Field = Field::OrderId;

    fn key(&self) -> i32 {
        self.order_id
    }

    fn set_key(&mut self, key: i32) {
        self.order_id = key;
    }

    fn values(&self) -> Vec<(Field, Value)> {
        vec![
            (Field::OrderDate, normalize::utc(self.order_date).into()),
            (Field::Username, self.username.clone().into()),
            (Field::FirstName, self.first_name.clone().into()),
            (Field::LastName, self.last_name.clone().into()),
            (Field::Address, self.address.clone().into()),
            (Field::City, self.city.clone().into()),
            (Field::State, self.state.clone().into()),
            (Field::PostalCode, self.postal_code.clone().into()),
            (Field::Country, self.country.clone().into()),
            (Field::Phone, self.phone.clone().into()),
            (Field::Email, self.email.clone().into()),
            (Field::Total, normalize::money(self.total).into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address: "12 St James's Square".into(),
            city: "London".into(),
            state: "London".into(),
            postal_code: "SW1Y 4JH".into(),
            country: "UK".into(),
            phone: "+44 20 7946 0000".into(),
            email: "ada@example.org".into(),
        }
    }

    fn order_with(shipping: ShippingDetails) -> Order {
        Order::new(Utc::now(), Some("ada".into()), shipping)
    }

    #[test]
    fn complete_order_is_valid() {
        assert!(order_with(shipping()).validate().is_ok());
    }

    #[test]
    fn empty_email_is_rejected() {
        let order = order_with(ShippingDetails {
            email: String::new(),
            ..shipping()
        });
        let errors = order.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn email_must_match_whole_pattern() {
        for bad in ["ada", "ada@example", "ada@example.museum", "ada smith@example.org"] {
            let order = order_with(ShippingDetails {
                email: bad.into(),
                ..shipping()
            });
            assert!(order.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn field_lengths_are_bounded() {
        let order = order_with(ShippingDetails {
            postal_code: "12345678901".into(),
            phone: "1".repeat(25),
            ..shipping()
        });
        let errors = order.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("postal_code"));
        assert!(fields.contains_key("phone"));
        assert!(!fields.contains_key("city"));
    }

    #[test]
    fn username_is_optional() {
        let order = Order::new(Utc::now(), None, shipping());
        assert!(order.validate().is_ok());
    }
}
