//! Shopping-cart maintenance and order placement.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::Serialize;
use validator::Validate;

use super::{ListQuery, Repository, SortOrder, Store};
use crate::{
    entity::{Cart, Order, OrderDetail, Product, cart},
    error::{AppError, AppResult},
    normalize,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

impl<C: ConnectionTrait> Repository<'_, C, Cart> {
    pub async fn items(&self, cart_id: &str) -> AppResult<Vec<Cart>> {
        let query = ListQuery::new()
            .filter(cart::Field::CartId, cart_id)
            .order_by(cart::Field::RecordId, SortOrder::Asc);
        self.list(&query).await
    }

    /// Adds one unit of a product, merging with an existing line of the same cart.
    pub async fn add_item(&self, cart_id: &str, product_id: i32) -> AppResult<Cart> {
        let query = ListQuery::new()
            .filter(cart::Field::CartId, cart_id)
            .filter(cart::Field::ProductId, product_id);
        match self.list(&query).await?.into_iter().next() {
            Some(mut item) => {
                item.count += 1;
                self.update(&item).await
            }
            None => {
                self.create(&Cart::new(cart_id, product_id, 1, normalize::now()))
                    .await
            }
        }
    }

    /// Removes one unit; the line disappears at zero. Returns the remaining count.
    pub async fn remove_item(&self, cart_id: &str, record_id: i32) -> AppResult<i32> {
        let item = match self.find(record_id).await? {
            Some(item) if item.cart_id == cart_id => item,
            _ => return Err(AppError::NotFound),
        };

        if item.count > 1 {
            let mut item = item;
            item.count -= 1;
            let item = self.update(&item).await?;
            Ok(item.count)
        } else {
            self.delete(item.record_id).await?;
            Ok(0)
        }
    }

    pub async fn empty(&self, cart_id: &str) -> AppResult<u64> {
        let query = ListQuery::new().filter(cart::Field::CartId, cart_id);
        self.delete_where(&query).await
    }

    /// Sum of count times current product price over the cart's lines.
    pub async fn total(&self, cart_id: &str) -> AppResult<Decimal> {
        let items = self.items(cart_id).await?;
        let mut prices: BTreeMap<i32, Decimal> = BTreeMap::new();
        let mut total = Decimal::ZERO;
        for item in &items {
            let price = match prices.get(&item.product_id) {
                Some(price) => *price,
                None => {
                    let price = self.product(item).await?.price;
                    prices.insert(item.product_id, price);
                    price
                }
            };
            total += price * Decimal::from(item.count);
        }
        Ok(normalize::money(total))
    }

    /// Re-keys an anonymous cart once the shopper is known.
    pub async fn migrate(&self, from_cart_id: &str, to_cart_id: &str) -> AppResult<u64> {
        if to_cart_id.trim().is_empty() {
            return Err(AppError::BadRequest("target cart id is empty".into()));
        }
        let query = ListQuery::new().filter(cart::Field::CartId, from_cart_id);
        self.set_where(cart::Field::CartId, to_cart_id, &query).await
    }
}

/// Sum of the detail line totals, refused when it cannot be stored.
fn order_total(details: &[OrderDetail]) -> AppResult<Decimal> {
    let total = details.iter().try_fold(Decimal::ZERO, |total, detail| {
        detail.line_total().and_then(|line| total.checked_add(line))
    });
    total
        .and_then(normalize::checked_money)
        .ok_or_else(|| AppError::BadRequest("order total exceeds the storable amount".into()))
}

/// The order's own total when set, otherwise the sum of its details.
fn resolved_total(order: &Order, details: &[OrderDetail]) -> AppResult<Decimal> {
    if order.total.is_zero() {
        return order_total(details);
    }
    normalize::checked_money(order.total)
        .ok_or_else(|| AppError::BadRequest("order total exceeds the storable amount".into()))
}

impl<C: ConnectionTrait> Store<C> {
    async fn write_order(&self, order: &Order, details: &[OrderDetail]) -> AppResult<PlacedOrder> {
        let mut order = order.clone();
        order.total = resolved_total(&order, details)?;

        let order = self.orders().create(&order).await?;
        let mut written = Vec::with_capacity(details.len());
        for detail in details {
            let mut detail = detail.clone();
            detail.order_id = order.order_id;
            written.push(self.order_details().create(&detail).await?);
        }

        tracing::info!(
            order_id = order.order_id,
            lines = written.len(),
            total = %order.total,
            "order placed"
        );
        Ok(PlacedOrder {
            order,
            details: written,
        })
    }
}

impl Store<DatabaseConnection> {
    /// Writes an order and its details atomically.
    ///
    /// Everything is validated before the transaction opens, so a rejected
    /// order leaves no rows behind.
    pub async fn place_order(&self, order: &Order, details: &[OrderDetail]) -> AppResult<PlacedOrder> {
        order.validate()?;
        for detail in details {
            detail.validate()?;
        }
        if details.is_empty() {
            return Err(AppError::BadRequest("order has no details".into()));
        }
        resolved_total(order, details)?;

        let txn = self.begin().await?;
        let placed = txn.write_order(order, details).await?;
        txn.commit().await?;
        Ok(placed)
    }

    /// Converts a cart into an order at current product prices and empties the cart.
    pub async fn checkout(&self, cart_id: &str, order: &Order) -> AppResult<PlacedOrder> {
        order.validate()?;

        let txn = self.begin().await?;
        let query = ListQuery::new()
            .filter(cart::Field::CartId, cart_id)
            .order_by(cart::Field::RecordId, SortOrder::Asc)
            .for_update();
        let items = txn.carts().list(&query).await?;
        if items.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".into()));
        }

        let mut details = Vec::with_capacity(items.len());
        for item in &items {
            if item.count <= 0 {
                return Err(AppError::BadRequest(format!(
                    "Cart has invalid quantity for product {}",
                    item.product_id
                )));
            }
            let product: Product = txn.carts().product(item).await?;
            details.push(OrderDetail::new(0, product.product_id, item.count, product.price));
        }

        let mut order = order.clone();
        order.total = Decimal::ZERO;
        let placed = txn.write_order(&order, &details).await?;
        txn.carts().empty(cart_id).await?;
        txn.commit().await?;
        Ok(placed)
    }
}
