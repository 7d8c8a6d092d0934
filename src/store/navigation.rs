//! On-demand relation lookups keyed by foreign-key values.

use sea_orm::ConnectionTrait;

use super::{ListQuery, Repository};
use crate::{
    entity::{Cart, Category, Order, OrderDetail, Product, order_detail, product},
    error::AppResult,
};

impl<C: ConnectionTrait> Repository<'_, C, Category> {
    pub async fn products(&self, category: &Category) -> AppResult<Vec<Product>> {
        let query = ListQuery::new().filter(product::Field::CategoryId, category.category_id);
        self.related::<Product>().list(&query).await
    }
}

impl<C: ConnectionTrait> Repository<'_, C, Product> {
    pub async fn category(&self, product: &Product) -> AppResult<Category> {
        self.related::<Category>().get(product.category_id).await
    }

    pub async fn order_details(&self, product: &Product) -> AppResult<Vec<OrderDetail>> {
        let query = ListQuery::new().filter(order_detail::Field::ProductId, product.product_id);
        self.related::<OrderDetail>().list(&query).await
    }
}

impl<C: ConnectionTrait> Repository<'_, C, Cart> {
    pub async fn product(&self, item: &Cart) -> AppResult<Product> {
        self.related::<Product>().get(item.product_id).await
    }
}

impl<C: ConnectionTrait> Repository<'_, C, Order> {
    pub async fn details(&self, order: &Order) -> AppResult<Vec<OrderDetail>> {
        let query = ListQuery::new().filter(order_detail::Field::OrderId, order.order_id);
        self.related::<OrderDetail>().list(&query).await
    }
}

impl<C: ConnectionTrait> Repository<'_, C, OrderDetail> {
    pub async fn order(&self, detail: &OrderDetail) -> AppResult<Order> {
        self.related::<Order>().get(detail.order_id).await
    }

    pub async fn product(&self, detail: &OrderDetail) -> AppResult<Product> {
        self.related::<Product>().get(detail.product_id).await
    }
}
