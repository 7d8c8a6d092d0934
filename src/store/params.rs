use sea_orm::{Value, sea_query::Order};
use serde::Deserialize;

use crate::entity::FieldName;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// (page, limit, offset). The offset never exceeds the bigint range.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page).min(i64::MAX as u64);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Equality filters, ordering and paging over one record type.
#[derive(Debug, Clone)]
pub struct ListQuery<F> {
    pub(crate) filters: Vec<(F, Value)>,
    pub(crate) order: Vec<(F, SortOrder)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) for_update: bool,
}

impl<F: FieldName> ListQuery<F> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            for_update: false,
        }
    }

    pub fn filter(mut self, field: F, value: impl Into<Value>) -> Self {
        self.filters.push((field, value.into()));
        self
    }

    pub fn order_by(mut self, field: F, order: SortOrder) -> Self {
        self.order.push((field, order));
        self
    }

    pub fn paginate(mut self, pagination: &Pagination) -> Self {
        let (_, limit, offset) = pagination.normalize();
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Take row locks on the matched rows until the transaction ends.
    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }
}

impl<F: FieldName> Default for ListQuery<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::new(0, 500).normalize(), (1, 100, 0));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let (page, limit, offset) = Pagination::new(u64::MAX, 50).normalize();
        assert_eq!((page, limit), (u64::MAX, 50));
        assert_eq!(offset, i64::MAX as u64);
    }
}
