// Filter - ordering and pagination passed alongside a criteria
//
// Example:
// ```ignore
// let page = Filter::new()
//     .order_by(SnapshotField::Id, Order::Desc)
//     .offset(20)
//     .limit(10);
// dao.list_by_volume_id(42, Some(&page))?;
// ```

use super::schema::Column;

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Sort keys plus offset/limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter<F> {
    order_by: Vec<(F, Order)>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl<F: Column> Default for Filter<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Column> Filter<F> {
    pub fn new() -> Self {
        Self {
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Page `index` (0-based) of `size` rows
    pub fn page(index: u64, size: u64) -> Self {
        Self::new().offset(index.saturating_mul(size)).limit(size)
    }

    /// Append a sort key; earlier keys take precedence
    pub fn order_by(mut self, field: F, order: Order) -> Self {
        self.order_by.push((field, order));
        self
    }

    /// Skip first N rows
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Return at most N rows
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_keys(&self) -> &[(F, Order)] {
        &self.order_by
    }

    pub fn get_offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SnapshotField;

    #[test]
    fn test_page() {
        let filter = Filter::<SnapshotField>::page(3, 25);
        assert_eq!(filter.get_offset(), Some(75));
        assert_eq!(filter.get_limit(), Some(25));
        assert!(filter.sort_keys().is_empty());
    }

    #[test]
    fn test_sort_keys_keep_order() {
        let filter = Filter::new()
            .order_by(SnapshotField::TypeDescription, Order::Asc)
            .order_by(SnapshotField::Id, Order::Desc);
        assert_eq!(
            filter.sort_keys(),
            &[
                (SnapshotField::TypeDescription, Order::Asc),
                (SnapshotField::Id, Order::Desc)
            ]
        );
    }
}
