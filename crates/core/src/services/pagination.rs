//! Paginated roster responses.

use huddle_db::repositories::PAGE_SIZE;
use serde::Serialize;

/// One page of a roster plus the information needed to page through it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub members: Vec<T>,
    pub page_size: u64,
    pub total: u64,
    /// Number of pages needed for `total` rows.
    pub page_count: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(members: Vec<T>, total: u64) -> Self {
        Self {
            members,
            page_size: PAGE_SIZE,
            total,
            page_count: total.div_ceil(PAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(Page::<()>::new(vec![], 0).page_count, 0);
        assert_eq!(Page::<()>::new(vec![], 10).page_count, 1);
        assert_eq!(Page::<()>::new(vec![], 11).page_count, 2);
    }
}
