//! Sale listing queries and paged results.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter and paging for [`crate::SaleOrchestrator::list_sales`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleQuery {
    /// 1-based.
    pub page: u32,
    /// `0` means the default page size; anything above the configured maximum is capped.
    pub limit: u32,
    pub include_cancelled: bool,
    /// Case-insensitive match on the sale reference and customer name/email/phone.
    pub search: Option<String>,
    /// Ordering by `sold_at`.
    pub sort: SortOrder,
}

impl Default for SaleQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            include_cancelled: false,
            search: None,
            sort: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub pages: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Cut one page out of an already filtered and ordered result set.
    pub fn slice(all: Vec<T>, page: u32, limit: u32) -> Self {
        let total = all.len();
        let limit = limit.max(1);
        let pages = total.div_ceil(limit as usize) as u32;
        let skip = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let items = all.into_iter().skip(skip).take(limit as usize).collect();
        Self {
            items,
            total,
            page,
            pages,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_pages_and_counts_them() {
        let page = Page::slice((1..=23).collect::<Vec<_>>(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23]);
        assert_eq!(page.total, 23);
        assert_eq!(page.pages, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = Page::slice(vec![1, 2], 5, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: Page<u8> = Page::slice(Vec::new(), 1, 10);
        assert_eq!(page.pages, 0);
        assert_eq!(page.total, 0);
    }
}
