//! One page of search results.

use serde::Serialize;

/// Page descriptor reported by the unpaged search
const PLACEHOLDER_PAGE_SIZE: usize = 10;
const PLACEHOLDER_TOTAL_PAGES: usize = 100;
const PLACEHOLDER_TOTAL_ITEMS: usize = 1000;

/// A page of items plus the totals of the whole result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page_number: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    /// `total_pages` is derived from `total_items` and `page_size`
    pub fn new(items: Vec<T>, page_number: usize, page_size: usize, total_items: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(page_size)
        };
        Self {
            items,
            page_number,
            page_size,
            total_pages,
            total_items,
        }
    }

    /// Page with a fixed descriptor that does not describe `items`. The
    /// unpaged search has always reported these numbers and clients rely on
    /// them being present, not on their values.
    pub fn placeholder(items: Vec<T>) -> Self {
        Self {
            items,
            page_number: 1,
            page_size: PLACEHOLDER_PAGE_SIZE,
            total_pages: PLACEHOLDER_TOTAL_PAGES,
            total_items: PLACEHOLDER_TOTAL_ITEMS,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
