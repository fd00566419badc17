//! Shared offset pagination helpers.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request with a clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(Some(1), Some(limit))
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_and_limit() {
        let request = PageRequest::new(Some(0), Some(500));
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, MAX_PAGE_SIZE);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(Some(3), Some(10));
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn computes_total_pages() {
        let page = Page::new(vec![1, 2], 21, PageRequest::new(Some(2), Some(10)));
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let empty: Page<u8> = Page::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
    }
}
