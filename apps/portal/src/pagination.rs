use serde::{Deserialize, Serialize};

/// One page of results plus the numbers a pager needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: i64) -> Self {
        Page {
            items,
            page: window.page,
            per_page: window.per_page,
            total,
            total_pages: window.total_pages,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Resolved LIMIT/OFFSET for a requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PageWindow {
    /// Resolves a raw `page` parameter the way a lenient paginator does:
    /// garbage means page 1, anything past the end means the last page.
    pub fn resolve(raw_page: Option<&str>, per_page: i64, total: i64) -> Self {
        let total_pages = ((total + per_page - 1) / per_page).max(1);
        let requested = raw_page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1);
        PageWindow {
            page: requested.clamp(1, total_pages),
            per_page,
            total_pages,
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_default() {
        let w = PageWindow::resolve(None, 10, 35);
        assert_eq!(w.page, 1);
        assert_eq!(w.total_pages, 4);
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn test_out_of_range_clamps_to_last() {
        let w = PageWindow::resolve(Some("99"), 10, 35);
        assert_eq!(w.page, 4);
        assert_eq!(w.offset(), 30);
    }

    #[test]
    fn test_garbage_and_negative() {
        assert_eq!(PageWindow::resolve(Some("abc"), 6, 20).page, 1);
        assert_eq!(PageWindow::resolve(Some("-3"), 6, 20).page, 1);
    }

    #[test]
    fn test_empty_result_has_one_page() {
        let w = PageWindow::resolve(Some("2"), 10, 0);
        assert_eq!(w.total_pages, 1);
        assert_eq!(w.page, 1);
    }

    #[test]
    fn test_page_navigation_flags() {
        let w = PageWindow::resolve(Some("2"), 3, 9);
        let page = Page::new(vec![4, 5, 6], w, 9);
        assert!(page.has_previous());
        assert!(page.has_next());
        let doubled = page.map(|n| n * 2);
        assert_eq!(doubled.items, vec![8, 10, 12]);
    }
}
