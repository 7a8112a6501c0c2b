//! Paginated list envelopes shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Page size used when neither the request nor the config sets one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Upper bound for a single page.
pub const MAX_PAGE_SIZE: u64 = 100;

const MAX_OFFSET: u64 = i64::MAX as u64;

/// Raw pagination/search parameters as sent by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

/// Normalized pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Row offset, never above `i64::MAX` so it binds as an SQLite integer.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(MAX_OFFSET)
    }
}

impl PageQuery {
    /// Resolves the window, clamping `limit` to `1..=max_limit` and `page` so
    /// that its offset stays within `i64::MAX`.
    pub fn window(&self, default_limit: u64, max_limit: u64) -> PageWindow {
        let max_limit = max_limit.max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        let page = self.page.unwrap_or(1).clamp(1, MAX_OFFSET / limit + 1);
        PageWindow { page, limit }
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// `{ items, totalPages, totalItems }` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: u64, window: PageWindow) -> Self {
        Self {
            items,
            total_pages: total_items.div_ceil(window.limit),
            total_items,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern and wraps
/// the term for substring matching.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults() {
        let w = PageQuery::default().window(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        assert_eq!(w, PageWindow { page: 1, limit: 10 });
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn test_window_clamps() {
        let q = PageQuery {
            page: Some(0),
            limit: Some(1000),
            search: None,
        };
        let w = q.window(10, 100);
        assert_eq!(w.page, 1);
        assert_eq!(w.limit, 100);

        let q = PageQuery {
            page: Some(3),
            limit: Some(0),
            search: None,
        };
        let w = q.window(10, 100);
        assert_eq!(w.limit, 1);
        assert_eq!(w.offset(), 2);
    }

    #[test]
    fn test_window_huge_page_stays_in_range() {
        let q = PageQuery {
            page: Some(u64::MAX),
            limit: Some(100),
            search: None,
        };
        let w = q.window(10, 100);
        assert!(w.offset() <= i64::MAX as u64);
        assert!(w.offset() > 0);

        let w = PageWindow {
            page: u64::MAX,
            limit: 100,
        };
        assert_eq!(w.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_total_pages() {
        let w = PageWindow { page: 1, limit: 10 };
        assert_eq!(Page::<u8>::new(vec![], 0, w).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 10, w).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 11, w).total_pages, 2);
    }

    #[test]
    fn test_search_term() {
        let q = PageQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_term(), None);
        let q = PageQuery {
            search: Some(" Pump ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_term(), Some("Pump"));
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("Pump"), "%pump%");
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }
}
