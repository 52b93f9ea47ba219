//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Hard cap on page size so a single listing request cannot scan the
/// whole table.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Build from optional query parameters, falling back to defaults.
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        let defaults = Self::default();
        Self {
            page: page.unwrap_or(defaults.page),
            per_page: per_page.unwrap_or(defaults.per_page),
        }
    }

    /// Page size clamped to `MAX_PAGE_SIZE`, never zero.
    pub fn limit(&self) -> u32 {
        self.per_page.clamp(1, MAX_PAGE_SIZE)
    }

    /// Row offset for the requested page (pages are 1-based).
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.limit()
    }

    /// Number of pages needed for `total_items` rows.
    pub fn total_pages(&self, total_items: u64) -> u32 {
        let limit = u64::from(self.limit());
        total_items.div_ceil(limit).min(u64::from(u32::MAX)) as u32
    }
}

/// Pagination metadata returned alongside listing results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total_items: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta {
                page: pagination.page.max(1),
                per_page: pagination.limit(),
                total_items,
                total_pages: pagination.total_pages(total_items),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pagination() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_from_query_fills_defaults() {
        let p = Pagination::from_query(None, Some(50));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 50);
    }

    #[test]
    fn test_page_size_is_capped() {
        let p = Pagination {
            page: 1,
            per_page: 10_000,
        };
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_zero_page_size_becomes_one() {
        let p = Pagination {
            page: 3,
            per_page: 0,
        };
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let p = Pagination {
            page: 1,
            per_page: 20,
        };
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(20), 1);
        assert_eq!(p.total_pages(21), 2);
    }
}
