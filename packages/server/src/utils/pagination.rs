use crate::config::PaginationConfig;
use crate::models::shared::{Pagination, parse_positive};

/// A resolved page window. Invalid `page`/`limit` input falls back to defaults instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn resolve(page: Option<&str>, limit: Option<&str>, config: &PaginationConfig) -> Self {
        let max = config.max_page_size.max(1);
        let per_page = parse_positive(limit)
            .unwrap_or(config.default_page_size)
            .clamp(1, max);
        let page = parse_positive(page)
            .filter(|&page| Self::window_start(page, per_page).is_some())
            .unwrap_or(1);
        Self { page, per_page }
    }

    /// Row offset of the page, `None` when it does not fit a Postgres BIGINT.
    fn window_start(page: u64, per_page: u64) -> Option<u64> {
        (page - 1)
            .checked_mul(per_page)
            .filter(|&offset| offset <= i64::MAX as u64)
    }

    pub fn offset(&self) -> u64 {
        Self::window_start(self.page, self.per_page).unwrap_or(0)
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages: total.div_ceil(self.per_page),
        }
    }
}
