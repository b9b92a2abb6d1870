//! Paginated list responses.

use serde::{Deserialize, Serialize};

/// One page of a server-side paginated list.
///
/// Pages are 1-based. `total_pages` is at least 1 even for empty lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Build a page, clamping the numbers to sane values.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, total_pages: u32) -> Self {
        let total_pages = total_pages.max(1);
        Self {
            items,
            page: page.clamp(1, total_pages),
            total_pages,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}
