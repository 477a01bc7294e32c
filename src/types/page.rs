//! Pagination parameters shared by every listing operation

use super::error::LedgerError;

/// Largest page size accepted unless configured otherwise
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// A validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_id: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate a page request
    ///
    /// `page_id` must be at least 1 and `page_size` must lie in
    /// `1..=max_page_size`. Pages past the end of the data are valid and
    /// simply yield nothing.
    pub fn new(page_id: u32, page_size: u32, max_page_size: u32) -> Result<Self, LedgerError> {
        if page_id == 0 || page_size == 0 || page_size > max_page_size {
            return Err(LedgerError::invalid_page(page_id, page_size, max_page_size));
        }
        Ok(Self { page_id, page_size })
    }

    pub fn page_id(&self) -> u32 {
        self.page_id
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items preceding this page
    pub fn offset(&self) -> usize {
        (self.page_id as usize - 1).saturating_mul(self.page_size as usize)
    }

    /// Clone out the slice of `items` covered by this page
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset())
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}
