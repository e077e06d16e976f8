//! Page/limit pagination primitives shared by backend endpoints.
//!
//! Endpoints accept a 1-based page number and a page size, clamp both to
//! sane bounds, and return items together with derived page metadata so
//! clients never have to recompute totals.

use serde::{Deserialize, Serialize};

/// Default page size applied when the client omits `limit`.
pub const DEFAULT_LIMIT: u32 = 10;
/// Upper bound on the page size; larger requests are clamped, not rejected.
pub const MAX_LIMIT: u32 = 50;

/// Errors raised when interpreting raw pagination input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageParamsError {
    /// The page number was zero; pages are 1-based.
    #[error("page must be at least 1")]
    ZeroPage,
    /// The limit was zero; at least one item per page is required.
    #[error("limit must be at least 1")]
    ZeroLimit,
}

/// Validated 1-based page number plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageParams", into = "RawPageParams")]
pub struct PageParams {
    page: u32,
    limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageParams {
    /// Build parameters, rejecting zero values and clamping oversized limits.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageParams, MAX_LIMIT};
    ///
    /// let params = PageParams::new(2, 500).expect("valid params");
    /// assert_eq!(params.page(), 2);
    /// assert_eq!(params.limit(), MAX_LIMIT);
    /// ```
    pub fn new(page: u32, limit: u32) -> Result<Self, PageParamsError> {
        if page == 0 {
            return Err(PageParamsError::ZeroPage);
        }
        if limit == 0 {
            return Err(PageParamsError::ZeroLimit);
        }
        Ok(Self {
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }

    /// Interpret optional raw query values, falling back to defaults.
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageParamsError> {
        Self::new(page.unwrap_or(1), limit.unwrap_or(DEFAULT_LIMIT))
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size after clamping.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip for this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1).saturating_mul(u64::from(self.limit))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawPageParams {
    page: u32,
    limit: u32,
}

impl From<PageParams> for RawPageParams {
    fn from(value: PageParams) -> Self {
        Self {
            page: value.page,
            limit: value.limit,
        }
    }
}

impl TryFrom<RawPageParams> for PageParams {
    type Error = PageParamsError;

    fn try_from(value: RawPageParams) -> Result<Self, Self::Error> {
        Self::new(value.page, value.limit)
    }
}

/// Metadata describing a page's position within the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// The page that was returned.
    pub current_page: u32,
    /// Total number of pages for the query.
    pub total_pages: u32,
    /// Total number of matching items across all pages.
    pub total_items: u64,
    /// Whether a later page exists.
    pub has_next_page: bool,
    /// Whether an earlier page exists.
    pub has_prev_page: bool,
}

impl PageMeta {
    /// Derive page metadata from the request parameters and the total count.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageMeta, PageParams};
    ///
    /// let params = PageParams::new(2, 10).expect("valid params");
    /// let meta = PageMeta::derive(params, 25);
    /// assert_eq!(meta.total_pages, 3);
    /// assert!(meta.has_next_page);
    /// assert!(meta.has_prev_page);
    /// ```
    #[must_use]
    pub fn derive(params: PageParams, total_items: u64) -> Self {
        let limit = u64::from(params.limit());
        let total_pages = total_items.div_ceil(limit);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        Self {
            current_page: params.page(),
            total_pages,
            total_items,
            has_next_page: u64::from(params.page()).saturating_mul(limit) < total_items,
            has_prev_page: params.page() > 1,
        }
    }
}

/// A page of items together with its derived metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// The items on this page, already ordered by the query.
    pub items: Vec<T>,
    /// Position of this page within the full result set.
    pub pagination: PageMeta,
}

impl<T> Paginated<T> {
    /// Assemble a page from its items, request parameters, and total count.
    pub fn assemble(items: Vec<T>, params: PageParams, total_items: u64) -> Self {
        Self {
            items,
            pagination: PageMeta::derive(params, total_items),
        }
    }

    /// Map the item type while preserving metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 10, PageParamsError::ZeroPage)]
    #[case(1, 0, PageParamsError::ZeroLimit)]
    fn zero_values_are_rejected(#[case] page: u32, #[case] limit: u32, #[case] expected: PageParamsError) {
        assert_eq!(PageParams::new(page, limit).expect_err("invalid"), expected);
    }

    #[rstest]
    fn oversized_limit_is_clamped() {
        let params = PageParams::new(1, MAX_LIMIT + 1).expect("valid params");
        assert_eq!(params.limit(), MAX_LIMIT);
    }

    #[rstest]
    fn defaults_apply_when_query_is_empty() {
        let params = PageParams::from_query(None, None).expect("defaults are valid");
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_LIMIT);
    }

    #[rstest]
    #[case(1, 10, 0, 0, false, false)]
    #[case(1, 10, 25, 3, true, false)]
    #[case(2, 10, 25, 3, true, true)]
    #[case(3, 10, 25, 3, false, true)]
    fn metadata_is_derived_from_totals(
        #[case] page: u32,
        #[case] limit: u32,
        #[case] total: u64,
        #[case] total_pages: u32,
        #[case] has_next: bool,
        #[case] has_prev: bool,
    ) {
        let params = PageParams::new(page, limit).expect("valid params");
        let meta = PageMeta::derive(params, total);
        assert_eq!(meta.total_pages, total_pages);
        assert_eq!(meta.has_next_page, has_next);
        assert_eq!(meta.has_prev_page, has_prev);
    }

    #[rstest]
    fn offset_skips_previous_pages() {
        let params = PageParams::new(3, 10).expect("valid params");
        assert_eq!(params.offset(), 20);
    }

    #[rstest]
    fn map_preserves_metadata() {
        let params = PageParams::new(1, 10).expect("valid params");
        let page = Paginated::assemble(vec![1_u32, 2, 3], params, 3).map(|n| n * 2);
        assert_eq!(page.items, vec![2, 4, 6]);
        assert_eq!(page.pagination.total_items, 3);
    }
}
