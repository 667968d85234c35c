//! Offset pagination

use serde::Deserialize;

/// Maximum rows per request
const MAX_LIMIT: i64 = 200;

/// Default rows per request
const DEFAULT_LIMIT: i64 = 100;

/// Validated skip/limit window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// Create a page window; skip is clamped to >= 0, limit to 1..=200.
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: DEFAULT_LIMIT }
    }
}

/// Query parameters for pagination
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl From<PageParams> for Page {
    fn from(params: PageParams) -> Self {
        Self::new(
            params.skip.unwrap_or(0),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_bounds() {
        let page = Page::new(-5, 0);
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, 1);

        let page = Page::new(10, 9999);
        assert_eq!(page.skip, 10);
        assert_eq!(page.limit, MAX_LIMIT);
    }

    #[test]
    fn defaults() {
        let page = Page::from(PageParams::default());
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, DEFAULT_LIMIT);
    }
}
