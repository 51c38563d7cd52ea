//! Common types used across the platform

use serde::{Deserialize, Deserializer, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Upper bound on page size
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Pagination {
    /// Clamp caller-supplied values into a usable window
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total_items: i64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(pagination, total_items),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total_items: i64) -> Self {
        let total_items = u64::try_from(total_items).unwrap_or(0);
        let per_page = u64::from(pagination.per_page.max(1));
        let total_pages = u32::try_from(total_items.div_ceil(per_page)).unwrap_or(u32::MAX);
        Self {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items,
            total_pages,
        }
    }
}

/// Deserialize a field that distinguishes "absent" from an explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_normalized_caps_page_size() {
        let p = Pagination { page: 0, per_page: 500 }.normalized();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let meta = PaginationMeta::new(Pagination { page: 1, per_page: 10 }, 21);
        assert_eq!(meta.total_pages, 3);
        let empty = PaginationMeta::new(Pagination::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        due_date: Option<Option<String>>,
    }

    #[test]
    fn test_deserialize_some_distinguishes_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.due_date, None);
        let cleared: Patch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));
        let set: Patch = serde_json::from_str(r#"{"due_date": "2024-01-01"}"#).unwrap();
        assert_eq!(set.due_date, Some(Some("2024-01-01".to_string())));
    }
}
