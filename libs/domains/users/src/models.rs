use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Default page number (1-based)
pub const DEFAULT_PAGE: u64 = 1;

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum number of records per page
pub const MAX_PAGE_SIZE: u64 = 100;

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address (unique, stored lowercase)
    pub email: String,
    /// Creation timestamp; `None` for records predating timestamp tracking
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated input for the repository `create` operation.
///
/// Produced by the service after validation and email normalization,
/// never deserialized directly from a request.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// DTO for creating a new user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
}

/// DTO for updating an existing user.
///
/// Both fields are optional, but at least one must be present.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// Pagination request, accepted in the query string as `page` / `pageSize`
#[derive(Debug, Clone, Copy, Deserialize, ToSchema, IntoParams)]
pub struct PageRequest {
    /// Page number (1-based)
    #[serde(default = "default_page")]
    pub page: u64,
    /// Records per page (1-100)
    #[serde(default = "default_page_size", alias = "pageSize")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    DEFAULT_PAGE
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Row offset for this page; page 0 is clamped to the first page
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.page_size
    }
}

/// One page of results with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Records on this page, newest first
    pub data: Vec<T>,
    /// Echoed page number (1-based)
    pub page: u64,
    /// Echoed page size
    pub page_size: u64,
    /// Total matching records
    pub total: u64,
    /// Total number of pages
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page from fetched records and the total row count.
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages: total.div_ceil(request.page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(2, 10).offset(), 10);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
        // Page 0 must not underflow
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
    }

    #[test]
    fn test_page_total_pages_rounds_up() {
        let page: Page<u32> = Page::new(vec![], PageRequest::new(1, 10), 25);
        assert_eq!(page.total_pages, 3);

        let page: Page<u32> = Page::new(vec![], PageRequest::new(1, 20), 25);
        assert_eq!(page.total_pages, 2);

        let page: Page<u32> = Page::new(vec![], PageRequest::new(1, 10), 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_page_request_defaults_from_query() {
        let req: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 10);
    }

    #[test]
    fn test_page_request_accepts_camel_case_alias() {
        let req: PageRequest = serde_json::from_str(r#"{"page": 2, "pageSize": 50}"#).unwrap();
        assert_eq!(req.page, 2);
        assert_eq!(req.page_size, 50);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page: Page<u32> = Page::new(vec![1, 2], PageRequest::new(1, 10), 2);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["total"], 2);
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());
        assert!(
            !UpdateUser {
                name: Some("Ada".to_string()),
                email: None,
            }
            .is_empty()
        );
    }
}
