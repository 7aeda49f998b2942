//! List query parsing: pagination, search, role filter and ordering.

use crate::auth::models::Role;
use crate::errors::{AppError, FieldErrors};
use serde::Deserialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
pub const MAX_SEARCH_LEN: usize = 100;

/// Raw query string; every field is parsed by hand so bad input yields a
/// field error map instead of an extractor rejection
#[derive(Debug, Default, Deserialize)]
pub struct ListUserQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub sort: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Username,
    Email,
    CreatedAt,
}

impl SortField {
    /// Column name; only whitelisted identifiers ever reach the ORDER BY clause
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Username => "username",
            SortField::Email => "email",
            SortField::CreatedAt => "created_at",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(SortField::Id),
            "username" => Some(SortField::Username),
            "email" => Some(SortField::Email),
            "created_at" => Some(SortField::CreatedAt),
            _ => None,
        }
    }
}

/// Validated listing parameters handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub sort: SortOrder,
    pub sort_by: SortField,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            role: None,
            sort: SortOrder::Desc,
            sort_by: SortField::Id,
        }
    }
}

impl UserFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ListUserQuery {
    pub fn into_filter(self) -> Result<UserFilter, AppError> {
        let mut errors = FieldErrors::new();
        let mut filter = UserFilter::default();

        if let Some(raw) = non_empty(&self.page) {
            match raw.parse::<u32>() {
                Ok(page) if page >= 1 => filter.page = page,
                _ => {
                    errors.insert("page".into(), "page must be at least 1".into());
                }
            }
        }

        if let Some(raw) = non_empty(&self.limit) {
            match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => filter.limit = limit,
                _ => {
                    errors.insert(
                        "limit".into(),
                        format!("limit must be between 1 and {MAX_LIMIT}"),
                    );
                }
            }
        }

        if let Some(search) = non_empty(&self.search) {
            if search.chars().count() > MAX_SEARCH_LEN {
                errors.insert(
                    "search".into(),
                    format!("search must not exceed {MAX_SEARCH_LEN} characters"),
                );
            } else {
                filter.search = Some(search.to_string());
            }
        }

        if let Some(role) = non_empty(&self.role) {
            match Role::parse(role) {
                Some(role) => filter.role = Some(role),
                None => {
                    errors.insert("role".into(), "role must be one of: user admin".into());
                }
            }
        }

        if let Some(sort) = non_empty(&self.sort) {
            match sort {
                "asc" => filter.sort = SortOrder::Asc,
                "desc" => filter.sort = SortOrder::Desc,
                _ => {
                    errors.insert("sort".into(), "sort must be one of: asc desc".into());
                }
            }
        }

        if let Some(sort_by) = non_empty(&self.sort_by) {
            match SortField::parse(sort_by) {
                Some(field) => filter.sort_by = field,
                None => {
                    errors.insert(
                        "sort_by".into(),
                        "sort_by must be one of: id username email created_at".into(),
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(AppError::validation(errors))
        }
    }
}
