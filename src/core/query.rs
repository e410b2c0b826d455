//! List requests, filters, sorters and pagination
//!
//! A [`ListRequest`] is the statically validated form of what a table view
//! asks for: one page of one resource, narrowed by equality filters and
//! ordered by sorters. Raw values coming off the wire go through
//! [`ListQueryParams`] and are coerced or rejected here, before any query is
//! built.

use crate::core::error::{AdminResult, ValidationError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Page size used when the caller supplies none (or an unusable one)
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest page a caller may ask for; bigger sizes are clamped to it
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Last addressable row index; PostgREST offsets are signed 64-bit
const MAX_ROW_INDEX: u64 = i64::MAX as u64;

/// Projection used when the caller supplies none
pub const DEFAULT_SELECTION: &str = "*";

static FIELD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("field name pattern is valid")
});

/// Filter operators understood by the translator
///
/// The set is closed: anything else is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
}

impl FilterOperator {
    /// Parse an operator name for the given field
    pub fn parse(field: &str, operator: &str) -> Result<Self, ValidationError> {
        match operator {
            "eq" => Ok(FilterOperator::Eq),
            other => Err(ValidationError::UnsupportedOperator {
                field: field.to_string(),
                operator: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
        }
    }
}

/// A single predicate on one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Filter {
    /// Equality predicate
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Eq,
            value: value.into(),
        }
    }
}

/// Filter as sent by the presentation layer
#[derive(Debug, Clone, Deserialize)]
pub struct RawFilter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl TryFrom<RawFilter> for Filter {
    type Error = ValidationError;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        let operator = FilterOperator::parse(&raw.field, &raw.operator)?;
        Ok(Self {
            field: raw.field,
            operator,
            value: raw.value,
        })
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn is_ascending(&self) -> bool {
        matches!(self, SortDirection::Asc)
    }
}

/// Ordering on one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sorter {
    pub field: String,
    pub direction: SortDirection,
}

impl Sorter {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sorter as sent by the presentation layer
#[derive(Debug, Clone, Deserialize)]
pub struct RawSorter {
    pub field: String,
    #[serde(alias = "direction")]
    pub order: String,
}

impl TryFrom<RawSorter> for Sorter {
    type Error = ValidationError;

    fn try_from(raw: RawSorter) -> Result<Self, Self::Error> {
        let direction = match raw.order.to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => {
                return Err(ValidationError::InvalidSortOrder {
                    field: raw.field,
                    order: raw.order,
                });
            }
        };
        Ok(Self {
            field: raw.field,
            direction,
        })
    }
}

/// Page number and size, both at least 1
///
/// Sizes are capped at [`MAX_PAGE_SIZE`] and page numbers at the last page
/// whose rows are still addressable, so offsets never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn new(page: u64, page_size: u64) -> Self {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        Self {
            page: page.clamp(1, MAX_ROW_INDEX / page_size),
            page_size,
        }
    }

    /// Coerce raw page values, falling back to page 1 and `default_page_size`
    /// for anything missing, non-numeric or not positive
    pub fn coerce(page: Option<&Value>, page_size: Option<&Value>, default_page_size: u64) -> Self {
        Self::new(
            page.and_then(positive_integer).unwrap_or(1),
            page_size
                .and_then(positive_integer)
                .unwrap_or(default_page_size),
        )
    }

    /// Zero-based offset of the first row on this page
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Inclusive row range `[start, end]` covered by this page
    pub fn range(&self) -> (u64, u64) {
        let start = self.offset();
        (
            start,
            start.saturating_add(self.page_size.saturating_sub(1)),
        )
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Integer value of a JSON number or numeric string, if it is at least 1
fn positive_integer(raw: &Value) -> Option<u64> {
    let number = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => n as f64,
                Err(_) => s.parse::<f64>().ok()?,
            }
        }
        _ => return None,
    };
    if !number.is_finite() || number < 1.0 {
        return None;
    }
    Some(number.trunc() as u64)
}

/// One page of one resource, narrowed and ordered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRequest {
    pub resource: String,
    pub pagination: Pagination,
    pub filters: Vec<Filter>,
    pub sorters: Vec<Sorter>,
    pub selection: String,
}

impl ListRequest {
    /// First page of `resource` with default size and projection
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            pagination: Pagination::default(),
            filters: Vec::new(),
            sorters: Vec::new(),
            selection: DEFAULT_SELECTION.to_string(),
        }
    }

    pub fn page(mut self, page: u64, page_size: u64) -> Self {
        self.pagination = Pagination::new(page, page_size);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sorter: Sorter) -> Self {
        self.sorters.push(sorter);
        self
    }

    pub fn select(mut self, selection: impl Into<String>) -> Self {
        self.selection = selection.into();
        self
    }

    /// Check field names and projection before they are turned into a query
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = self
            .filters
            .iter()
            .map(|f| &f.field)
            .chain(self.sorters.iter().map(|s| &s.field));
        for field in fields {
            if !FIELD_NAME.is_match(field) {
                return Err(ValidationError::InvalidField {
                    field: field.clone(),
                });
            }
        }

        let selection = self.selection.trim();
        if selection.is_empty() || selection.contains(['&', '=', '#']) {
            return Err(ValidationError::InvalidSelection {
                selection: self.selection.clone(),
            });
        }
        Ok(())
    }
}

/// Query parameters for a list endpoint
///
/// # Format
/// ```text
/// GET /api/amenities?current=2&pageSize=25
/// GET /api/amenities?filters=[{"field":"category_id","operator":"eq","value":3}]
/// GET /api/amenities?sorters=[{"field":"name","order":"asc"}]&select=id,name
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListQueryParams {
    /// Page number (starts at 1)
    pub current: Option<String>,

    /// Alias for `current`
    pub page: Option<String>,

    /// Number of rows per page
    #[serde(rename = "pageSize", alias = "page_size")]
    pub page_size: Option<String>,

    /// Filters as a JSON array of `{field, operator, value}`
    pub filters: Option<String>,

    /// Sorters as a JSON array of `{field, order}`
    pub sorters: Option<String>,

    /// Column projection
    pub select: Option<String>,
}

impl ListQueryParams {
    /// Build a validated list request for `resource`
    pub fn into_request(
        self,
        resource: impl Into<String>,
        default_page_size: u64,
    ) -> AdminResult<ListRequest> {
        let page = self.current.or(self.page).map(Value::String);
        let page_size = self.page_size.map(Value::String);

        let filters = match self.filters.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Vec<RawFilter>>(raw)?
                .into_iter()
                .map(Filter::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let sorters = match self.sorters.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Vec<RawSorter>>(raw)?
                .into_iter()
                .map(Sorter::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        let request = ListRequest {
            resource: resource.into(),
            pagination: Pagination::coerce(page.as_ref(), page_size.as_ref(), default_page_size),
            filters,
            sorters,
            selection: self
                .select
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SELECTION.to_string()),
        };
        request.validate()?;
        Ok(request)
    }
}

/// One page of rows plus the matching-row count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    #[serde(rename = "data")]
    pub rows: Vec<Value>,
    pub total: u64,
}

impl ListResult {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u64,

    /// Number of rows per page
    #[serde(rename = "pageSize")]
    pub page_size: u64,

    /// Total number of matching rows
    pub total: u64,

    /// Total number of pages
    #[serde(rename = "totalPages")]
    pub total_pages: u64,

    /// Whether there is a next page
    #[serde(rename = "hasNext")]
    pub has_next: bool,

    /// Whether there is a previous page
    #[serde(rename = "hasPrev")]
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total: u64) -> Self {
        let Pagination { page, page_size } = pagination;
        let total_pages = if total == 0 || page_size == 0 {
            0
        } else {
            total.div_ceil(page_size)
        };

        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: pagination.offset().saturating_add(page_size) < total,
            has_prev: page > 1,
        }
    }
}
