//! Page requests and pages of results.

use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size accepted from a query string.
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses `field` or `field,asc|desc`.
    pub fn parse(value: &str) -> Result<Self, CriteriaError> {
        let (field, direction) = match value.split_once(',') {
            Some((field, dir)) => {
                let direction = match dir.to_ascii_lowercase().as_str() {
                    "asc" => SortDirection::Ascending,
                    "desc" => SortDirection::Descending,
                    _ => {
                        return Err(CriteriaError::MalformedParameter {
                            parameter: "sort".to_string(),
                            message: format!("unknown sort direction '{}'", dir),
                        });
                    }
                };
                (field, direction)
            }
            None => (value, SortDirection::Ascending),
        };
        if field.is_empty() {
            return Err(CriteriaError::MalformedParameter {
                parameter: "sort".to_string(),
                message: "missing sort field".to_string(),
            });
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// A zero-based page request with optional ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    #[serde(default)]
    pub sort: Vec<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: Vec::new(),
        }
    }

    /// Appends an ordering term.
    pub fn with_sort(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Reads `page`, `size` and `sort` from a URL query string.
    ///
    /// Keys other than those three are ignored, so the same string can be
    /// handed to [`crate::criteria::parse_criteria`].
    pub fn from_query(query: &str) -> Result<Self, CriteriaError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut request = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "page" => request.page = parse_number(&key, &value)?,
                "size" => {
                    let size = parse_number(&key, &value)?;
                    if size == 0 || size > MAX_PAGE_SIZE {
                        return Err(CriteriaError::MalformedParameter {
                            parameter: "size".to_string(),
                            message: format!("page size must be between 1 and {}", MAX_PAGE_SIZE),
                        });
                    }
                    request.size = size;
                }
                "sort" => request.sort.push(SortOrder::parse(&value)?),
                _ => {}
            }
        }

        Ok(request)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32, CriteriaError> {
    value.parse().map_err(|_| CriteriaError::MalformedParameter {
        parameter: key.to_string(),
        message: format!("'{}' is not a non-negative integer", value),
    })
}

/// One page of results plus the total count of matching records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
        }
    }

    /// Total number of pages at this page size.
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(u64::from(self.size))
    }

    /// Returns true if a later page exists.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Maps the page content, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}
