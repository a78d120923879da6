use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub const DEFAULT_PAGE_INDEX: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Paging parameters as they arrive on the query string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default = "default_page_index", alias = "pageIndex")]
    pub page_index: i64,
    #[serde(default = "default_page_size", alias = "pageSize")]
    pub page_size: i64,
}

fn default_page_index() -> i64 {
    DEFAULT_PAGE_INDEX
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_index: DEFAULT_PAGE_INDEX,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page_index: i64, page_size: i64) -> Result<Self, PaginationError> {
        let pagination = Self { page_index, page_size };
        pagination.validate()?;
        Ok(pagination)
    }

    pub fn offset(&self) -> i64 {
        self.page_index.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn validate(&self) -> Result<(), PaginationError> {
        if self.page_index < 1 {
            return Err(PaginationError::InvalidArgument(format!(
                "page_index must be at least 1, got {}",
                self.page_index
            )));
        }
        if self.page_size < 1 {
            return Err(PaginationError::InvalidArgument(format!(
                "page_size must be positive, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}

/// One page of an ordered result set.
///
/// `items` is expected to be the window the caller already fetched for
/// `page_index`; only the metadata is computed here. The previous/next flags
/// are derived on demand so they can never disagree with the stored fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedList<T> {
    items: Vec<T>,
    page_index: i64,
    page_size: i64,
    total_pages: i64,
}

impl<T> PaginatedList<T> {
    pub fn new(
        items: Vec<T>,
        total_count: i64,
        page_index: i64,
        page_size: i64,
    ) -> Result<Self, PaginationError> {
        Pagination { page_index, page_size }.validate()?;

        if total_count < 0 {
            return Err(PaginationError::InvalidArgument(format!(
                "total_count must not be negative, got {}",
                total_count
            )));
        }
        if items.len() as u64 > page_size as u64 {
            return Err(PaginationError::InvalidArgument(format!(
                "{} items do not fit in a page of {}",
                items.len(),
                page_size
            )));
        }

        Ok(Self {
            items,
            page_index,
            page_size,
            total_pages: total_pages(total_count, page_size),
        })
    }

    pub fn from_pagination(
        items: Vec<T>,
        total_count: i64,
        pagination: &Pagination,
    ) -> Result<Self, PaginationError> {
        Self::new(items, total_count, pagination.page_index, pagination.page_size)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn page_index(&self) -> i64 {
        self.page_index
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn total_pages(&self) -> i64 {
        self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index < self.total_pages
    }

    /// Converts the items while keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> PaginatedList<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }

    pub fn try_map<U, E, F>(self, f: F) -> Result<PaginatedList<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(PaginatedList {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            page_index: self.page_index,
            page_size: self.page_size,
            total_pages: self.total_pages,
        })
    }
}

/// Shorthand for [`PaginatedList::new`].
pub fn paginate<T>(
    items: Vec<T>,
    total_count: i64,
    page_index: i64,
    page_size: i64,
) -> Result<PaginatedList<T>, PaginationError> {
    PaginatedList::new(items, total_count, page_index, page_size)
}

// ceil(total_count / page_size) without going through floating point
fn total_pages(total_count: i64, page_size: i64) -> i64 {
    total_count / page_size + i64::from(total_count % page_size != 0)
}

impl<T: Serialize> Serialize for PaginatedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut page = serializer.serialize_struct("PaginatedList", 6)?;
        page.serialize_field("items", &self.items)?;
        page.serialize_field("page_index", &self.page_index)?;
        page.serialize_field("page_size", &self.page_size)?;
        page.serialize_field("total_pages", &self.total_pages)?;
        page.serialize_field("has_previous_page", &self.has_previous_page())?;
        page.serialize_field("has_next_page", &self.has_next_page())?;
        page.end()
    }
}
