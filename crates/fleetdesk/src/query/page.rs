use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 15;

/// Page selection. `per_page: None` returns every matching row on page one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub per_page: Option<u32>,
    pub page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: Some(DEFAULT_PER_PAGE),
            page: 1,
        }
    }
}

impl PageRequest {
    pub fn all() -> Self {
        Self {
            per_page: None,
            page: 1,
        }
    }

    pub fn of(per_page: u32, page: u32) -> Self {
        Self {
            per_page: Some(per_page),
            page,
        }
    }

    /// Cut one page out of the full, already ordered result set.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        match self.per_page.filter(|size| *size > 0) {
            None => Page {
                items,
                total,
                page: 1,
                per_page: None,
            },
            Some(size) => {
                let page = self.page.max(1);
                let size_usize = size as usize;
                let skip = (page as usize - 1).saturating_mul(size_usize);
                let items = items.into_iter().skip(skip).take(size_usize).collect();
                Page {
                    items,
                    total,
                    page,
                    per_page: Some(size),
                }
            }
        }
    }
}

/// One page of results plus the total row count for page-count computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u32 {
        match self.per_page {
            None | Some(0) => 1,
            Some(size) => {
                let pages = self.total.div_ceil(size as usize).max(1);
                u32::try_from(pages).unwrap_or(u32::MAX)
            }
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
