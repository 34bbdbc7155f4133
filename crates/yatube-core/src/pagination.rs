//! Page-number pagination with clamping.
//!
//! Requests for a missing or non-numeric page land on page 1; requests outside
//! `1..=num_pages` land on the last page. A collection always has at least one
//! (possibly empty) page.

use serde::{Deserialize, Serialize};

/// Number of posts shown per page.
pub const PAGE_SIZE: u64 = 10;

/// Page number as requested by the client, before clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestedPage(Option<i64>);

impl RequestedPage {
    /// Parse the raw `page` query value. Anything that is not an integer means "first page".
    ///
    /// Integers beyond `i64` saturate so they still clamp to the last page.
    pub fn parse(raw: Option<&str>) -> Self {
        Self(raw.and_then(|s| parse_saturating(s.trim())))
    }

    pub fn number(n: i64) -> Self {
        Self(Some(n))
    }

    pub fn first() -> Self {
        Self(None)
    }
}

fn parse_saturating(s: &str) -> Option<i64> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

/// Splits `count` items into pages of `per_page`.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Clamp the requested page into range and describe it.
    pub fn resolve(&self, requested: RequestedPage) -> PageMeta {
        let num_pages = self.num_pages();
        let number = match requested.0 {
            None => 1,
            Some(n) if n < 1 => num_pages,
            Some(n) => (n as u64).min(num_pages),
        };

        let (start_index, end_index) = if self.count == 0 {
            (0, 0)
        } else {
            let start = self.per_page * (number - 1) + 1;
            let end = if number == num_pages {
                self.count
            } else {
                number * self.per_page
            };
            (start, end)
        };

        PageMeta {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next: number < num_pages,
            has_previous: number > 1,
            next_page_number: (number < num_pages).then_some(number + 1),
            previous_page_number: (number > 1).then_some(number - 1),
            start_index,
            end_index,
        }
    }
}

/// Everything needed to render pagination controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    /// 1-based index of the first item on this page, 0 when empty.
    pub start_index: u64,
    pub end_index: u64,
}

impl PageMeta {
    /// Number of items to skip before this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// One page of items plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Paginate an already ordered, fully loaded collection.
    pub fn from_vec(items: Vec<T>, per_page: u64, requested: RequestedPage) -> Self {
        let meta = Paginator::new(items.len() as u64, per_page).resolve(requested);
        let items = items
            .into_iter()
            .skip(meta.offset() as usize)
            .take(meta.limit() as usize)
            .collect();
        Self { items, meta }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
