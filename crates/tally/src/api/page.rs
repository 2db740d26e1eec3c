//! Cursor pagination primitives shared by every collection endpoint.
//!
//! A collection is consumed one [`Page`] at a time. Each page carries the
//! items of one bounded slice plus the continuation token for the next
//! slice. GitHub encodes the token as a page number in the `Link` header;
//! a missing token (or a zero one) means the walk is over.

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page size GitHub accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Parameters for one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number (the continuation token).
    pub page: u32,
    /// Requested page size.
    pub per_page: u32,
}

impl PageRequest {
    /// Request the first page of a collection.
    #[inline]
    pub fn first(per_page: u32) -> Self {
        Self::new(1, per_page)
    }

    /// Request a specific page, clamping the size to what the API accepts.
    #[inline]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One slice of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Continuation token for the next page, `None` at the end of the walk.
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    /// Create a page. A zero continuation token is normalized to `None`.
    pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
        Self {
            items,
            next_page: next_page.filter(|&p| p != 0),
        }
    }

    /// Create the final page of a collection.
    #[inline]
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// An empty final page.
    #[inline]
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }

    /// Returns true if the server signalled more pages.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Number of items on this page.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if this page holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map every item, keeping the continuation token.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page: self.next_page,
        }
    }
}
