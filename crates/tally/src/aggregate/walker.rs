//! Cursor-based pagination over a single collection endpoint.

use std::collections::BTreeSet;
use std::future::Future;
use std::marker::PhantomData;

use thiserror::Error;

use crate::api::{ApiError, Page, PageRequest};

/// One page yielded by a [`PageWalker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedPage<T> {
    /// Page number that was requested (1-indexed).
    pub number: u32,
    pub items: Vec<T>,
}

/// A page request failed. The walk cannot continue past it.
#[derive(Debug, Clone, Error)]
#[error("page {page}: {source}")]
pub struct PageFailure {
    pub page: u32,
    pub source: ApiError,
}

/// Drives pagination of one collection until the server signals the end.
///
/// `fetch` issues exactly one request per call; the walker never retries.
/// Each page number is requested at most once: a continuation token that
/// points back at an already consumed page ends the walk.
///
/// ```ignore
/// let mut walker = PageWalker::new(100, |req| client.list_repositories("acme", req));
/// while let Some(page) = walker.next_page().await {
///     let page = page?;
///     // ...
/// }
/// ```
pub struct PageWalker<T, F> {
    fetch: F,
    per_page: u32,
    next: Option<u32>,
    visited: BTreeSet<u32>,
    items_seen: usize,
    looped: bool,
    _items: PhantomData<fn() -> T>,
}

impl<T, F, Fut> PageWalker<T, F>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    /// Create a walker starting at the first page.
    pub fn new(per_page: u32, fetch: F) -> Self {
        Self {
            fetch,
            per_page,
            next: Some(1),
            visited: BTreeSet::new(),
            items_seen: 0,
            looped: false,
            _items: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the walk is over.
    ///
    /// After an error the walk is over.
    pub async fn next_page(&mut self) -> Option<Result<WalkedPage<T>, PageFailure>> {
        let number = self.next.take()?;
        self.visited.insert(number);

        let page = match (self.fetch)(PageRequest::new(number, self.per_page)).await {
            Ok(page) => page,
            Err(source) => {
                return Some(Err(PageFailure {
                    page: number,
                    source,
                }));
            }
        };

        self.items_seen += page.items.len();
        self.next = match page.next_page {
            None | Some(0) => None,
            Some(token) if self.visited.contains(&token) => {
                tracing::warn!(
                    page = number,
                    next = token,
                    "Server pointed back at an already consumed page, ending walk"
                );
                self.looped = true;
                None
            }
            Some(token) => Some(token),
        };

        Some(Ok(WalkedPage {
            number,
            items: page.items,
        }))
    }

    /// Drain every remaining page into one vector.
    pub async fn collect_items(mut self) -> Result<Vec<T>, PageFailure> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }

    /// Number of pages requested so far (including a failed one).
    pub fn pages_requested(&self) -> u32 {
        self.visited.len() as u32
    }

    /// Number of items yielded so far.
    pub fn items_seen(&self) -> usize {
        self.items_seen
    }

    /// Returns true once no further page will be requested.
    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }

    /// Returns true if the walk ended on a repeated continuation token.
    pub fn ended_on_loop(&self) -> bool {
        self.looped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Scripted collection: page number -> (items, next token).
    fn script(
        pages: &[(u32, Vec<u32>, Option<u32>)],
    ) -> (
        impl FnMut(PageRequest) -> std::future::Ready<Result<Page<u32>, ApiError>> + use<>,
        Arc<Mutex<Vec<u32>>>,
    ) {
        let pages: HashMap<u32, (Vec<u32>, Option<u32>)> = pages
            .iter()
            .map(|(n, items, next)| (*n, (items.clone(), *next)))
            .collect();
        let requested = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requested);

        let fetch = move |req: PageRequest| {
            log.lock().unwrap().push(req.page);
            std::future::ready(match pages.get(&req.page) {
                Some((items, next)) => Ok(Page::new(items.clone(), *next)),
                None => Err(ApiError::not_found(format!("page {}", req.page))),
            })
        };
        (fetch, requested)
    }

    #[tokio::test]
    async fn test_walks_until_zero_token() {
        let (fetch, requested) = script(&[
            (1, vec![1, 2], Some(2)),
            (2, vec![3, 4], Some(3)),
            (3, vec![5], Some(0)),
        ]);
        let walker = PageWalker::new(2, fetch);
        let items = walker.collect_items().await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(*requested.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_single_page() {
        let (fetch, requested) = script(&[(1, vec![7], None)]);
        let mut walker = PageWalker::new(100, fetch);

        let page = walker.next_page().await.unwrap().unwrap();
        assert_eq!(page.number, 1);
        assert!(walker.is_finished());
        assert!(walker.next_page().await.is_none());
        assert_eq!(requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_never_rerequests_consumed_page() {
        let (fetch, requested) = script(&[(1, vec![1], Some(2)), (2, vec![2], Some(1))]);
        let mut walker = PageWalker::new(100, fetch);
        while let Some(page) = walker.next_page().await {
            page.unwrap();
        }

        assert!(walker.ended_on_loop());
        assert_eq!(*requested.lock().unwrap(), vec![1, 2]);
        assert_eq!(walker.items_seen(), 2);
    }

    #[tokio::test]
    async fn test_error_ends_walk() {
        let (fetch, requested) = script(&[(1, vec![1], Some(2))]);
        let mut walker = PageWalker::new(100, fetch);

        assert!(walker.next_page().await.unwrap().is_ok());
        let err = walker.next_page().await.unwrap().unwrap_err();
        assert_eq!(err.page, 2);
        assert!(walker.next_page().await.is_none());
        assert_eq!(walker.pages_requested(), 2);
        assert_eq!(*requested.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_page_size_is_forwarded() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&sizes);
        let walker = PageWalker::new(30, move |req: PageRequest| {
            log.lock().unwrap().push(req.per_page);
            std::future::ready(Ok::<_, ApiError>(Page::<u32>::empty()))
        });
        walker.collect_items().await.unwrap();
        assert_eq!(*sizes.lock().unwrap(), vec![30]);
    }
}
