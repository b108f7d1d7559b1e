use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt};

use crate::Result;

/// One page of a token-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

// ─── pages ────────────────────────────────────────────────────────────────

/// Turn a token-driven fetch into a lazy stream of pages.
///
/// Nothing is requested until the stream is polled, and each poll issues at
/// most one fetch. An empty or missing `next_token` ends the stream. The
/// stream is not restartable itself; call the constructor again to list from
/// the first page.
pub fn pages<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, Result<Vec<T>>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    stream::try_unfold((fetch, Cursor::Start), |(mut fetch, cursor)| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };
        let page = fetch(token).await?;
        let next = match page.next_token {
            Some(token) if !token.is_empty() => Cursor::Next(token),
            _ => Cursor::Done,
        };
        Ok(Some((page.items, (fetch, next))))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiError;
    use futures::TryStreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn three_pages(calls: Arc<AtomicUsize>) -> BoxStream<'static, Result<Vec<u32>>> {
        pages(move |token| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(match token.as_deref() {
                    None => Page {
                        items: vec![1, 2],
                        next_token: Some("p2".into()),
                    },
                    Some("p2") => Page {
                        items: vec![3],
                        next_token: Some("p3".into()),
                    },
                    _ => Page::last(vec![4]),
                })
            }
        })
    }

    #[tokio::test]
    async fn drains_every_page_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let all: Vec<Vec<u32>> = three_pages(calls.clone()).try_collect().await.unwrap();
        assert_eq!(all, vec![vec![1, 2], vec![3], vec![4]]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn is_lazy_and_stops_when_caller_stops() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = three_pages(calls.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = stream.try_next().await.unwrap();
        assert_eq!(first, Some(vec![1, 2]));
        drop(stream);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_token_ends_stream() {
        let stream = pages(|_token| async {
            Ok(Page {
                items: vec!["only"],
                next_token: Some(String::new()),
            })
        });
        let all: Vec<Vec<&str>> = stream.try_collect().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn error_ends_stream() {
        let mut stream = pages(|_token| async {
            Err::<Page<u8>, _>(ApiError::Status {
                operation: "ListRoots",
                status: 500,
                body: "boom".into(),
            })
        });
        assert!(stream.try_next().await.is_err());
        assert!(stream.next().await.is_none());
    }
}
