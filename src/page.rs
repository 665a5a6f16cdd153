//! Paged result iteration.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;

use crate::error::Error;
use crate::protocol::response::RowsResult;
use crate::row::Row;

/// One page of a `Rows` RESULT: its decoded rows plus the cursor for the
/// next page, if the server reported `HAS_MORE_PAGES`.
#[derive(Debug, Clone)]
pub struct Page {
    rows: Vec<Row>,
    paging_state: Option<Bytes>,
}

impl Page {
    pub(crate) fn from_rows_result(result: RowsResult) -> Page {
        let columns = Arc::new(result.metadata.columns);
        let rows = result.rows.into_iter().map(|values| Row::new(columns.clone(), values)).collect();
        Page { rows, paging_state: result.metadata.paging_state }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn has_more_pages(&self) -> bool {
        self.paging_state.is_some()
    }

    pub fn paging_state(&self) -> Option<&Bytes> {
        self.paging_state.as_ref()
    }
}

pub(crate) type FetchFut = Pin<Box<dyn Future<Output = Result<Page, Error>> + Send>>;

enum StreamState {
    Pending(Option<Bytes>),
    Fetching(FetchFut),
    Done,
}

/// Lazily fetches subsequent pages, one `paging_state` cursor at a time.
///
/// Drives one boxed future per page — one allocation per page fetch, in
/// exchange for a state machine with no unsafe pin projection to get wrong.
pub struct PageStream<F> {
    fetch: F,
    state: StreamState,
}

impl<F> PageStream<F>
where
    F: FnMut(Option<Bytes>) -> FetchFut,
{
    pub(crate) fn new(fetch: F) -> PageStream<F> {
        PageStream { fetch, state: StreamState::Pending(None) }
    }
}

impl<F> Stream for PageStream<F>
where
    F: FnMut(Option<Bytes>) -> FetchFut + Unpin,
{
    type Item = Result<Page, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                StreamState::Done => return Poll::Ready(None),
                StreamState::Pending(cursor) => {
                    let cursor = cursor.take();
                    this.state = StreamState::Fetching((this.fetch)(cursor));
                }
                StreamState::Fetching(fut) => match fut.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(e)) => {
                        this.state = StreamState::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(Ok(page)) => {
                        this.state = match page.paging_state.clone() {
                            Some(cursor) => StreamState::Pending(Some(cursor)),
                            None => StreamState::Done,
                        };
                        return Poll::Ready(Some(Ok(page)));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_core::Stream;
    use std::pin::pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_waker() -> std::task::Waker {
        use std::task::{RawWaker, RawWakerVTable, Waker};
        fn clone(_: *const ()) -> RawWaker {
            raw()
        }
        fn noop(_: *const ()) {}
        fn raw() -> RawWaker {
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(raw()) }
    }

    #[test]
    fn stream_terminates_when_no_more_pages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let mut stream = pin!(PageStream::new(move |_cursor: Option<Bytes>| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Page { rows: vec![], paging_state: None })
            }) as FetchFut
        }));

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(matches!(stream.as_mut().poll_next(&mut cx), Poll::Ready(Some(Ok(_)))));
        assert!(matches!(stream.as_mut().poll_next(&mut cx), Poll::Ready(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
