//! Stream combinators used to fold nested subscriptions into one live value.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::firestore::error::FirestoreResult;

pub type ResultStream<T> = BoxStream<'static, FirestoreResult<T>>;

/// Emits the latest value of every input once each input has produced one,
/// then again whenever any input changes. No inputs emit a single empty
/// vector. The first error is forwarded and ends the stream.
pub struct CombineLatest<T> {
    inputs: Vec<Option<ResultStream<T>>>,
    latest: Vec<Option<T>>,
    done: bool,
}

impl<T> Unpin for CombineLatest<T> {}

pub fn combine_latest<T>(inputs: Vec<ResultStream<T>>) -> CombineLatest<T> {
    let latest = inputs.iter().map(|_| None).collect();
    CombineLatest {
        inputs: inputs.into_iter().map(Some).collect(),
        latest,
        done: false,
    }
}

impl<T: Clone> Stream for CombineLatest<T> {
    type Item = FirestoreResult<Vec<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.inputs.is_empty() {
            this.done = true;
            return Poll::Ready(Some(Ok(Vec::new())));
        }

        let mut changed = false;
        for (slot, latest) in this.inputs.iter_mut().zip(this.latest.iter_mut()) {
            while let Some(input) = slot.as_mut() {
                match input.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(value))) => {
                        *latest = Some(value);
                        changed = true;
                    }
                    Poll::Ready(Some(Err(err))) => {
                        this.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => *slot = None,
                    Poll::Pending => break,
                }
            }
        }

        let complete = this.latest.iter().all(Option::is_some);
        if changed && complete {
            let values = this.latest.iter().flatten().cloned().collect();
            return Poll::Ready(Some(Ok(values)));
        }
        if this.inputs.iter().all(Option::is_none) {
            this.done = true;
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

/// Maps every outer value to an inner stream and forwards the inner stream's
/// items, dropping the previous inner stream when a new outer value arrives.
pub struct SwitchMap<T, U, F> {
    outer: Option<ResultStream<T>>,
    inner: Option<ResultStream<U>>,
    project: F,
    done: bool,
}

impl<T, U, F> Unpin for SwitchMap<T, U, F> {}

pub fn switch_map<T, U, F>(outer: ResultStream<T>, project: F) -> SwitchMap<T, U, F>
where
    F: FnMut(T) -> ResultStream<U>,
{
    SwitchMap {
        outer: Some(outer),
        inner: None,
        project,
        done: false,
    }
}

impl<T, U, F> Stream for SwitchMap<T, U, F>
where
    F: FnMut(T) -> ResultStream<U>,
{
    type Item = FirestoreResult<U>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        while let Some(outer) = this.outer.as_mut() {
            match outer.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(value))) => this.inner = Some((this.project)(value)),
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.outer = None,
                Poll::Pending => break,
            }
        }

        if let Some(inner) = this.inner.as_mut() {
            match inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(Ok(value))),
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.inner = None,
                Poll::Pending => {}
            }
        }

        if this.outer.is_none() && this.inner.is_none() {
            this.done = true;
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

/// Forwards items up to and including the first error.
pub fn end_on_error<T: Send + 'static>(stream: ResultStream<T>) -> ResultStream<T> {
    stream
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
