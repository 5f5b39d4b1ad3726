//! Bridge from observables to async streams
//!
//! Lets async code consume store states or action executions with
//! `StreamExt`, e.g. inside a `tokio::select!` loop.
//!
//! # Example
//!
//! ```ignore
//! use polar_flux::Store;
//! use tokio_stream::StreamExt;
//!
//! let mut states = store.observe().into_stream();
//! while let Some(state) = states.next().await {
//!     render(&state);
//! }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

use crate::observable::Observable;
use crate::subscription::{Subscription, SubscriptionGuard};

/// Stream of values delivered to one subscription.
///
/// Values are buffered without bound until polled. Dropping the stream
/// cancels the subscription.
#[derive(Debug)]
pub struct ObservableStream<T> {
    rx: UnboundedReceiverStream<T>,
    guard: SubscriptionGuard,
}

impl<T> ObservableStream<T> {
    /// The subscription feeding this stream.
    pub fn subscription(&self) -> &Subscription {
        self.guard.subscription()
    }
}

impl<T> Stream for ObservableStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    /// Subscribe and forward owned copies of every value into a stream.
    ///
    /// For store views the current state is the first item.
    pub fn into_stream(&self) -> ObservableStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |value: &T| {
            // Receiver gone means the stream was dropped; its guard is
            // cancelling this subscription.
            let _ = tx.send(value.clone());
        });
        ObservableStream {
            rx: UnboundedReceiverStream::new(rx),
            guard: subscription.into_guard(),
        }
    }
}
