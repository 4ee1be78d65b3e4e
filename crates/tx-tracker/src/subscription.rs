//! The stream of events a spawned poller publishes.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::mpsc;

/// Events of one poller, in the order they happened.
///
/// The stream ends once the poller has stopped and every event has been read.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wraps the receiving end of a poller's event channel.
    pub const fn from_receiver(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Events published but not read yet.
    pub fn backlog(&self) -> usize {
        self.receiver.len()
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
