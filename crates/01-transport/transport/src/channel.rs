//! Batched message channel between host event sources and the guest loop.
//!
//! Any number of producers may [`push`](MessageChannel::push) from any context
//! (event callbacks, timers, storage completions, other threads). Exactly one
//! consumer drains the channel, always taking every pending message at once.
//! When nothing is pending the consumer parks: asynchronously through
//! [`drain`](MessageChannel::drain), or on a condition variable through
//! [`drain_blocking`](MessageChannel::drain_blocking).

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use crate::value::Message;

/// Ordered set of messages drained in one consumption cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    messages: SmallVec<[Message; 8]>,
}

impl Batch {
    /// Creates a batch holding a single message.
    pub fn single(message: Message) -> Self {
        let mut messages = SmallVec::new();
        messages.push(message);
        Self { messages }
    }

    /// Number of messages in the batch.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` when the batch carries no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates the messages in push order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Consumes the batch into a vector.
    pub fn into_vec(self) -> Vec<Message> {
        self.messages.into_vec()
    }
}

impl IntoIterator for Batch {
    type Item = Message;
    type IntoIter = smallvec::IntoIter<[Message; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl FromIterator<Message> for Batch {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

#[derive(Default)]
struct State {
    pending: SmallVec<[Message; 8]>,
    waker: Option<Waker>,
}

impl State {
    fn take_batch(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Batch {
            messages: mem::take(&mut self.pending),
        })
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    ready: Condvar,
}

/// Multi-producer, single-consumer queue drained in whole batches.
///
/// Cloning yields another handle onto the same queue.
#[derive(Clone, Default)]
pub struct MessageChannel {
    shared: Arc<Shared>,
}

impl MessageChannel {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message`, waking the consumer if it is parked. Never blocks.
    pub fn push(&self, message: Message) {
        tracing::trace!(kind = %message.kind, "message queued");
        let waker = {
            let mut state = self.shared.state.lock();
            state.pending.push(message);
            state.waker.take()
        };
        self.shared.ready.notify_one();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Takes every pending message without waiting.
    pub fn try_drain(&self) -> Option<Batch> {
        self.shared.state.lock().take_batch()
    }

    /// Resolves with every pending message, parking until at least one exists.
    ///
    /// Only one consumer may await the channel at a time.
    pub fn drain(&self) -> Drain<'_> {
        Drain { channel: self }
    }

    /// Blocks the calling thread until at least one message is pending, then takes them all.
    pub fn drain_blocking(&self) -> Batch {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(batch) = state.take_batch() {
                return batch;
            }
            self.shared.ready.wait(&mut state);
        }
    }

    /// Number of messages waiting to be drained.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Future returned by [`MessageChannel::drain`].
#[must_use = "futures do nothing unless polled"]
pub struct Drain<'a> {
    channel: &'a MessageChannel,
}

impl Future for Drain<'_> {
    type Output = Batch;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Batch> {
        let mut state = self.channel.shared.state.lock();
        if let Some(batch) = state.take_batch() {
            return Poll::Ready(batch);
        }
        match &state.waker {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            _ => state.waker = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}
