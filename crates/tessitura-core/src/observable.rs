//! Observable values and event streams.
//!
//! Two flavours, both backed by `crossbeam-channel` so that subscribers can
//! poll, block, or join a `select!` loop:
//!
//! - [`Watch`]: a current value plus subscribers. A new subscriber
//!   immediately receives the current value, then every later update.
//! - [`Broadcast`]: events without replay. Subscribers only see what is
//!   published after they subscribe.
//!
//! Dropping a [`Subscription`] unsubscribes it; the publisher prunes
//! disconnected subscribers on its next publish.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::time::Duration;

/// Receiving end of a [`Watch`] or [`Broadcast`].
#[derive(Debug)]
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next pending value, if any.
    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next value.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Drains everything pending and returns the most recent value.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    /// Iterates over pending values without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = T> + '_ {
        self.rx.try_iter()
    }

    /// Underlying channel, for use in `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }
}

fn publish_to<T: Clone>(subscribers: &mut Vec<Sender<T>>, value: &T) {
    subscribers.retain(|tx| tx.send(value.clone()).is_ok());
}

/// Event stream without replay.
#[derive(Debug)]
pub struct Broadcast<T> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Broadcast<T> {
    /// Creates a stream with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        Subscription { rx }
    }

    /// Delivers `value` to every live subscriber.
    pub fn publish(&self, value: T) {
        publish_to(&mut self.subscribers.lock(), &value);
    }

    /// Number of subscribers seen alive at the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[derive(Debug)]
struct WatchInner<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

/// Replay-latest observable value.
#[derive(Debug)]
pub struct Watch<T> {
    inner: Mutex<WatchInner<T>>,
}

impl<T: Clone> Watch<T> {
    /// Creates a watch holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(WatchInner {
                value,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Replaces the value and notifies every subscriber.
    pub fn set(&self, value: T) {
        let mut inner = self.inner.lock();
        publish_to(&mut inner.subscribers, &value);
        inner.value = value;
    }

    /// Subscribes; the current value is delivered first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut inner = self.inner.lock();
        if tx.send(inner.value.clone()).is_ok() {
            inner.subscribers.push(tx);
        }
        Subscription { rx }
    }
}

impl<T: Clone + PartialEq> Watch<T> {
    /// Like [`Watch::set`] but skips the notification when nothing changed.
    ///
    /// Returns true if the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.value == value {
            return false;
        }
        publish_to(&mut inner.subscribers, &value);
        inner.value = value;
        true
    }
}
