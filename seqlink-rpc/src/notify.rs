//! Fan-out primitives used to push engine events to local subscribers.
//!
//! A [`Channel`] is a cloneable handle to one shared hub. Every clone sends
//! into and subscribes from the same hub, so handing a channel out never
//! copies its subscriber list.

use std::fmt;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::lock;

struct Hub<T> {
    subscribers: Vec<Sender<T>>,
    last: Option<T>,
}

/// Multi-subscriber value channel.
pub struct Channel<T> {
    hub: Arc<Mutex<Hub<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub {
                subscribers: Vec::new(),
                last: None,
            })),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("hub", &Arc::as_ptr(&self.hub))
            .finish()
    }
}

impl<T: Clone> Channel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `value` to every live subscriber and remember it as [`last`](Self::last).
    ///
    /// Never blocks: subscriber queues are unbounded. Subscribers whose
    /// receiver was dropped are pruned.
    pub fn send(&self, value: T) {
        let mut hub = lock(&self.hub);
        hub.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        hub.last = Some(value);
    }

    /// Register a new subscriber. It only sees values sent after this call.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        lock(&self.hub).subscribers.push(tx);
        rx
    }

    /// Most recent value sent, if any.
    pub fn last(&self) -> Option<T> {
        lock(&self.hub).last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.hub).subscribers.len()
    }

    /// True when both handles refer to the same hub.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hub, &other.hub)
    }
}

/// Zero-payload change signal; subscribers re-read whatever state they watch.
#[derive(Clone, Default, Debug)]
pub struct Notification {
    channel: Channel<()>,
}

impl Notification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        self.channel.send(());
    }

    pub fn subscribe(&self) -> Receiver<()> {
        self.channel.subscribe()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.channel.ptr_eq(&other.channel)
    }
}
