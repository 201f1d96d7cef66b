//! Keyed cache of per-key event channels with lazy creation.
//!
//! The registry itself does no locking and sends nothing; its owner holds it
//! under the same lock as the rest of its cached state and issues the
//! upstream bind request when [`SubscriptionRegistry::bind`] reports a key
//! that is not bound yet. Both the local access path and the inbound event
//! path resolve keys through the same map, so they converge on one channel
//! per key. Whether a channel exists and whether the remote side was asked
//! to feed it are tracked separately.

use std::collections::HashMap;
use std::hash::Hash;

use crate::notify::Channel;

struct Entry<T> {
    channel: Channel<T>,
    bound: bool,
}

pub struct SubscriptionRegistry<K, T> {
    entries: HashMap<K, Entry<T>>,
}

impl<K, T> Default for SubscriptionRegistry<K, T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone> SubscriptionRegistry<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel for `key`, creating an unbound one if absent. The flag is
    /// true when the channel was created by this call.
    pub fn get_or_insert(&mut self, key: K) -> (Channel<T>, bool) {
        match self.entries.get(&key) {
            Some(entry) => (entry.channel.clone(), false),
            None => {
                let channel = Channel::new();
                self.entries.insert(
                    key,
                    Entry {
                        channel: channel.clone(),
                        bound: false,
                    },
                );
                (channel, true)
            }
        }
    }

    /// Channel for `key`, marked bound. The flag is true when this call
    /// flipped the key to bound, i.e. the caller owes the bind request.
    pub fn bind(&mut self, key: K) -> (Channel<T>, bool) {
        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            channel: Channel::new(),
            bound: false,
        });
        let newly_bound = !entry.bound;
        entry.bound = true;
        (entry.channel.clone(), newly_bound)
    }

    /// Drop the channel for `key`. Existing subscribers keep their receivers
    /// but see no further values through this registry.
    pub fn remove(&mut self, key: &K) -> Option<Channel<T>> {
        self.entries.remove(key).map(|entry| entry.channel)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_bound(&self, key: &K) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.bound)
    }

    /// Keys the remote side was asked to feed.
    pub fn bound_keys(&self) -> Vec<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.bound)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
