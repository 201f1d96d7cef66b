//! Message transport between the control side and the engine.
//!
//! [`RpcChannel`] is the seam both sides talk through: every listener sees
//! every message (broadcast), and filtering by target is the listener's job.
//! [`LocalChannel`] is the in-process implementation, either sharing messages
//! directly or pushing them through a real encode/decode step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use serde::Deserialize;

use crate::config::RpcConfig;
use crate::framing::{self, DEFAULT_MAX_MESSAGE_BYTES};
use crate::lock;
use crate::message::Msg;

/// Callback invoked for every delivered message.
pub type Handler = Box<dyn Fn(&Msg) + Send + Sync>;

/// Token returned by [`RpcChannel::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Transport contract required by the proxies.
pub trait RpcChannel: Send + Sync {
    /// Best-effort, non-blocking hand-off. Sends from one caller are
    /// delivered in order.
    fn send(&self, msg: Msg);

    /// Register a handler for every message delivered by this channel.
    fn listen(&self, handler: Handler) -> ListenerId;

    /// Remove a handler. Idempotent. Once this returns the handler is not
    /// running and will never run again.
    fn unlisten(&self, id: ListenerId);

    /// True when payloads cross a real serialization boundary, so live
    /// in-process handles cannot be sent.
    fn is_serialized(&self) -> bool;
}

/// How a [`LocalChannel`] hands messages to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Listeners receive the sent message itself; handles are shared.
    #[default]
    Direct,
    /// Messages are encoded to a frame and each listener gets a decoded copy.
    Serialized,
}

struct Gate {
    active: bool,
    in_flight: usize,
}

struct Listener {
    id: ListenerId,
    handler: Handler,
    gate: Mutex<Gate>,
    idle: Condvar,
}

/// Marks one running invocation; released even if the handler panics.
struct InFlight<'a>(&'a Listener);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut gate = lock(&self.0.gate);
        gate.in_flight -= 1;
        if gate.in_flight == 0 {
            self.0.idle.notify_all();
        }
    }
}

impl Listener {
    fn invoke(&self, msg: &Msg) {
        let _in_flight = {
            let mut gate = lock(&self.gate);
            if !gate.active {
                return;
            }
            gate.in_flight += 1;
            InFlight(self)
        };
        (self.handler)(msg);
    }

    /// Close the gate and wait for running invocations to drain.
    fn revoke(&self) {
        let mut gate = lock(&self.gate);
        gate.active = false;
        while gate.in_flight > 0 {
            gate = self
                .idle
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// In-process broadcast channel.
///
/// Delivery is synchronous on the sending thread, to listeners in
/// registration order. Handlers may send on the same channel.
pub struct LocalChannel {
    mode: TransportMode,
    max_message_bytes: usize,
    listeners: RwLock<Vec<Arc<Listener>>>,
    next_id: AtomicU64,
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new(TransportMode::Direct)
    }
}

impl LocalChannel {
    pub fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn direct() -> Self {
        Self::new(TransportMode::Direct)
    }

    pub fn serialized() -> Self {
        Self::new(TransportMode::Serialized)
    }

    pub fn from_config(config: &RpcConfig) -> Self {
        let mut channel = Self::new(config.transport_mode());
        channel.max_message_bytes = config.max_message_bytes();
        channel
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self) -> Vec<Arc<Listener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RpcChannel for LocalChannel {
    fn send(&self, msg: Msg) {
        let listeners = self.snapshot();

        match self.mode {
            TransportMode::Direct => {
                for listener in &listeners {
                    listener.invoke(&msg);
                }
            }
            TransportMode::Serialized => {
                let frame = match framing::encode(&msg) {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::error!(target: "rpc::channel", "dropping {}::{}: {}", msg.target(), msg.method(), e);
                        return;
                    }
                };
                for listener in &listeners {
                    match framing::decode::<Msg>(&frame, self.max_message_bytes) {
                        Ok(copy) => listener.invoke(&copy),
                        Err(e) => {
                            log::error!(target: "rpc::channel", "undeliverable {}::{}: {}", msg.target(), msg.method(), e);
                        }
                    }
                }
            }
        }
    }

    fn listen(&self, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener = Arc::new(Listener {
            id,
            handler,
            gate: Mutex::new(Gate {
                active: true,
                in_flight: 0,
            }),
            idle: Condvar::new(),
        });
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
        log::debug!(target: "rpc::channel", "listener {} registered", id.0);
        id
    }

    fn unlisten(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            listeners
                .iter()
                .position(|l| l.id == id)
                .map(|idx| listeners.remove(idx))
        };

        // A sender may still hold a snapshot containing this listener; the
        // gate makes sure it no longer runs once revoke returns.
        if let Some(listener) = removed {
            listener.revoke();
            log::debug!(target: "rpc::channel", "listener {} removed", id.0);
        }
    }

    fn is_serialized(&self) -> bool {
        self.mode == TransportMode::Serialized
    }
}
