//! Addressed message bridge between a control-side proxy and a sequencer
//! engine running in another execution context.
//!
//! Outbound calls become [`Msg`]s handed to an [`RpcChannel`]; inbound engine
//! events are routed through a [`DispatchTable`] into cached state and
//! [`notify`] channels.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod message;
pub mod notify;
pub mod registry;
pub mod sequencer;

pub use channel::{Handler, ListenerId, LocalChannel, RpcChannel, TransportMode};
pub use config::RpcConfig;
pub use dispatch::DispatchTable;
pub use error::{ArgError, RpcError, RpcResult};
pub use message::{Arg, Args, FromArg, Method, Msg, Target, TargetName};
pub use notify::{Channel, Notification};
pub use registry::SubscriptionRegistry;
pub use sequencer::{methods, RpcSequencer, Sequencer};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock ignoring poisoning; guarded state here is always left consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
