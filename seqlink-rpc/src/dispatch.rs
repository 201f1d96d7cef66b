//! Method-name keyed routing of inbound messages.
//!
//! A [`DispatchTable`] is built once, before its owner starts listening, and
//! is never mutated afterwards. Handlers receive a shared context `C` (the
//! owner's state) plus the message arguments.

use std::collections::{HashMap, HashSet};

use crate::message::{Args, Method, Msg};

/// Handler bound to one method.
pub type Call<C> = Box<dyn Fn(&C, &Args) + Send + Sync>;

pub struct DispatchTable<C> {
    calls: HashMap<Method, Call<C>>,
    // Known methods with no handler, e.g. our own commands echoed back.
    ignored: HashSet<Method>,
}

impl<C> Default for DispatchTable<C> {
    fn default() -> Self {
        Self {
            calls: HashMap::new(),
            ignored: HashSet::new(),
        }
    }
}

impl<C> DispatchTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `method` to `call`. A second bind of the same method replaces the first.
    pub fn bind<F>(mut self, method: impl Into<Method>, call: F) -> Self
    where
        F: Fn(&C, &Args) + Send + Sync + 'static,
    {
        let method = method.into();
        if self.calls.insert(method.clone(), Box::new(call)).is_some() {
            log::warn!(target: "rpc::dispatch", "method bound twice: {}", method);
        }
        self
    }

    /// Drop `methods` quietly instead of reporting them as unknown.
    pub fn ignore<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Method>,
    {
        self.ignored.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.calls.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Run the handler bound to `msg.method()`.
    ///
    /// Unknown methods are logged and dropped; returns whether a handler ran.
    pub fn dispatch(&self, ctx: &C, msg: &Msg) -> bool {
        match self.calls.get(msg.method()) {
            Some(call) => {
                call(ctx, msg.args());
                true
            }
            None if self.ignored.contains(msg.method()) => {
                log::debug!(target: "rpc::dispatch", "ignored {}::{}", msg.target(), msg.method());
                false
            }
            None => {
                log::warn!(target: "rpc::dispatch", "not found method: {}::{}", msg.target(), msg.method());
                false
            }
        }
    }
}
