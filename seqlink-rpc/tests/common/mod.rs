#![allow(dead_code)]
//! Test harness utilities for seqlink-rpc integration tests.

use std::sync::{Arc, Mutex};

use seqlink_rpc::channel::{ListenerId, LocalChannel, RpcChannel, TransportMode};
use seqlink_rpc::message::{Args, Msg, Target, TargetName};
use seqlink_rpc::methods;
use seqlink_types::{Status, Tick, TrackId};

const ENGINE_EVENTS: [&str; 3] = [
    methods::STATUS_CHANGED,
    methods::POSITION_CHANGED,
    methods::MIDI_TICK_PLAYED,
];

/// Stand-in for the engine side: records every command addressed to its
/// target and emits events back over the same channel.
pub struct FakeEngine {
    channel: Arc<LocalChannel>,
    target: Target,
    received: Arc<Mutex<Vec<Msg>>>,
    listen_id: ListenerId,
}

impl FakeEngine {
    pub fn attach(channel: Arc<LocalChannel>) -> Self {
        Self::attach_to(channel, Target::new(TargetName::Sequencer))
    }

    pub fn attach_to(channel: Arc<LocalChannel>, target: Target) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let listen_id = channel.listen(Box::new(move |msg: &Msg| {
            // Events we emit come back to us on a broadcast channel.
            if msg.target() != target || ENGINE_EVENTS.contains(&msg.method()) {
                return;
            }
            log.lock().unwrap().push(msg.clone());
        }));
        Self {
            channel,
            target,
            received,
            listen_id,
        }
    }

    /// All commands received so far.
    pub fn received(&self) -> Vec<Msg> {
        self.received.lock().unwrap().clone()
    }

    /// Commands received with the given method name.
    pub fn received_method(&self, method: &str) -> Vec<Msg> {
        self.received()
            .into_iter()
            .filter(|m| m.method() == method)
            .collect()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.received()
            .iter()
            .map(|m| m.method().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.received.lock().unwrap().clear();
    }

    pub fn emit_status(&self, status: Status) {
        self.emit(methods::STATUS_CHANGED, Args::new().with(status));
    }

    pub fn emit_position(&self, position: f32) {
        self.emit(methods::POSITION_CHANGED, Args::new().with(position));
    }

    pub fn emit_tick(&self, track: TrackId, tick: Tick) {
        self.emit(methods::MIDI_TICK_PLAYED, Args::new().with(track).with(tick));
    }

    fn emit(&self, method: &str, args: Args) {
        self.channel.send(Msg::with_args(self.target, method, args));
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.channel.unlisten(self.listen_id);
    }
}

/// Fresh channel in the given mode.
pub fn channel(mode: TransportMode) -> Arc<LocalChannel> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(LocalChannel::new(mode))
}
