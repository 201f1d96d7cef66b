//! Control-side proxy for a sequencer engine living behind an [`RpcChannel`].
//!
//! Every command becomes one fire-and-forget message addressed to the
//! proxy's target. Engine events coming back over the channel update the
//! cached status and playback position and fan out to subscribers.

use std::sync::{Arc, Mutex};

use seqlink_types::{AudioStreamRef, MidiData, MidiStream, Status, Tick, TrackId};

use crate::channel::{ListenerId, RpcChannel};
use crate::config::RpcConfig;
use crate::dispatch::DispatchTable;
use crate::error::{RpcError, RpcResult};
use crate::lock;
use crate::message::{Args, Msg, Target, TargetName};
use crate::notify::{Channel, Notification};
use crate::registry::SubscriptionRegistry;

/// Method names spoken between the proxy and the engine.
pub mod methods {
    // Engine -> proxy events
    pub const STATUS_CHANGED: &str = "statusChanged";
    pub const POSITION_CHANGED: &str = "positionChanged";
    pub const MIDI_TICK_PLAYED: &str = "midiTickPlayed";

    // Proxy -> engine commands
    pub const INIT_MIDI_TRACK: &str = "initMIDITrack";
    pub const INIT_AUDIO_TRACK: &str = "initAudioTrack";
    pub const SET_MIDI_TRACK: &str = "setMIDITrack";
    pub const SET_AUDIO_TRACK: &str = "setAudioTrack";
    pub const PLAY: &str = "play";
    pub const PAUSE: &str = "pause";
    pub const STOP: &str = "stop";
    pub const SEEK: &str = "seek";
    pub const REWIND: &str = "rewind";
    pub const SET_LOOP: &str = "setLoop";
    pub const UNSET_LOOP: &str = "unsetLoop";
    pub const INSTANTLY_PLAY_MIDI: &str = "instantlyPlayMidi";
    pub const BIND_MIDI_TICK_PLAYED: &str = "bindMidiTickPlayed";
    pub const UNBIND_MIDI_TICK_PLAYED: &str = "unbindMidiTickPlayed";

    /// Everything the proxy sends. A broadcast channel hands these back to
    /// the proxy's own listener.
    pub const COMMANDS: [&str; 14] = [
        INIT_MIDI_TRACK,
        INIT_AUDIO_TRACK,
        SET_MIDI_TRACK,
        SET_AUDIO_TRACK,
        PLAY,
        PAUSE,
        STOP,
        SEEK,
        REWIND,
        SET_LOOP,
        UNSET_LOOP,
        INSTANTLY_PLAY_MIDI,
        BIND_MIDI_TICK_PLAYED,
        UNBIND_MIDI_TICK_PLAYED,
    ];
}

/// Sequencer control surface.
///
/// Commands return as soon as the message is handed to the transport; no
/// acknowledgment is awaited. Reads return cached values only.
pub trait Sequencer: Send + Sync {
    fn status(&self) -> Status;
    fn status_changed(&self) -> Channel<Status>;

    fn init_midi_track(&self, id: TrackId);
    fn init_audio_track(&self, id: TrackId);
    fn set_midi_track(&self, id: TrackId, stream: Arc<MidiStream>) -> RpcResult<()>;
    fn set_audio_track(&self, id: TrackId, stream: AudioStreamRef) -> RpcResult<()>;

    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn seek(&self, position_ms: u64);
    fn rewind(&self);
    fn set_loop(&self, from_ms: u64, to_ms: u64);
    fn unset_loop(&self);

    /// Tick events for one track. The first access for a track asks the
    /// engine to start emitting them.
    fn midi_tick_played(&self, id: TrackId) -> Channel<Tick>;
    fn position_changed(&self) -> Notification;
    fn playback_position(&self) -> f32;

    /// Play `data` immediately, outside the track timeline.
    ///
    /// There is no handle to stop or cancel this playback. Controlling it
    /// would need an engine-issued playback id returned here.
    fn instantly_play_midi(&self, data: Arc<MidiData>) -> RpcResult<()>;
}

/// Values only the engine is the authority on, plus the tick channels.
/// One lock guards all of it.
struct CachedState {
    status: Status,
    playback_position: f32,
    midi_tick_played: SubscriptionRegistry<TrackId, Tick>,
}

struct Shared {
    target: Target,
    state: Mutex<CachedState>,
    status_changed: Channel<Status>,
    position_changed: Notification,
}

fn engine_events() -> DispatchTable<Shared> {
    DispatchTable::new()
        .bind(methods::STATUS_CHANGED, |shared: &Shared, args: &Args| {
            let status = args.arg::<Status>(0);
            lock(&shared.state).status = status;
            shared.status_changed.send(status);
        })
        .bind(methods::POSITION_CHANGED, |shared: &Shared, args: &Args| {
            let position = args.arg::<f32>(0);
            lock(&shared.state).playback_position = position;
            shared.position_changed.notify();
        })
        .bind(methods::MIDI_TICK_PLAYED, |shared: &Shared, args: &Args| {
            let track = args.arg::<TrackId>(0);
            let tick = args.arg::<Tick>(1);
            let (channel, created) = lock(&shared.state).midi_tick_played.get_or_insert(track);
            if created {
                log::debug!(target: "rpc::sequencer", "tick channel for track {} created by event", track);
            }
            channel.send(tick);
        })
        .ignore(methods::COMMANDS)
}

/// [`Sequencer`] implemented by messaging a remote engine.
///
/// Dropping the proxy unregisters its listener, waiting for any dispatch
/// already in progress to finish.
pub struct RpcSequencer {
    channel: Arc<dyn RpcChannel>,
    shared: Arc<Shared>,
    // Held across a registry bind/unbind and its send so the engine sees
    // them in registry order. Never taken by the event handlers.
    bind_order: Mutex<()>,
    listen_id: ListenerId,
}

impl RpcSequencer {
    pub fn new(channel: Arc<dyn RpcChannel>) -> Self {
        Self::with_target(channel, Target::new(TargetName::Sequencer))
    }

    pub fn with_config(channel: Arc<dyn RpcChannel>, config: &RpcConfig) -> Self {
        Self::with_target(channel, config.sequencer_target())
    }

    pub fn with_target(channel: Arc<dyn RpcChannel>, target: Target) -> Self {
        let shared = Arc::new(Shared {
            target,
            state: Mutex::new(CachedState {
                status: Status::default(),
                playback_position: 0.0,
                midi_tick_played: SubscriptionRegistry::new(),
            }),
            status_changed: Channel::new(),
            position_changed: Notification::new(),
        });

        let table = engine_events();
        let ctx = Arc::clone(&shared);
        // The channel broadcasts everything; only our target is dispatched.
        let listen_id = channel.listen(Box::new(move |msg: &Msg| {
            if msg.target() != ctx.target {
                return;
            }
            table.dispatch(&ctx, msg);
        }));
        log::debug!(target: "rpc::sequencer", "proxy for {} listening as {}", target, listen_id.get());

        Self {
            channel,
            shared,
            bind_order: Mutex::new(()),
            listen_id,
        }
    }

    pub fn target(&self) -> Target {
        self.shared.target
    }

    /// Tracks the engine was asked to emit ticks for.
    pub fn bound_tracks(&self) -> Vec<TrackId> {
        let mut tracks = lock(&self.shared.state).midi_tick_played.bound_keys();
        tracks.sort();
        tracks
    }

    /// Forget the tick channel for `id` and tell the engine to stop emitting
    /// ticks for it. Returns false when the track had no channel.
    ///
    /// Subscribers of the old channel keep their receivers but get nothing
    /// more; a later [`Sequencer::midi_tick_played`] binds a fresh channel.
    pub fn unbind_midi_tick_played(&self, id: TrackId) -> bool {
        let _order = lock(&self.bind_order);
        let removed = lock(&self.shared.state).midi_tick_played.remove(&id);
        if removed.is_none() {
            return false;
        }
        self.send(methods::UNBIND_MIDI_TICK_PLAYED, Args::new().with(id));
        true
    }

    fn send(&self, method: &str, args: Args) {
        self.channel
            .send(Msg::with_args(self.shared.target, method, args));
    }

    /// Send a message carrying an in-process handle, refusing when the
    /// channel would have to serialize it.
    fn send_handle(&self, method: &'static str, args: Args) -> RpcResult<()> {
        if self.channel.is_serialized() && !args.is_serializable() {
            log::error!(target: "rpc::sequencer", "{} is not implemented over a serialized channel", method);
            return Err(RpcError::NotImplemented { method });
        }
        self.send(method, args);
        Ok(())
    }
}

impl Drop for RpcSequencer {
    fn drop(&mut self) {
        self.channel.unlisten(self.listen_id);
    }
}

impl Sequencer for RpcSequencer {
    fn status(&self) -> Status {
        lock(&self.shared.state).status
    }

    fn status_changed(&self) -> Channel<Status> {
        self.shared.status_changed.clone()
    }

    fn init_midi_track(&self, id: TrackId) {
        self.send(methods::INIT_MIDI_TRACK, Args::new().with(id));
    }

    fn init_audio_track(&self, id: TrackId) {
        self.send(methods::INIT_AUDIO_TRACK, Args::new().with(id));
    }

    fn set_midi_track(&self, id: TrackId, stream: Arc<MidiStream>) -> RpcResult<()> {
        self.send_handle(methods::SET_MIDI_TRACK, Args::new().with(id).with(stream))
    }

    fn set_audio_track(&self, id: TrackId, stream: AudioStreamRef) -> RpcResult<()> {
        self.send_handle(methods::SET_AUDIO_TRACK, Args::new().with(id).with(stream))
    }

    fn play(&self) {
        self.send(methods::PLAY, Args::new());
    }

    fn pause(&self) {
        self.send(methods::PAUSE, Args::new());
    }

    fn stop(&self) {
        self.send(methods::STOP, Args::new());
    }

    fn seek(&self, position_ms: u64) {
        self.send(methods::SEEK, Args::new().with(position_ms));
    }

    fn rewind(&self) {
        self.send(methods::REWIND, Args::new());
    }

    fn set_loop(&self, from_ms: u64, to_ms: u64) {
        self.send(methods::SET_LOOP, Args::new().with(from_ms).with(to_ms));
    }

    fn unset_loop(&self) {
        self.send(methods::UNSET_LOOP, Args::new());
    }

    fn midi_tick_played(&self, id: TrackId) -> Channel<Tick> {
        let _order = lock(&self.bind_order);
        let (channel, newly_bound) = lock(&self.shared.state).midi_tick_played.bind(id);
        // Flipped under the lock, so exactly one caller owes the request.
        if newly_bound {
            self.send(methods::BIND_MIDI_TICK_PLAYED, Args::new().with(id));
        }
        channel
    }

    fn position_changed(&self) -> Notification {
        self.shared.position_changed.clone()
    }

    fn playback_position(&self) -> f32 {
        lock(&self.shared.state).playback_position
    }

    fn instantly_play_midi(&self, data: Arc<MidiData>) -> RpcResult<()> {
        self.send_handle(methods::INSTANTLY_PLAY_MIDI, Args::new().with(data))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::channel::LocalChannel;

    fn engine_msg(method: &str, args: Args) -> Msg {
        Msg::with_args(Target::new(TargetName::Sequencer), method, args)
    }

    #[test]
    fn status_event_updates_cache_and_notifies() {
        let channel = Arc::new(LocalChannel::direct());
        let seq = RpcSequencer::new(channel.clone());
        let rx = seq.status_changed().subscribe();

        channel.send(engine_msg(methods::STATUS_CHANGED, Args::new().with(Status::Playing)));

        assert_eq!(seq.status(), Status::Playing);
        assert_eq!(rx.try_recv().unwrap(), Status::Playing);
    }

    #[test]
    fn position_event_updates_cache_and_notifies() {
        let channel = Arc::new(LocalChannel::direct());
        let seq = RpcSequencer::new(channel.clone());
        let rx = seq.position_changed().subscribe();
        assert_eq!(seq.playback_position(), 0.0);

        channel.send(engine_msg(methods::POSITION_CHANGED, Args::new().with(12.5f32)));

        assert_eq!(seq.playback_position(), 12.5);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn other_targets_are_ignored() {
        let channel = Arc::new(LocalChannel::direct());
        let seq = RpcSequencer::new(channel.clone());

        channel.send(Msg::with_args(
            Target::new(TargetName::Player),
            methods::STATUS_CHANGED,
            Args::new().with(Status::Playing),
        ));

        assert_eq!(seq.status(), Status::Stopped);
    }

    #[test]
    fn configured_target_is_used() {
        let channel = Arc::new(LocalChannel::direct());
        let config = RpcConfig::from_toml_str("[sequencer]\ntarget = \"Player\"\n").unwrap();
        let seq = RpcSequencer::with_config(channel.clone(), &config);
        assert_eq!(seq.target(), Target::new(TargetName::Player));

        channel.send(Msg::with_args(
            Target::new(TargetName::Player),
            methods::STATUS_CHANGED,
            Args::new().with(Status::Paused),
        ));
        assert_eq!(seq.status(), Status::Paused);
    }

    #[test]
    fn echoed_commands_have_no_handler() {
        let table = engine_events();
        assert_eq!(table.len(), 3);
        for method in methods::COMMANDS {
            assert!(!table.contains(method), "{} has a handler", method);
        }

        let channel = Arc::new(LocalChannel::direct());
        let seq = RpcSequencer::new(channel.clone());
        seq.play();
        seq.seek(250);
        assert_eq!(seq.status(), Status::Stopped);
        assert_eq!(seq.playback_position(), 0.0);
    }

    #[test]
    fn drop_unregisters_listener() {
        let channel = Arc::new(LocalChannel::direct());
        let seq = RpcSequencer::new(channel.clone());
        assert_eq!(channel.listener_count(), 1);
        drop(seq);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn unbind_removes_channel_and_tells_engine() {
        let channel = Arc::new(LocalChannel::direct());
        let unbinds = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&unbinds);
        channel.listen(Box::new(move |msg: &Msg| {
            if msg.method() == methods::UNBIND_MIDI_TICK_PLAYED {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let seq = RpcSequencer::new(channel.clone());

        assert!(!seq.unbind_midi_tick_played(TrackId::new(1)));
        let first = seq.midi_tick_played(TrackId::new(1));
        assert_eq!(seq.bound_tracks(), vec![TrackId::new(1)]);

        assert!(seq.unbind_midi_tick_played(TrackId::new(1)));
        assert!(seq.bound_tracks().is_empty());
        assert_eq!(unbinds.load(Ordering::SeqCst), 1);

        let second = seq.midi_tick_played(TrackId::new(1));
        assert!(!first.ptr_eq(&second));
    }
}
