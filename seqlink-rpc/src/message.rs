//! Addressed messages exchanged over an [`RpcChannel`](crate::channel::RpcChannel).
//!
//! A [`Msg`] names a logical endpoint ([`Target`]), a method, and an ordered
//! list of positional arguments. Arguments are decoded by position and
//! expected type at the call site via [`FromArg`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use seqlink_types::{AudioStreamRef, MidiData, MidiStream, Status, Tick, TrackId};

use crate::error::ArgError;

/// Logical endpoints reachable through the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetName {
    Sequencer,
    AudioEngine,
    Player,
    Synthesizer,
}

impl TargetName {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetName::Sequencer => "Sequencer",
            TargetName::AudioEngine => "AudioEngine",
            TargetName::Player => "Player",
            TargetName::Synthesizer => "Synthesizer",
        }
    }
}

impl FromStr for TargetName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sequencer" => Ok(TargetName::Sequencer),
            "AudioEngine" => Ok(TargetName::AudioEngine),
            "Player" => Ok(TargetName::Player),
            "Synthesizer" => Ok(TargetName::Synthesizer),
            other => Err(format!("unknown target: {}", other)),
        }
    }
}

/// Address of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: TargetName,
}

impl Target {
    pub fn new(name: TargetName) -> Self {
        Self { name }
    }
}

impl From<TargetName> for Target {
    fn from(name: TargetName) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

/// Method name; unique within one dispatch table.
pub type Method = String;

/// One positional argument.
///
/// The last three variants are in-process handles shared by `Arc`. They are
/// skipped by serde, so encoding a message that holds one fails.
#[derive(Clone, Serialize, Deserialize)]
pub enum Arg {
    U64(u64),
    Float(f32),
    Str(String),
    Status(Status),
    TrackId(TrackId),
    Tick(Tick),
    #[serde(skip)]
    MidiStream(Arc<MidiStream>),
    #[serde(skip)]
    AudioStream(AudioStreamRef),
    #[serde(skip)]
    MidiData(Arc<MidiData>),
}

impl Arg {
    /// Short type name, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::U64(_) => "u64",
            Arg::Float(_) => "f32",
            Arg::Str(_) => "string",
            Arg::Status(_) => "status",
            Arg::TrackId(_) => "track id",
            Arg::Tick(_) => "tick",
            Arg::MidiStream(_) => "midi stream",
            Arg::AudioStream(_) => "audio stream",
            Arg::MidiData(_) => "midi data",
        }
    }

    /// False for handles that only exist inside this process.
    pub fn is_serializable(&self) -> bool {
        !matches!(
            self,
            Arg::MidiStream(_) | Arg::AudioStream(_) | Arg::MidiData(_)
        )
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::U64(v) => write!(f, "U64({})", v),
            Arg::Float(v) => write!(f, "Float({})", v),
            Arg::Str(v) => write!(f, "Str({:?})", v),
            Arg::Status(v) => write!(f, "Status({:?})", v),
            Arg::TrackId(v) => write!(f, "TrackId({})", v),
            Arg::Tick(v) => write!(f, "Tick({})", v),
            Arg::MidiStream(s) => write!(f, "MidiStream({:p})", Arc::as_ptr(s)),
            Arg::AudioStream(s) => write!(f, "AudioStream({:p})", Arc::as_ptr(s) as *const ()),
            Arg::MidiData(d) => write!(f, "MidiData({} events)", d.events.len()),
        }
    }
}

/// Values compare by value; handles compare by identity.
impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::U64(a), Arg::U64(b)) => a == b,
            (Arg::Float(a), Arg::Float(b)) => a == b,
            (Arg::Str(a), Arg::Str(b)) => a == b,
            (Arg::Status(a), Arg::Status(b)) => a == b,
            (Arg::TrackId(a), Arg::TrackId(b)) => a == b,
            (Arg::Tick(a), Arg::Tick(b)) => a == b,
            (Arg::MidiStream(a), Arg::MidiStream(b)) => Arc::ptr_eq(a, b),
            (Arg::AudioStream(a), Arg::AudioStream(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Arg::MidiData(a), Arg::MidiData(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<u64> for Arg {
    fn from(v: u64) -> Self {
        Arg::U64(v)
    }
}

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Float(v)
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<Status> for Arg {
    fn from(v: Status) -> Self {
        Arg::Status(v)
    }
}

impl From<TrackId> for Arg {
    fn from(v: TrackId) -> Self {
        Arg::TrackId(v)
    }
}

impl From<Tick> for Arg {
    fn from(v: Tick) -> Self {
        Arg::Tick(v)
    }
}

impl From<Arc<MidiStream>> for Arg {
    fn from(v: Arc<MidiStream>) -> Self {
        Arg::MidiStream(v)
    }
}

impl From<AudioStreamRef> for Arg {
    fn from(v: AudioStreamRef) -> Self {
        Arg::AudioStream(v)
    }
}

impl From<Arc<MidiData>> for Arg {
    fn from(v: Arc<MidiData>) -> Self {
        Arg::MidiData(v)
    }
}

/// Types that can be read back out of an [`Arg`] position.
pub trait FromArg: Sized {
    const EXPECTED: &'static str;

    fn from_arg(arg: &Arg) -> Option<Self>;
}

macro_rules! impl_from_arg {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromArg for $ty {
            const EXPECTED: &'static str = $name;

            fn from_arg(arg: &Arg) -> Option<Self> {
                match arg {
                    Arg::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_from_arg!(u64, U64, "u64");
impl_from_arg!(f32, Float, "f32");
impl_from_arg!(String, Str, "string");
impl_from_arg!(Status, Status, "status");
impl_from_arg!(TrackId, TrackId, "track id");
impl_from_arg!(Tick, Tick, "tick");
impl_from_arg!(Arc<MidiStream>, MidiStream, "midi stream");
impl_from_arg!(AudioStreamRef, AudioStream, "audio stream");
impl_from_arg!(Arc<MidiData>, MidiData, "midi data");

/// Ordered, positionally typed argument list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a value, builder style.
    pub fn with(mut self, value: impl Into<Arg>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }

    pub fn is_serializable(&self) -> bool {
        self.0.iter().all(Arg::is_serializable)
    }

    /// Decode position `index` as `T`.
    pub fn get<T: FromArg>(&self, index: usize) -> Result<T, ArgError> {
        let arg = self.0.get(index).ok_or(ArgError {
            index,
            expected: T::EXPECTED,
            found: None,
        })?;
        T::from_arg(arg).ok_or(ArgError {
            index,
            expected: T::EXPECTED,
            found: Some(arg.kind()),
        })
    }

    /// Decode position `index` as `T`, failing fast.
    ///
    /// # Panics
    ///
    /// Panics when the position is missing or holds another type. Handlers
    /// know the layout of the methods they bind, so a mismatch is a bug on
    /// the sending side.
    pub fn arg<T: FromArg>(&self, index: usize) -> T {
        match self.get(index) {
            Ok(v) => v,
            Err(e) => panic!("{}", e),
        }
    }
}

impl From<Vec<Arg>> for Args {
    fn from(args: Vec<Arg>) -> Self {
        Self(args)
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An addressed envelope. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    target: Target,
    method: Method,
    args: Args,
}

impl Msg {
    pub fn new(target: Target, method: impl Into<Method>) -> Self {
        Self::with_args(target, method, Args::new())
    }

    pub fn with_args(target: Target, method: impl Into<Method>, args: Args) -> Self {
        Self {
            target,
            method: method.into(),
            args,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &Args {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_compare_by_name() {
        assert_eq!(Target::new(TargetName::Sequencer), TargetName::Sequencer.into());
        assert_ne!(
            Target::new(TargetName::Sequencer),
            Target::new(TargetName::Player)
        );
        assert_eq!("Player".parse::<TargetName>(), Ok(TargetName::Player));
        assert!("Mixer".parse::<TargetName>().is_err());
    }

    #[test]
    fn args_decode_by_position_and_type() {
        let args = Args::new().with(TrackId::new(3)).with(480 as Tick).with(1.5f32);
        assert_eq!(args.arg::<TrackId>(0), TrackId::new(3));
        assert_eq!(args.arg::<Tick>(1), 480);
        assert_eq!(args.arg::<f32>(2), 1.5);
    }

    #[test]
    fn get_reports_mismatch_and_missing() {
        let args = Args::new().with(Status::Playing);

        let err = args.get::<f32>(0).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.expected, "f32");
        assert_eq!(err.found, Some("status"));

        let err = args.get::<Status>(1).unwrap_err();
        assert_eq!(err.found, None);
    }

    #[test]
    #[should_panic(expected = "argument 0")]
    fn arg_fails_fast_on_wrong_type() {
        let args = Args::new().with("play");
        let _: u64 = args.arg(0);
    }

    #[test]
    fn handles_compare_by_identity() {
        let data = Arc::new(MidiData::default());
        let same = Arg::MidiData(Arc::clone(&data));
        let copy = Arg::MidiData(Arc::new(MidiData::default()));
        assert_eq!(Arg::MidiData(data), same);
        assert_ne!(same, copy);
        assert!(!same.is_serializable());
        assert!(Arg::Tick(1).is_serializable());
    }
}
