//! Playback status and audio stream handles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sequencer playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    Error,
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl Status {
    pub fn is_playing(self) -> bool {
        matches!(self, Status::Playing)
    }
}

/// A live source of interleaved audio samples owned by the control side.
///
/// Streams are handed to the engine by reference; they only make sense inside
/// the process that created them.
pub trait AudioStream: Send + Sync {
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
    /// Fill `buf` with the next samples, returning how many were written.
    fn read(&self, buf: &mut [f32]) -> usize;
}

/// Shared handle to an audio stream.
pub type AudioStreamRef = Arc<dyn AudioStream>;
