//! # seqlink-types
//!
//! Shared type definitions for the seqlink sequencer bridge.
//! This crate holds the plain data that both the control-side proxy and the
//! engine side agree on: track keys, playback status and MIDI payloads.

mod audio;
pub mod midi;

pub use audio::{AudioStream, AudioStreamRef, Status};
pub use midi::{MidiData, MidiEvent, MidiStream, Tick};

/// Unique identifier for an audio or MIDI track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(u32);

impl TrackId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrackId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_id_displays_raw_value() {
        assert_eq!(TrackId::new(7).to_string(), "7");
    }

    #[test]
    fn track_ids_order_by_value() {
        let mut ids = vec![TrackId::new(3), TrackId::new(1), TrackId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![TrackId::new(1), TrackId::new(2), TrackId::new(3)]);
        assert_eq!(TrackId::from(5).get(), 5);
    }
}
