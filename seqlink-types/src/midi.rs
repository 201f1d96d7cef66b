//! MIDI payloads exchanged with the sequencer engine.

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

/// MIDI tick position.
pub type Tick = u32;

/// Default ticks per quarter note.
pub const DEFAULT_RESOLUTION: u16 = 480;

/// A single timed MIDI channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub tick: Tick,
    pub channel: u8,
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    pub fn note_on(tick: Tick, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            tick,
            channel,
            status: 0x90,
            data1: pitch,
            data2: velocity,
        }
    }

    pub fn note_off(tick: Tick, channel: u8, pitch: u8) -> Self {
        Self {
            tick,
            channel,
            status: 0x80,
            data1: pitch,
            data2: 0,
        }
    }
}

/// A block of MIDI events sharing one tick resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiData {
    pub resolution: u16,
    pub events: Vec<MidiEvent>,
}

impl Default for MidiData {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            events: Vec::new(),
        }
    }
}

impl MidiData {
    pub fn new(resolution: u16, events: Vec<MidiEvent>) -> Self {
        Self { resolution, events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Tick of the last event, or 0 when empty.
    pub fn end_tick(&self) -> Tick {
        self.events.iter().map(|e| e.tick).max().unwrap_or(0)
    }
}

/// Live MIDI feed for a track: the initial data plus a receiver the control
/// side keeps pushing further chunks into.
///
/// Holds a channel endpoint, so it cannot be serialized.
#[derive(Debug)]
pub struct MidiStream {
    pub init_data: MidiData,
    pub chunks: Receiver<MidiData>,
}

impl MidiStream {
    pub fn new(init_data: MidiData, chunks: Receiver<MidiData>) -> Self {
        Self { init_data, chunks }
    }
}
