//! MIDI generation from pin bands.
//!
//! Generates Standard MIDI File (SMF) format 0 (single track) holding
//! exactly what the mechanism will play.

use serde::{Deserialize, Serialize};

use crate::band::Bands;
use crate::profile::MechanismProfile;
use crate::smf::vlq;

/// Velocity used for every generated note on and note off.
pub const VELOCITY: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinAction {
    // Off sorts first so a pin released and struck on the same tick
    // is released before it sounds again.
    Off,
    On,
}

/// A pin firing or releasing at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinEvent {
    pub tick: u64,
    pub pin: usize,
    pub action: PinAction,
}

/// Interleave note on/off events for every band, each off `unit` ticks
/// after its on. Ordered by tick, then pin, then off before on.
pub fn pin_events(bands: &Bands, unit: u64) -> Vec<PinEvent> {
    let mut events: Vec<PinEvent> = bands
        .iter()
        .flat_map(|(pin, ticks)| {
            ticks.iter().flat_map(move |&tick| {
                [
                    PinEvent {
                        tick,
                        pin,
                        action: PinAction::On,
                    },
                    PinEvent {
                        tick: tick + unit,
                        pin,
                        action: PinAction::Off,
                    },
                ]
            })
        })
        .collect();

    events.sort();
    events
}

/// Encode bands as a format 0 MIDI file playing the mechanism's pins.
pub fn write_bands(bands: &Bands, profile: &MechanismProfile, resolution: u16, unit: u64) -> Vec<u8> {
    let pitches = profile.pitches();
    let mut writer = MidiWriter::new(resolution, 0);

    writer.program_change(profile.program);

    for event in pin_events(bands, unit) {
        writer.seek(event.tick);
        let pitch = pitches[event.pin];
        match event.action {
            PinAction::On => writer.note_on(pitch, VELOCITY),
            PinAction::Off => writer.note_off(pitch, VELOCITY),
        }
    }

    writer.finish()
}

struct MidiWriter {
    ticks_per_beat: u16,
    channel: u8,
    events: Vec<MidiEvent>,
    current_tick: u64,
}

/// Empty text meta event, a no-op that only carries a delta time.
const FILLER: [u8; 3] = [0xFF, 0x01, 0x00];

struct MidiEvent {
    tick: u64,
    data: Vec<u8>,
}

impl MidiWriter {
    fn new(ticks_per_beat: u16, channel: u8) -> Self {
        MidiWriter {
            ticks_per_beat,
            channel: channel & 0x0F,
            events: Vec::new(),
            current_tick: 0,
        }
    }

    fn note_on(&mut self, pitch: u8, velocity: u8) {
        self.channel_event(vec![0x90 | self.channel, pitch & 0x7F, velocity & 0x7F]);
    }

    fn note_off(&mut self, pitch: u8, velocity: u8) {
        self.channel_event(vec![0x80 | self.channel, pitch & 0x7F, velocity & 0x7F]);
    }

    fn program_change(&mut self, program: u8) {
        self.channel_event(vec![0xC0 | self.channel, program & 0x7F]);
    }

    fn seek(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    fn channel_event(&mut self, data: Vec<u8>) {
        self.events.push(MidiEvent {
            tick: self.current_tick,
            data,
        });
    }

    fn finish(mut self) -> Vec<u8> {
        // Stable, so same-tick events keep insertion order
        self.events.sort_by_key(|e| e.tick);

        let track_data = self.encode_track();

        let mut out = Vec::with_capacity(22 + track_data.len());

        // Header chunk: MThd
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes()); // chunk length
        out.extend_from_slice(&0u16.to_be_bytes()); // format 0
        out.extend_from_slice(&1u16.to_be_bytes()); // 1 track
        out.extend_from_slice(&self.ticks_per_beat.to_be_bytes());

        // Track chunk: MTrk
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend(track_data);

        out
    }

    fn encode_track(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut last_tick = 0u64;

        for event in &self.events {
            let mut delta = event.tick.saturating_sub(last_tick);
            // gaps wider than one VLQ are bridged with empty text events
            while delta > u64::from(vlq::MAX) {
                out.extend(vlq::encode(vlq::MAX));
                out.extend(&FILLER);
                delta -= u64::from(vlq::MAX);
            }
            out.extend(vlq::encode(delta as u32));
            out.extend(&event.data);
            last_tick = event.tick;
        }

        // End of track
        out.extend(&[0x00, 0xFF, 0x2F, 0x00]);
        out
    }
}
