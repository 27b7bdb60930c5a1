//! The piano roll: every note struck in the input, with its suppression
//! state and the global transposition.
//!
//! Queries that depend on ordering take an explicit [`PitchOrder`] or
//! [`TickOrder`] built once by the caller. Orders stay valid across
//! suppression changes and transposition, but not across [`PianoRoll::add`].

use serde::{Deserialize, Serialize};

use crate::smf::NoteMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    #[default]
    Audible,
    /// Struck again before the pin could rearm.
    SuppressedByRepetition,
}

/// One note on from the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub tick: u64,
    pub pitch: u8,
    pub channel: u8,
    pub track: usize,
    pub state: NoteState,
}

impl NoteEvent {
    pub fn new(tick: u64, pitch: u8, channel: u8, track: usize) -> Self {
        NoteEvent {
            tick,
            pitch,
            channel,
            track,
            state: NoteState::Audible,
        }
    }

    pub fn is_audible(&self) -> bool {
        self.state == NoteState::Audible
    }
}

/// Note indices sorted by (pitch, tick); equal keys keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchOrder(Vec<usize>);

/// Note indices sorted by tick; equal ticks keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOrder(Vec<usize>);

impl PitchOrder {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl TickOrder {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PianoRoll {
    notes: Vec<NoteEvent>,
    /// Semitones added to every pitch when mapping onto pins.
    transpose: i32,
}

impl PianoRoll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of decoded messages, keeping one note per note on.
    pub fn from_messages(messages: Vec<NoteMessage>) -> Self {
        let notes = messages
            .into_iter()
            .filter(NoteMessage::is_on)
            .map(|m| NoteEvent::new(m.tick, m.pitch, m.channel, m.track))
            .collect();

        PianoRoll {
            notes,
            transpose: 0,
        }
    }

    pub fn add(&mut self, note: NoteEvent) {
        self.notes.push(note);
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    pub fn set_transpose(&mut self, semitones: i32) {
        self.transpose = semitones;
    }

    pub fn audible(&self) -> impl Iterator<Item = &NoteEvent> {
        self.notes.iter().filter(|n| n.is_audible())
    }

    pub fn suppressed_count(&self) -> usize {
        self.notes.len() - self.audible().count()
    }

    pub fn pitch_order(&self) -> PitchOrder {
        let mut order: Vec<usize> = (0..self.notes.len()).collect();
        order.sort_by_key(|&i| (self.notes[i].pitch, self.notes[i].tick));
        PitchOrder(order)
    }

    pub fn tick_order(&self) -> TickOrder {
        let mut order: Vec<usize> = (0..self.notes.len()).collect();
        order.sort_by_key(|&i| self.notes[i].tick);
        TickOrder(order)
    }

    /// Audible note count per source pitch.
    pub fn histogram(&self) -> [usize; 128] {
        let mut counts = [0usize; 128];
        for note in self.audible() {
            counts[note.pitch as usize] += 1;
        }
        counts
    }

    /// Suppress notes that repeat the same pitch less than `delta` ticks
    /// after the last audible one. Notes sharing a tick with an audible
    /// note of the same pitch are always suppressed.
    ///
    /// Every note is re-evaluated, so running this again with the same
    /// `delta` leaves the states unchanged. Returns the number suppressed.
    pub fn filter_repetition(&mut self, order: &PitchOrder, delta: u64) -> usize {
        debug_assert_eq!(order.0.len(), self.notes.len(), "stale pitch order");

        let mut suppressed = 0;
        let mut reference: Option<(u8, u64)> = None;

        for &i in &order.0 {
            let note = &mut self.notes[i];
            match reference {
                Some((pitch, tick)) if pitch == note.pitch => {
                    let gap = note.tick - tick;
                    if gap == 0 || gap < delta {
                        note.state = NoteState::SuppressedByRepetition;
                        suppressed += 1;
                    } else {
                        note.state = NoteState::Audible;
                        reference = Some((note.pitch, note.tick));
                    }
                }
                _ => {
                    note.state = NoteState::Audible;
                    reference = Some((note.pitch, note.tick));
                }
            }
        }

        suppressed
    }

    /// Shortest positive gap between two consecutive audible notes of the
    /// same pitch, or `None` if no pitch repeats.
    pub fn min_repetition(&self, order: &PitchOrder) -> Option<u64> {
        debug_assert_eq!(order.0.len(), self.notes.len(), "stale pitch order");

        order
            .0
            .iter()
            .map(|&i| &self.notes[i])
            .filter(|n| n.is_audible())
            .collect::<Vec<_>>()
            .windows(2)
            .filter(|w| w[0].pitch == w[1].pitch)
            .map(|w| w[1].tick - w[0].tick)
            .filter(|&gap| gap > 0)
            .min()
    }
}
