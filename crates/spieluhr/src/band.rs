//! Band mapping: fold every playable note onto exactly one pin.

use serde::{Deserialize, Serialize};

use crate::profile::MechanismProfile;
use crate::roll::{PianoRoll, TickOrder};

/// Sorted, de-duplicated firing ticks for every pin of a mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bands {
    pins: Vec<Vec<u64>>,
    /// Audible notes that no pin could play, even after octave folding.
    unmapped: usize,
}

impl Bands {
    /// Build bands from per-pin tick lists, sorting and de-duplicating each.
    pub fn from_pins(mut pins: Vec<Vec<u64>>, unmapped: usize) -> Self {
        for ticks in &mut pins {
            ticks.sort_unstable();
            ticks.dedup();
        }
        Bands { pins, unmapped }
    }

    pub fn pins(&self) -> &[Vec<u64>] {
        &self.pins
    }

    pub fn pin(&self, pin: usize) -> &[u64] {
        &self.pins[pin]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u64])> {
        self.pins.iter().map(Vec::as_slice).enumerate()
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn unmapped(&self) -> usize {
        self.unmapped
    }

    /// Number of holes to punch.
    pub fn hole_count(&self) -> usize {
        self.pins.iter().map(Vec::len).sum()
    }

    /// True when no pin fires at all.
    pub fn is_empty(&self) -> bool {
        self.hole_count() == 0
    }

    /// Every tick at which any pin fires, sorted and de-duplicated.
    pub fn timeline(&self) -> Vec<u64> {
        let mut ticks: Vec<u64> = self.pins.iter().flatten().copied().collect();
        ticks.sort_unstable();
        ticks.dedup();
        ticks
    }
}

/// Pin owning each pitch, if any.
fn pitch_owners(profile: &MechanismProfile) -> [Option<usize>; 128] {
    let mut owners = [None; 128];
    for (pin, set) in profile.source_sets().into_iter().enumerate() {
        for pitch in set {
            // later pins win; validated profiles never overlap
            owners[pitch as usize] = Some(pin);
        }
    }
    owners
}

/// Project every audible note, shifted by the roll's transposition, onto
/// the pin whose octave-folded source set contains it.
pub fn map(roll: &PianoRoll, order: &TickOrder, profile: &MechanismProfile) -> Bands {
    let owners = pitch_owners(profile);
    let transpose = roll.transpose();
    let notes = roll.notes();

    let mut pins: Vec<Vec<u64>> = vec![Vec::new(); profile.pin_count()];
    let mut unmapped = 0;

    for note in order.indices().iter().map(|&i| &notes[i]) {
        if !note.is_audible() {
            continue;
        }
        let pitch = note.pitch as i32 + transpose;
        let owner = usize::try_from(pitch)
            .ok()
            .and_then(|p| owners.get(p).copied().flatten());

        match owner {
            Some(pin) => {
                let band = &mut pins[pin];
                if band.last() != Some(&note.tick) {
                    band.push(note.tick);
                }
            }
            None => unmapped += 1,
        }
    }

    Bands { pins, unmapped }
}
