//! Transposition search: the global shift that leaves the fewest notes
//! without a pin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::roll::PianoRoll;
use crate::{Error, Result};

/// Which shifts the search may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Any number of semitones.
    #[default]
    Any,
    /// Whole octaves only, keeping the key.
    Octaves,
    /// Never a whole octave, including no shift at all.
    NoOctaves,
}

impl SearchMode {
    pub fn allows(self, shift: i32) -> bool {
        match self {
            SearchMode::Any => true,
            SearchMode::Octaves => shift.rem_euclid(12) == 0,
            SearchMode::NoOctaves => shift.rem_euclid(12) != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search mode {0:?}, expected any, octaves or no-octaves")]
pub struct ParseSearchModeError(String);

impl FromStr for SearchMode {
    type Err = ParseSearchModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "any" => Ok(SearchMode::Any),
            "octaves" => Ok(SearchMode::Octaves),
            "no-octaves" => Ok(SearchMode::NoOctaves),
            other => Err(ParseSearchModeError(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::Any => "any",
            SearchMode::Octaves => "octaves",
            SearchMode::NoOctaves => "no-octaves",
        })
    }
}

/// Outcome of a transposition search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransposeReport {
    /// Semitones added to every source pitch.
    pub shift: i32,
    /// Audible notes whose shifted pitch has no pin of its own.
    pub unplayable: usize,
}

impl TransposeReport {
    /// Whole octaves in the shift, rounded towards negative infinity.
    pub fn octaves(&self) -> i32 {
        self.shift.div_euclid(12)
    }

    /// Semitones left after [`octaves`](Self::octaves), always 0..12.
    pub fn halftones(&self) -> i32 {
        self.shift.rem_euclid(12)
    }
}

/// Count audible notes that land outside `targets` after shifting.
pub fn count_unplayable(histogram: &[usize; 128], targets: &[bool; 128], shift: i32) -> usize {
    histogram
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .filter(|&(pitch, _)| {
            let shifted = pitch as i32 + shift;
            !(0..128).contains(&shifted) || !targets[shifted as usize]
        })
        .map(|(_, &count)| count)
        .sum()
}

/// Find the shift that minimises unplayable audible notes against the
/// absolute `targets` pitches.
///
/// Candidates run from `min(targets) - highest - 1` to
/// `max(targets) - lowest + 2`. Ties go to the smaller `|shift|`, then to
/// the earlier (more negative) candidate.
pub fn search(roll: &PianoRoll, targets: &[u8], mode: SearchMode) -> Result<TransposeReport> {
    let (lowest, highest) = roll
        .audible()
        .fold(None, |range: Option<(u8, u8)>, n| match range {
            None => Some((n.pitch, n.pitch)),
            Some((lo, hi)) => Some((lo.min(n.pitch), hi.max(n.pitch))),
        })
        .ok_or(Error::NoNotes)?;

    let (target_min, target_max) = match (targets.iter().min(), targets.iter().max()) {
        (Some(&lo), Some(&hi)) => (lo as i32, hi as i32),
        _ => return Err(Error::NoNotes),
    };

    let mut playable = [false; 128];
    for &t in targets {
        playable[(t & 0x7F) as usize] = true;
    }
    let histogram = roll.histogram();

    let mut best: Option<TransposeReport> = None;
    let first = target_min - highest as i32 - 1;
    let last = target_max - lowest as i32 + 2;

    for shift in (first..=last).filter(|&s| mode.allows(s)) {
        let unplayable = count_unplayable(&histogram, &playable, shift);
        let better = match best {
            None => true,
            Some(b) => {
                unplayable < b.unplayable
                    || (unplayable == b.unplayable && shift.abs() < b.shift.abs())
            }
        };
        if better {
            best = Some(TransposeReport { shift, unplayable });
        }
    }

    // only octave-only searches over a window without a multiple of 12 get
    // here; no shift can do better than leaving the notes alone
    let report = best.unwrap_or_else(|| TransposeReport {
        shift: 0,
        unplayable: count_unplayable(&histogram, &playable, 0),
    });

    info!(
        octaves = report.octaves(),
        halftones = report.halftones(),
        unplayable = report.unplayable,
        "transposition chosen"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::NoteEvent;
    use pretty_assertions::assert_eq;

    fn roll(pitches: &[u8]) -> PianoRoll {
        let mut roll = PianoRoll::new();
        for (i, &pitch) in pitches.iter().enumerate() {
            roll.add(NoteEvent::new(i as u64 * 10, pitch, 0, 0));
        }
        roll
    }

    const C_MAJOR: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

    #[test]
    fn test_black_keys_onto_c_major() {
        let roll = roll(&[1, 3, 6, 8, 10, 1, 3]);
        let report = search(&roll, &C_MAJOR, SearchMode::Any).unwrap();
        assert_eq!(report, TransposeReport { shift: -1, unplayable: 0 });
    }

    #[test]
    fn test_prefers_no_shift_when_already_playable() {
        let roll = roll(&[60, 62, 64]);
        let targets: Vec<u8> = (48..84).collect();
        let report = search(&roll, &targets, SearchMode::Any).unwrap();
        assert_eq!(report, TransposeReport { shift: 0, unplayable: 0 });
    }

    #[test]
    fn test_shifts_into_range() {
        // an octave above a 15-note comb
        let roll = roll(&[72, 74, 76, 77, 79]);
        let targets: Vec<u8> = [0u8, 2, 4, 5, 7, 9, 11, 12].iter().map(|n| n + 48).collect();
        let report = search(&roll, &targets, SearchMode::Any).unwrap();
        assert_eq!(report.shift, -24);
        assert_eq!(report.unplayable, 0);
        assert_eq!((report.octaves(), report.halftones()), (-2, 0));
    }

    #[test]
    fn test_octave_only_mode() {
        let roll = roll(&[1, 3, 6, 8, 10]);
        let report = search(&roll, &C_MAJOR, SearchMode::Octaves).unwrap();
        assert_eq!(report.shift % 12, 0);
        assert_eq!(report.unplayable, 5);
    }

    #[test]
    fn test_no_octaves_mode_skips_zero() {
        let roll = roll(&[0, 2, 4]);
        let report = search(&roll, &C_MAJOR, SearchMode::NoOctaves).unwrap();
        assert_ne!(report.shift.rem_euclid(12), 0);
    }

    #[test]
    fn test_octave_only_window_without_multiple_of_twelve() {
        // window is 4..=7
        let roll = roll(&[55]);
        let report = search(&roll, &[60], SearchMode::Octaves).unwrap();
        assert_eq!(report, TransposeReport { shift: 0, unplayable: 1 });
    }

    #[test]
    fn test_counts_notes_not_pitches() {
        let roll = roll(&[61, 61, 61, 62]);
        let report = search(&roll, &[62], SearchMode::Any).unwrap();
        assert_eq!(report, TransposeReport { shift: 1, unplayable: 1 });
    }

    #[test]
    fn test_empty_roll_fails() {
        let err = search(&PianoRoll::new(), &C_MAJOR, SearchMode::Any).unwrap_err();
        assert!(matches!(err, Error::NoNotes));
        assert_eq!(err.kind(), crate::ErrorKind::EmptyContent);
    }

    #[test]
    fn test_decomposition_of_negative_shift() {
        let report = TransposeReport { shift: -1, unplayable: 0 };
        assert_eq!((report.octaves(), report.halftones()), (-1, 11));
    }

    #[test]
    fn test_search_mode_parsing() {
        assert_eq!("octaves".parse::<SearchMode>().unwrap(), SearchMode::Octaves);
        assert_eq!("no-octaves".parse::<SearchMode>().unwrap(), SearchMode::NoOctaves);
        assert!("semitones".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::NoOctaves.to_string(), "no-octaves");
    }
}
