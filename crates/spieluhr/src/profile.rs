//! Music box mechanisms.
//!
//! Each profile describes one comb: which pitches its pins play and the
//! physical geometry of the punch strip it reads. All lengths are in
//! millimetres.

use serde::Serialize;

use crate::{Error, Result};

/// Profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "sankyo20";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MechanismProfile {
    pub name: &'static str,
    /// MIDI pitch of pin 0.
    pub lowest: u8,
    /// Semitone offset from `lowest` for every pin, strictly increasing.
    pub notes: &'static [u8],
    /// General MIDI program used when re-encoding.
    pub program: u8,
    /// Strip width across the pins.
    pub height: f64,
    /// Distance from the strip edge to the centre of pin 0.
    pub offset: f64,
    /// Distance between neighbouring pins.
    pub distance: f64,
    /// Punched hole diameter.
    pub diameter: f64,
    /// Strip length covering one minimum repeat unit.
    pub step: f64,
}

// https://www.spieluhr.de/Artikel/varAussehen.asp?ArtikelNr=4905
const SANKYO15: MechanismProfile = MechanismProfile {
    name: "sankyo15",
    lowest: 56,
    // G#1 A#1 | C2 C#2 D#2 F2 G2 G#2 A#2 | C3 C#3 D#3 F3 G3 G#3
    notes: &[0, 2, 4, 5, 7, 9, 11, 12, 14, 16, 17, 19, 21, 23, 24],
    program: 1,
    height: 41.0,
    offset: 6.0,
    distance: 2.0,
    diameter: 1.8,
    step: 8.0,
};

// https://www.spieluhr.de/Artikel/varAussehen.asp?ArtikelNr=4972
const SANKYO20: MechanismProfile = MechanismProfile {
    name: "sankyo20",
    lowest: 48,
    notes: &[
        0, 2, 4, 5, 7, 9, 11, // C D E F G A B
        12, 14, 16, 17, 19, 21, 23, // C1 .. B1
        24, 26, 28, 29, 31, 33, // C2 .. A2
    ],
    program: 2,
    height: 70.0,
    offset: 6.5,
    distance: 3.0,
    diameter: 2.4,
    step: 7.0,
};

// http://www.njdean.co.uk/musical-movements-mbm30hp.htm
const TEANOLA30: MechanismProfile = MechanismProfile {
    name: "teanola30",
    lowest: 41,
    notes: &[
        0, 2, // F G
        7, 9, 11, 12, 14, 16, 17, 18, // C1 D1 E1 F1 G1 A1 A#1 B1
        19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, // C2 .. B2
        31, 32, 33, 34, 35, 36, 38, 40, // C3 .. F3 G3 A3
    ],
    program: 3,
    height: 70.0,
    offset: 6.0,
    distance: 2.0,
    diameter: 1.8,
    step: 8.0,
};

// http://www.spieluhr.de/Artikel/varAussehen.asp?ArtikelNr=5663
const SANKYO33: MechanismProfile = MechanismProfile {
    name: "sankyo33",
    lowest: 48,
    notes: &[
        0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, // C D .. B
        12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, // C1 .. B1
        24, 25, 26, 27, 28, 29, 30, 31, 32, 33, // C2 .. A2
    ],
    program: 4,
    height: 70.0,
    offset: 5.3,
    distance: 1.8,
    diameter: 1.7,
    step: 8.0,
};

static REGISTRY: [MechanismProfile; 4] = [SANKYO15, SANKYO20, TEANOLA30, SANKYO33];

/// All built-in profiles, in registry order.
pub fn all() -> &'static [MechanismProfile] {
    &REGISTRY
}

/// Names of all built-in profiles, sorted.
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.iter().map(|p| p.name.to_string()).collect();
    names.sort();
    names
}

/// Find a built-in profile by name and validate it.
pub fn lookup(name: &str) -> Result<&'static MechanismProfile> {
    let profile = REGISTRY
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::UnknownProfile {
            name: name.to_string(),
            available: names(),
        })?;
    profile.validate()?;
    Ok(profile)
}

impl MechanismProfile {
    pub fn pin_count(&self) -> usize {
        self.notes.len()
    }

    /// Absolute MIDI pitch of every pin.
    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|&n| self.lowest + n).collect()
    }

    pub fn hole_radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Across-strip position of a pin's hole centre.
    pub fn pin_y(&self, pin: usize) -> f64 {
        pin as f64 * self.distance + self.offset
    }

    /// Every pitch that folds onto each pin: the pin's own pitch plus its
    /// octaves in both directions, stopping at the first octave another pin
    /// already plays.
    pub fn source_sets(&self) -> Vec<Vec<u8>> {
        let pitches = self.pitches();
        let owned = |p: i32| pitches.iter().any(|&q| q as i32 == p);

        pitches
            .iter()
            .map(|&pitch| {
                let mut set = vec![pitch];

                let mut p = pitch as i32 - 12;
                while p >= 0 && !owned(p) {
                    set.push(p as u8);
                    p -= 12;
                }

                let mut p = pitch as i32 + 12;
                while p <= 127 && !owned(p) {
                    set.push(p as u8);
                    p += 12;
                }

                set
            })
            .collect()
    }

    /// Check the invariants the band mapper and layout rely on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidProfile {
            name: self.name.to_string(),
            reason,
        };

        if self.notes.is_empty() {
            return Err(invalid("no pins".to_string()));
        }
        if let Some(w) = self.notes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "notes must be strictly increasing, found {} then {}",
                w[0], w[1]
            )));
        }
        let top = self.lowest as u32 + *self.notes.last().unwrap_or(&0) as u32;
        if top > 127 {
            return Err(invalid(format!("highest pin plays pitch {top}, above 127")));
        }
        if self.program > 127 {
            return Err(invalid(format!("program {} out of range", self.program)));
        }
        for (label, value) in [
            ("height", self.height),
            ("distance", self.distance),
            ("diameter", self.diameter),
            ("step", self.step),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(format!("{label} must be positive, got {value}")));
            }
        }

        let mut owner: [Option<usize>; 128] = [None; 128];
        for (pin, set) in self.source_sets().iter().enumerate() {
            for &pitch in set {
                if let Some(other) = owner[pitch as usize] {
                    return Err(invalid(format!(
                        "pins {other} and {pin} both fold pitch {pitch}"
                    )));
                }
                owner[pitch as usize] = Some(pin);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_profiles_are_valid() {
        for profile in all() {
            profile.validate().unwrap();
        }
        assert_eq!(names(), vec!["sankyo15", "sankyo20", "sankyo33", "teanola30"]);
    }

    #[test]
    fn test_pin_counts_match_model_names() {
        assert_eq!(lookup("sankyo15").unwrap().pin_count(), 15);
        assert_eq!(lookup("sankyo20").unwrap().pin_count(), 20);
        assert_eq!(lookup("teanola30").unwrap().pin_count(), 30);
        assert_eq!(lookup("sankyo33").unwrap().pin_count(), 33);
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let err = lookup("hurdy-gurdy").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        let message = err.to_string();
        assert!(message.contains("hurdy-gurdy"));
        assert!(message.contains("sankyo15, sankyo20, sankyo33, teanola30"));
    }

    #[test]
    fn test_source_sets_fold_octaves_until_another_pin() {
        let profile = MechanismProfile {
            name: "test",
            lowest: 0,
            notes: &[0, 2, 4, 12],
            ..SANKYO20
        };
        let sets = profile.source_sets();
        // pin 0 stops going up at pin 3 (pitch 12)
        assert_eq!(sets[0], vec![0]);
        // pin 1 folds every D upwards
        assert_eq!(sets[1], vec![2, 14, 26, 38, 50, 62, 74, 86, 98, 110, 122]);
        assert_eq!(sets[3], vec![12, 24, 36, 48, 60, 72, 84, 96, 108, 120]);
    }

    #[test]
    fn test_validate_rejects_unsorted_notes() {
        let profile = MechanismProfile {
            name: "broken",
            notes: &[0, 4, 2],
            ..SANKYO20
        };
        assert!(matches!(profile.validate(), Err(Error::InvalidProfile { .. })));
    }

    #[test]
    fn test_validate_rejects_duplicate_pins() {
        let profile = MechanismProfile {
            name: "broken",
            notes: &[0, 2, 2],
            ..SANKYO20
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_pitch_overflow() {
        let profile = MechanismProfile {
            name: "broken",
            lowest: 120,
            notes: &[0, 12],
            ..SANKYO20
        };
        assert!(profile.validate().is_err());
    }
}
