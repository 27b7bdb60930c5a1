//! One-shot conversion from MIDI bytes to pin bands.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::band::{self, Bands};
use crate::draw::{self, DrawOp};
use crate::layout::StripLayout;
use crate::profile::MechanismProfile;
use crate::render::svg;
use crate::roll::PianoRoll;
use crate::sheet::Sheet;
use crate::smf;
use crate::transpose::{self, SearchMode, TransposeReport};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Suppress same-pitch repeats closer than this many ticks.
    pub filter_ticks: u64,
    /// Fixed shift in semitones; searched for when `None`.
    pub transpose: Option<i32>,
    pub search: SearchMode,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            filter_ticks: 1,
            transpose: None,
            search: SearchMode::Any,
        }
    }
}

/// Result of [`convert`]: the mechanism's pin bands plus what it took to
/// get there.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub profile: MechanismProfile,
    /// Ticks per quarter note of the input file.
    pub resolution: u16,
    /// Note ons read from the input.
    pub notes: usize,
    /// Notes dropped by the repetition filter.
    pub suppressed: usize,
    /// Shift applied to every pitch.
    pub transpose: i32,
    /// Search outcome, absent when the shift was given.
    pub report: Option<TransposeReport>,
    pub bands: Bands,
    /// Shortest repeat of any audible pitch, in ticks. One `profile.step`
    /// of strip covers this many ticks.
    pub unit: u64,
}

impl Conversion {
    pub fn unmapped(&self) -> usize {
        self.bands.unmapped()
    }

    /// Format 0 MIDI file playing exactly the punched notes.
    pub fn to_midi(&self) -> Vec<u8> {
        smf::write_bands(&self.bands, &self.profile, self.resolution, self.unit)
    }

    pub fn layout(&self, sheet: &Sheet) -> Result<StripLayout> {
        StripLayout::new(&self.bands, &self.profile, self.unit, sheet)
    }

    pub fn draw(&self, layout: &StripLayout, sheet: &Sheet) -> Vec<DrawOp> {
        draw::render(layout, &self.profile, sheet)
    }

    /// The whole strip as one SVG page tall enough for every segment.
    pub fn to_svg(&self, sheet: &Sheet) -> Result<String> {
        let layout = self.layout(sheet)?;
        let tall = sheet.unpaged(layout.segments.len(), self.profile.height);
        Ok(svg::to_svg(&self.draw(&layout, &tall), &tall))
    }
}

/// Decode `bytes` and fit the notes onto `profile`.
///
/// Runs the repetition filter, picks a transposition (unless one is
/// given), folds notes onto pins and measures the minimum repeat unit.
/// When no pitch repeats, the unit is one quarter note.
pub fn convert(bytes: &[u8], profile: &MechanismProfile, options: &ConvertOptions) -> Result<Conversion> {
    profile.validate()?;

    let midi = smf::decode(bytes)?;
    let resolution = midi.resolution();
    let mut roll = PianoRoll::from_messages(midi.messages);
    if roll.is_empty() {
        return Err(Error::NoNotes);
    }
    let notes = roll.len();

    let order = roll.pitch_order();
    let suppressed = roll.filter_repetition(&order, options.filter_ticks);
    debug!(notes, suppressed, delta = options.filter_ticks, "repetition filter");

    let (shift, report) = match options.transpose {
        Some(shift) => (shift, None),
        None => {
            let report = transpose::search(&roll, &profile.pitches(), options.search)?;
            (report.shift, Some(report))
        }
    };
    roll.set_transpose(shift);

    let bands = band::map(&roll, &roll.tick_order(), profile);
    if bands.is_empty() {
        return Err(Error::NoPlayableNotes);
    }

    let unit = roll
        .min_repetition(&order)
        .unwrap_or(u64::from(resolution))
        .max(1);

    info!(
        box_type = profile.name,
        notes,
        suppressed,
        transpose = shift,
        holes = bands.hole_count(),
        unmapped = bands.unmapped(),
        unit,
        "converted"
    );

    Ok(Conversion {
        profile: profile.clone(),
        resolution,
        notes,
        suppressed,
        transpose: shift,
        report,
        bands,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;
    use crate::smf::vlq;
    use pretty_assertions::assert_eq;

    /// Single track file from (delta, event bytes) pairs.
    fn smf(resolution: u16, events: &[(u32, &[u8])]) -> Vec<u8> {
        let mut track = Vec::new();
        for (delta, bytes) in events {
            track.extend(vlq::encode(*delta));
            track.extend_from_slice(bytes);
        }
        track.extend([0x00, 0xFF, 0x2F, 0x00]);

        let mut out = b"MThd".to_vec();
        out.extend(6u32.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        out.extend(1u16.to_be_bytes());
        out.extend(resolution.to_be_bytes());
        out.extend(b"MTrk");
        out.extend((track.len() as u32).to_be_bytes());
        out.extend(track);
        out
    }

    fn two_pin() -> MechanismProfile {
        MechanismProfile {
            name: "two",
            lowest: 48,
            notes: &[0, 2],
            ..profile::lookup("sankyo20").unwrap().clone()
        }
    }

    #[test]
    fn test_two_notes_end_to_end() {
        let bytes = smf(
            480,
            &[
                (0, &[0x90, 60, 100]),
                (480, &[0x80, 60, 0]),
                (0, &[0x90, 62, 100]),
                (480, &[0x80, 62, 0]),
            ],
        );
        let options = ConvertOptions {
            transpose: Some(0),
            ..ConvertOptions::default()
        };
        let conversion = convert(&bytes, &two_pin(), &options).unwrap();

        assert_eq!(conversion.bands.pins(), &[vec![0], vec![480]]);
        assert_eq!(conversion.unit, 480);
        assert_eq!(conversion.report, None);
        assert_eq!(conversion.notes, 2);
    }

    #[test]
    fn test_search_runs_without_override() {
        let bytes = smf(96, &[(0, &[0x90, 61, 100]), (96, &[0x90, 63, 100])]);
        let conversion = convert(&bytes, &two_pin(), &ConvertOptions::default()).unwrap();

        let report = conversion.report.unwrap();
        assert_eq!(report.unplayable, 0);
        assert_eq!(conversion.transpose, report.shift);
        assert_eq!(conversion.unmapped(), 0);
        assert_eq!(conversion.bands.hole_count(), 2);
    }

    #[test]
    fn test_unit_is_shortest_audible_repeat() {
        let bytes = smf(
            480,
            &[
                (0, &[0x90, 60, 100]),
                (10, &[0x90, 60, 100]),
                (110, &[0x90, 60, 100]),
                (240, &[0x90, 60, 100]),
            ],
        );
        let options = ConvertOptions {
            filter_ticks: 50,
            transpose: Some(0),
            ..ConvertOptions::default()
        };
        let conversion = convert(&bytes, &two_pin(), &options).unwrap();
        assert_eq!(conversion.suppressed, 1);
        assert_eq!(conversion.unit, 120);
        assert_eq!(conversion.bands.pin(0), &[0, 120, 360]);
    }

    #[test]
    fn test_file_without_notes() {
        let bytes = smf(480, &[(0, &[0xC0, 5])]);
        let err = convert(&bytes, &two_pin(), &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NoNotes));
    }

    #[test]
    fn test_nothing_playable() {
        // C# has no pin in any octave
        let bytes = smf(480, &[(0, &[0x90, 61, 100])]);
        let options = ConvertOptions {
            transpose: Some(0),
            ..ConvertOptions::default()
        };
        let err = convert(&bytes, &two_pin(), &options).unwrap_err();
        assert!(matches!(err, Error::NoPlayableNotes));
        assert_eq!(err.kind(), crate::ErrorKind::EmptyContent);
    }

    #[test]
    fn test_midi_output_replays_bands() {
        let bytes = smf(
            240,
            &[(0, &[0x90, 48, 100]), (240, &[0x90, 50, 100]), (0, &[0x90, 48, 90])],
        );
        let options = ConvertOptions {
            transpose: Some(0),
            ..ConvertOptions::default()
        };
        let conversion = convert(&bytes, &two_pin(), &options).unwrap();
        let replayed = smf::decode(&conversion.to_midi()).unwrap();

        assert_eq!(replayed.header.format, 0);
        assert_eq!(replayed.resolution(), 240);
        let ons: Vec<(u64, u8)> = replayed
            .messages
            .iter()
            .filter(|m| m.is_on())
            .map(|m| (m.tick, m.pitch))
            .collect();
        assert_eq!(ons, vec![(0, 48), (240, 48), (240, 50)]);
    }

    #[test]
    fn test_svg_is_single_page() {
        let bytes = smf(480, &[(0, &[0x90, 60, 100]), (480, &[0x90, 62, 100])]);
        let conversion = convert(&bytes, &two_pin(), &ConvertOptions::default()).unwrap();
        let svg = conversion.to_svg(&Sheet::default()).unwrap();
        assert_eq!(svg.matches("<g ").count(), 1);
    }
}
