//! MIDI to music box punch strip converter.
//!
//! Takes a Standard MIDI File, fits it onto the fixed pins of a music box
//! mechanism and lays the result out as holes on a paper strip, split into
//! segments that fit a printable sheet.
//!
//! The pipeline is a single batch pass:
//!
//! 1. [`smf::decode`] turns raw bytes into note messages.
//! 2. [`PianoRoll`] stores them; [`PianoRoll::filter_repetition`] drops
//!    notes re-struck faster than the mechanism can rearm.
//! 3. [`transpose::search`] finds the shift that loses the fewest notes.
//! 4. [`band::map`] folds every note onto one pin.
//! 5. [`layout::StripLayout`] turns pin times into hole coordinates, and
//!    [`draw::render`] into drawing primitives for the [`render`] surfaces.
//!
//! # Example
//!
//! ```no_run
//! use spieluhr::{convert, profile, ConvertOptions, Sheet};
//!
//! let bytes = std::fs::read("tune.mid")?;
//! let mechanism = profile::lookup("sankyo20")?;
//! let conversion = convert(&bytes, mechanism, &ConvertOptions::default())?;
//!
//! let midi = conversion.to_midi();
//! let layout = conversion.layout(&Sheet::default())?;
//! let svg = spieluhr::render::svg::to_svg(&conversion.draw(&layout, &Sheet::default()), &Sheet::default());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod band;
pub mod draw;
pub mod layout;
pub mod pipeline;
pub mod profile;
pub mod render;
pub mod roll;
pub mod sheet;
pub mod smf;
pub mod transpose;

pub use band::Bands;
pub use draw::DrawOp;
pub use layout::{Hole, Segment, StripLayout};
pub use pipeline::{convert, Conversion, ConvertOptions};
pub use profile::MechanismProfile;
pub use roll::{NoteEvent, NoteState, PianoRoll};
pub use sheet::Sheet;
pub use transpose::{SearchMode, TransposeReport};

/// Broad class of a failure, used by callers to decide how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The MIDI bytes are not a file we can decode.
    MalformedInput,
    /// The file decoded but holds nothing the mechanism can play.
    EmptyContent,
    /// Unknown or inconsistent mechanism/sheet settings.
    Configuration,
    /// Writing an output artifact failed.
    Output,
}

/// Errors from decoding, analysis and layout.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated MIDI data at byte {offset}: {context}")]
    Truncated { offset: usize, context: &'static str },

    #[error("first chunk is {found:?}, expected \"MThd\"")]
    MissingHeader { found: String },

    #[error("multiple MThd chunks")]
    MultipleHeaders,

    #[error("invalid MThd chunk: length {0}, expected 6")]
    InvalidHeader(u32),

    #[error("unsupported time division {0:#06x}, only ticks per quarter note are supported")]
    UnsupportedDivision(u16),

    #[error("unknown MIDI status byte {status:#04x} at byte {offset}")]
    UnknownStatus { status: u8, offset: usize },

    #[error("variable-length quantity at byte {offset} is longer than 4 bytes")]
    VlqOverflow { offset: usize },

    #[error("data byte {byte:#04x} at byte {offset} with no running status")]
    MissingStatus { byte: u8, offset: usize },

    #[error("no notes to analyze")]
    NoNotes,

    #[error("none of the notes can be played on this mechanism")]
    NoPlayableNotes,

    #[error("unknown music box type {name:?}, available: {}", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },

    #[error("invalid mechanism profile {name}: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("invalid sheet: {0}")]
    InvalidSheet(String),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Truncated { .. }
            | Error::MissingHeader { .. }
            | Error::MultipleHeaders
            | Error::InvalidHeader(_)
            | Error::UnsupportedDivision(_)
            | Error::UnknownStatus { .. }
            | Error::VlqOverflow { .. }
            | Error::MissingStatus { .. } => ErrorKind::MalformedInput,
            Error::NoNotes | Error::NoPlayableNotes => ErrorKind::EmptyContent,
            Error::UnknownProfile { .. } | Error::InvalidProfile { .. } | Error::InvalidSheet(_) => {
                ErrorKind::Configuration
            }
            Error::Io(_) => ErrorKind::Output,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
