//! Standard MIDI File reading and writing.

mod decode;
mod reader;
pub mod vlq;
pub mod writer;

pub use decode::{decode, DecodedMidi, Header, NoteAction, NoteMessage, PERCUSSION_PROGRAM};
pub use writer::{pin_events, write_bands, PinAction, PinEvent};
