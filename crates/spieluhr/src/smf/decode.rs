//! Standard MIDI File decoding.
//!
//! Only note on/off messages survive decoding; everything else is framed
//! correctly and skipped. Tracks are merged into a single chronological
//! message list.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::smf::reader::Reader;
use crate::{Error, Result};

/// Program number that marks a track's notes as percussion.
pub const PERCUSSION_PROGRAM: u8 = 127;

/// Smallest chunk: four byte tag plus four byte length.
const CHUNK_HEADER_LEN: usize = 8;

/// Contents of the `MThd` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub format: u16,
    /// Track count as declared by the header, not necessarily what follows.
    pub tracks: u16,
    /// Ticks per quarter note.
    pub resolution: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteAction {
    On { velocity: u8 },
    Off,
}

/// A note on or note off at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMessage {
    pub tick: u64,
    pub track: usize,
    pub channel: u8,
    pub pitch: u8,
    pub action: NoteAction,
}

impl NoteMessage {
    pub fn is_on(&self) -> bool {
        matches!(self.action, NoteAction::On { .. })
    }
}

/// Everything the rest of the pipeline needs from a MIDI file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMidi {
    pub header: Header,
    /// Number of `MTrk` chunks actually decoded.
    pub tracks_decoded: usize,
    /// Note messages from all tracks, ordered by tick. Messages sharing a
    /// tick keep track order, then file order.
    pub messages: Vec<NoteMessage>,
}

impl DecodedMidi {
    pub fn resolution(&self) -> u16 {
        self.header.resolution
    }
}

/// Decode a complete Standard MIDI File held in memory.
pub fn decode(bytes: &[u8]) -> Result<DecodedMidi> {
    let mut reader = Reader::new(bytes);
    let mut header: Option<Header> = None;
    let mut messages = Vec::new();
    let mut track_index = 0usize;

    while !reader.is_empty() {
        if reader.remaining() < CHUNK_HEADER_LEN {
            warn!(
                remaining = reader.remaining(),
                "ignoring trailing bytes at end of MIDI file"
            );
            break;
        }

        let tag = reader.take(4, "chunk tag")?;
        let len = reader.u32_be("chunk length")?;
        let body_offset = reader.offset();
        let body = reader
            .take(len as usize, "chunk length exceeds remaining bytes")?;

        debug!(tag = %String::from_utf8_lossy(tag), len, "chunk");

        match (tag, header) {
            (b"MThd", Some(_)) => return Err(Error::MultipleHeaders),
            (b"MThd", None) => {
                if len != 6 {
                    return Err(Error::InvalidHeader(len));
                }
                header = Some(decode_header(Reader::at(body, body_offset))?);
            }
            (_, None) => {
                return Err(Error::MissingHeader {
                    found: String::from_utf8_lossy(tag).into_owned(),
                })
            }
            (b"MTrk", Some(_)) => {
                decode_track(Reader::at(body, body_offset), track_index, &mut messages)?;
                track_index += 1;
            }
            (_, Some(_)) => {
                debug!(tag = %String::from_utf8_lossy(tag), "skipping unknown chunk");
            }
        }
    }

    let header = header.ok_or_else(|| Error::MissingHeader {
        found: "end of file".to_string(),
    })?;

    messages.sort_by_key(|m| m.tick);

    Ok(DecodedMidi {
        header,
        tracks_decoded: track_index,
        messages,
    })
}

fn decode_header(mut body: Reader<'_>) -> Result<Header> {
    let format = body.u16_be("MThd format")?;
    let tracks = body.u16_be("MThd track count")?;
    let resolution = body.u16_be("MThd division")?;

    // high bit set means SMPTE frames, which has no ticks-per-beat
    if resolution == 0 || resolution & 0x8000 != 0 {
        return Err(Error::UnsupportedDivision(resolution));
    }

    Ok(Header {
        format,
        tracks,
        resolution,
    })
}

/// Per-track decoder state.
struct TrackState {
    index: usize,
    tick: u64,
    status: Option<u8>,
    program: Option<u8>,
}

fn decode_track(
    mut body: Reader<'_>,
    index: usize,
    messages: &mut Vec<NoteMessage>,
) -> Result<()> {
    let mut state = TrackState {
        index,
        tick: 0,
        status: None,
        program: None,
    };

    while !body.is_empty() {
        let delta = body.vlq()?;
        state.tick += delta as u64;

        let offset = body.offset();
        let status = match body.peek() {
            Some(byte) if byte & 0x80 != 0 => {
                body.byte("status")?;
                // meta and sysex leave the channel running status alone
                if byte < 0xF0 {
                    state.status = Some(byte);
                }
                byte
            }
            // running status: this is the first data byte of the previous event
            Some(byte) => state.status.ok_or(Error::MissingStatus { byte, offset })?,
            None => {
                return Err(Error::Truncated {
                    offset,
                    context: "event after delta time",
                })
            }
        };

        match status >> 4 {
            0x8 | 0x9 | 0xA | 0xB | 0xE => {
                let data = body.take(2, "channel message data")?;
                state.channel_message(status, data[0], data[1], messages);
            }
            0xC | 0xD => {
                let data = body.take(1, "channel message data")?;
                state.channel_message(status, data[0], 0, messages);
            }
            _ if status == 0xFF => {
                let _meta_type = body.byte("meta event type")?;
                let len = body.vlq()?;
                body.take(len as usize, "meta event payload")?;
            }
            _ if status == 0xF0 || status == 0xF7 => {
                let len = body.vlq()?;
                body.take(len as usize, "sysex payload")?;
            }
            _ => return Err(Error::UnknownStatus { status, offset }),
        }
    }

    Ok(())
}

impl TrackState {
    fn channel_message(&mut self, status: u8, data1: u8, data2: u8, out: &mut Vec<NoteMessage>) {
        let channel = status & 0x0F;
        let action = match status >> 4 {
            0x9 if data2 > 0 => {
                if self.program == Some(PERCUSSION_PROGRAM) {
                    return;
                }
                NoteAction::On { velocity: data2 }
            }
            0x8 | 0x9 => NoteAction::Off,
            0xC => {
                self.program = Some(data1);
                return;
            }
            _ => return,
        };

        out.push(NoteMessage {
            tick: self.tick,
            track: self.index,
            channel,
            pitch: data1 & 0x7F,
            action,
        });
    }
}
