//! MIDI variable-length quantities: big-endian base 128, high bit set on
//! every byte except the last.

use crate::{Error, Result};

/// Largest value a four-byte quantity can carry.
pub const MAX: u32 = 0x0FFF_FFFF;

/// Encode a value as a MIDI variable-length quantity.
pub fn encode(mut value: u32) -> Vec<u8> {
    debug_assert!(value <= MAX, "VLQ value {value} exceeds 28 bits");

    if value == 0 {
        return vec![0];
    }

    let mut bytes = Vec::with_capacity(4);
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }

    bytes.reverse();
    bytes
}

/// Decode a quantity from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. `offset` is only
/// used to position errors within the enclosing file.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if i == 4 {
            return Err(Error::VlqOverflow { offset });
        }
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(Error::Truncated {
        offset: offset + bytes.len(),
        context: "variable-length quantity",
    })
}
