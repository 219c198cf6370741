//! Compact save-record format for vehicles and their permanent parts.
//!
//! A vehicle record is a 13-byte entry followed by one 6-byte entry per
//! permanent part and a single terminator byte:
//!
//! ```text
//! barge: 12 x y shape_lo shape_hi|frame<<2 xtiles ytiles 0 dir<<1|moving<<3 0 lift' 0 0
//! part:   5 x y shape_lo shape_hi|frame<<2 lift'
//! end:    1
//! ```
//!
//! Coordinates keep only their low byte and `lift'` stores the lift with its
//! nibbles swapped.

use harbor_core::{Facing, TileCoord};
use thiserror::Error;

const BARGE_ENTRY_LEN: u8 = 12;
const PART_ENTRY_LEN: u8 = 5;
const END_OF_PARTS: u8 = 1;

/// Encoded size of the vehicle entry, length byte included.
pub const BARGE_RECORD_SIZE: usize = BARGE_ENTRY_LEN as usize + 1;

/// Encoded size of one permanent part, length byte included.
pub const PART_RECORD_SIZE: usize = PART_ENTRY_LEN as usize + 1;

/// Failures raised while decoding a vehicle record.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IregError {
    /// The record ended before an entry was complete.
    #[error("record truncated at byte {offset}")]
    Truncated {
        /// Offset at which more bytes were expected.
        offset: usize,
    },
    /// An entry started with an unknown length byte.
    #[error("unexpected entry length {length} at byte {offset}")]
    UnexpectedLength {
        /// Length byte that was read.
        length: u8,
        /// Offset of the length byte.
        offset: usize,
    },
    /// Bytes followed the terminator.
    #[error("{extra} trailing bytes after the part list")]
    TrailingBytes {
        /// Number of unread bytes.
        extra: usize,
    },
}

/// Placement shared by every entry of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Low byte of the anchor column.
    pub x: u8,
    /// Low byte of the anchor row.
    pub y: u8,
    /// Shape number, ten bits.
    pub shape: u16,
    /// Frame number, six bits.
    pub frame: u8,
    /// Lift of the anchor.
    pub lift: u8,
}

impl ObjectEntry {
    /// Builds an entry from a full placement, truncating what the format
    /// cannot hold.
    #[must_use]
    pub fn new(tile: TileCoord, shape: u16, frame: u8) -> Self {
        Self {
            x: low_byte(tile.x()),
            y: low_byte(tile.y()),
            shape: shape & 0x3ff,
            frame: frame & 0x3f,
            lift: low_byte(tile.z()),
        }
    }

    fn write_shape(&self, out: &mut Vec<u8>) {
        out.push(self.x);
        out.push(self.y);
        out.push((self.shape & 0xff) as u8);
        out.push(((self.shape >> 8) & 0x03) as u8 | (self.frame << 2));
    }

    fn read_shape(bytes: &[u8]) -> (u8, u8, u16, u8) {
        let shape = u16::from(bytes[2]) | (u16::from(bytes[3] & 0x03) << 8);
        (bytes[0], bytes[1], shape, bytes[3] >> 2)
    }
}

/// Decoded vehicle record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BargeRecord {
    /// Placement of the vehicle itself.
    pub barge: ObjectEntry,
    /// Footprint width.
    pub xtiles: u8,
    /// Footprint height.
    pub ytiles: u8,
    /// Facing when saved.
    pub facing: Facing,
    /// Whether the vehicle was under player control.
    pub moving: bool,
    /// Permanent parts in ownership order.
    pub parts: Vec<ObjectEntry>,
}

impl BargeRecord {
    /// Serialises the record.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(BARGE_RECORD_SIZE + self.parts.len() * PART_RECORD_SIZE + 1);
        out.push(BARGE_ENTRY_LEN);
        self.barge.write_shape(&mut out);
        out.push(self.xtiles);
        out.push(self.ytiles);
        out.push(0);
        out.push((self.facing.index() << 1) | (u8::from(self.moving) << 3));
        out.push(0);
        out.push(nibble_swap(self.barge.lift));
        out.push(0);
        out.push(0);

        for part in &self.parts {
            out.push(PART_ENTRY_LEN);
            part.write_shape(&mut out);
            out.push(nibble_swap(part.lift));
        }
        out.push(END_OF_PARTS);
        out
    }

    /// Parses a record produced by [`BargeRecord::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`IregError`] when the bytes are truncated, contain an entry
    /// of the wrong length, or continue past the terminator.
    pub fn decode(bytes: &[u8]) -> Result<Self, IregError> {
        let head = entry(bytes, 0, BARGE_ENTRY_LEN)?;
        let (x, y, shape, frame) = ObjectEntry::read_shape(head);
        let barge = ObjectEntry {
            x,
            y,
            shape,
            frame,
            lift: nibble_swap(head[9]),
        };
        let flags = head[7];

        let mut parts = Vec::new();
        let mut offset = BARGE_RECORD_SIZE;
        loop {
            match bytes.get(offset) {
                None => return Err(IregError::Truncated { offset }),
                Some(&END_OF_PARTS) => break,
                Some(_) => {
                    let body = entry(bytes, offset, PART_ENTRY_LEN)?;
                    let (x, y, shape, frame) = ObjectEntry::read_shape(body);
                    parts.push(ObjectEntry {
                        x,
                        y,
                        shape,
                        frame,
                        lift: nibble_swap(body[4]),
                    });
                    offset += PART_RECORD_SIZE;
                }
            }
        }

        let extra = bytes.len() - offset - 1;
        if extra > 0 {
            return Err(IregError::TrailingBytes { extra });
        }

        Ok(Self {
            barge,
            xtiles: head[4],
            ytiles: head[5],
            facing: Facing::from_index((flags >> 1) & 3),
            moving: flags & 0x08 != 0,
            parts,
        })
    }

    /// Encoded size of the record.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        BARGE_RECORD_SIZE + self.parts.len() * PART_RECORD_SIZE + 1
    }
}

/// Returns the body of the entry at `offset` after checking its length byte.
fn entry(bytes: &[u8], offset: usize, expected: u8) -> Result<&[u8], IregError> {
    let length = *bytes.get(offset).ok_or(IregError::Truncated { offset })?;
    if length != expected {
        return Err(IregError::UnexpectedLength { length, offset });
    }
    let start = offset + 1;
    let end = start + usize::from(length);
    bytes.get(start..end).ok_or(IregError::Truncated {
        offset: bytes.len(),
    })
}

fn low_byte(value: i32) -> u8 {
    (value & 0xff) as u8
}

fn nibble_swap(value: u8) -> u8 {
    value.rotate_left(4)
}
