//! Wire frame encoding and decoding.
//!
//! Every request and response exchanged with the controller is a single frame:
//!
//! ```text
//! 0x5a 0x5a | LENGTH | COMMAND_ID | PAYLOAD... | CHECKSUM
//! ```
//!
//! `LENGTH` counts the command ID, the payload and the checksum.
//! The checksum is the one's complement of the 8-bit sum of `LENGTH`,
//! `COMMAND_ID` and the payload.
//!
//! Before transmission, the payload and checksum are obfuscated by a rolling
//! transform: the byte at position `i` of the frame body (counting from the
//! `LENGTH` byte) is incremented by `i - 1`. The length and command ID bytes
//! are sent as-is.
//!
//! This module performs no I/O.

use alloc::vec::Vec;
use core::{
    fmt::{Display, Formatter},
    num::Wrapping,
};
use log::trace;

/// Fixed two-byte frame header.
pub const HEADER: [u8; 2] = [0x5a, 0x5a];

/// Maximum payload length that still fits the 8-bit length field.
pub const MAX_PAYLOAD_LEN: usize = 0xff - 2;

/// Maximum length of an encoded frame.
pub const MAX_FRAME_LEN: usize = HEADER.len() + 1 + 0xff;

// Header, length, command ID and checksum
const MIN_FRAME_LEN: usize = HEADER.len() + 3;

// Body positions below this are not transformed
const TRANSFORM_START: usize = 2;

/// Integrity failure detected while decoding a frame.
///
/// A frame failing any of these checks must be discarded as a whole.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DecodeError {
    /// The frame is too short or does not start with [`HEADER`].
    MalformedHeader,
    /// The frame length does not match its `LENGTH` byte.
    LengthMismatch,
    /// The transmitted checksum does not match the frame contents.
    ChecksumMismatch,
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "malformed header"),
            Self::LengthMismatch => write!(f, "length mismatch"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// A single protocol frame, without header and checksum.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Frame {
    /// Command identifier.
    pub command_id: u8,
    /// Payload bytes, excluding the command identifier.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Constructs a new frame.
    ///
    /// The payload must not exceed [`MAX_PAYLOAD_LEN`] bytes.
    pub fn new(command_id: u8, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();

        debug_assert!(
            payload.len() <= MAX_PAYLOAD_LEN,
            "payload does not fit into a single frame"
        );

        Self {
            command_id,
            payload,
        }
    }

    /// Serializes the frame into its on-wire representation.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MIN_FRAME_LEN + self.payload.len());

        buf.extend_from_slice(&HEADER);
        buf.push((self.payload.len() + 2) as u8);
        buf.push(self.command_id);
        buf.extend_from_slice(&self.payload);

        let sum = checksum(&buf[HEADER.len()..]);

        buf.push(sum);

        for (pos, byte) in buf[HEADER.len()..]
            .iter_mut()
            .enumerate()
            .skip(TRANSFORM_START)
        {
            *byte = transform(*byte, pos);
        }

        trace!("Encoded frame: {buf:02x?}");

        buf
    }

    /// Parses and verifies a frame received from the controller.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::MalformedHeader`] if the data is shorter than
    ///   5 bytes or does not start with [`HEADER`].
    /// - [`DecodeError::LengthMismatch`] if the data length does not match
    ///   the frame's length byte.
    /// - [`DecodeError::ChecksumMismatch`] if the checksum is incorrect.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MIN_FRAME_LEN || !data.starts_with(&HEADER) {
            return Err(DecodeError::MalformedHeader);
        }

        if data.len() != HEADER.len() + 1 + usize::from(data[HEADER.len()]) {
            return Err(DecodeError::LengthMismatch);
        }

        let mut body = data[HEADER.len()..].to_vec();

        for (pos, byte) in body.iter_mut().enumerate().skip(TRANSFORM_START) {
            *byte = untransform(*byte, pos);
        }

        let Some((&received, contents)) = body.split_last() else {
            return Err(DecodeError::MalformedHeader);
        };

        if received != checksum(contents) {
            return Err(DecodeError::ChecksumMismatch);
        }

        Ok(Self {
            command_id: contents[1],
            payload: contents[2..].to_vec(),
        })
    }
}

/// Computes the one's complement of the 8-bit sum of the data.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    !data.iter().map(|&x| Wrapping(x)).sum::<Wrapping<_>>().0
}

/// Obfuscates a byte located at the given frame body position.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn transform(byte: u8, pos: usize) -> u8 {
    byte.wrapping_add(pos.wrapping_sub(1) as u8)
}

/// Reverses [`transform`] for a byte located at the given frame body position.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn untransform(byte: u8, pos: usize) -> u8 {
    byte.wrapping_sub(pos.wrapping_sub(1) as u8)
}
