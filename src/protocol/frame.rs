//! Structured SBUS frames
//!
//! ```text
//! +-----------------+-------------------------------------------------+---------+
//! | header (16)     | body (13)                                       | CRC (2) |
//! |                 | sync(5) opcode(2) sid(1) did(1) payload(4)      | BE      |
//! +-----------------+-------------------------------------------------+---------+
//! ```
//!
//! The CRC covers the body only.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::crc::crc16;
use crate::core::{Error, Result};

/// Constant frame header
pub const FRAME_HEADER: [u8; 16] = [
    0xc0, 0xa8, 0x0a, 0x07, 0x53, 0x4d, 0x41, 0x52, 0x54, 0x43, 0x4c, 0x4f, 0x55, 0x44, 0xaa,
    0xaa,
];

/// Sync bytes opening every body
pub const FRAME_SYNC: [u8; 5] = [0x0f, 0x03, 0xfe, 0xff, 0xfe];

/// Number of payload bytes carried by a frame
pub const PAYLOAD_LEN: usize = 4;

/// Length of the CRC-protected body
pub const BODY_LEN: usize = FRAME_SYNC.len() + 2 + 1 + 1 + PAYLOAD_LEN;

/// Length of a complete frame on the wire
pub const FRAME_LEN: usize = FRAME_HEADER.len() + BODY_LEN + 2;

/// Logical content of a structured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSpec {
    /// Sending device (SID)
    pub source_id: u8,
    /// Receiving device (DID)
    pub dest_id: u8,
    /// Operation code
    pub opcode: u16,
    /// Operation arguments
    pub payload: [u8; PAYLOAD_LEN],
}

impl FrameSpec {
    /// Creates a new frame spec
    pub fn new(source_id: u8, dest_id: u8, opcode: u16, payload: [u8; PAYLOAD_LEN]) -> Self {
        FrameSpec {
            source_id,
            dest_id,
            opcode,
            payload,
        }
    }

    /// Appends the complete frame to `dst`
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(FRAME_LEN);
        dst.put_slice(&FRAME_HEADER);

        let body_start = dst.len();
        dst.put_slice(&FRAME_SYNC);
        dst.put_u16(self.opcode);
        dst.put_u8(self.source_id);
        dst.put_u8(self.dest_id);
        dst.put_slice(&self.payload);

        let crc = crc16(&dst[body_start..]);
        dst.put_u16(crc);
    }

    /// Encodes the complete frame
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Validates an inbound frame and extracts its content
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() != FRAME_LEN {
            return Err(Error::protocol(format!(
                "Frame must be {} bytes, got {}",
                FRAME_LEN,
                frame.len()
            )));
        }

        let (header, rest) = frame.split_at(FRAME_HEADER.len());
        if header != FRAME_HEADER {
            return Err(Error::protocol("Unexpected frame header"));
        }

        let (body, crc_bytes) = rest.split_at(BODY_LEN);
        if body[..FRAME_SYNC.len()] != FRAME_SYNC {
            return Err(Error::protocol("Unexpected sync bytes"));
        }

        let expected = crc16(body);
        let actual = u16::from_be_bytes([crc_bytes[0], crc_bytes[1]]);
        if expected != actual {
            return Err(Error::protocol(format!(
                "CRC mismatch: expected {:#06x}, got {:#06x}",
                expected, actual
            )));
        }

        let fields = &body[FRAME_SYNC.len()..];
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&fields[4..]);

        Ok(FrameSpec {
            opcode: u16::from_be_bytes([fields[0], fields[1]]),
            source_id: fields[2],
            dest_id: fields[3],
            payload,
        })
    }
}
