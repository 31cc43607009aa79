//! Protocol implementation module
//!
//! This module defines the SBUS frame layout, its CRC, and the datagram codec
//! used for both structured frames and plain text payloads.

pub mod codec;
pub mod crc;
pub mod frame;
pub mod message;

pub use self::codec::{decode_text, encode_text, Charset, DatagramCodec};
pub use self::crc::crc16;
pub use self::frame::{FrameSpec, FRAME_HEADER, FRAME_LEN, FRAME_SYNC};
pub use self::message::OutgoingPayload;
