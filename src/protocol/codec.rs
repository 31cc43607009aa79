use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::message::OutgoingPayload;
use crate::core::{Error, Result};

/// Character sets supported for text payloads and replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Ascii,
    Utf8,
    Latin1,
    Utf16Be,
    Utf16Le,
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASCII" | "US-ASCII" => Ok(Charset::Ascii),
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            "ISO-8859-1" | "ISO8859_1" | "LATIN1" => Ok(Charset::Latin1),
            "UTF-16BE" => Ok(Charset::Utf16Be),
            "UTF-16LE" => Ok(Charset::Utf16Le),
            other => Err(Error::encoding(format!("Unsupported character set '{}'", other))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Charset::Ascii => "US-ASCII",
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
        })
    }
}

/// Decodes raw datagram bytes into text
///
/// No CRC is checked; the bytes must be valid under `charset`.
pub fn decode_text(bytes: &[u8], charset: Charset) -> Result<String> {
    match charset {
        Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(pos) => Err(Error::encoding(format!(
                "Byte {:#04x} at offset {} is not ASCII",
                bytes[pos], pos
            ))),
            None => Ok(bytes.iter().map(|&b| b as char).collect()),
        },
        Charset::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Error::encoding(format!("Invalid UTF-8: {}", e))),
        Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        Charset::Utf16Be | Charset::Utf16Le => {
            if bytes.len() % 2 != 0 {
                return Err(Error::encoding(format!(
                    "Odd byte count {} for {}",
                    bytes.len(),
                    charset
                )));
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| match charset {
                    Charset::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
                    _ => u16::from_le_bytes([pair[0], pair[1]]),
                })
                .collect();
            String::from_utf16(&units).map_err(|e| Error::encoding(format!("{}: {}", charset, e)))
        }
    }
}

/// Encodes text for the wire
pub fn encode_text(text: &str, charset: Charset, dst: &mut BytesMut) -> Result<()> {
    match charset {
        Charset::Ascii => {
            if let Some(c) = text.chars().find(|c| !c.is_ascii()) {
                return Err(Error::encoding(format!("'{}' can not be encoded as ASCII", c)));
            }
            dst.put_slice(text.as_bytes());
        }
        Charset::Utf8 => dst.put_slice(text.as_bytes()),
        Charset::Latin1 => {
            for c in text.chars() {
                let code = c as u32;
                if code > 0xff {
                    return Err(Error::encoding(format!(
                        "'{}' can not be encoded as ISO-8859-1",
                        c
                    )));
                }
                dst.put_u8(code as u8);
            }
        }
        Charset::Utf16Be => text.encode_utf16().for_each(|unit| dst.put_u16(unit)),
        Charset::Utf16Le => text.encode_utf16().for_each(|unit| dst.put_u16_le(unit)),
    }
    Ok(())
}

/// Codec turning outgoing payloads into datagrams and datagrams into text
///
/// Every call to `decode` consumes the whole buffer: one datagram is one item.
#[derive(Debug, Clone, Copy)]
pub struct DatagramCodec {
    charset: Charset,
}

impl DatagramCodec {
    /// Creates a codec for the given character set
    pub fn new(charset: Charset) -> Self {
        DatagramCodec { charset }
    }

    /// Creates a codec from a configured character set name
    pub fn for_charset(name: &str) -> Result<Self> {
        Ok(DatagramCodec::new(name.parse()?))
    }

    /// Returns the codec's character set
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Encodes a payload into a standalone datagram
    pub fn to_datagram(&mut self, payload: OutgoingPayload) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(payload, &mut buf)?;
        Ok(buf.freeze())
    }
}

impl Decoder for DatagramCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }
        let datagram = src.split();
        decode_text(&datagram, self.charset).map(Some)
    }
}

impl Encoder<OutgoingPayload> for DatagramCodec {
    type Error = Error;

    fn encode(&mut self, item: OutgoingPayload, dst: &mut BytesMut) -> Result<()> {
        match item {
            OutgoingPayload::Frame(spec) => {
                spec.encode_into(dst);
                Ok(())
            }
            OutgoingPayload::Text(text) => encode_text(&text, self.charset, dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{FrameSpec, FRAME_LEN};

    #[test]
    fn test_charset_names() {
        assert_eq!("ascii".parse::<Charset>().unwrap(), Charset::Ascii);
        assert_eq!("US-ASCII".parse::<Charset>().unwrap(), Charset::Ascii);
        assert_eq!("utf-8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("Latin1".parse::<Charset>().unwrap(), Charset::Latin1);
        assert!(matches!("EBCDIC".parse::<Charset>(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"42\r\n", Charset::Ascii).unwrap(), "42\r\n");
        assert!(matches!(
            decode_text(&[0x34, 0xc3], Charset::Ascii),
            Err(Error::Encoding(_))
        ));
        assert_eq!(decode_text(&[0xe9], Charset::Latin1).unwrap(), "é");
        assert!(decode_text(&[0xc3], Charset::Utf8).is_err());
        assert_eq!(decode_text(&[0x00, 0x41], Charset::Utf16Be).unwrap(), "A");
        assert!(decode_text(&[0x41], Charset::Utf16Le).is_err());
    }

    #[test]
    fn test_encode_text() {
        let mut buf = BytesMut::new();
        encode_text("ON\r\n", Charset::Ascii, &mut buf).unwrap();
        assert_eq!(&buf[..], b"ON\r\n");

        let mut buf = BytesMut::new();
        assert!(encode_text("café", Charset::Ascii, &mut buf).is_err());
        encode_text("café", Charset::Latin1, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x63, 0x61, 0x66, 0xe9]);

        let mut buf = BytesMut::new();
        encode_text("A", Charset::Utf16Le, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x41, 0x00]);
    }

    #[test]
    fn test_codec_frame_and_text() {
        let mut codec = DatagramCodec::new(Charset::Ascii);

        let frame = codec
            .to_datagram(OutgoingPayload::Frame(FrameSpec::new(1, 2, 0x0031, [21, 100, 0, 0])))
            .unwrap();
        assert_eq!(frame.len(), FRAME_LEN);

        let text = codec.to_datagram(OutgoingPayload::Text("123".into())).unwrap();
        assert_eq!(&text[..], b"123");
    }

    #[test]
    fn test_codec_decode_consumes_datagram() {
        let mut codec = DatagramCodec::for_charset("ASCII").unwrap();
        let mut buf = BytesMut::from(&b"ON"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("ON".to_string()));
        assert!(buf.is_empty());
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }
}
