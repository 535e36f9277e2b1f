//! Wire codec — Decoder / Encoder for `tokio_util::codec::Framed`.
//!
//! Framing is done by first reading the fixed 8-byte header, extracting
//! the 48-bit body length, then waiting for the full body before
//! yielding a decoded [`Frame`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AspikeError;
use crate::frame::Frame;
use crate::header::{FrameHeader, HEADER_SIZE};

/// Maximum accepted body size (128 MiB, the proto-level cap).
pub const MAX_BODY_SIZE: usize = 128 * 1024 * 1024;

/// Stateless codec for protocol frames.
pub struct AspikeCodec;

impl Decoder for AspikeCodec {
    type Item = Frame;
    type Error = AspikeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need at least a full header to proceed.
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header to learn the body length.
        let header = FrameHeader::from_bytes(&src[..HEADER_SIZE])?;
        let body_len = header.length() as usize;

        if body_len > MAX_BODY_SIZE {
            return Err(AspikeError::FrameTooLarge {
                size: body_len,
                max: MAX_BODY_SIZE,
            });
        }

        let total = HEADER_SIZE + body_len;
        if src.len() < total {
            // Reserve capacity to avoid repeated allocations.
            src.reserve(total - src.len());
            return Ok(None);
        }

        // We have a complete frame — split it off.
        let frame = src.split_to(total);
        Frame::from_bytes(&frame).map(Some)
    }
}

impl Encoder<Frame> for AspikeCodec {
    type Error = AspikeError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = item.to_bytes()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminMessage;
    use crate::message::Message;
    use crate::value::Value;

    #[test]
    fn decode_requires_full_header() {
        let mut codec = AspikeCodec;
        let mut buf = BytesMut::from(&[2u8, 3, 0][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_waits_for_full_body() {
        let mut codec = AspikeCodec;
        let frame = Frame::message(Message::get("test", "s1", &Value::from("k1")).unwrap());
        let bytes = frame.to_bytes().unwrap();

        let mut buf = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrip_through_codec() {
        let mut codec = AspikeCodec;
        let frame = Frame::admin(AdminMessage::login("admin", "admin").unwrap());

        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn two_frames_decode_in_sequence() {
        let mut codec = AspikeCodec;
        let first = Frame::message(Message::get("test", "s1", &Value::from("a")).unwrap());
        let second = Frame::message(Message::get("test", "s1", &Value::from("b")).unwrap());

        let mut buf = BytesMut::new();
        codec.encode(first.clone(), &mut buf).unwrap();
        codec.encode(second.clone(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), first);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), second);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_body_rejected() {
        let mut codec = AspikeCodec;
        let header = FrameHeader::new(crate::header::MessageKind::Message, (MAX_BODY_SIZE + 1) as u64);
        let mut buf = BytesMut::from(&header.to_bytes()[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(AspikeError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn bad_version_fails_fast() {
        let mut codec = AspikeCodec;
        let mut buf = BytesMut::from(&[9u8, 3, 0, 0, 0, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(AspikeError::UnsupportedProtocolVersion(9))
        ));
    }
}
