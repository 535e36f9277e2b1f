//! Frame header — 8 bytes, big-endian.
//!
//! ```text
//! Offset  Size   Field
//! ──────  ─────  ──────────────
//!   0       1    version   constant 2
//!   1       1    kind      Info | Admin | Message | Compressed
//!   2       6    length    48-bit payload byte count
//! ──────  ─────  ──────────────
//! Total:   8 bytes
//! ```
//!
//! The length counts bytes after the header only.

use crate::error::AspikeError;

/// Fixed size of the on-wire header.
pub const HEADER_SIZE: usize = 8;

/// Type alias for the exact byte array that can hold one header.
pub type HeaderBytes = [u8; HEADER_SIZE];

/// Protocol version this client speaks.
pub const PROTOCOL_VERSION: u8 = 2;

/// Frame kind tag. The client produces and consumes `Admin` and
/// `Message`; `Info` and `Compressed` are reserved.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info = 1,
    Admin = 2,
    Message = 3,
    Compressed = 4,
}

impl TryFrom<u8> for MessageKind {
    type Error = AspikeError;

    fn try_from(tag: u8) -> Result<Self, AspikeError> {
        Ok(match tag {
            1 => MessageKind::Info,
            2 => MessageKind::Admin,
            3 => MessageKind::Message,
            4 => MessageKind::Compressed,
            other => return Err(AspikeError::UnknownMessageKind(other)),
        })
    }
}

/// The 8-byte frame envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    kind: MessageKind,
    length: u64,
}

impl FrameHeader {
    /// Create a header for a body of `length` bytes. Lengths are
    /// truncated to 48 bits on the wire.
    pub fn new(kind: MessageKind, length: u64) -> Self {
        Self { kind, length }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Declared body length in bytes (excludes the header itself).
    pub fn length(&self) -> u64 {
        self.length
    }

    // ── Serialization ────────────────────────────────────────────

    /// Serialize to exactly [`HEADER_SIZE`] bytes.
    pub fn to_bytes(&self) -> HeaderBytes {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = PROTOCOL_VERSION;
        buf[1] = self.kind as u8;
        buf[2..8].copy_from_slice(&self.length.to_be_bytes()[2..8]);
        buf
    }

    /// Deserialize from at least [`HEADER_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AspikeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(AspikeError::Truncated);
        }
        if bytes[0] != PROTOCOL_VERSION {
            return Err(AspikeError::UnsupportedProtocolVersion(bytes[0]));
        }
        let kind = MessageKind::try_from(bytes[1])?;
        let mut raw = [0u8; 8];
        raw[2..8].copy_from_slice(&bytes[2..8]);
        Ok(Self {
            kind,
            length: u64::from_be_bytes(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_8() {
        assert_eq!(HEADER_SIZE, 8);
    }

    #[test]
    fn roundtrip() {
        let header = FrameHeader::new(MessageKind::Message, 1234);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.kind(), MessageKind::Message);
        assert_eq!(parsed.length(), 1234);
    }

    #[test]
    fn length_is_48_bit_big_endian() {
        let header = FrameHeader::new(MessageKind::Admin, 0x0102_0304_0506);
        let bytes = header.to_bytes();
        assert_eq!(bytes, [2, 2, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(FrameHeader::from_bytes(&bytes).unwrap().length(), 0x0102_0304_0506);
    }

    #[test]
    fn wrong_version_rejected() {
        let bytes = [3u8, 3, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(AspikeError::UnsupportedProtocolVersion(3))
        ));
    }

    #[test]
    fn unknown_kind_rejected() {
        let bytes = [2u8, 9, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(AspikeError::UnknownMessageKind(9))
        ));
    }

    #[test]
    fn too_short_rejected() {
        assert!(matches!(
            FrameHeader::from_bytes(&[2, 3, 0]),
            Err(AspikeError::Truncated)
        ));
    }
}
