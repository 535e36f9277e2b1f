//! Complete frame — the 8-byte envelope header plus one message body.
//!
//! The body kind is carried in the header; parse dispatches on it.
//! The envelope does not cross-check the body's internal counts — a
//! disagreement surfaces in the body parser.

use crate::admin::AdminMessage;
use crate::error::AspikeError;
use crate::header::{FrameHeader, HEADER_SIZE, MessageKind};
use crate::message::Message;

/// A frame body: an operation message or an admin message.
///
/// `Info` and `Compressed` frames have no body codec here.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Message(Message),
    Admin(AdminMessage),
}

impl Body {
    /// The kind tag this body is framed under.
    pub fn kind(&self) -> MessageKind {
        match self {
            Body::Message(_) => MessageKind::Message,
            Body::Admin(_) => MessageKind::Admin,
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>, AspikeError> {
        match self {
            Body::Message(message) => message.pack(),
            Body::Admin(admin) => Ok(admin.pack()),
        }
    }
}

/// A fully assembled frame ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    body: Body,
}

impl Frame {
    pub fn message(message: Message) -> Self {
        Self {
            body: Body::Message(message),
        }
    }

    pub fn admin(admin: AdminMessage) -> Self {
        Self {
            body: Body::Admin(admin),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    // ── Serialization ────────────────────────────────────────────

    /// Serialize the full frame (header + body).
    pub fn to_bytes(&self) -> Result<Vec<u8>, AspikeError> {
        let body = self.body.pack()?;
        let header = FrameHeader::new(self.kind(), body.len() as u64);
        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
        buf.extend_from_slice(&header.to_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize a frame from raw bytes (header + body, no trailing
    /// data).
    pub fn from_bytes(bytes: &[u8]) -> Result<Frame, AspikeError> {
        let header = FrameHeader::from_bytes(bytes)?;
        let total = HEADER_SIZE + header.length() as usize;
        if bytes.len() < total {
            return Err(AspikeError::Truncated);
        }
        if bytes.len() > total {
            return Err(AspikeError::Encoding(format!(
                "{} trailing bytes after frame body",
                bytes.len() - total
            )));
        }
        let body_bytes = &bytes[HEADER_SIZE..total];
        let body = match header.kind() {
            MessageKind::Message => Body::Message(Message::parse(body_bytes)?),
            MessageKind::Admin => Body::Admin(AdminMessage::parse(body_bytes)?),
            kind => return Err(AspikeError::UnsupportedMessageKind(kind)),
        };
        Ok(Frame { body })
    }
}
