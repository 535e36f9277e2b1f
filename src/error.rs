//! Domain-specific error types for the Aerospike wire protocol.
//!
//! All fallible operations return `Result<T, AspikeError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

use crate::header::MessageKind;
use crate::value::ValueType;

/// The canonical error type for the client and codec layers.
#[derive(Debug, Error)]
pub enum AspikeError {
    // ── Connection Errors ────────────────────────────────────────
    /// A verb was invoked before `connect` succeeded.
    #[error("client is not connected")]
    NotConnected,

    /// An exchange was aborted mid-flight; the connection must be
    /// re-established before further requests.
    #[error("connection poisoned by an aborted exchange; reconnect required")]
    ConnectionPoisoned,

    /// The stream ended before a full response arrived.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    // ── Framing Errors ───────────────────────────────────────────
    /// The frame header carried a protocol version other than 2.
    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(u8),

    /// The frame header's kind byte is outside the enumerated set.
    #[error("unknown message kind: {0:#x}")]
    UnknownMessageKind(u8),

    /// A frame of this kind was not expected or has no body codec.
    #[error("unexpected message kind: {0:?}")]
    UnsupportedMessageKind(MessageKind),

    /// The declared body length exceeds the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Decode Errors ────────────────────────────────────────────
    /// A payload ended before its declared length was satisfied.
    #[error("truncated payload")]
    Truncated,

    /// A value type tag outside the enumerated set, or one with no
    /// decodable payload (foreign-language blobs, GeoJSON).
    #[error("unknown value type tag: {0}")]
    UnknownValueType(u8),

    /// A field type byte outside the enumerated set.
    #[error("unknown field type: {0}")]
    UnknownFieldType(u8),

    /// An operation type byte outside the enumerated set.
    #[error("unknown operation type: {0}")]
    UnknownOperationType(u8),

    /// An admin command byte outside the enumerated set.
    #[error("unknown admin command: {0}")]
    UnknownAdminCommand(u8),

    /// An admin field type byte outside the enumerated set.
    #[error("unknown admin field type: {0}")]
    UnknownAdminFieldType(u8),

    /// A string payload was not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The MessagePack envelope of a container was malformed.
    #[error("malformed payload: {0}")]
    Encoding(String),

    // ── Request Errors ───────────────────────────────────────────
    /// A digest was requested for a value type that has none.
    #[error("digest not supported for {0:?} values")]
    DigestNotSupported(ValueType),

    /// A bin name longer than the server's 14-byte limit.
    #[error("bin name too long: {0} bytes (max 14)")]
    BinNameTooLong(usize),

    /// Password hashing failed.
    #[error("credential hashing failed: {0}")]
    Credential(String),

    /// The server answered with a non-zero result code.
    #[error("server returned result code {0}")]
    ServerError(u8),
}
