//! # aspike
//!
//! Asynchronous client for the Aerospike key-value store's binary wire
//! protocol (version 2).
//!
//! This crate contains:
//! - **Values**: `Value` / `ValueType` — typed scalars, recursive
//!   MessagePack containers, and RIPEMD-160 record digests
//! - **Protocol types**: `Field`, `Bin`, `Operation`, `Message`,
//!   `AdminMessage`, `FrameHeader`, `Frame`, and the three info-flag
//!   bitsets
//! - **Codec**: `AspikeCodec` for framed TCP I/O via `tokio_util`
//! - **Client**: `AspikeClient` — connect + login, then
//!   put / get / delete / exists / operate over one serialized
//!   connection
//! - **Error**: `AspikeError` — typed, `thiserror`-based error hierarchy

pub mod admin;
pub mod client;
pub mod codec;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod message;
pub mod value;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use admin::{AdminCommand, AdminField, AdminFieldType, AdminMessage};
pub use client::{AspikeClient, DEFAULT_PORT};
pub use codec::{AspikeCodec, MAX_BODY_SIZE};
pub use error::AspikeError;
pub use flags::{Info1Flags, Info2Flags, Info3Flags};
pub use frame::{Body, Frame};
pub use header::{FrameHeader, HEADER_SIZE, MessageKind, PROTOCOL_VERSION};
pub use message::{
    Bin, DEFAULT_TRANSACTION_TTL, Field, FieldType, MESSAGE_PRELUDE_SIZE, Message, Operation,
    OperationType, result_code,
};
pub use value::{DIGEST_SIZE, Value, ValueType};
