//! Typed values and their on-wire representation.
//!
//! Scalars pack to fixed big-endian payloads (or raw bytes); `List` and
//! `Map` use MessagePack as the outer framing. Every element inside a
//! container — array item, map key, map value — is first rendered as
//!
//! ```text
//! type_tag (1B) | scalar_bytes
//! ```
//!
//! and embedded in the envelope as an opaque MessagePack bin string. On
//! decode the envelope is walked first, then each bin is split into its
//! leading tag byte and payload. The two-level scheme is what lets
//! heterogeneous containers round-trip.

use ripemd::{Digest, Ripemd160};

use crate::error::AspikeError;

/// Size of a record digest in bytes (RIPEMD-160 output).
pub const DIGEST_SIZE: usize = 20;

/// Stable on-wire type tags.
///
/// Tags 7–12 are blobs owned by other client languages and `Ldt`/`GeoJson`
/// have no payload codec here; they are recognized so the tag byte space
/// stays stable, but decoding them fails with
/// [`AspikeError::UnknownValueType`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undef = 0,
    Integer = 1,
    Double = 2,
    String = 3,
    Blob = 4,
    Java = 7,
    CSharp = 8,
    Python = 9,
    Ruby = 10,
    Php = 11,
    Erlang = 12,
    Map = 19,
    List = 20,
    Ldt = 21,
    GeoJson = 23,
}

impl TryFrom<u8> for ValueType {
    type Error = AspikeError;

    fn try_from(tag: u8) -> Result<Self, AspikeError> {
        Ok(match tag {
            0 => ValueType::Undef,
            1 => ValueType::Integer,
            2 => ValueType::Double,
            3 => ValueType::String,
            4 => ValueType::Blob,
            7 => ValueType::Java,
            8 => ValueType::CSharp,
            9 => ValueType::Python,
            10 => ValueType::Ruby,
            11 => ValueType::Php,
            12 => ValueType::Erlang,
            19 => ValueType::Map,
            20 => ValueType::List,
            21 => ValueType::Ldt,
            23 => ValueType::GeoJson,
            other => return Err(AspikeError::UnknownValueType(other)),
        })
    }
}

/// A typed value as stored in a bin or used as a record key.
///
/// `Integer` holds the wire slot as an opaque unsigned 64-bit quantity;
/// signed callers go through `From<i64>`, which reinterprets the
/// two's-complement bits (so `-1` packs as `u64::MAX`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Integer(u64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// The wire tag for this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Undef,
            Value::Integer(_) => ValueType::Integer,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Blob(_) => ValueType::Blob,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
        }
    }

    /// Whether [`Value::digest`] is valid for this value.
    ///
    /// Only scalar values can address a record; containers and `Nil`
    /// have no digest.
    pub fn is_digestible(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::Double(_) | Value::String(_) | Value::Blob(_)
        )
    }

    // ── Packing ──────────────────────────────────────────────────

    /// Serialize the value payload (without its tag byte).
    pub fn pack(&self) -> Result<Vec<u8>, AspikeError> {
        match self {
            Value::Nil => Ok(Vec::new()),
            Value::Integer(v) => Ok(v.to_be_bytes().to_vec()),
            Value::Double(v) => Ok(v.to_be_bytes().to_vec()),
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            Value::Blob(b) => Ok(b.clone()),
            Value::List(items) => {
                let mut buf = Vec::new();
                rmp::encode::write_array_len(&mut buf, items.len() as u32)
                    .map_err(encode_error)?;
                for item in items {
                    rmp::encode::write_bin(&mut buf, &item.pack_tagged()?)
                        .map_err(encode_error)?;
                }
                Ok(buf)
            }
            Value::Map(pairs) => {
                let mut buf = Vec::new();
                rmp::encode::write_map_len(&mut buf, pairs.len() as u32)
                    .map_err(encode_error)?;
                for (key, value) in pairs {
                    rmp::encode::write_bin(&mut buf, &key.pack_tagged()?)
                        .map_err(encode_error)?;
                    rmp::encode::write_bin(&mut buf, &value.pack_tagged()?)
                        .map_err(encode_error)?;
                }
                Ok(buf)
            }
        }
    }

    /// Serialize as `tag byte || payload` — the container-element form.
    pub fn pack_tagged(&self) -> Result<Vec<u8>, AspikeError> {
        let mut buf = vec![self.value_type() as u8];
        buf.extend_from_slice(&self.pack()?);
        Ok(buf)
    }

    /// Packed payload size in bytes.
    ///
    /// Scalars answer without serializing; containers pack to measure.
    pub fn packed_len(&self) -> Result<usize, AspikeError> {
        match self {
            Value::Nil => Ok(0),
            Value::Integer(_) | Value::Double(_) => Ok(8),
            Value::String(s) => Ok(s.len()),
            Value::Blob(b) => Ok(b.len()),
            Value::List(_) | Value::Map(_) => Ok(self.pack()?.len()),
        }
    }

    // ── Parsing ──────────────────────────────────────────────────

    /// Deserialize a payload of the given wire type.
    pub fn parse(value_type: ValueType, data: &[u8]) -> Result<Value, AspikeError> {
        match value_type {
            ValueType::Undef => Ok(Value::Nil),
            ValueType::Integer => {
                if data.len() != 8 {
                    return Err(AspikeError::Truncated);
                }
                let raw: [u8; 8] = data.try_into().map_err(|_| AspikeError::Truncated)?;
                Ok(Value::Integer(u64::from_be_bytes(raw)))
            }
            ValueType::Double => {
                if data.len() != 8 {
                    return Err(AspikeError::Truncated);
                }
                let raw: [u8; 8] = data.try_into().map_err(|_| AspikeError::Truncated)?;
                Ok(Value::Double(f64::from_be_bytes(raw)))
            }
            ValueType::String => Ok(Value::String(String::from_utf8(data.to_vec())?)),
            ValueType::Blob => Ok(Value::Blob(data.to_vec())),
            ValueType::List => {
                let mut rd: &[u8] = data;
                let len = rmp::decode::read_array_len(&mut rd).map_err(decode_error)?;
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(read_element(&mut rd)?);
                }
                Ok(Value::List(items))
            }
            ValueType::Map => {
                let mut rd: &[u8] = data;
                let len = rmp::decode::read_map_len(&mut rd).map_err(decode_error)?;
                let mut pairs = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    let key = read_element(&mut rd)?;
                    let value = read_element(&mut rd)?;
                    pairs.push((key, value));
                }
                Ok(Value::Map(pairs))
            }
            other => Err(AspikeError::UnknownValueType(other as u8)),
        }
    }

    /// Deserialize a container element of the form `tag byte || payload`.
    pub fn parse_tagged(data: &[u8]) -> Result<Value, AspikeError> {
        let (&tag, payload) = data.split_first().ok_or(AspikeError::Truncated)?;
        Value::parse(ValueType::try_from(tag)?, payload)
    }

    // ── Digest ───────────────────────────────────────────────────

    /// The record content address:
    /// `RIPEMD160(set_name_utf8 || tag byte || packed payload)`.
    ///
    /// Only scalar values are digestible; the server locates records by
    /// this digest and never sees the raw key.
    pub fn digest(&self, set_name: &str) -> Result<[u8; DIGEST_SIZE], AspikeError> {
        if !self.is_digestible() {
            return Err(AspikeError::DigestNotSupported(self.value_type()));
        }
        let mut ripe = Ripemd160::new();
        ripe.update(set_name.as_bytes());
        ripe.update([self.value_type() as u8]);
        ripe.update(self.pack()?);
        Ok(ripe.finalize().into())
    }
}

/// Advance past one bin-string element and decode its tagged contents.
fn read_element(rd: &mut &[u8]) -> Result<Value, AspikeError> {
    let len = rmp::decode::read_bin_len(rd).map_err(decode_error)? as usize;
    if rd.len() < len {
        return Err(AspikeError::Truncated);
    }
    let (element, rest) = rd.split_at(len);
    *rd = rest;
    Value::parse_tagged(element)
}

fn encode_error<E: std::fmt::Display>(err: E) -> AspikeError {
    AspikeError::Encoding(err.to_string())
}

fn decode_error<E: std::fmt::Display>(err: E) -> AspikeError {
    AspikeError::Encoding(err.to_string())
}

// ── Native conversions ───────────────────────────────────────────

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(v: Vec<(Value, Value)>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Nil,
        }
    }
}
