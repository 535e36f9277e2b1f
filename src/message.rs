//! Operation message body — typed fields, per-bin operations, and the
//! request builders that assemble complete messages.
//!
//! ```text
//! Message:  size=22 (1B) | info1 (1B) | info2 (1B) | info3 (1B)
//!         | reserved (1B) | result_code (1B) | generation (4B)
//!         | record_ttl (4B) | transaction_ttl (4B)
//!         | fields_count (2B) | operations_count (2B)
//!         | fields... | operations...
//! Field:    length (4B) | field_type (1B) | payload (length-1 B)
//! Op:       length (4B) | op_type (1B) | bin (length-1 B)
//! Bin:      value_type (1B) | version (1B) | name_len (1B) | name | value
//! ```
//!
//! All multi-byte integers are big-endian. Field and operation length
//! prefixes count their type byte (`length = 1 + len(rest)`).

use crate::error::AspikeError;
use crate::flags::{Info1Flags, Info2Flags, Info3Flags};
use crate::value::{DIGEST_SIZE, Value, ValueType};

/// Fixed size of the message prelude, and the value of its size byte.
pub const MESSAGE_PRELUDE_SIZE: usize = 22;

/// Maximum bin name length in bytes (server limit).
pub const BIN_NAME_MAX: usize = 14;

/// Transaction TTL sent when the caller does not override it, in
/// milliseconds.
pub const DEFAULT_TRANSACTION_TTL: u32 = 1000;

/// Well-known server result codes.
pub mod result_code {
    /// The request succeeded.
    pub const OK: u8 = 0;
    /// The addressed record does not exist.
    pub const KEY_NOT_FOUND: u8 = 2;
}

// ── Fields ───────────────────────────────────────────────────────

/// Metadata field types. The client produces Namespace, SetName, and
/// Digest; the rest frame scans, queries, and UDF invocations.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Namespace = 0,
    SetName = 1,
    Key = 2,
    Digest = 4,
    TaskId = 7,
    ScanOptions = 8,
    ScanTimeout = 9,
    ScanRps = 10,
    IndexRange = 22,
    IndexFilter = 23,
    IndexLimit = 24,
    IndexOrder = 25,
    IndexType = 26,
    UdfPackageName = 30,
    UdfFunction = 31,
    UdfArglist = 32,
    UdfOp = 33,
    QueryBins = 40,
    BatchIndex = 41,
    BatchIndexWithSet = 42,
    Predexp = 43,
}

impl TryFrom<u8> for FieldType {
    type Error = AspikeError;

    fn try_from(tag: u8) -> Result<Self, AspikeError> {
        Ok(match tag {
            0 => FieldType::Namespace,
            1 => FieldType::SetName,
            2 => FieldType::Key,
            4 => FieldType::Digest,
            7 => FieldType::TaskId,
            8 => FieldType::ScanOptions,
            9 => FieldType::ScanTimeout,
            10 => FieldType::ScanRps,
            22 => FieldType::IndexRange,
            23 => FieldType::IndexFilter,
            24 => FieldType::IndexLimit,
            25 => FieldType::IndexOrder,
            26 => FieldType::IndexType,
            30 => FieldType::UdfPackageName,
            31 => FieldType::UdfFunction,
            32 => FieldType::UdfArglist,
            33 => FieldType::UdfOp,
            40 => FieldType::QueryBins,
            41 => FieldType::BatchIndex,
            42 => FieldType::BatchIndexWithSet,
            43 => FieldType::Predexp,
            other => return Err(AspikeError::UnknownFieldType(other)),
        })
    }
}

/// A typed metadata item attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub field_type: FieldType,
    pub data: Vec<u8>,
}

impl Field {
    pub fn new(field_type: FieldType, data: Vec<u8>) -> Self {
        Self { field_type, data }
    }

    pub fn namespace(namespace: &str) -> Self {
        Self::new(FieldType::Namespace, namespace.as_bytes().to_vec())
    }

    pub fn set_name(set_name: &str) -> Self {
        Self::new(FieldType::SetName, set_name.as_bytes().to_vec())
    }

    pub fn digest(digest: [u8; DIGEST_SIZE]) -> Self {
        Self::new(FieldType::Digest, digest.to_vec())
    }

    /// Total on-wire size: length prefix, type byte, payload.
    pub fn wire_len(&self) -> usize {
        4 + 1 + self.data.len()
    }

    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.data.len() as u32 + 1).to_be_bytes());
        buf.push(self.field_type as u8);
        buf.extend_from_slice(&self.data);
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.pack_into(&mut buf);
        buf
    }

    /// Parse one field from the front of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Field, usize), AspikeError> {
        if data.len() < 5 {
            return Err(AspikeError::Truncated);
        }
        let length_raw: [u8; 4] = data[0..4].try_into().map_err(|_| AspikeError::Truncated)?;
        let length = u32::from_be_bytes(length_raw) as usize;
        // The prefix counts the type byte, so it is never zero.
        if length < 1 {
            return Err(AspikeError::Truncated);
        }
        if data.len() < 4 + length {
            return Err(AspikeError::Truncated);
        }
        let field_type = FieldType::try_from(data[4])?;
        let payload = data[5..4 + length].to_vec();
        Ok((Field::new(field_type, payload), 4 + length))
    }
}

// ── Bins and operations ──────────────────────────────────────────

/// Per-bin operation types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Read = 1,
    Write = 2,
    CdtRead = 3,
    CdtModify = 4,
    Incr = 5,
    MapRead = 6,
    MapModify = 7,
    Append = 9,
    Prepend = 10,
    Touch = 11,
    BitRead = 12,
    BitModify = 13,
    Delete = 14,
}

impl TryFrom<u8> for OperationType {
    type Error = AspikeError;

    fn try_from(tag: u8) -> Result<Self, AspikeError> {
        Ok(match tag {
            1 => OperationType::Read,
            2 => OperationType::Write,
            3 => OperationType::CdtRead,
            4 => OperationType::CdtModify,
            5 => OperationType::Incr,
            6 => OperationType::MapRead,
            7 => OperationType::MapModify,
            9 => OperationType::Append,
            10 => OperationType::Prepend,
            11 => OperationType::Touch,
            12 => OperationType::BitRead,
            13 => OperationType::BitModify,
            14 => OperationType::Delete,
            other => return Err(AspikeError::UnknownOperationType(other)),
        })
    }
}

/// A named typed value within a record.
///
/// Version is 0 on writes; the server may return non-zero. A bin whose
/// value is `Nil` is legal on read requests ("read this named bin").
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub name: String,
    pub version: u8,
    pub value: Value,
}

impl Bin {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Result<Self, AspikeError> {
        let name = name.into();
        if name.len() > BIN_NAME_MAX {
            return Err(AspikeError::BinNameTooLong(name.len()));
        }
        Ok(Self {
            name,
            version: 0,
            value: value.into(),
        })
    }

    pub fn pack(&self) -> Result<Vec<u8>, AspikeError> {
        let value_bytes = self.value.pack()?;
        let mut buf = Vec::with_capacity(3 + self.name.len() + value_bytes.len());
        buf.push(self.value.value_type() as u8);
        buf.push(self.version);
        buf.push(self.name.len() as u8);
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(&value_bytes);
        Ok(buf)
    }

    /// Parse a bin occupying the whole of `data`; the value payload runs
    /// to the end of the slice.
    pub fn parse(data: &[u8]) -> Result<Bin, AspikeError> {
        if data.len() < 3 {
            return Err(AspikeError::Truncated);
        }
        let value_type = ValueType::try_from(data[0])?;
        let version = data[1];
        let name_len = data[2] as usize;
        if data.len() < 3 + name_len {
            return Err(AspikeError::Truncated);
        }
        let name = String::from_utf8(data[3..3 + name_len].to_vec())?;
        let value = Value::parse(value_type, &data[3 + name_len..])?;
        Ok(Bin {
            name,
            version,
            value,
        })
    }
}

/// A per-bin action attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operation_type: OperationType,
    pub bin: Bin,
}

impl Operation {
    pub fn new(operation_type: OperationType, bin: Bin) -> Self {
        Self {
            operation_type,
            bin,
        }
    }

    /// A read of the named bin (value slot left empty).
    pub fn read(name: impl Into<String>) -> Result<Self, AspikeError> {
        Ok(Self::new(OperationType::Read, Bin::new(name, Value::Nil)?))
    }

    /// A write of the given value to the named bin.
    pub fn write(name: impl Into<String>, value: impl Into<Value>) -> Result<Self, AspikeError> {
        Ok(Self::new(OperationType::Write, Bin::new(name, value)?))
    }

    pub fn pack_into(&self, buf: &mut Vec<u8>) -> Result<(), AspikeError> {
        let bin_bytes = self.bin.pack()?;
        buf.extend_from_slice(&(bin_bytes.len() as u32 + 1).to_be_bytes());
        buf.push(self.operation_type as u8);
        buf.extend_from_slice(&bin_bytes);
        Ok(())
    }

    pub fn pack(&self) -> Result<Vec<u8>, AspikeError> {
        let mut buf = Vec::new();
        self.pack_into(&mut buf)?;
        Ok(buf)
    }

    /// Parse one operation from the front of `data`, returning it
    /// together with the number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Operation, usize), AspikeError> {
        if data.len() < 5 {
            return Err(AspikeError::Truncated);
        }
        let length_raw: [u8; 4] = data[0..4].try_into().map_err(|_| AspikeError::Truncated)?;
        let length = u32::from_be_bytes(length_raw) as usize;
        if length < 1 {
            return Err(AspikeError::Truncated);
        }
        if data.len() < 4 + length {
            return Err(AspikeError::Truncated);
        }
        let operation_type = OperationType::try_from(data[4])?;
        let bin = Bin::parse(&data[5..4 + length])?;
        Ok((Operation::new(operation_type, bin), 4 + length))
    }
}

// ── Message ──────────────────────────────────────────────────────

/// A complete operation message body: info flags, record metadata,
/// fields, and operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub info1: Info1Flags,
    pub info2: Info2Flags,
    pub info3: Info3Flags,
    pub result_code: u8,
    pub generation: u32,
    pub record_ttl: u32,
    pub transaction_ttl: u32,
    pub fields: Vec<Field>,
    pub operations: Vec<Operation>,
}

impl Message {
    pub fn pack(&self) -> Result<Vec<u8>, AspikeError> {
        let mut buf = Vec::with_capacity(MESSAGE_PRELUDE_SIZE);
        buf.push(MESSAGE_PRELUDE_SIZE as u8);
        buf.push(self.info1.bits());
        buf.push(self.info2.bits());
        buf.push(self.info3.bits());
        buf.push(0); // reserved
        buf.push(self.result_code);
        buf.extend_from_slice(&self.generation.to_be_bytes());
        buf.extend_from_slice(&self.record_ttl.to_be_bytes());
        buf.extend_from_slice(&self.transaction_ttl.to_be_bytes());
        buf.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        buf.extend_from_slice(&(self.operations.len() as u16).to_be_bytes());
        for field in &self.fields {
            field.pack_into(&mut buf);
        }
        for operation in &self.operations {
            operation.pack_into(&mut buf)?;
        }
        Ok(buf)
    }

    pub fn parse(data: &[u8]) -> Result<Message, AspikeError> {
        if data.len() < MESSAGE_PRELUDE_SIZE {
            return Err(AspikeError::Truncated);
        }
        let info1 = Info1Flags::from_bits_retain(data[1]);
        let info2 = Info2Flags::from_bits_retain(data[2]);
        let info3 = Info3Flags::from_bits_retain(data[3]);
        let result_code = data[5];
        let generation = read_u32(&data[6..10])?;
        let record_ttl = read_u32(&data[10..14])?;
        let transaction_ttl = read_u32(&data[14..18])?;
        let fields_count = read_u16(&data[18..20])?;
        let operations_count = read_u16(&data[20..22])?;

        // Each parse advances the remaining slice by the element's total
        // on-wire length; the counts must be satisfied exactly.
        let mut data_left = &data[MESSAGE_PRELUDE_SIZE..];
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            let (field, consumed) = Field::parse(data_left)?;
            data_left = &data_left[consumed..];
            fields.push(field);
        }
        let mut operations = Vec::with_capacity(operations_count as usize);
        for _ in 0..operations_count {
            let (operation, consumed) = Operation::parse(data_left)?;
            data_left = &data_left[consumed..];
            operations.push(operation);
        }

        Ok(Message {
            info1,
            info2,
            info3,
            result_code,
            generation,
            record_ttl,
            transaction_ttl,
            fields,
            operations,
        })
    }

    // ── Request builders ─────────────────────────────────────────

    /// The standard leading fields: Namespace, SetName, Digest.
    ///
    /// The digest addresses the record; the raw key is never sent.
    fn key_fields(
        namespace: &str,
        set_name: &str,
        key: &Value,
    ) -> Result<Vec<Field>, AspikeError> {
        let digest = key.digest(set_name)?;
        Ok(vec![
            Field::namespace(namespace),
            Field::set_name(set_name),
            Field::digest(digest),
        ])
    }

    fn request(
        info1: Info1Flags,
        info2: Info2Flags,
        info3: Info3Flags,
        fields: Vec<Field>,
        operations: Vec<Operation>,
    ) -> Message {
        Message {
            info1,
            info2,
            info3,
            result_code: 0,
            generation: 0,
            record_ttl: 0,
            transaction_ttl: DEFAULT_TRANSACTION_TTL,
            fields,
            operations,
        }
    }

    /// A write of one or more bins. `ttl` of 0 keeps the server default.
    pub fn put(
        namespace: &str,
        set_name: &str,
        key: &Value,
        bins: Vec<Bin>,
        ttl: u32,
    ) -> Result<Message, AspikeError> {
        let operations = bins
            .into_iter()
            .map(|bin| Operation::new(OperationType::Write, bin))
            .collect();
        let mut message = Self::request(
            Info1Flags::empty(),
            Info2Flags::WRITE,
            Info3Flags::empty(),
            Self::key_fields(namespace, set_name, key)?,
            operations,
        );
        message.record_ttl = ttl;
        Ok(message)
    }

    /// A read of every populated bin.
    pub fn get(namespace: &str, set_name: &str, key: &Value) -> Result<Message, AspikeError> {
        Ok(Self::request(
            Info1Flags::READ | Info1Flags::GET_ALL,
            Info2Flags::empty(),
            Info3Flags::empty(),
            Self::key_fields(namespace, set_name, key)?,
            Vec::new(),
        ))
    }

    /// A record deletion.
    pub fn delete(namespace: &str, set_name: &str, key: &Value) -> Result<Message, AspikeError> {
        Ok(Self::request(
            Info1Flags::empty(),
            Info2Flags::DELETE | Info2Flags::WRITE,
            Info3Flags::empty(),
            Self::key_fields(namespace, set_name, key)?,
            Vec::new(),
        ))
    }

    /// An existence probe: reads metadata only, no bin data.
    pub fn exists(namespace: &str, set_name: &str, key: &Value) -> Result<Message, AspikeError> {
        Ok(Self::request(
            Info1Flags::READ | Info1Flags::DONT_GET_BIN_DATA,
            Info2Flags::empty(),
            Info3Flags::empty(),
            Self::key_fields(namespace, set_name, key)?,
            Vec::new(),
        ))
    }

    /// A pass-through request: caller-chosen flags and operations. The
    /// standard field triple is appended after any extra fields.
    #[allow(clippy::too_many_arguments)]
    pub fn operate(
        namespace: &str,
        set_name: &str,
        key: &Value,
        info1: Info1Flags,
        info2: Info2Flags,
        info3: Info3Flags,
        operations: Vec<Operation>,
        extra_fields: Vec<Field>,
        ttl: u32,
        generation: u32,
    ) -> Result<Message, AspikeError> {
        let mut fields = extra_fields;
        fields.extend(Self::key_fields(namespace, set_name, key)?);
        let mut message = Self::request(info1, info2, info3, fields, operations);
        message.record_ttl = ttl;
        message.generation = generation;
        Ok(message)
    }
}

fn read_u32(data: &[u8]) -> Result<u32, AspikeError> {
    let raw: [u8; 4] = data.try_into().map_err(|_| AspikeError::Truncated)?;
    Ok(u32::from_be_bytes(raw))
}

fn read_u16(data: &[u8]) -> Result<u16, AspikeError> {
    let raw: [u8; 2] = data.try_into().map_err(|_| AspikeError::Truncated)?;
    Ok(u16::from_be_bytes(raw))
}
