//! OMCI codec: typed frame model, builders and the decoder.
//!
//! Baseline OMCI frames are 44 bytes on the wire (48 with CRC for
//! ONU-originated responses). The builder side produces the ASCII-hex form
//! consumed by the OpenOLT `OmciMsgOut` RPC; the decoder side turns frame
//! bytes back into enriched records for the capture pipeline.

pub mod attributes;
pub mod builder;
pub mod decoder;
pub mod error;
pub mod layout;
pub mod reader;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use time::OffsetDateTime;

pub use decoder::Decoder;
pub use error::{FrameError, OmciError};

/// OMCI message types, discriminated by the full message-type byte
/// (action bits AR = 0x40 / AK = 0x20 included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    CreateRequest,
    CreateResponse,
    DeleteRequest,
    DeleteResponse,
    SetRequest,
    SetResponse,
    GetRequest,
    GetResponse,
    GetAllAlarmsRequest,
    GetAllAlarmsResponse,
    GetAllAlarmsNextRequest,
    GetAllAlarmsNextResponse,
    MibUploadRequest,
    MibUploadResponse,
    MibUploadNextRequest,
    MibUploadNextResponse,
    MibResetRequest,
    MibResetResponse,
    AlarmNotification,
    AttributeValueChange,
    RebootRequest,
    RebootResponse,
    /// Message-type byte outside the supported set.
    Unknown(u8),
}

impl MessageType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        let mt = match byte {
            0x44 => Self::CreateRequest,
            0x24 => Self::CreateResponse,
            0x46 => Self::DeleteRequest,
            0x26 => Self::DeleteResponse,
            0x48 => Self::SetRequest,
            0x28 => Self::SetResponse,
            0x49 => Self::GetRequest,
            0x29 => Self::GetResponse,
            0x4B => Self::GetAllAlarmsRequest,
            0x2B => Self::GetAllAlarmsResponse,
            0x4C => Self::GetAllAlarmsNextRequest,
            0x2C => Self::GetAllAlarmsNextResponse,
            0x4D => Self::MibUploadRequest,
            0x2D => Self::MibUploadResponse,
            0x4E => Self::MibUploadNextRequest,
            0x2E => Self::MibUploadNextResponse,
            0x4F => Self::MibResetRequest,
            0x2F => Self::MibResetResponse,
            0x10 => Self::AlarmNotification,
            0x11 => Self::AttributeValueChange,
            0x59 => Self::RebootRequest,
            0x39 => Self::RebootResponse,
            _ => return None,
        };
        Some(mt)
    }

    pub fn byte(self) -> u8 {
        match self {
            Self::CreateRequest => 0x44,
            Self::CreateResponse => 0x24,
            Self::DeleteRequest => 0x46,
            Self::DeleteResponse => 0x26,
            Self::SetRequest => 0x48,
            Self::SetResponse => 0x28,
            Self::GetRequest => 0x49,
            Self::GetResponse => 0x29,
            Self::GetAllAlarmsRequest => 0x4B,
            Self::GetAllAlarmsResponse => 0x2B,
            Self::GetAllAlarmsNextRequest => 0x4C,
            Self::GetAllAlarmsNextResponse => 0x2C,
            Self::MibUploadRequest => 0x4D,
            Self::MibUploadResponse => 0x2D,
            Self::MibUploadNextRequest => 0x4E,
            Self::MibUploadNextResponse => 0x2E,
            Self::MibResetRequest => 0x4F,
            Self::MibResetResponse => 0x2F,
            Self::AlarmNotification => 0x10,
            Self::AttributeValueChange => 0x11,
            Self::RebootRequest => 0x59,
            Self::RebootResponse => 0x39,
            Self::Unknown(byte) => byte,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateRequest => f.write_str("CreateRequest"),
            Self::CreateResponse => f.write_str("CreateResponse"),
            Self::DeleteRequest => f.write_str("DeleteRequest"),
            Self::DeleteResponse => f.write_str("DeleteResponse"),
            Self::SetRequest => f.write_str("SetRequest"),
            Self::SetResponse => f.write_str("SetResponse"),
            Self::GetRequest => f.write_str("GetRequest"),
            Self::GetResponse => f.write_str("GetResponse"),
            Self::GetAllAlarmsRequest => f.write_str("GetAllAlarmsRequest"),
            Self::GetAllAlarmsResponse => f.write_str("GetAllAlarmsResponse"),
            Self::GetAllAlarmsNextRequest => f.write_str("GetAllAlarmsNextRequest"),
            Self::GetAllAlarmsNextResponse => f.write_str("GetAllAlarmsNextResponse"),
            Self::MibUploadRequest => f.write_str("MibUploadRequest"),
            Self::MibUploadResponse => f.write_str("MibUploadResponse"),
            Self::MibUploadNextRequest => f.write_str("MibUploadNextRequest"),
            Self::MibUploadNextResponse => f.write_str("MibUploadNextResponse"),
            Self::MibResetRequest => f.write_str("MibResetRequest"),
            Self::MibResetResponse => f.write_str("MibResetResponse"),
            Self::AlarmNotification => f.write_str("AlarmNotification"),
            Self::AttributeValueChange => f.write_str("AttributeValueChange"),
            Self::RebootRequest => f.write_str("RebootRequest"),
            Self::RebootResponse => f.write_str("RebootResponse"),
            Self::Unknown(byte) => write!(f, "UnknownMessageType(0x{byte:02x})"),
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome code carried by every `*Response` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    ProcessingError,
    NotSupported,
    ParameterError,
    UnknownEntity,
    UnknownInstance,
    DeviceBusy,
    InstanceExists,
    AttributeFailure,
    Unknown(u8),
}

impl ResultCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Success,
            1 => Self::ProcessingError,
            2 => Self::NotSupported,
            3 => Self::ParameterError,
            4 => Self::UnknownEntity,
            5 => Self::UnknownInstance,
            6 => Self::DeviceBusy,
            7 => Self::InstanceExists,
            9 => Self::AttributeFailure,
            other => Self::Unknown(other),
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::ProcessingError => 1,
            Self::NotSupported => 2,
            Self::ParameterError => 3,
            Self::UnknownEntity => 4,
            Self::UnknownInstance => 5,
            Self::DeviceBusy => 6,
            Self::InstanceExists => 7,
            Self::AttributeFailure => 9,
            Self::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::ProcessingError => f.write_str("ProcessingError"),
            Self::NotSupported => f.write_str("NotSupported"),
            Self::ParameterError => f.write_str("ParameterError"),
            Self::UnknownEntity => f.write_str("UnknownEntity"),
            Self::UnknownInstance => f.write_str("UnknownInstance"),
            Self::DeviceBusy => f.write_str("DeviceBusy"),
            Self::InstanceExists => f.write_str("InstanceExists"),
            Self::AttributeFailure => f.write_str("AttributeFailure"),
            Self::Unknown(code) => write!(f, "UnknownResult({code})"),
        }
    }
}

impl Serialize for ResultCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A decoded attribute value. The representation follows the schema kind:
/// strings stay text, binary kinds stay raw bytes, everything else is an
/// unsigned integer.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Integer(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(value) => serializer.serialize_u64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Bytes(value) => serializer.serialize_str(&hex::encode(value)),
        }
    }
}

/// Ordered attribute-name/value map. Insertion order is preserved; wire
/// order is re-derived from the schema's attribute index when serialising
/// frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeValues(Vec<(String, AttributeValue)>);

impl AttributeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.0.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find(|(entry, _)| entry.as_str() == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for AttributeValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Managed entity embedded in a MIB upload exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedMe {
    pub class_id: u16,
    pub instance_id: u16,
    pub attribute_mask: u16,
    pub attributes: AttributeValues,
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Per-message-type frame contents. One tagged variant per type; the
/// capability accessors below replace field lookup by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MessageBody {
    CreateRequest {
        attributes: AttributeValues,
    },
    CreateResponse {
        result: ResultCode,
    },
    DeleteRequest,
    DeleteResponse {
        result: ResultCode,
    },
    SetRequest {
        attribute_mask: u16,
        attributes: AttributeValues,
    },
    SetResponse {
        result: ResultCode,
    },
    GetRequest {
        attribute_mask: u16,
    },
    GetResponse {
        result: ResultCode,
        attribute_mask: u16,
        attributes: AttributeValues,
    },
    GetAllAlarmsRequest {
        alarm_retrieval_mode: u8,
    },
    GetAllAlarmsResponse {
        command_count: u16,
    },
    GetAllAlarmsNextRequest {
        command_sequence_number: u16,
    },
    GetAllAlarmsNextResponse {
        alarm_entity_class: u16,
        alarm_entity_instance: u16,
        #[serde(serialize_with = "hex_bytes")]
        alarm_bitmap: [u8; layout::ALARM_BITMAP_LEN],
    },
    MibUploadRequest,
    MibUploadResponse {
        command_count: u16,
    },
    MibUploadNextRequest {
        command_sequence_number: u16,
    },
    MibUploadNextResponse {
        reported_me: ReportedMe,
    },
    MibResetRequest,
    MibResetResponse {
        result: ResultCode,
    },
    AlarmNotification {
        #[serde(serialize_with = "hex_bytes")]
        alarm_bitmap: [u8; layout::ALARM_BITMAP_LEN],
        alarm_sequence_number: u8,
    },
    AttributeValueChange {
        attribute_mask: u16,
        attributes: AttributeValues,
    },
    RebootRequest {
        reboot_condition: u8,
    },
    RebootResponse {
        result: ResultCode,
    },
    /// Contents that could not be decoded; kept raw.
    Unknown {
        #[serde(serialize_with = "hex_bytes")]
        contents: Vec<u8>,
    },
}

impl MessageBody {
    /// Result field, present on every `*Response` variant.
    pub fn result(&self) -> Option<ResultCode> {
        match self {
            Self::CreateResponse { result }
            | Self::DeleteResponse { result }
            | Self::SetResponse { result }
            | Self::GetResponse { result, .. }
            | Self::MibResetResponse { result }
            | Self::RebootResponse { result } => Some(*result),
            _ => None,
        }
    }

    /// Embedded managed entity, present on MIB upload responses.
    pub fn reported_me(&self) -> Option<&ReportedMe> {
        match self {
            Self::MibUploadNextResponse { reported_me } => Some(reported_me),
            _ => None,
        }
    }

    /// Alarm bitmap plus the class it is scoped to, when that class differs
    /// from the frame's own entity class.
    pub fn alarm_bitmap(&self) -> Option<(&[u8; layout::ALARM_BITMAP_LEN], Option<u16>)> {
        match self {
            Self::AlarmNotification { alarm_bitmap, .. } => Some((alarm_bitmap, None)),
            Self::GetAllAlarmsNextResponse {
                alarm_bitmap,
                alarm_entity_class,
                ..
            } => Some((alarm_bitmap, Some(*alarm_entity_class))),
            _ => None,
        }
    }
}

/// Fully decoded and enriched OMCI message, as delivered to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub message_number: u64,
    pub message_type: MessageType,
    pub transaction_id: u16,
    pub interface_id: String,
    pub onu_id: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    pub source: String,
    pub destination: String,
    pub entity_class: String,
    pub instance_id: u16,
    pub message_layer: MessageBody,
    pub message_data: serde_json::Map<String, serde_json::Value>,
}
