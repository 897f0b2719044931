use thiserror::Error;

/// Errors returned by the OMCI frame builders and the attribute parser.
#[derive(Debug, Error)]
pub enum OmciError {
    #[error("unknown managed entity class {0}")]
    UnknownClass(u16),
    #[error("attribute list is empty")]
    EmptyAttributeList,
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("attribute '{name}' expects an integer, got '{value}'")]
    BadInteger { name: String, value: String },
    #[error("message contents exceed {limit} bytes ({actual})")]
    Serialize { limit: usize, actual: usize },
}

/// Errors surfaced while reading frame bytes during decode.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unsupported device identifier 0x{0:02x}")]
    DeviceId(u8),
    #[error("unknown message type 0x{0:02x}")]
    MessageType(u8),
    #[error("unknown managed entity class {0}")]
    UnknownClass(u16),
}
