//! OMCI analysis and injection over the OpenOLT gRPC transport.
//!
//! The crate has two halves. The observation side extracts ITU-T G.988 OMCI
//! frames from captured TCP payloads (offline files or a live interface),
//! decodes them against a managed-entity schema and keeps the results in a
//! bounded ring plus a live queue. The injection side builds OMCI request
//! frames, delivers them to an OLT's OpenOLT agent and can drive single- or
//! multi-client stress workloads across the transaction-id space.
//!
//! State is explicit: embedders create a [`CaptureContext`] and thread it
//! through; only the managed-entity schema is process-global and read-only.

pub mod capture;
pub mod config;
pub mod extract;
pub mod inject;
pub mod omci;
pub mod schema;

pub use capture::{CaptureContext, CaptureError, CaptureStats, StatsSnapshot};
pub use config::{Config, ConfigError};
pub use inject::{inject, InjectionKind, InjectionRequest, INJECTED_OK};
pub use omci::{
    AttributeValue, AttributeValues, Decoder, MessageBody, MessageRecord, MessageType, OmciError,
    ResultCode,
};
pub use schema::{registry, MeRegistry};
