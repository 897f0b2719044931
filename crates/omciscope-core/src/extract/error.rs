use thiserror::Error;

/// Errors produced while slicing captured packets down to TCP payloads.
#[derive(Debug, Error)]
pub enum TcpError {
    #[error("packet slicing failed: {0}")]
    Slice(String),
    #[error("missing network layer")]
    MissingNetworkLayer,
}
