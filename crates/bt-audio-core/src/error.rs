//! Error types for the A2DP sink core.

use thiserror::Error;

use crate::codec::Codec;

/// Primary error type for sink operations.
#[derive(Error, Debug)]
pub enum SinkError {
    /// A call to the Bluetooth stack failed.
    #[error("BlueZ error: {0}")]
    Bus(String),

    /// Pipeline construction or state change failed.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// An endpoint for this codec is already registered on the adapter.
    #[error("{0} endpoint already registered")]
    EndpointAlreadyRegistered(Codec),

    /// The pairing agent is already registered from this adapter.
    #[error("Pairing agent already registered")]
    AgentAlreadyRegistered,

    /// Adapter is not tracked by the registry.
    #[error("Bluetooth adapter not found: {0}")]
    AdapterNotFound(String),

    /// Service authorization was refused by the agent.
    #[error("Service rejected: {0}")]
    ServiceRejected(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
