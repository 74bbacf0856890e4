//! Error types for BlueZ D-Bus operations.

use bt_audio_core::SinkError;
use thiserror::Error;

/// BlueZ backend error types.
#[derive(Error, Debug)]
pub enum BluezError {
    /// Could not reach the system bus.
    #[error("D-Bus connection failed: {0}")]
    Connection(String),

    /// A method call on a BlueZ object failed.
    #[error("{member} failed: {message}")]
    Call { member: String, message: String },

    /// A path is not a valid D-Bus object path.
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// A property had an unexpected type.
    #[error("Unsupported value for property {0}")]
    UnsupportedValue(String),
}

impl BluezError {
    /// Wrap a failed call to `member`.
    pub fn call(member: &str, err: dbus::Error) -> Self {
        Self::Call {
            member: member.to_string(),
            message: err.message().unwrap_or("no error message").to_string(),
        }
    }
}

impl From<BluezError> for SinkError {
    fn from(err: BluezError) -> Self {
        SinkError::Bus(err.to_string())
    }
}

/// Convenience Result type for BlueZ operations.
pub type Result<T> = std::result::Result<T, BluezError>;
