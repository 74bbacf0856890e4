//! `org.bluez.MediaEndpoint1` responder.
//!
//! The sink answers `SelectConfiguration` with a fixed configuration per codec
//! and ignores the capabilities offered by the source. The remaining calls are
//! acknowledgements only.

use tracing::{debug, info};

use crate::codec::Codec;
use crate::path::ObjectPath;

/// Codec endpoint registered for the A2DP sink role.
#[derive(Debug, Clone)]
pub struct EndpointService {
    codec: Codec,
    path: ObjectPath,
}

impl EndpointService {
    pub fn new(codec: Codec, path: ObjectPath) -> Self {
        Self { codec, path }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Pick a configuration from the capabilities offered by the source.
    ///
    /// Always returns the codec's static configuration; the offer is only logged.
    pub fn select_configuration(&self, offered: &[u8]) -> Vec<u8> {
        let configuration = self.codec.configuration().to_vec();
        info!(
            "{} SelectConfiguration offered {:02x?}, replying {:02x?}",
            self.codec, offered, configuration
        );
        configuration
    }

    /// A transport was configured with this endpoint.
    pub fn set_configuration(&self, transport: &ObjectPath) {
        info!("{} SetConfiguration for {}", self.codec, transport);
    }

    /// A transport using this endpoint went away.
    pub fn clear_configuration(&self, transport: &ObjectPath) {
        info!("{} ClearConfiguration for {}", self.codec, transport);
    }

    /// The stack released the endpoint.
    pub fn release(&self) {
        debug!("{} endpoint {} released", self.codec, self.path);
    }
}
