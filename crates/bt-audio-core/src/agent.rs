//! `org.bluez.Agent1` responder.
//!
//! Authorizes incoming connections for the A2DP sink service and refuses
//! everything else.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::codec::is_a2dp_sink;
use crate::error::{Result, SinkError};
use crate::path::ObjectPath;

/// IO capability announced when registering the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCapability {
    /// No display, no keyboard: "just works" pairing.
    NoInputNoOutput,
}

impl AgentCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoInputNoOutput => "NoInputNoOutput",
        }
    }
}

impl fmt::Display for AgentCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pairing agent registered with the stack. There is at most one per
/// process; every adapter shares it.
#[derive(Debug, Clone, Default)]
pub struct AgentSlot(Arc<Mutex<Option<Arc<AgentService>>>>);

impl AgentSlot {
    pub fn get(&self) -> Option<Arc<AgentService>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, agent: Arc<AgentService>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(agent);
    }
}

/// Pairing agent that only lets the audio sink service through.
#[derive(Debug, Clone)]
pub struct AgentService {
    path: ObjectPath,
}

impl AgentService {
    pub fn new(path: ObjectPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Authorize `device` to use `service_uuid`.
    pub fn authorize_service(&self, device: &ObjectPath, service_uuid: &str) -> Result<()> {
        if is_a2dp_sink(service_uuid) {
            info!("Authorized A2DP sink for {}", device);
            Ok(())
        } else {
            warn!("Rejected service {} for {}", service_uuid, device);
            Err(SinkError::ServiceRejected(service_uuid.to_string()))
        }
    }

    /// The stack unregistered the agent.
    pub fn release(&self) {
        debug!("Agent {} released", self.path);
    }

    /// A pending request was cancelled by the stack.
    pub fn cancel(&self) {
        debug!("Agent {} request cancelled", self.path);
    }
}
