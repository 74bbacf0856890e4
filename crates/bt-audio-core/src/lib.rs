//! # bt-audio-core
//!
//! Object tree and playback logic for a Bluetooth A2DP sink.
//!
//! This crate provides:
//! - Guarded parsing of BlueZ object paths
//! - A typed model of bus objects, capabilities and property changes
//! - The adapter / device / transport tree and its event routing
//! - A per-transport pipeline state machine
//! - The media endpoint and pairing agent responders
//!
//! It performs no I/O of its own. The Bluetooth stack and the media framework
//! are reached through the collaborator traits in [`traits`].

pub mod adapter;
pub mod agent;
pub mod codec;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod path;
pub mod pipeline;
pub mod registry;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

pub use adapter::AdapterNode;
pub use agent::{AgentCapability, AgentService, AgentSlot};
pub use codec::{Codec, A2DP_SINK_UUID};
pub use config::SinkSettings;
pub use device::DeviceNode;
pub use endpoint::EndpointService;
pub use error::{Result, SinkError};
pub use event::{
    BusEvent, CapabilitySet, Interface, ManagedObject, PropertySet, PropertyValue, TransportState,
};
pub use path::ObjectPath;
pub use pipeline::{
    next_generation, ElementSpec, MessageWatcher, PipelineConfig, PipelineController,
    PipelineMessage, PipelineNotice, PlaybackState, RunState,
};
pub use registry::ObjectRegistry;
pub use traits::{
    AgentManager, BusEventStream, EndpointProperties, MediaControl, PathEventSource, Pipeline,
    PipelineBuilder, RemoteProperty, Services,
};
pub use transport::TransportNode;
