//! Collaborator traits for the Bluetooth stack and the media framework.
//!
//! Production implementations live in `bt-audio-bluez` and `bt-audio-pipeline`;
//! tests use the recording fakes in `crate::testing` or mockall mocks.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::agent::{AgentCapability, AgentService, AgentSlot};
use crate::codec::{Codec, A2DP_SINK_UUID};
use crate::config::SinkSettings;
use crate::endpoint::EndpointService;
use crate::error::Result;
use crate::event::{BusEvent, Interface, ManagedObject, PropertyValue};
use crate::path::ObjectPath;
use crate::pipeline::{ElementSpec, MessageWatcher, PipelineNotice, RunState};

/// Stream of bus notifications in arrival order.
pub type BusEventStream = BoxStream<'static, BusEvent>;

/// Source of the object snapshot and of add/remove/change notifications.
#[async_trait]
pub trait PathEventSource: Send + Sync {
    /// Every object currently managed by the stack.
    async fn snapshot(&self) -> Result<Vec<ManagedObject>>;

    /// Subscribe to object and property notifications.
    async fn subscribe(&self) -> Result<BusEventStream>;
}

/// Property reads and writes on remote objects.
#[async_trait]
pub trait RemoteProperty: Send + Sync {
    async fn get(&self, object: &ObjectPath, interface: Interface, name: &str)
        -> Result<PropertyValue>;

    async fn set(
        &self,
        object: &ObjectPath,
        interface: Interface,
        name: &str,
        value: PropertyValue,
    ) -> Result<()>;
}

/// Properties passed to `Media1.RegisterEndpoint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointProperties {
    pub uuid: String,
    pub codec: Codec,
    pub delay_reporting: bool,
    pub capabilities: Vec<u8>,
}

impl EndpointProperties {
    /// Sink endpoint properties for `codec` with its fixed capability record.
    pub fn sink(codec: Codec) -> Self {
        Self {
            uuid: A2DP_SINK_UUID.to_string(),
            codec,
            delay_reporting: true,
            capabilities: codec.capabilities().to_vec(),
        }
    }
}

/// Media endpoint registration on an adapter.
#[async_trait]
pub trait MediaControl: Send + Sync {
    /// Export `responder` at `endpoint` and register it with the adapter's
    /// media interface.
    async fn register_endpoint(
        &self,
        adapter: &ObjectPath,
        endpoint: &ObjectPath,
        properties: EndpointProperties,
        responder: Arc<EndpointService>,
    ) -> Result<()>;
}

/// Process-wide pairing agent manager.
#[async_trait]
pub trait AgentManager: Send + Sync {
    /// Export `responder` at `agent` and register it with the stack.
    async fn register_agent(
        &self,
        agent: &ObjectPath,
        capability: AgentCapability,
        responder: Arc<AgentService>,
    ) -> Result<()>;

    /// Make `agent` the default agent for the whole stack.
    async fn request_default_agent(&self, agent: &ObjectPath) -> Result<()>;
}

/// Factory for decode pipelines.
#[cfg_attr(test, mockall::automock)]
pub trait PipelineBuilder: Send + Sync {
    /// Create an empty, named pipeline whose asynchronous messages are
    /// forwarded to `watcher`.
    fn create(&self, name: &str, watcher: MessageWatcher) -> Result<Box<dyn Pipeline>>;
}

/// A processing graph under construction or running.
#[cfg_attr(test, mockall::automock)]
pub trait Pipeline: Send {
    /// Add a named element with its properties.
    fn add_element(&mut self, element: &ElementSpec) -> Result<()>;

    /// Link two previously added elements.
    fn link(&mut self, src: &str, dst: &str) -> Result<()>;

    /// Change the run state of the whole graph.
    fn set_state(&mut self, state: RunState) -> Result<()>;
}

/// Handles to every collaborator, shared down the object tree.
#[derive(Clone)]
pub struct Services {
    pub source: Arc<dyn PathEventSource>,
    pub properties: Arc<dyn RemoteProperty>,
    pub media: Arc<dyn MediaControl>,
    pub agents: Arc<dyn AgentManager>,
    pub pipelines: Arc<dyn PipelineBuilder>,
    pub notices: tokio::sync::mpsc::UnboundedSender<PipelineNotice>,
    /// Pairing agent shared by every adapter.
    pub agent: AgentSlot,
    pub settings: Arc<SinkSettings>,
}
