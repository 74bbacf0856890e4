//! Bluetooth adapter node.
//!
//! Provides adapter-level control (power, discoverable, endpoint and agent
//! registration) and routes bus events down to the adapter's devices.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::{AgentCapability, AgentService};
use crate::codec::Codec;
use crate::device::DeviceNode;
use crate::endpoint::EndpointService;
use crate::error::{Result, SinkError};
use crate::event::{CapabilitySet, Interface, ManagedObject, PropertySet, PropertyValue};
use crate::path::ObjectPath;
use crate::pipeline::PipelineNotice;
use crate::traits::{EndpointProperties, Services};

/// A local Bluetooth controller and the devices known under it.
pub struct AdapterNode {
    id: String,
    path: ObjectPath,
    powered: Option<bool>,
    discoverable: Option<bool>,
    devices: HashMap<String, DeviceNode>,
    endpoints: HashMap<Codec, Arc<EndpointService>>,
    agent: Option<Arc<AgentService>>,
    services: Services,
}

impl AdapterNode {
    /// Create the adapter and build its device/transport subtree from `objects`.
    pub fn open(
        id: impl Into<String>,
        path: ObjectPath,
        properties: &PropertySet,
        objects: &[ManagedObject],
        services: Services,
    ) -> Self {
        info!("New adapter {}", path);
        let mut adapter = Self {
            id: id.into(),
            path,
            powered: properties.powered,
            discoverable: properties.discoverable,
            devices: HashMap::new(),
            endpoints: HashMap::new(),
            agent: None,
            services,
        };

        for object in objects {
            if object.capabilities.contains(Interface::Device)
                && object.path.is_under(&adapter.path)
                && object.path.transport_id().is_none()
            {
                adapter.on_object_added(&object.path, &object.capabilities, &object.properties);
            }
        }
        for device in adapter.devices.values_mut() {
            device.adopt(objects);
        }

        adapter
    }

    /// Adapter id (e.g., "hci0").
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Last observed `Powered` value.
    pub fn powered(&self) -> Option<bool> {
        self.powered
    }

    /// Last observed `Discoverable` value.
    pub fn discoverable(&self) -> Option<bool> {
        self.discoverable
    }

    pub fn device(&self, id: &str) -> Option<&DeviceNode> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceNode> {
        self.devices.values()
    }

    /// Codecs with a registered endpoint.
    pub fn registered_codecs(&self) -> Vec<Codec> {
        let mut codecs: Vec<Codec> = self.endpoints.keys().copied().collect();
        codecs.sort();
        codecs
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    /// Power on/off the adapter. The new value is observed later through
    /// a property change.
    pub async fn set_powered(&self, powered: bool) -> Result<()> {
        self.services
            .properties
            .set(&self.path, Interface::Adapter, "Powered", PropertyValue::Bool(powered))
            .await?;

        if powered {
            info!("Turning on adapter {}", self.path);
        } else {
            info!("Turning off adapter {}", self.path);
        }

        Ok(())
    }

    /// Set whether the adapter is discoverable by other devices.
    pub async fn set_discoverable(&self, discoverable: bool) -> Result<()> {
        self.services
            .properties
            .set(
                &self.path,
                Interface::Adapter,
                "Discoverable",
                PropertyValue::Bool(discoverable),
            )
            .await?;

        if discoverable {
            info!("Making adapter {} discoverable", self.path);
        } else {
            debug!("Adapter {} is no longer discoverable", self.path);
        }

        Ok(())
    }

    /// Register the sink endpoint for `codec` with the adapter's media interface.
    ///
    /// Fails with `EndpointAlreadyRegistered` on a second call for the same codec.
    pub async fn register_endpoint(&mut self, codec: Codec) -> Result<()> {
        if self.endpoints.contains_key(&codec) {
            return Err(SinkError::EndpointAlreadyRegistered(codec));
        }

        let path = self.services.settings.endpoint_path(&self.id, codec);
        let responder = Arc::new(EndpointService::new(codec, path.clone()));
        self.services
            .media
            .register_endpoint(
                &self.path,
                &path,
                EndpointProperties::sink(codec),
                responder.clone(),
            )
            .await?;

        info!("{} media endpoint registered for {} at {}", codec, self.path, path);
        self.endpoints.insert(codec, responder);
        Ok(())
    }

    /// Register the pairing agent and ask for it to become the default.
    ///
    /// The agent and the default-agent request cover the whole Bluetooth
    /// stack, so an adapter arriving after the first one only adopts the
    /// agent that is already registered.
    pub async fn register_agent(&mut self) -> Result<()> {
        if self.agent.is_some() {
            return Err(SinkError::AgentAlreadyRegistered);
        }
        if let Some(shared) = self.services.agent.get() {
            debug!("Pairing agent {} already registered, shared by {}", shared.path(), self.path);
            self.agent = Some(shared);
            return Ok(());
        }

        let path = self.services.settings.agent_path();
        let responder = Arc::new(AgentService::new(path.clone()));
        self.services
            .agents
            .register_agent(&path, AgentCapability::NoInputNoOutput, responder.clone())
            .await?;
        self.services.agents.request_default_agent(&path).await?;

        info!("Pairing agent {} registered as default", path);
        self.services.agent.set(responder.clone());
        self.agent = Some(responder);
        Ok(())
    }

    pub fn on_object_added(
        &mut self,
        path: &ObjectPath,
        capabilities: &CapabilitySet,
        properties: &PropertySet,
    ) {
        let Some(device_id) = path.device_id() else {
            return;
        };

        if capabilities.contains(Interface::Device) && path.transport_id().is_none() {
            if let Some(previous) = self.devices.get_mut(device_id) {
                previous.close();
            }
            let device = DeviceNode::new(path.clone(), properties, self.services.clone());
            self.devices.insert(device_id.to_string(), device);
        } else if let Some(device) = self.devices.get_mut(device_id) {
            device.on_object_added(path, capabilities, properties);
        }
    }

    pub fn on_object_removed(&mut self, path: &ObjectPath, capabilities: &CapabilitySet) {
        let Some(device_id) = path.device_id() else {
            return;
        };

        if capabilities.contains(Interface::Device) && path.transport_id().is_none() {
            if let Some(device) = self.devices.get_mut(device_id) {
                device.close();
                self.devices.remove(device_id);
            }
        } else if let Some(device) = self.devices.get_mut(device_id) {
            device.on_object_removed(path, capabilities);
        }
    }

    pub fn on_properties_changed(
        &mut self,
        interface: Interface,
        changed: &PropertySet,
        invalidated: &[String],
        path: &ObjectPath,
    ) {
        if let Some(device_id) = path.device_id() {
            if let Some(device) = self.devices.get_mut(device_id) {
                device.on_properties_changed(interface, changed, invalidated, path);
            }
            return;
        }

        if interface != Interface::Adapter {
            return;
        }
        if let Some(powered) = changed.powered {
            self.powered = Some(powered);
            info!("Adapter {} powered: {}", self.path, powered);
        }
        if let Some(discoverable) = changed.discoverable {
            self.discoverable = Some(discoverable);
            info!("Adapter {} discoverable: {}", self.path, discoverable);
        }
    }

    pub fn on_pipeline_notice(&mut self, notice: &PipelineNotice) {
        let Some(device_id) = notice.path.device_id() else {
            return;
        };
        if let Some(device) = self.devices.get_mut(device_id) {
            device.on_pipeline_notice(notice);
        }
    }

    /// Close every device (and through them every transport), then the adapter.
    pub fn close(&mut self) {
        for device in self.devices.values_mut() {
            device.close();
        }
        self.devices.clear();
        if !self.endpoints.is_empty() {
            debug!("Dropping {} endpoint(s) of {}", self.endpoints.len(), self.path);
        }
        info!("Removed adapter {}", self.path);
    }
}
