//! Remote device node.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::event::{CapabilitySet, Interface, ManagedObject, PropertySet};
use crate::path::ObjectPath;
use crate::pipeline::PipelineNotice;
use crate::traits::Services;
use crate::transport::TransportNode;

/// A remote peer under an adapter, owning its media transports.
pub struct DeviceNode {
    path: ObjectPath,
    alias: Option<String>,
    connected: Option<bool>,
    transports: HashMap<String, TransportNode>,
    services: Services,
}

impl DeviceNode {
    pub fn new(path: ObjectPath, properties: &PropertySet, services: Services) -> Self {
        info!("New device {}", path);
        Self {
            path,
            alias: properties.alias.clone(),
            connected: properties.connected,
            transports: HashMap::new(),
            services,
        }
    }

    /// Pick up transports that already exist under this device.
    pub fn adopt(&mut self, objects: &[ManagedObject]) {
        for object in objects {
            if object.path != self.path && object.path.is_under(&self.path) {
                self.on_object_added(&object.path, &object.capabilities, &object.properties);
            }
        }
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Alias if known, otherwise the object path.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(self.path.as_str())
    }

    /// Last observed `Connected` value. Mirrors the stack, not authoritative.
    pub fn connected(&self) -> Option<bool> {
        self.connected
    }

    pub fn transport(&self, id: &str) -> Option<&TransportNode> {
        self.transports.get(id)
    }

    pub fn transports(&self) -> impl Iterator<Item = &TransportNode> {
        self.transports.values()
    }

    pub fn on_object_added(
        &mut self,
        path: &ObjectPath,
        capabilities: &CapabilitySet,
        properties: &PropertySet,
    ) {
        let Some(id) = path.transport_id() else {
            return;
        };
        if !capabilities.contains(Interface::MediaTransport) {
            return;
        }

        let codec = match properties.codec.map(|id| (id, Codec::from_id(id))) {
            Some((_, Some(codec))) => codec,
            Some((raw, None)) => {
                warn!("Ignoring transport {} with unsupported codec 0x{:02x}", path, raw);
                return;
            }
            None => {
                warn!("Ignoring transport {} without a codec", path);
                return;
            }
        };

        if let Some(previous) = self.transports.get_mut(id) {
            previous.close();
        }
        let node =
            TransportNode::with_properties(path.clone(), codec, properties, self.services.clone());
        self.transports.insert(id.to_string(), node);
    }

    pub fn on_object_removed(&mut self, path: &ObjectPath, capabilities: &CapabilitySet) {
        let Some(id) = path.transport_id() else {
            return;
        };
        if !capabilities.contains(Interface::MediaTransport) {
            return;
        }
        if let Some(node) = self.transports.get_mut(id) {
            node.close();
            self.transports.remove(id);
        }
    }

    pub fn on_properties_changed(
        &mut self,
        interface: Interface,
        changed: &PropertySet,
        invalidated: &[String],
        path: &ObjectPath,
    ) {
        if let Some(id) = path.transport_id() {
            if let Some(node) = self.transports.get_mut(id) {
                node.on_properties_changed(interface, changed);
            }
            return;
        }

        if interface != Interface::Device {
            return;
        }
        if let Some(alias) = &changed.alias {
            self.alias = Some(alias.clone());
        }
        if let Some(connected) = changed.connected {
            self.connected = Some(connected);
            if connected {
                info!("Device {} connected", self.display_name());
            } else {
                info!("Device {} disconnected", self.display_name());
            }
        }
        if !invalidated.is_empty() {
            debug!("Device {} invalidated {:?}", self.path, invalidated);
        }
    }

    pub fn on_pipeline_notice(&mut self, notice: &PipelineNotice) {
        let Some(id) = notice.path.transport_id() else {
            return;
        };
        match self.transports.get_mut(id) {
            Some(node) if *node.path() == notice.path => node.on_pipeline_notice(notice),
            _ => debug!("No transport for pipeline message from {}", notice.path),
        }
    }

    /// Close every transport, then the device itself.
    pub fn close(&mut self) {
        for node in self.transports.values_mut() {
            node.close();
        }
        self.transports.clear();
        info!("Removed device {}", self.path);
    }
}
