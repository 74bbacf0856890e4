//! Adapter registry and the event dispatch loop.
//!
//! The registry owns every [`AdapterNode`] keyed by adapter id and routes bus
//! events and pipeline notices down the tree by path. All mutation happens
//! from [`ObjectRegistry::run`], one event at a time.

use std::collections::HashMap;
use std::future::Future;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapter::AdapterNode;
use crate::error::Result;
use crate::event::{BusEvent, CapabilitySet, Interface, ManagedObject, PropertySet};
use crate::path::ObjectPath;
use crate::pipeline::PipelineNotice;
use crate::traits::{BusEventStream, Services};

/// Root of the object tree.
pub struct ObjectRegistry {
    adapters: HashMap<String, AdapterNode>,
    services: Services,
}

impl ObjectRegistry {
    pub fn new(services: Services) -> Self {
        Self {
            adapters: HashMap::new(),
            services,
        }
    }

    /// Fetch the current object snapshot and build the tree from it.
    pub async fn bootstrap(&mut self) -> Result<()> {
        let objects = self.services.source.snapshot().await?;
        self.bootstrap_from(&objects);
        Ok(())
    }

    /// Build one adapter per adapter object in `objects`; each adapter picks
    /// up its own devices and transports from the same snapshot.
    pub fn bootstrap_from(&mut self, objects: &[ManagedObject]) {
        self.close();

        for object in objects {
            if !object.capabilities.contains(Interface::Adapter) {
                continue;
            }
            let Some(id) = object.path.adapter_id() else {
                continue;
            };
            let adapter = AdapterNode::open(
                id,
                object.path.clone(),
                &object.properties,
                objects,
                self.services.clone(),
            );
            self.adapters.insert(id.to_string(), adapter);
        }

        info!("Bootstrapped {} adapter(s)", self.adapters.len());
    }

    pub fn get_adapter(&self, id: &str) -> Option<&AdapterNode> {
        self.adapters.get(id)
    }

    pub fn get_adapter_mut(&mut self, id: &str) -> Option<&mut AdapterNode> {
        self.adapters.get_mut(id)
    }

    pub fn adapters(&self) -> impl Iterator<Item = &AdapterNode> {
        self.adapters.values()
    }

    /// Route one bus event.
    pub async fn dispatch(&mut self, event: BusEvent) {
        match event {
            BusEvent::ObjectAdded {
                path,
                capabilities,
                properties,
            } => self.on_object_added(&path, &capabilities, &properties).await,
            BusEvent::ObjectRemoved { path, capabilities } => {
                self.on_object_removed(&path, &capabilities)
            }
            BusEvent::PropertiesChanged {
                interface,
                changed,
                invalidated,
                path,
            } => self.on_properties_changed(interface, &changed, &invalidated, &path),
        }
    }

    /// A new adapter replaces any previous one with the same id and gets the
    /// pairing agent. Everything else is forwarded to its adapter.
    pub async fn on_object_added(
        &mut self,
        path: &ObjectPath,
        capabilities: &CapabilitySet,
        properties: &PropertySet,
    ) {
        let Some(id) = path.adapter_id() else {
            return;
        };

        if !capabilities.contains(Interface::Adapter) {
            match self.adapters.get_mut(id) {
                Some(adapter) => adapter.on_object_added(path, capabilities, properties),
                None => debug!("No adapter for {}", path),
            }
            return;
        }

        let objects = match self.services.source.snapshot().await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Failed to read objects under {}: {}", path, e);
                Vec::new()
            }
        };

        if let Some(previous) = self.adapters.get_mut(id) {
            previous.close();
        }
        let services = self.services.clone();
        let mut adapter = AdapterNode::open(id, path.clone(), properties, &objects, services);
        if let Err(e) = adapter.register_agent().await {
            error!("Failed to register agent for {}: {}", path, e);
        }
        self.adapters.insert(id.to_string(), adapter);
    }

    /// An adapter goes away only when `Adapter1` itself is removed; losing any
    /// other interface leaves it in place.
    pub fn on_object_removed(&mut self, path: &ObjectPath, capabilities: &CapabilitySet) {
        let Some(id) = path.adapter_id() else {
            return;
        };

        if capabilities.contains(Interface::Adapter) {
            if let Some(adapter) = self.adapters.get_mut(id) {
                adapter.close();
                self.adapters.remove(id);
            }
        } else if let Some(adapter) = self.adapters.get_mut(id) {
            adapter.on_object_removed(path, capabilities);
        }
    }

    pub fn on_properties_changed(
        &mut self,
        interface: Interface,
        changed: &PropertySet,
        invalidated: &[String],
        path: &ObjectPath,
    ) {
        if !path.in_bluez_namespace() {
            return;
        }
        let Some(id) = path.adapter_id() else {
            return;
        };
        if let Some(adapter) = self.adapters.get_mut(id) {
            adapter.on_properties_changed(interface, changed, invalidated, path);
        }
    }

    /// Route a pipeline message to the transport that owns the pipeline.
    pub fn on_pipeline_notice(&mut self, notice: &PipelineNotice) {
        let Some(id) = notice.path.adapter_id() else {
            return;
        };
        match self.adapters.get_mut(id) {
            Some(adapter) => adapter.on_pipeline_notice(notice),
            None => debug!("Dropping pipeline message for {}", notice.path),
        }
    }

    /// Dispatch bus events and pipeline notices until the bus stream ends or
    /// `shutdown` resolves, then tear down the whole tree.
    pub async fn run(
        &mut self,
        mut events: BusEventStream,
        mut notices: mpsc::UnboundedReceiver<PipelineNotice>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.next() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        warn!("Bus event stream ended");
                        break;
                    }
                },
                Some(notice) = notices.recv() => self.on_pipeline_notice(&notice),
            }
        }

        self.close();
    }

    /// Close every adapter and empty the registry.
    pub fn close(&mut self) {
        for adapter in self.adapters.values_mut() {
            adapter.close();
        }
        self.adapters.clear();
    }
}
