//! Recording fakes for every collaborator trait.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc;

use crate::agent::{AgentCapability, AgentService, AgentSlot};
use crate::config::SinkSettings;
use crate::endpoint::EndpointService;
use crate::error::{Result, SinkError};
use crate::event::{CapabilitySet, Interface, ManagedObject, PropertySet, PropertyValue};
use crate::path::ObjectPath;
use crate::pipeline::{ElementSpec, MessageWatcher, PipelineNotice, RunState};
use crate::traits::{
    AgentManager, BusEventStream, EndpointProperties, MediaControl, PathEventSource, Pipeline,
    PipelineBuilder, RemoteProperty, Services,
};

pub const ADAPTER: &str = "/org/bluez/hci0";
pub const DEVICE: &str = "/org/bluez/hci0/dev_AA";
pub const TRANSPORT: &str = "/org/bluez/hci0/dev_AA/fd0";

/// Everything one fake pipeline was asked to do.
#[derive(Debug, Clone, Default)]
pub struct PipelineLog {
    pub name: String,
    pub elements: Vec<ElementSpec>,
    pub links: Vec<(String, String)>,
    pub states: Vec<RunState>,
    pub dropped: bool,
}

#[derive(Default)]
struct Recorded {
    snapshot: Vec<ManagedObject>,
    property_writes: Vec<(ObjectPath, Interface, String, PropertyValue)>,
    endpoints: Vec<(ObjectPath, ObjectPath, EndpointProperties)>,
    agents: Vec<(ObjectPath, AgentCapability)>,
    default_agents: Vec<ObjectPath>,
    pipelines: Vec<Arc<Mutex<PipelineLog>>>,
    watchers: Vec<MessageWatcher>,
    snapshot_calls: usize,
}

/// In-memory Bluetooth stack and media framework.
#[derive(Clone)]
pub struct FakeStack {
    recorded: Arc<Mutex<Recorded>>,
    notices: mpsc::UnboundedSender<PipelineNotice>,
    receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<PipelineNotice>>>>,
    agent: AgentSlot,
}

impl FakeStack {
    pub fn new() -> Self {
        let (notices, receiver) = mpsc::unbounded_channel();
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            notices,
            receiver: Arc::new(Mutex::new(Some(receiver))),
            agent: AgentSlot::default(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            source: Arc::new(self.clone()),
            properties: Arc::new(self.clone()),
            media: Arc::new(self.clone()),
            agents: Arc::new(self.clone()),
            pipelines: Arc::new(self.clone()),
            notices: self.notices.clone(),
            agent: self.agent.clone(),
            settings: Arc::new(SinkSettings::default()),
        }
    }

    pub fn take_notices(&self) -> mpsc::UnboundedReceiver<PipelineNotice> {
        self.receiver
            .lock()
            .unwrap()
            .take()
            .expect("notice receiver already taken")
    }

    pub fn set_snapshot(&self, objects: Vec<ManagedObject>) {
        self.recorded.lock().unwrap().snapshot = objects;
    }

    pub fn snapshot_calls(&self) -> usize {
        self.recorded.lock().unwrap().snapshot_calls
    }

    pub fn property_writes(&self) -> Vec<(ObjectPath, Interface, String, PropertyValue)> {
        self.recorded.lock().unwrap().property_writes.clone()
    }

    pub fn endpoints(&self) -> Vec<(ObjectPath, ObjectPath, EndpointProperties)> {
        self.recorded.lock().unwrap().endpoints.clone()
    }

    pub fn agents(&self) -> Vec<(ObjectPath, AgentCapability)> {
        self.recorded.lock().unwrap().agents.clone()
    }

    pub fn default_agents(&self) -> Vec<ObjectPath> {
        self.recorded.lock().unwrap().default_agents.clone()
    }

    pub fn pipeline_count(&self) -> usize {
        self.recorded.lock().unwrap().pipelines.len()
    }

    pub fn pipeline(&self, index: usize) -> PipelineLog {
        let recorded = self.recorded.lock().unwrap();
        let log = recorded.pipelines[index].lock().unwrap().clone();
        log
    }

    pub fn watcher(&self, index: usize) -> MessageWatcher {
        self.recorded.lock().unwrap().watchers[index].clone()
    }
}

/// Snapshot entry helper.
pub fn object(path: &str, interfaces: &[Interface], properties: PropertySet) -> ManagedObject {
    ManagedObject {
        path: ObjectPath::new(path),
        capabilities: interfaces.iter().copied().collect::<CapabilitySet>(),
        properties,
    }
}

#[async_trait]
impl PathEventSource for FakeStack {
    async fn snapshot(&self) -> Result<Vec<ManagedObject>> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.snapshot_calls += 1;
        Ok(recorded.snapshot.clone())
    }

    async fn subscribe(&self) -> Result<BusEventStream> {
        Ok(Box::pin(stream::empty()))
    }
}

#[async_trait]
impl RemoteProperty for FakeStack {
    async fn get(
        &self,
        object: &ObjectPath,
        interface: Interface,
        name: &str,
    ) -> Result<PropertyValue> {
        let recorded = self.recorded.lock().unwrap();
        recorded
            .property_writes
            .iter()
            .rev()
            .find(|(path, iface, prop, _)| {
                path == object && *iface == interface && prop == name
            })
            .map(|(_, _, _, value)| value.clone())
            .ok_or_else(|| SinkError::Bus(format!("no value for {}", name)))
    }

    async fn set(
        &self,
        object: &ObjectPath,
        interface: Interface,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .property_writes
            .push((object.clone(), interface, name.to_string(), value));
        Ok(())
    }
}

#[async_trait]
impl MediaControl for FakeStack {
    async fn register_endpoint(
        &self,
        adapter: &ObjectPath,
        endpoint: &ObjectPath,
        properties: EndpointProperties,
        _responder: Arc<EndpointService>,
    ) -> Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .endpoints
            .push((adapter.clone(), endpoint.clone(), properties));
        Ok(())
    }
}

#[async_trait]
impl AgentManager for FakeStack {
    async fn register_agent(
        &self,
        agent: &ObjectPath,
        capability: AgentCapability,
        _responder: Arc<AgentService>,
    ) -> Result<()> {
        self.recorded.lock().unwrap().agents.push((agent.clone(), capability));
        Ok(())
    }

    async fn request_default_agent(&self, agent: &ObjectPath) -> Result<()> {
        self.recorded.lock().unwrap().default_agents.push(agent.clone());
        Ok(())
    }
}

impl PipelineBuilder for FakeStack {
    fn create(&self, name: &str, watcher: MessageWatcher) -> Result<Box<dyn Pipeline>> {
        let log = Arc::new(Mutex::new(PipelineLog {
            name: name.to_string(),
            ..Default::default()
        }));
        let mut recorded = self.recorded.lock().unwrap();
        recorded.pipelines.push(log.clone());
        recorded.watchers.push(watcher);
        Ok(Box::new(FakePipeline { log }))
    }
}

struct FakePipeline {
    log: Arc<Mutex<PipelineLog>>,
}

impl Pipeline for FakePipeline {
    fn add_element(&mut self, element: &ElementSpec) -> Result<()> {
        self.log.lock().unwrap().elements.push(element.clone());
        Ok(())
    }

    fn link(&mut self, src: &str, dst: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .links
            .push((src.to_string(), dst.to_string()));
        Ok(())
    }

    fn set_state(&mut self, state: RunState) -> Result<()> {
        self.log.lock().unwrap().states.push(state);
        Ok(())
    }
}

impl Drop for FakePipeline {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.dropped = true;
        }
    }
}
