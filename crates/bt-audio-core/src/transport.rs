//! Media transport node.

use tracing::{debug, info};

use crate::codec::Codec;
use crate::event::{Interface, PropertySet, TransportState};
use crate::path::ObjectPath;
use crate::pipeline::{PipelineController, PipelineNotice, PlaybackState};
use crate::traits::Services;

/// A live audio stream from one device, decoded by its own pipeline.
pub struct TransportNode {
    path: ObjectPath,
    codec: Codec,
    controller: PipelineController,
}

impl TransportNode {
    pub fn new(path: ObjectPath, codec: Codec, services: Services) -> Self {
        info!("New {} media transport {}", codec, path);
        let controller = PipelineController::new(path.clone(), codec, services);
        Self {
            path,
            codec,
            controller,
        }
    }

    /// Create the node and apply the state it was announced with. A transport
    /// that is already `pending` is waiting for us and starts right away.
    pub fn with_properties(
        path: ObjectPath,
        codec: Codec,
        properties: &PropertySet,
        services: Services,
    ) -> Self {
        let mut node = Self::new(path, codec, services);
        if properties.state == Some(TransportState::Pending) {
            node.controller.on_transport_state(TransportState::Pending);
        }
        node
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn on_properties_changed(&mut self, interface: Interface, changed: &PropertySet) {
        if interface != Interface::MediaTransport {
            return;
        }
        match changed.state {
            Some(state) => {
                debug!("Transport {} state -> {:?}", self.path, state);
                self.controller.on_transport_state(state);
            }
            None => debug!("Transport {} properties changed: {:?}", self.path, changed),
        }
    }

    pub fn on_pipeline_notice(&mut self, notice: &PipelineNotice) {
        self.controller.on_notice(notice);
    }

    /// Stop and release the pipeline before the node is dropped.
    pub fn close(&mut self) {
        self.controller.close();
        info!("Removed media transport {}", self.path);
    }
}
