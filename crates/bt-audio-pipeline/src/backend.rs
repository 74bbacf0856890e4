//! GStreamer implementation of the pipeline traits.

use std::collections::HashMap;

use bt_audio_core::{ElementSpec, MessageWatcher, Pipeline, PipelineBuilder, RunState, SinkError};
use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::message::forward;

/// Creates GStreamer pipelines whose bus messages are forwarded into the
/// dispatch loop.
pub struct GstPipelineBuilder {
    _private: (),
}

impl GstPipelineBuilder {
    /// Initialize GStreamer.
    pub fn new() -> bt_audio_core::Result<Self> {
        gst::init()
            .map_err(|e| SinkError::Pipeline(format!("Failed to initialize GStreamer: {}", e)))?;
        debug!("GStreamer {} initialized", gst::version_string());
        Ok(Self { _private: () })
    }
}

impl PipelineBuilder for GstPipelineBuilder {
    fn create(
        &self,
        name: &str,
        watcher: MessageWatcher,
    ) -> bt_audio_core::Result<Box<dyn Pipeline>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SinkError::Pipeline(format!("No runtime to watch {}: {}", name, e)))?;

        let pipeline = gst::Pipeline::with_name(name);
        let bus = pipeline
            .bus()
            .ok_or_else(|| SinkError::Pipeline(format!("Pipeline {} has no bus", name)))?;
        let watch = runtime.spawn(forward(bus, watcher));

        Ok(Box::new(GstPipeline {
            name: name.to_string(),
            pipeline,
            elements: HashMap::new(),
            watch,
        }))
    }
}

/// One decode graph. Dropping it stops the graph and its message watch.
pub struct GstPipeline {
    name: String,
    pipeline: gst::Pipeline,
    elements: HashMap<String, gst::Element>,
    watch: JoinHandle<()>,
}

impl GstPipeline {
    fn element(&self, name: &str) -> bt_audio_core::Result<&gst::Element> {
        self.elements
            .get(name)
            .ok_or_else(|| SinkError::Pipeline(format!("{}: no element named {}", self.name, name)))
    }
}

/// Set `key` on `element` from its string form.
pub fn apply_property(element: &gst::Element, key: &str, value: &str) -> bt_audio_core::Result<()> {
    let pspec = element
        .find_property(key)
        .ok_or_else(|| SinkError::Pipeline(format!("{} has no property {}", element.name(), key)))?;
    if !pspec.flags().contains(glib::ParamFlags::WRITABLE) {
        return Err(SinkError::Pipeline(format!("{}.{} is read-only", element.name(), key)));
    }
    let value = glib::Value::deserialize(value, pspec.value_type()).map_err(|e| {
        SinkError::Pipeline(format!("{}.{}: cannot parse {:?}: {}", element.name(), key, value, e))
    })?;
    element.set_property_from_value(key, &value);
    Ok(())
}

impl Pipeline for GstPipeline {
    fn add_element(&mut self, spec: &ElementSpec) -> bt_audio_core::Result<()> {
        let element = gst::ElementFactory::make(&spec.factory)
            .name(spec.name.as_str())
            .build()
            .map_err(|e| SinkError::Pipeline(format!("Failed to create {}: {}", spec.factory, e)))?;

        for (key, value) in &spec.properties {
            apply_property(&element, key, value)?;
        }

        self.pipeline
            .add(&element)
            .map_err(|e| SinkError::Pipeline(format!("Failed to add {}: {}", spec.name, e)))?;
        self.elements.insert(spec.name.clone(), element);
        Ok(())
    }

    fn link(&mut self, src: &str, dst: &str) -> bt_audio_core::Result<()> {
        let from = self.element(src)?;
        let to = self.element(dst)?;
        from.link(to)
            .map_err(|e| SinkError::Pipeline(format!("Failed to link {} -> {}: {}", src, dst, e)))
    }

    fn set_state(&mut self, state: RunState) -> bt_audio_core::Result<()> {
        let target = match state {
            RunState::Null => gst::State::Null,
            RunState::Playing => gst::State::Playing,
        };
        self.pipeline.set_state(target).map_err(|e| {
            SinkError::Pipeline(format!("{}: {:?} failed: {}", self.name, target, e))
        })?;
        Ok(())
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!("{}: failed to release pipeline: {}", self.name, e);
        }
        self.watch.abort();
    }
}
