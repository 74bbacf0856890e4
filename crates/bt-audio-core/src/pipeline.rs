//! Per-transport decode pipeline and its play/stop state machine.
//!
//! A [`PipelineController`] builds its pipeline lazily on the first `pending`
//! transport state and reuses it for every later idle/pending cycle. The
//! pipeline is only dropped when the owning transport is closed.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::codec::Codec;
use crate::event::TransportState;
use crate::path::ObjectPath;
use crate::traits::{Pipeline, Services};

/// Jitter buffer and output parameters, identical for every pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Jitter buffer latency bound in milliseconds.
    pub latency_ms: u32,
    /// Drop packets that arrive later than the latency bound.
    pub drop_on_latency: bool,
    /// Named output device (e.g. an ALSA PCM); the sink default when unset.
    pub output_device: Option<String>,
    /// Output sink element factory.
    pub output_sink: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            latency_ms: 200,
            drop_on_latency: true,
            output_device: None,
            output_sink: "alsasink".to_string(),
        }
    }
}

/// One element of a pipeline topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    /// Unique name within the pipeline.
    pub name: String,
    /// Element factory to instantiate.
    pub factory: String,
    /// Properties applied after creation, as string values.
    pub properties: Vec<(String, String)>,
}

impl ElementSpec {
    pub fn new(name: impl Into<String>, factory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: factory.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.properties.push((key.into(), value.to_string()));
        self
    }
}

/// Element chain decoding `codec` from `transport`, in link order.
pub fn topology(codec: Codec, transport: &ObjectPath, config: &PipelineConfig) -> Vec<ElementSpec> {
    let mut chain = vec![
        ElementSpec::new("source", "avdtpsrc").property("transport", transport),
        ElementSpec::new("jitter", "rtpjitterbuffer")
            .property("latency", config.latency_ms)
            .property("drop-on-latency", config.drop_on_latency),
    ];

    match codec {
        Codec::Sbc => chain.extend([
            ElementSpec::new("depay", "rtpsbcdepay"),
            ElementSpec::new("parse", "sbcparse"),
            ElementSpec::new("decoder", "sbcdec"),
        ]),
        Codec::Aac => chain.extend([
            ElementSpec::new("depay", "rtpmp4adepay"),
            ElementSpec::new("decoder", "avdec_aac"),
        ]),
    }

    chain.push(ElementSpec::new("convert", "audioconvert"));

    let mut sink = ElementSpec::new("sink", config.output_sink.as_str());
    if let Some(device) = &config.output_device {
        sink = sink.property("device", device);
    }
    chain.push(sink);

    chain
}

/// Run state requested from the media framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Null,
    Playing,
}

/// Asynchronous message posted by a running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineMessage {
    EndOfStream,
    Error { message: String, debug: Option<String> },
    Warning { message: String, debug: Option<String> },
    Other(String),
}

/// Pipeline message tagged with the transport that owns the pipeline and
/// the generation of the pipeline that posted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineNotice {
    pub path: ObjectPath,
    pub generation: u64,
    pub message: PipelineMessage,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Process-unique id for a newly built pipeline.
pub fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Forwards one pipeline's messages into the dispatch loop.
#[derive(Debug, Clone)]
pub struct MessageWatcher {
    path: ObjectPath,
    generation: u64,
    tx: mpsc::UnboundedSender<PipelineNotice>,
}

impl MessageWatcher {
    pub fn new(
        path: ObjectPath,
        generation: u64,
        tx: mpsc::UnboundedSender<PipelineNotice>,
    ) -> Self {
        Self {
            path,
            generation,
            tx,
        }
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue `message` for the dispatch loop. Returns `false` once the loop
    /// has gone away.
    pub fn notify(&self, message: PipelineMessage) -> bool {
        self.tx
            .send(PipelineNotice {
                path: self.path.clone(),
                generation: self.generation,
                message,
            })
            .is_ok()
    }
}

/// Lifecycle state of a transport's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No pipeline constructed yet.
    Absent,
    /// Pipeline constructed, not running.
    Idle,
    /// Pipeline constructed and running.
    Playing,
}

/// Owns at most one pipeline for one transport.
pub struct PipelineController {
    path: ObjectPath,
    codec: Codec,
    services: Services,
    pipeline: Option<Box<dyn Pipeline>>,
    generation: Option<u64>,
    state: PlaybackState,
    usable: bool,
    builds: usize,
}

impl PipelineController {
    pub fn new(path: ObjectPath, codec: Codec, services: Services) -> Self {
        Self {
            path,
            codec,
            services,
            pipeline: None,
            generation: None,
            state: PlaybackState::Absent,
            usable: true,
            builds: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether construction failed; such a pipeline is never started or rebuilt.
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Number of pipelines constructed over this controller's lifetime.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// React to the transport's `State` property.
    pub fn on_transport_state(&mut self, state: TransportState) {
        match state {
            TransportState::Pending => self.start(),
            TransportState::Idle => self.stop(),
            TransportState::Active => debug!("Transport {} is active", self.path),
        }
    }

    /// Generation of the current pipeline, if one is held.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// React to a message posted by a pipeline. Messages queued by a pipeline
    /// that has since been released are dropped.
    pub fn on_notice(&mut self, notice: &PipelineNotice) {
        if self.generation != Some(notice.generation) {
            debug!(
                "Ignoring message from stale pipeline {} on {}",
                notice.generation, self.path
            );
            return;
        }
        self.on_message(&notice.message);
    }

    fn on_message(&mut self, message: &PipelineMessage) {
        match message {
            PipelineMessage::EndOfStream => {
                info!("End of stream on {}", self.path);
                self.stop();
            }
            PipelineMessage::Error {
                message,
                debug: detail,
            } => {
                error!(
                    "Pipeline error on {}: {} ({})",
                    self.path,
                    message,
                    detail.as_deref().unwrap_or("no debug info")
                );
                self.stop();
            }
            PipelineMessage::Warning {
                message,
                debug: detail,
            } => {
                warn!(
                    "Pipeline warning on {}: {} ({})",
                    self.path,
                    message,
                    detail.as_deref().unwrap_or("no debug info")
                );
            }
            PipelineMessage::Other(kind) => trace!("Pipeline message on {}: {}", self.path, kind),
        }
    }

    /// Start playback, building the pipeline on first use.
    pub fn start(&mut self) {
        if !self.usable {
            warn!("Pipeline for {} is unusable, not starting", self.path);
            return;
        }

        if self.pipeline.is_none() {
            self.build();
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };
        if !self.usable {
            return;
        }

        match pipeline.set_state(RunState::Playing) {
            Ok(()) => {
                info!("Playing {} stream from {}", self.codec, self.path);
                self.state = PlaybackState::Playing;
            }
            Err(e) => {
                error!("Failed to start pipeline for {}: {}", self.path, e);
                self.state = PlaybackState::Idle;
            }
        }
    }

    /// Halt playback. The pipeline is kept for the next start; safe to call
    /// before anything was built.
    pub fn stop(&mut self) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };

        if let Err(e) = pipeline.set_state(RunState::Null) {
            warn!("Failed to stop pipeline for {}: {}", self.path, e);
        }
        if self.state == PlaybackState::Playing {
            info!("Stopped {} stream from {}", self.codec, self.path);
        }
        self.state = PlaybackState::Idle;
    }

    /// Stop and release the pipeline. Called by the owning transport on removal.
    pub fn close(&mut self) {
        self.stop();
        if self.pipeline.take().is_some() {
            debug!("Released pipeline for {}", self.path);
        }
        self.generation = None;
        self.state = PlaybackState::Absent;
    }

    fn build(&mut self) {
        let name = format!(
            "{}-{}",
            self.codec.short_name(),
            self.path.transport_id().unwrap_or("transport")
        );
        let generation = next_generation();
        let watcher = MessageWatcher::new(
            self.path.clone(),
            generation,
            self.services.notices.clone(),
        );

        let mut pipeline = match self.services.pipelines.create(&name, watcher) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!("Failed to create pipeline {}: {}", name, e);
                self.usable = false;
                return;
            }
        };
        self.builds += 1;
        self.generation = Some(generation);
        self.state = PlaybackState::Idle;

        let elements = topology(self.codec, &self.path, &self.services.settings.pipeline);
        for element in &elements {
            if let Err(e) = pipeline.add_element(element) {
                error!(
                    "Pipeline {}: failed to add {} ({}): {}",
                    name, element.name, element.factory, e
                );
                self.usable = false;
            }
        }

        if self.usable {
            for pair in elements.windows(2) {
                if let Err(e) = pipeline.link(&pair[0].name, &pair[1].name) {
                    error!(
                        "Pipeline {}: failed to link {} -> {}: {}",
                        name, pair[0].name, pair[1].name, e
                    );
                    self.usable = false;
                }
            }
        }

        if self.usable {
            debug!("Built pipeline {} with {} elements", name, elements.len());
        } else {
            error!(
                "Pipeline {} could not be constructed; transport {} will stay silent",
                name, self.path
            );
        }
        self.pipeline = Some(pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::testing::{FakeStack, TRANSPORT};
    use crate::traits::{MockPipeline, MockPipelineBuilder};
    use std::sync::Arc;

    fn transport() -> ObjectPath {
        ObjectPath::new(TRANSPORT)
    }

    fn controller(stack: &FakeStack, codec: Codec) -> PipelineController {
        PipelineController::new(transport(), codec, stack.services())
    }

    mod chains {
        use super::*;

        fn factories(chain: &[ElementSpec]) -> Vec<&str> {
            chain.iter().map(|e| e.factory.as_str()).collect()
        }

        #[test]
        fn sbc_chain() {
            let chain = topology(Codec::Sbc, &transport(), &PipelineConfig::default());
            assert_eq!(
                factories(&chain),
                vec![
                    "avdtpsrc",
                    "rtpjitterbuffer",
                    "rtpsbcdepay",
                    "sbcparse",
                    "sbcdec",
                    "audioconvert",
                    "alsasink"
                ]
            );
            assert_eq!(
                chain[0].properties,
                vec![("transport".to_string(), TRANSPORT.to_string())]
            );
        }

        #[test]
        fn aac_chain() {
            let chain = topology(Codec::Aac, &transport(), &PipelineConfig::default());
            assert_eq!(
                factories(&chain),
                vec![
                    "avdtpsrc",
                    "rtpjitterbuffer",
                    "rtpmp4adepay",
                    "avdec_aac",
                    "audioconvert",
                    "alsasink"
                ]
            );
        }

        #[test]
        fn applies_jitter_and_output_config() {
            let config = PipelineConfig {
                latency_ms: 80,
                drop_on_latency: false,
                output_device: Some("hw:1,0".to_string()),
                output_sink: "alsasink".to_string(),
            };
            let chain = topology(Codec::Sbc, &transport(), &config);
            let jitter = &chain[1].properties;
            assert!(jitter.contains(&("latency".to_string(), "80".to_string())));
            assert!(jitter.contains(&("drop-on-latency".to_string(), "false".to_string())));
            let sink = chain.last().unwrap();
            assert_eq!(sink.properties, vec![("device".to_string(), "hw:1,0".to_string())]);
        }

        #[test]
        fn default_sink_has_no_device() {
            let chain = topology(Codec::Aac, &transport(), &PipelineConfig::default());
            assert!(chain.last().unwrap().properties.is_empty());
        }
    }

    mod state_machine {
        use super::*;

        #[test]
        fn starts_absent() {
            let stack = FakeStack::new();
            let ctl = controller(&stack, Codec::Sbc);
            assert_eq!(ctl.state(), PlaybackState::Absent);
            assert_eq!(ctl.builds(), 0);
        }

        #[test]
        fn idle_before_pending_is_noop() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Idle);
            assert_eq!(ctl.state(), PlaybackState::Absent);
            assert_eq!(stack.pipeline_count(), 0);
        }

        #[test]
        fn pending_builds_and_plays() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Pending);
            assert_eq!(ctl.state(), PlaybackState::Playing);
            assert_eq!(stack.pipeline_count(), 1);

            let log = stack.pipeline(0);
            assert_eq!(log.name, "sbc-fd0");
            assert_eq!(log.elements.len(), 7);
            assert_eq!(log.links.len(), 6);
            assert_eq!(log.states, vec![RunState::Playing]);
        }

        #[test]
        fn cycles_reuse_one_pipeline() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Aac);
            for _ in 0..3 {
                ctl.on_transport_state(TransportState::Pending);
                assert_eq!(ctl.state(), PlaybackState::Playing);
                ctl.on_transport_state(TransportState::Idle);
                assert_eq!(ctl.state(), PlaybackState::Idle);
            }
            assert_eq!(ctl.builds(), 1);
            assert_eq!(stack.pipeline_count(), 1);
            assert_eq!(
                stack.pipeline(0).states,
                vec![
                    RunState::Playing,
                    RunState::Null,
                    RunState::Playing,
                    RunState::Null,
                    RunState::Playing,
                    RunState::Null
                ]
            );
        }

        #[test]
        fn active_changes_nothing() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Active);
            assert_eq!(ctl.state(), PlaybackState::Absent);
        }

        #[test]
        fn close_stops_and_releases() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Pending);
            ctl.close();
            assert_eq!(ctl.state(), PlaybackState::Absent);
            let log = stack.pipeline(0);
            assert_eq!(log.states.last(), Some(&RunState::Null));
            assert!(log.dropped);
        }

        #[test]
        fn close_without_pipeline_is_safe() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.close();
            ctl.stop();
            assert_eq!(ctl.state(), PlaybackState::Absent);
        }
    }

    mod messages {
        use super::*;

        #[test]
        fn end_of_stream_stops() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Pending);
            ctl.on_message(&PipelineMessage::EndOfStream);
            assert_eq!(ctl.state(), PlaybackState::Idle);
        }

        #[test]
        fn error_stops_but_stays_restartable() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Pending);
            ctl.on_message(&PipelineMessage::Error {
                message: "Could not acquire transport".to_string(),
                debug: None,
            });
            assert_eq!(ctl.state(), PlaybackState::Idle);

            ctl.on_transport_state(TransportState::Pending);
            assert_eq!(ctl.state(), PlaybackState::Playing);
            assert_eq!(ctl.builds(), 1);
        }

        #[test]
        fn warning_and_other_keep_state() {
            let stack = FakeStack::new();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Pending);
            ctl.on_message(&PipelineMessage::Warning {
                message: "late buffer".to_string(),
                debug: Some("jitter".to_string()),
            });
            ctl.on_message(&PipelineMessage::Other("state-changed".to_string()));
            assert_eq!(ctl.state(), PlaybackState::Playing);
        }

        #[test]
        fn notices_from_released_pipeline_are_ignored() {
            let stack = FakeStack::new();
            let mut notices = stack.take_notices();
            let mut ctl = controller(&stack, Codec::Sbc);
            ctl.on_transport_state(TransportState::Pending);
            stack.watcher(0).notify(PipelineMessage::Error {
                message: "Could not acquire transport".to_string(),
                debug: None,
            });

            ctl.close();
            assert_eq!(ctl.generation(), None);
            ctl.on_transport_state(TransportState::Pending);
            assert_eq!(ctl.builds(), 2);
            assert_ne!(ctl.generation(), Some(stack.watcher(0).generation()));

            let stale = notices.try_recv().unwrap();
            ctl.on_notice(&stale);
            assert_eq!(ctl.state(), PlaybackState::Playing);

            stack.watcher(1).notify(PipelineMessage::EndOfStream);
            ctl.on_notice(&notices.try_recv().unwrap());
            assert_eq!(ctl.state(), PlaybackState::Idle);
        }

        #[test]
        fn generations_are_unique() {
            let first = next_generation();
            let second = next_generation();
            assert!(second > first);
        }

        #[tokio::test]
        async fn watcher_tags_messages_with_path_and_generation() {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let watcher = MessageWatcher::new(transport(), 7, tx);
            assert!(watcher.notify(PipelineMessage::EndOfStream));
            let notice = rx.recv().await.unwrap();
            assert_eq!(notice.path.as_str(), TRANSPORT);
            assert_eq!(notice.generation, 7);
            assert_eq!(notice.message, PipelineMessage::EndOfStream);

            drop(rx);
            assert!(!watcher.notify(PipelineMessage::EndOfStream));
        }
    }

    mod construction_failure {
        use super::*;

        fn services_with(builder: MockPipelineBuilder) -> Services {
            let stack = FakeStack::new();
            let mut services = stack.services();
            services.pipelines = Arc::new(builder);
            services
        }

        #[test]
        fn failed_link_leaves_pipeline_unusable() {
            let mut builder = MockPipelineBuilder::new();
            builder.expect_create().times(1).returning(|_, _| {
                let mut pipeline = MockPipeline::new();
                pipeline.expect_add_element().returning(|_| Ok(()));
                pipeline.expect_link().returning(|src, _| {
                    if src == "depay" {
                        Err(SinkError::Pipeline("could not link".to_string()))
                    } else {
                        Ok(())
                    }
                });
                pipeline.expect_set_state().returning(|_| Ok(()));
                Ok(Box::new(pipeline) as Box<dyn Pipeline>)
            });

            let mut ctl = PipelineController::new(transport(), Codec::Sbc, services_with(builder));
            ctl.on_transport_state(TransportState::Pending);
            assert!(!ctl.is_usable());
            assert_eq!(ctl.state(), PlaybackState::Idle);

            // Not rebuilt on the next pending.
            ctl.on_transport_state(TransportState::Pending);
            assert_eq!(ctl.builds(), 1);
            assert_eq!(ctl.state(), PlaybackState::Idle);
        }

        #[test]
        fn failed_create_is_not_retried() {
            let mut builder = MockPipelineBuilder::new();
            builder
                .expect_create()
                .times(1)
                .returning(|_, _| Err(SinkError::Pipeline("no such element".to_string())));

            let mut ctl = PipelineController::new(transport(), Codec::Aac, services_with(builder));
            ctl.on_transport_state(TransportState::Pending);
            ctl.on_transport_state(TransportState::Pending);
            assert_eq!(ctl.state(), PlaybackState::Absent);
            assert_eq!(ctl.builds(), 0);
        }

        #[test]
        fn failed_start_stays_idle() {
            let mut builder = MockPipelineBuilder::new();
            builder.expect_create().times(1).returning(|_, _| {
                let mut pipeline = MockPipeline::new();
                pipeline.expect_add_element().returning(|_| Ok(()));
                pipeline.expect_link().returning(|_, _| Ok(()));
                pipeline.expect_set_state().returning(|state| match state {
                    RunState::Playing => {
                        Err(SinkError::Pipeline("state change failed".to_string()))
                    }
                    RunState::Null => Ok(()),
                });
                Ok(Box::new(pipeline) as Box<dyn Pipeline>)
            });

            let mut ctl = PipelineController::new(transport(), Codec::Sbc, services_with(builder));
            ctl.on_transport_state(TransportState::Pending);
            assert!(ctl.is_usable());
            assert_eq!(ctl.state(), PlaybackState::Idle);
        }
    }
}
