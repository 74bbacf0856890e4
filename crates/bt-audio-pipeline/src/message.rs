//! Bus message translation and forwarding.

use bt_audio_core::{MessageWatcher, PipelineMessage};
use futures::StreamExt;
use gstreamer as gst;
use tracing::debug;

/// Typed view of a GStreamer bus message.
pub fn translate(message: &gst::Message) -> PipelineMessage {
    match message.view() {
        gst::MessageView::Eos(_) => PipelineMessage::EndOfStream,
        gst::MessageView::Error(err) => PipelineMessage::Error {
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        },
        gst::MessageView::Warning(warning) => PipelineMessage::Warning {
            message: warning.error().to_string(),
            debug: warning.debug().map(|d| d.to_string()),
        },
        _ => PipelineMessage::Other(format!("{:?}", message.type_())),
    }
}

/// Forward every message on `bus` to `watcher` until either side goes away.
pub async fn forward(bus: gst::Bus, watcher: MessageWatcher) {
    let mut messages = bus.stream();
    while let Some(message) = messages.next().await {
        if !watcher.notify(translate(&message)) {
            break;
        }
    }
    debug!("Stopped watching pipeline messages for {}", watcher.path());
}
