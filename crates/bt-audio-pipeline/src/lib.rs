//! # bt-audio-pipeline
//!
//! GStreamer decode pipelines for the bt-audio A2DP sink.
//!
//! This crate provides:
//! - [`GstPipelineBuilder`], the `PipelineBuilder` used in production
//! - [`GstPipeline`], one graph built from `ElementSpec`s and linked pairwise
//! - Translation of bus messages into `PipelineMessage`s, forwarded to the
//!   dispatch loop through a `MessageWatcher`

mod backend;
mod message;

pub use backend::{apply_property, GstPipeline, GstPipelineBuilder};
pub use message::{forward, translate};
