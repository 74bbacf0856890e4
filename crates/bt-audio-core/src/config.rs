//! Settings shared by every node in the object tree.

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Result, SinkError};
use crate::path::ObjectPath;
use crate::pipeline::PipelineConfig;

/// Default root under which the endpoint and agent objects are exported.
pub const DEFAULT_OBJECT_PREFIX: &str = "/bt_audio";

/// Process-wide sink settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// Object path prefix for exported responders.
    pub object_prefix: String,
    /// Jitter buffer and output parameters applied to every pipeline.
    pub pipeline: PipelineConfig,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            object_prefix: DEFAULT_OBJECT_PREFIX.to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SinkSettings {
    /// Reject prefixes D-Bus would refuse as an object path.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.object_prefix;
        let well_formed = prefix.starts_with('/')
            && !prefix.ends_with('/')
            && prefix[1..].split('/').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if !well_formed {
            return Err(SinkError::Config(format!(
                "invalid object prefix: {:?}",
                prefix
            )));
        }
        if self.pipeline.output_sink.trim().is_empty() {
            return Err(SinkError::Config("output sink must not be empty".to_string()));
        }
        Ok(())
    }

    /// Path of the endpoint exported for `codec` on `adapter_id`.
    pub fn endpoint_path(&self, adapter_id: &str, codec: Codec) -> ObjectPath {
        ObjectPath::new(format!(
            "{}/endpoint_{}_{}",
            self.object_prefix,
            adapter_id,
            codec.short_name()
        ))
    }

    /// Path of the pairing agent.
    pub fn agent_path(&self) -> ObjectPath {
        ObjectPath::new(format!("{}/agent", self.object_prefix))
    }
}
