//! Command-line arguments and the optional TOML configuration file.
//!
//! Values come from three layers: built-in defaults, then the file given with
//! `--config`, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bt_audio_core::{Codec, SinkError, SinkSettings};
use clap::Parser;
use serde::Deserialize;

/// Bluetooth A2DP sink: plays audio streamed from phones and other sources.
#[derive(Parser, Debug, Default)]
#[command(name = "bt-audio", version, about)]
pub struct Args {
    /// Adapter to serve as the sink (e.g., hci0)
    #[arg(long)]
    pub adapter: Option<String>,

    /// Codec endpoint to register; repeat for several (sbc, aac)
    #[arg(long = "codec", value_parser = parse_codec)]
    pub codecs: Vec<Codec>,

    /// Jitter buffer latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u32>,

    /// Keep late packets instead of dropping them
    #[arg(long)]
    pub no_drop_on_latency: bool,

    /// Output device passed to the audio sink (e.g., hw:0)
    #[arg(long)]
    pub output_device: Option<String>,

    /// GStreamer audio sink element
    #[arg(long)]
    pub output_sink: Option<String>,

    /// Object path prefix for the exported endpoint and agent objects
    #[arg(long)]
    pub object_prefix: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter when RUST_LOG is not set (e.g., info, debug, bt_audio_core=trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Check host setup and exit
    #[arg(long)]
    pub check: bool,

    /// Leave the adapter's discoverable setting alone
    #[arg(long)]
    pub no_discoverable: bool,
}

fn parse_codec(value: &str) -> std::result::Result<Codec, String> {
    match value.to_ascii_lowercase().as_str() {
        "sbc" => Ok(Codec::Sbc),
        "aac" => Ok(Codec::Aac),
        other => Err(format!("unsupported codec {:?} (expected sbc or aac)", other)),
    }
}

/// Contents of the `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub adapter: Option<String>,
    pub codecs: Option<Vec<Codec>>,
    pub discoverable: Option<bool>,
    pub object_prefix: Option<String>,
    pub log_level: Option<String>,
    pub pipeline: FilePipeline,
}

/// `[pipeline]` table of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilePipeline {
    pub latency_ms: Option<u32>,
    pub drop_on_latency: Option<bool>,
    pub output_device: Option<String>,
    pub output_sink: Option<String>,
}

pub fn load_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Fully resolved agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub adapter: String,
    pub codecs: Vec<Codec>,
    pub discoverable: bool,
    pub settings: SinkSettings,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub check: bool,
}

impl AgentConfig {
    /// Layer `file` and then `args` over the defaults.
    pub fn resolve(args: &Args, file: Option<FileConfig>) -> std::result::Result<Self, SinkError> {
        let file = file.unwrap_or_default();
        let mut settings = SinkSettings::default();

        if let Some(prefix) = args.object_prefix.clone().or(file.object_prefix) {
            settings.object_prefix = prefix;
        }

        let pipeline = &mut settings.pipeline;
        if let Some(latency) = args.latency_ms.or(file.pipeline.latency_ms) {
            pipeline.latency_ms = latency;
        }
        if args.no_drop_on_latency {
            pipeline.drop_on_latency = false;
        } else if let Some(drop) = file.pipeline.drop_on_latency {
            pipeline.drop_on_latency = drop;
        }
        if let Some(device) = args.output_device.clone().or(file.pipeline.output_device) {
            pipeline.output_device = Some(device);
        }
        if let Some(sink) = args.output_sink.clone().or(file.pipeline.output_sink) {
            pipeline.output_sink = sink;
        }
        settings.validate()?;

        let requested = if !args.codecs.is_empty() {
            args.codecs.clone()
        } else {
            file.codecs.unwrap_or_else(|| Codec::ALL.to_vec())
        };
        let mut codecs = Vec::new();
        for codec in requested {
            if !codecs.contains(&codec) {
                codecs.push(codec);
            }
        }
        if codecs.is_empty() {
            return Err(SinkError::Config("at least one codec is required".to_string()));
        }

        Ok(Self {
            adapter: args
                .adapter
                .clone()
                .or(file.adapter)
                .unwrap_or_else(|| "hci0".to_string()),
            codecs,
            discoverable: !args.no_discoverable && file.discoverable.unwrap_or(true),
            settings,
            log_level: args
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
            log_file: args.log_file.clone(),
            check: args.check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(flags: &[&str]) -> Args {
        let mut argv = vec!["bt-audio"];
        argv.extend_from_slice(flags);
        Args::try_parse_from(argv).unwrap()
    }

    fn file(contents: &str) -> FileConfig {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        load_file(tmp.path()).unwrap()
    }

    #[test]
    fn defaults() {
        let config = AgentConfig::resolve(&args(&[]), None).unwrap();
        assert_eq!(config.adapter, "hci0");
        assert_eq!(config.codecs, vec![Codec::Sbc, Codec::Aac]);
        assert!(config.discoverable);
        assert_eq!(config.settings, SinkSettings::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn flags_override_file() {
        let file = file(
            r#"
            adapter = "hci1"
            codecs = ["aac"]

            [pipeline]
            latency_ms = 120
            output_device = "hw:1"
            "#,
        );
        let config = AgentConfig::resolve(
            &args(&["--latency-ms", "80", "--codec", "sbc", "--no-drop-on-latency"]),
            Some(file),
        )
        .unwrap();

        assert_eq!(config.adapter, "hci1");
        assert_eq!(config.codecs, vec![Codec::Sbc]);
        assert_eq!(config.settings.pipeline.latency_ms, 80);
        assert!(!config.settings.pipeline.drop_on_latency);
        assert_eq!(config.settings.pipeline.output_device.as_deref(), Some("hw:1"));
    }

    #[test]
    fn repeated_codecs_are_deduplicated() {
        let flags = args(&["--codec", "AAC", "--codec", "sbc", "--codec", "aac"]);
        let config = AgentConfig::resolve(&flags, None).unwrap();
        assert_eq!(config.codecs, vec![Codec::Aac, Codec::Sbc]);
    }

    #[test]
    fn rejects_unknown_codec_flag() {
        assert!(Args::try_parse_from(["bt-audio", "--codec", "ldac"]).is_err());
    }

    #[test]
    fn rejects_bad_prefix() {
        let result = AgentConfig::resolve(&args(&["--object-prefix", "relative/path"]), None);
        assert!(matches!(result, Err(SinkError::Config(_))));
    }

    #[test]
    fn rejects_empty_codec_list_in_file() {
        let file = file("codecs = []\n");
        let result = AgentConfig::resolve(&args(&[]), Some(file));
        assert!(matches!(result, Err(SinkError::Config(_))));
    }

    #[test]
    fn rejects_unknown_keys() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"adaptr = \"hci0\"\n").unwrap();
        assert!(load_file(tmp.path()).is_err());
    }

    #[test]
    fn discoverable_can_be_disabled_in_file() {
        let file = file("discoverable = false\n");
        let config = AgentConfig::resolve(&args(&[]), Some(file)).unwrap();
        assert!(!config.discoverable);
    }
}
