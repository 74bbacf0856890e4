//! bt-audio - Bluetooth A2DP sink agent.
//!
//! Tracks BlueZ adapters, devices and media transports, registers codec
//! endpoints and a pairing agent, and plays every incoming stream through a
//! GStreamer pipeline.

mod config;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bt_audio_bluez::{BluezBus, SystemSetup};
use bt_audio_core::pipeline::topology;
use bt_audio_core::{
    AgentSlot, ObjectPath, ObjectRegistry, PathEventSource, Services, SinkError,
};
use bt_audio_pipeline::GstPipelineBuilder;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{AgentConfig, Args};

fn setup_logging(
    config: &AgentConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("Invalid log level {:?}", config.log_level))?,
    };

    let Some(path) = &config.log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
        return Ok(None);
    };

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Logging to {}", path.display());
    Ok(Some(guard))
}

/// Report host setup problems for the configured codecs.
fn run_check(config: &AgentConfig) -> Result<()> {
    let placeholder = ObjectPath::new("/org/bluez/hci0/dev_00/fd0");
    let factories: BTreeSet<String> = config
        .codecs
        .iter()
        .flat_map(|codec| topology(*codec, &placeholder, &config.settings.pipeline))
        .map(|element| element.factory)
        .collect();
    let factories: Vec<&str> = factories.iter().map(String::as_str).collect();

    let status = SystemSetup::check(&factories);
    println!("{}", status.summary());
    for issue in &status.issues {
        println!("  - {}", issue.description);
        if let Some(cmd) = &issue.fix_command {
            println!("    Fix: {}", cmd);
        }
    }

    if !status.ready {
        bail!("host setup incomplete");
    }
    Ok(())
}

async fn run(config: AgentConfig) -> Result<()> {
    let bus = Arc::new(BluezBus::connect()?);
    let pipelines = Arc::new(GstPipelineBuilder::new()?);
    let (notices, notice_rx) = mpsc::unbounded_channel();

    let services = Services {
        source: bus.clone(),
        properties: bus.clone(),
        media: bus.clone(),
        agents: bus.clone(),
        pipelines,
        notices,
        agent: AgentSlot::default(),
        settings: Arc::new(config.settings.clone()),
    };

    // Subscribe first so nothing between the snapshot and the loop is lost.
    let events = bus.subscribe().await?;
    let mut registry = ObjectRegistry::new(services);
    registry.bootstrap().await?;

    let adapter = registry
        .get_adapter_mut(&config.adapter)
        .ok_or_else(|| SinkError::AdapterNotFound(config.adapter.clone()))?;
    adapter.set_powered(true).await?;
    if config.discoverable {
        adapter.set_discoverable(true).await?;
    }
    for codec in &config.codecs {
        adapter.register_endpoint(*codec).await?;
    }
    adapter.register_agent().await?;

    info!("A2DP sink ready on {}", config.adapter);

    registry
        .run(events, notice_rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                futures::future::pending::<()>().await;
            }
        })
        .await;

    info!("bt-audio exiting");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file = args.config.as_deref().map(config::load_file).transpose()?;
    let config = AgentConfig::resolve(&args, file)?;

    // Setup logging before anything else
    let _guard = setup_logging(&config)?;

    if config.check {
        return run_check(&config);
    }

    info!("Starting bt-audio on {}", config.adapter);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(config))
}
