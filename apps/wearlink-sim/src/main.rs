mod config;
mod sim_sdk;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use wearlink_bridge::{Bridge, BridgeConfig, LifecycleEvent};
use wearlink_core::{ConnectionState, StreamKind};
use wearlink_transport::{ChannelEventSink, MethodCall, MethodResponse, OutboundEvent};

use crate::config::SimConfig;
use crate::sim_sdk::SimSdk;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (.toml, .json or .env)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Overrides the configured run duration, e.g. "30s"
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    duration: Option<Duration>,
}

#[derive(Debug, Error)]
enum SimError {
    #[error("config: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("{method} failed with {code}: {message}")]
    Call {
        method: String,
        code: String,
        message: String,
    },
    #[error("device {0} did not connect in time")]
    ConnectTimeout(String),
}

#[tokio::main]
async fn main() {
    let filter = std::env::var("WEARLINK_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("simulation failed: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), SimError> {
    let mut config = SimConfig::new(cli.config)?;
    if let Some(duration) = cli.duration {
        config.duration = duration;
    }
    let kinds = config.streams.clone();

    let (sdk_tx, sdk_rx) = mpsc::unbounded_channel();
    let sdk = Arc::new(SimSdk::new(&config, sdk_tx));
    let (sink, events) = ChannelEventSink::new();
    let bridge = Bridge::new(
        sdk,
        Arc::new(sink),
        BridgeConfig {
            use_max_settings_when_unspecified: config.use_max_settings,
            ..BridgeConfig::default()
        },
    );

    let pump = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.pump_sdk_events(sdk_rx).await })
    };
    let printer = tokio::spawn(print_events(events));

    let device_id = config.device_id.as_str();
    call(&bridge, "connect", json!(device_id)).await?;
    wait_for_connection(&bridge, device_id).await?;
    if let Some(info) = bridge.device_info(device_id) {
        info!(device_id = %device_id, name = %info.name, rssi = info.rssi, "connected");
    }

    for kind in &kinds {
        let response = match kind {
            StreamKind::Ppi => call(&bridge, "startPpiStreaming", json!(device_id)).await,
            kind => call(&bridge, "startStreaming", json!([device_id, kind.wire_name()])).await,
        };
        if let Err(err) = response {
            warn!(kind = %kind, "stream not started: {err}");
        }
    }
    if let Ok(disk) = call(&bridge, "getDiskSpace", json!(device_id)).await {
        info!(device_id = %device_id, disk = %disk, "disk space");
    }

    info!(duration = ?config.duration, streams = kinds.len(), "simulation running");
    tokio::select! {
        _ = tokio::time::sleep(config.duration) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    for kind in bridge.active_streams(device_id) {
        if let Err(err) = call(&bridge, "stopStreaming", json!([device_id, kind.wire_name()])).await
        {
            warn!(kind = %kind, "stop failed: {err}");
        }
    }
    call(&bridge, "disconnect", json!(device_id)).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = bridge.stats();
    bridge.handle_lifecycle(LifecycleEvent::Teardown);
    info!(
        events = stats.events_emitted,
        late = stats.late_callbacks_dropped,
        stream_errors = stats.stream_errors,
        degraded = stats.degraded_envelopes,
        "simulation finished"
    );

    pump.abort();
    drop(bridge);
    let _ = pump.await;
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
    Ok(())
}

async fn call(bridge: &Bridge, method: &str, arguments: Value) -> Result<Value, SimError> {
    match bridge
        .handle_method_call(MethodCall::new(method, arguments))
        .await
    {
        MethodResponse::Success(value) => Ok(value),
        MethodResponse::Error { code, message } => Err(SimError::Call {
            method: method.to_string(),
            code,
            message,
        }),
        MethodResponse::NotImplemented => Err(SimError::Call {
            method: method.to_string(),
            code: "notImplemented".to_string(),
            message: String::new(),
        }),
    }
}

async fn wait_for_connection(bridge: &Bridge, device_id: &str) -> Result<(), SimError> {
    let connected = async {
        while bridge.connection_state(device_id) != ConnectionState::Connected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(CONNECT_TIMEOUT, connected)
        .await
        .map_err(|_| SimError::ConnectTimeout(device_id.to_string()))
}

/// Writes every outbound event to stdout as one JSON line.
async fn print_events(mut events: mpsc::UnboundedReceiver<OutboundEvent>) {
    while let Some(event) = events.recv().await {
        println!("{}", event_line(&event));
    }
}

fn event_line(event: &OutboundEvent) -> Value {
    json!({ "event": event.name, "payload": event.payload })
}
