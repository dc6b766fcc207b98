use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use anyhow::anyhow;
use autolightd::Config;
use autolightd::engine::Engine;
use autolightd::integrations::ha::RestClient;
use autolightd::integrations::mqtt::RumqttcClient;
use autolightd::integrations::mqtt::Statestream;
use autolightd::runtime;
use autolightd::runtime::Runtime;
use autolightd::runtime::RuntimeHost;
use autolightd::runtime::StateStore;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Room lighting automation for Home Assistant
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "autolightd.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    if args.check {
        info!(
            "{}: configuration OK ({} rooms)",
            args.config.display(),
            config.rooms.len()
        );
        return Ok(());
    }

    info!("autolightd starting");
    info!("Loaded config from: {}", args.config.display());

    let mqtt_config = config
        .mqtt
        .as_ref()
        .context("[mqtt] section is required to run the daemon")?;
    let ha_config = config
        .home_assistant
        .as_ref()
        .context("[home_assistant] section is required to run the daemon")?;

    // State source
    let (tx, mut rx) = runtime::host_channel();
    let client = RumqttcClient::new(mqtt_config).context("Failed to create MQTT client")?;
    let mut statestream = Statestream::new(client, mqtt_config.statestream_prefix.clone());
    info!(
        "Connecting to MQTT broker at {}:{}",
        mqtt_config.broker, mqtt_config.port
    );
    statestream
        .setup()
        .await
        .map_err(|e| anyhow!("Statestream setup failed: {}", e))?;
    let statestream_task = tokio::spawn(statestream.run(tx.clone()));

    let mut store = StateStore::new();
    runtime::sync(
        &mut rx,
        &mut store,
        Duration::from_secs(mqtt_config.sync_timeout_secs),
    )
    .await;

    // Action sink
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let sink = RestClient::new(ha_config).context("Failed to create Home Assistant client")?;
    let action_task = tokio::spawn(runtime::forward_actions(sink, action_rx));

    let mut engine = Engine::from_config(&config, RuntimeHost::new(store, action_tx));
    engine.start();

    let mut runtime = Runtime::new(engine, tx, rx);
    tokio::select! {
        _ = runtime.run() => {
            error!("Runtime loop exited");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C, shutting down");
        }
    }

    statestream_task.abort();
    drop(runtime);
    // Let queued actions drain now that the engine's sender is gone
    if tokio::time::timeout(Duration::from_secs(5), action_task)
        .await
        .is_err()
    {
        error!("Timed out waiting for pending actions");
    }

    info!("autolightd stopped");
    Ok(())
}
