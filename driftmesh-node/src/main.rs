//! `driftmesh-node`: config loading, logging initialization, and wiring
//! of the convergence engine to a concrete L2 (`driftmesh-udp-cla`) and a
//! sample application (`driftmesh-echo-app`) - the thin binary gluing
//! the library crates together.

mod config;

use std::sync::Arc;

use driftmesh_engine::{channel, spawn_discovery_ticker, spawn_retransmit_ticker, Engine};
use driftmesh_udp_cla::UdpCla;
use tracing::{error, info};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some((node_config, config_source)) = config::init() else {
        return Ok(());
    };

    let log_level = std::env::var("DRIFTMESH_NODE_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<tracing::Level>().ok())
        .unwrap_or_else(|| node_config.log_level());

    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
        let filter = EnvFilter::builder()
            .with_default_directive(tracing_subscriber::filter::LevelFilter::from_level(log_level).into())
            .from_env_lossy();
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(filter))
            .init();
    }

    info!("{PKG_NAME} version {PKG_VERSION} starting...");
    info!("{config_source}");

    inner_main(node_config).await.inspect_err(|e| error!("{e}"))
}

async fn inner_main(node_config: config::NodeConfig) -> anyhow::Result<()> {
    let engine_config = node_config.engine_config();

    let link = Arc::new(UdpCla::bind(node_config.bind_addr, node_config.broadcast_addr).await?);
    let echo_app = Arc::new(driftmesh_echo_app::EchoApp::new(node_config.echo_service_num));

    let (tx, rx) = channel(&engine_config);
    echo_app.attach(tx.clone());

    let mut engine = Engine::new(engine_config, link.clone(), echo_app, tx.clone());
    let stats = engine.stats();

    let _discovery_task =
        spawn_discovery_ticker(tx.clone(), stats.clone(), node_config.discovery_period_s);
    let _retransmit_task =
        spawn_retransmit_ticker(tx.clone(), stats.clone(), node_config.retransmit_period_s);
    let _recv_task = link.spawn_recv_loop(tx.clone(), stats);

    info!(
        node = %node_config.node.to_eid(),
        bind_addr = %node_config.bind_addr,
        "started successfully"
    );

    tokio::select! {
        _ = engine.run(rx) => {
            info!("convergence engine loop exited (message channel closed)");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received CTRL+C, stopping...");
        }
    }

    info!("stopped");
    Ok(())
}
