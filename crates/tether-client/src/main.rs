use anyhow::{Context, Result};
use tether_client::app::ClientApp;
use tether_client::config::ClientConfig;
use tether_client::transport::WsTransport;
use tether_engine::device::GpuInit;
use tether_engine::logging::init_logging;
use tether_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    let config = ClientConfig::from_env();
    init_logging(config.logging.clone());

    let transport = WsTransport::connect(&config.server_url, config.poll_interval)
        .with_context(|| format!("failed to connect to {}", config.server_url))
        .inspect_err(|e| log::error!("{e:#}"))?;

    let runtime_config = RuntimeConfig {
        title: config.title.clone(),
        initial_size: config.window_size,
    };
    let app = ClientApp::new(transport, config.view);

    let mut app = Runtime::run(runtime_config, GpuInit::default(), app)?;
    if let Some(err) = app.take_failure() {
        return Err(err);
    }

    log::info!(
        "session closed after {} cycles",
        app.dispatcher().session().cycles
    );
    Ok(())
}
