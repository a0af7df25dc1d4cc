//! Proxy balancer binary entry point.

use sdn_proxy_balancer::config::ConfigLoader;
use sdn_proxy_balancer::module::ModuleContract;
use sdn_proxy_balancer::modules::proxy_balancer::Controller;
use sdn_proxy_balancer::openflow::SwitchEvent;
use sdn_proxy_balancer::telemetry;
use tokio::sync::mpsc;

/// Capacity of the switch event queue.
const EVENT_QUEUE_DEPTH: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::args_os().nth(1);
    let config = ConfigLoader::with_default_validators().load_or_default(config_path.as_ref())?;

    telemetry::init(&config.logging)?;
    tracing::info!(
        name = %config.controller.name,
        "proxy-balancer v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut controller = Controller::new(config.balancer)?;
    controller.start()?;

    // The switch transport owns the sending half.
    let (events_tx, events_rx) = mpsc::channel::<SwitchEvent>(EVENT_QUEUE_DEPTH);

    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = controller.run_event_loop(events_rx) => {},
        _ = ctrl_c => tracing::info!("shutdown signal received"),
        () = sigterm => tracing::info!("shutdown signal received"),
    }

    drop(events_tx);
    controller.stop()?;
    Ok(())
}
