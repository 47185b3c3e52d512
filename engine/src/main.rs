//! The entrypoint for the PowerBridge background service. Listens for remote power management
//! requests over HTTP and for the local UI over a named pipe, and performs the requested actions
//! on this machine.

use engine::{settings, Engine};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    Engine::start(settings::settings_path()).await
}
