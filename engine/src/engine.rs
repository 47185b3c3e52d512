use std::{
    future::Future,
    io,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use tokio::{net::TcpListener, sync::watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    apps::AppStore,
    communication::{http, ipc::IpcServer},
    dispatcher::RequestDispatcher,
    executor::CommandExecutor,
    platform::{NativePlatform, PlatformActions},
    service_api::ServiceApi,
    settings::{self, RELOAD_INTERVAL},
    stats::StatsProvider,
};

/// Engine is the central control point for the PowerBridge service. It is responsible for:
///
/// - Loading settings and keeping them fresh
/// - Serving remote callers over HTTP
/// - Serving the local UI over IPC
/// - Shutting everything down on Ctrl+C
pub struct Engine {}

impl Engine {
    /// Start the engine and run until it is interrupted or one of the listeners fails.
    pub async fn start(settings_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        info!("PowerBridge engine starting..");

        //
        // Start by instantiating the elements we will be using in the engine.
        // Once created; clone them as Arcs to share across the tasks
        //
        let settings = settings::load_or_create(&settings_path)?;
        info!("Loaded settings from {}", settings_path.display());

        let (settings_tx, settings_rx) = watch::channel(settings.clone());
        let cancel = CancellationToken::new();

        let platform: Arc<dyn PlatformActions> = Arc::new(NativePlatform);
        let executor = Arc::new(CommandExecutor::new(platform, settings_rx.clone()));
        let dispatcher = Arc::new(RequestDispatcher::new(
            Arc::clone(&executor),
            settings_rx.clone(),
        ));

        let apps_path = settings::resolve_relative(&settings_path, &settings.apps_file);
        let apps = AppStore::load(apps_path).await?;
        let service_api = Arc::new(ServiceApi::new(
            executor,
            apps,
            StatsProvider::new(),
            settings_rx,
        ));

        let bind_address: IpAddr = settings.http.bind_address.parse()?;
        let listener = TcpListener::bind(SocketAddr::new(bind_address, settings.http.port)).await?;

        //
        // Settings hot reload. Listener addresses and the pipe name are only read here, at start
        // up; everything else is read from the live snapshot on each request.
        //
        tokio::spawn(settings::watch_settings(
            settings_path,
            settings_tx,
            RELOAD_INTERVAL,
            cancel.child_token(),
        ));

        let http_handle = tokio::spawn(http::serve(listener, dispatcher, cancel.child_token()));

        let pipe_name = settings.ipc.pipe_name.clone();
        let ipc_cancel = cancel.child_token();
        let ipc_handle = tokio::spawn(async move {
            IpcServer::listen(service_api, &pipe_name, ipc_cancel).await
        });

        tokio::spawn(cancel_on_interrupt(tokio::signal::ctrl_c(), cancel.clone()));

        // If either listener returns, bring the other one down and report why
        let result = tokio::select! {
            result = http_handle => result,
            result = ipc_handle => result,
        };
        cancel.cancel();

        result??;

        info!("PowerBridge engine stopped");
        Ok(())
    }
}

/// Cancels `cancel` once `signal` fires. If the signal cannot be listened for the service keeps
/// running without a Ctrl+C handler.
async fn cancel_on_interrupt<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Interrupt received, shutting down");
            cancel.cancel();
        }
        Err(e) => error!("Unable to listen for the interrupt signal: {e}"),
    }
}
