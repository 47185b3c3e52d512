use std::{sync::Arc, time::Instant};

use shared_std::{
    commands::CommandType,
    models::{AppEntry, ServiceStatus, SystemStats},
    settings::PowerBridgeSettings,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    apps::{AppStore, AppStoreError},
    error::CommandError,
    executor::CommandExecutor,
    stats::StatsProvider,
};

/// The facade the IPC handler works against. Holds the services shared with the rest of the
/// engine; it keeps no state of its own beyond the start time.
///
/// # API naming conventions
///
/// - apps_ => anything touching the app launcher store
/// - command_ => command execution
pub struct ServiceApi {
    executor: Arc<CommandExecutor>,
    apps: AppStore,
    stats: StatsProvider,
    settings: watch::Receiver<PowerBridgeSettings>,
    started: Instant,
}

impl ServiceApi {
    pub fn new(
        executor: Arc<CommandExecutor>,
        apps: AppStore,
        stats: StatsProvider,
        settings: watch::Receiver<PowerBridgeSettings>,
    ) -> Self {
        ServiceApi {
            executor,
            apps,
            stats,
            settings,
            started: Instant::now(),
        }
    }

    //
    // Read models
    //

    pub fn stats(&self) -> SystemStats {
        self.stats.snapshot()
    }

    pub fn status(&self) -> ServiceStatus {
        let settings = self.settings.borrow();

        ServiceStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
            http_port: settings.http.port,
            secret_configured: settings.http.secret_configured(),
            wake_on_lan_configured: settings.wake_on_lan.is_configured(),
            default_command: settings.http.default_command,
        }
    }

    //
    // App launcher store
    //

    pub async fn apps_list(&self) -> Vec<AppEntry> {
        self.apps.list().await
    }

    pub async fn apps_save(&self, app: AppEntry) -> Result<AppEntry, AppStoreError> {
        self.apps.save(app).await
    }

    pub async fn apps_delete(&self, id: &str) -> Result<bool, AppStoreError> {
        self.apps.delete(id).await
    }

    //
    // Commands
    //

    /// Goes through the same executor as HTTP dispatch.
    pub async fn command_execute(
        &self,
        command: CommandType,
        cancel: &CancellationToken,
    ) -> Result<(), CommandError> {
        self.executor.execute(command, cancel).await
    }
}
