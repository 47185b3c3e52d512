#![allow(dead_code)]

use std::{
    io,
    net::SocketAddrV4,
    sync::{Arc, Barrier, Mutex},
};

use engine::{
    apps::AppStore, dispatcher::RequestDispatcher, executor::CommandExecutor,
    platform::PlatformActions, service_api::ServiceApi, stats::StatsProvider,
};
use shared_std::settings::PowerBridgeSettings;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Shutdown(Vec<String>),
    ScreenOff,
    Lock,
    Broadcast { payload: Vec<u8>, target: SocketAddrV4 },
}

/// Records every OS call instead of making it.
#[derive(Default)]
pub struct RecordingPlatform {
    pub calls: Mutex<Vec<Call>>,
    pub fail_screen_off: bool,
    pub fail_lock: bool,
    /// When set, every shutdown waits here before returning.
    pub shutdown_barrier: Option<Arc<Barrier>>,
}

impl RecordingPlatform {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlatformActions for RecordingPlatform {
    fn run_shutdown(&self, args: &[&str]) -> io::Result<()> {
        self.record(Call::Shutdown(args.iter().map(|a| a.to_string()).collect()));
        if let Some(barrier) = &self.shutdown_barrier {
            barrier.wait();
        }
        Ok(())
    }

    fn turn_screen_off(&self) -> io::Result<()> {
        self.record(Call::ScreenOff);
        if self.fail_screen_off {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "display driver hung"));
        }
        Ok(())
    }

    fn lock_workstation(&self) -> io::Result<()> {
        self.record(Call::Lock);
        if self.fail_lock {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "no interactive session"));
        }
        Ok(())
    }

    fn broadcast_datagram(&self, payload: &[u8], target: SocketAddrV4) -> io::Result<()> {
        self.record(Call::Broadcast {
            payload: payload.to_vec(),
            target,
        });
        Ok(())
    }
}

fn as_platform(platform: &Arc<RecordingPlatform>) -> Arc<dyn PlatformActions> {
    Arc::clone(platform) as Arc<dyn PlatformActions>
}

pub fn executor(
    platform: &Arc<RecordingPlatform>,
    settings: PowerBridgeSettings,
) -> Arc<CommandExecutor> {
    let (_tx, rx) = watch::channel(settings);
    Arc::new(CommandExecutor::new(as_platform(platform), rx))
}

pub fn dispatcher(
    platform: &Arc<RecordingPlatform>,
    settings: PowerBridgeSettings,
) -> RequestDispatcher {
    let (_tx, rx) = watch::channel(settings);
    let executor = Arc::new(CommandExecutor::new(as_platform(platform), rx.clone()));
    RequestDispatcher::new(executor, rx)
}

/// A service API over a fresh app store in `dir`.
pub async fn service_api(
    platform: &Arc<RecordingPlatform>,
    settings: PowerBridgeSettings,
    dir: &tempfile::TempDir,
) -> Arc<ServiceApi> {
    let (_tx, rx) = watch::channel(settings);
    let executor = Arc::new(CommandExecutor::new(as_platform(platform), rx.clone()));
    let apps = AppStore::load(dir.path().join("apps.json")).await.unwrap();

    Arc::new(ServiceApi::new(executor, apps, StatsProvider::new(), rx))
}

pub fn settings_with_secret(secret: &str) -> PowerBridgeSettings {
    let mut settings = PowerBridgeSettings::default();
    settings.http.secret = secret.to_string();
    settings
}
