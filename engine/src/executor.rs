//! Maps a [`CommandType`] to the OS action that carries it out.
//!
//! # Cancellation
//!
//! The cancellation token is checked once, immediately before the OS call is handed to the
//! blocking pool. Once a shutdown has been spawned or a packet broadcast the action is not undone,
//! and cancelling afterwards has no effect.

use std::{
    io,
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use shared_std::{commands::CommandType, settings::PowerBridgeSettings};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{error::CommandError, platform::PlatformActions};

/// 6 bytes of 0xFF followed by the target MAC 16 times.
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Stateless apart from the settings receiver; the Wake-on-LAN target is read fresh on every call.
pub struct CommandExecutor {
    platform: Arc<dyn PlatformActions>,
    settings: watch::Receiver<PowerBridgeSettings>,
}

impl CommandExecutor {
    pub fn new(
        platform: Arc<dyn PlatformActions>,
        settings: watch::Receiver<PowerBridgeSettings>,
    ) -> Self {
        CommandExecutor { platform, settings }
    }

    /// Performs the action for `command`.
    ///
    /// `CommandType::None` returns immediately without touching the OS, whatever the state of
    /// `cancel`. `TurnScreenOff` never fails: errors are logged and swallowed.
    pub async fn execute(
        &self,
        command: CommandType,
        cancel: &CancellationToken,
    ) -> Result<(), CommandError> {
        if command == CommandType::None {
            return Ok(());
        }

        if cancel.is_cancelled() {
            info!(%command, "Command cancelled before execution");
            return Err(CommandError::Cancelled);
        }

        info!(%command, "Executing command");

        match command {
            CommandType::None => Ok(()),
            CommandType::Restart
            | CommandType::Shutdown
            | CommandType::ForceShutdown
            | CommandType::UefiReboot => {
                let args = shutdown_arguments(command);
                self.on_platform(move |p| p.run_shutdown(args))
                    .await
                    .map_err(CommandError::execution_failed(command))
            }
            CommandType::TurnScreenOff => {
                if let Err(e) = self.on_platform(|p| p.turn_screen_off()).await {
                    warn!("Failed to turn the screen off: {e}");
                }
                Ok(())
            }
            CommandType::Lock => self
                .on_platform(|p| p.lock_workstation())
                .await
                .map_err(CommandError::execution_failed(command)),
            CommandType::WakeOnLan => {
                let (packet, target) = self.wake_on_lan_target()?;
                self.on_platform(move |p| p.broadcast_datagram(&packet, target))
                    .await
                    .map_err(CommandError::execution_failed(command))?;
                info!(%target, "Sent Wake-on-LAN magic packet");
                Ok(())
            }
        }
    }

    /// Runs a blocking OS call off the async workers.
    async fn on_platform<F>(&self, action: F) -> io::Result<()>
    where
        F: FnOnce(&dyn PlatformActions) -> io::Result<()> + Send + 'static,
    {
        let platform = Arc::clone(&self.platform);
        tokio::task::spawn_blocking(move || action(platform.as_ref()))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    fn wake_on_lan_target(&self) -> Result<([u8; MAGIC_PACKET_LEN], SocketAddrV4), CommandError> {
        let settings = self.settings.borrow().wake_on_lan.clone();
        let invalid = |reason: String| CommandError::InvalidConfiguration {
            command: CommandType::WakeOnLan,
            reason,
        };

        if !settings.is_configured() {
            return Err(invalid("no MAC address is configured".to_string()));
        }

        let mac = parse_mac_address(&settings.mac_address).ok_or_else(|| {
            invalid(format!("'{}' is not a valid MAC address", settings.mac_address))
        })?;

        let address: Ipv4Addr = settings.broadcast_address.trim().parse().map_err(|_| {
            invalid(format!(
                "'{}' is not a valid IPv4 broadcast address",
                settings.broadcast_address
            ))
        })?;

        Ok((magic_packet(&mac), SocketAddrV4::new(address, settings.port)))
    }
}

/// Arguments passed to `shutdown.exe` for each power command.
pub fn shutdown_arguments(command: CommandType) -> &'static [&'static str] {
    match command {
        CommandType::Restart => &["/r", "/t", "0"],
        CommandType::Shutdown => &["/s", "/t", "0"],
        CommandType::ForceShutdown => &["/s", "/f", "/t", "10"],
        CommandType::UefiReboot => &["/r", "/fw", "/t", "0"],
        _ => &[],
    }
}

/// Normalises a MAC written with optional `:` or `-` separators into its 6 bytes.
pub fn parse_mac_address(raw: &str) -> Option<[u8; 6]> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut mac = [0u8; 6];
    for (i, byte) in mac.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
    }

    Some(mac)
}

pub fn magic_packet(mac: &[u8; 6]) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFF; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(mac);
    }
    packet
}
